//! Input normalizer.
//!
//! Cleans collection files in place (blank and duplicate lines removed)
//! and parses each remaining line into a `CardRequest`.
//!
//! Line grammar:
//! `[<int>x ]<name>[ (<set-annotation>)][ #<collector-number>][ - <set-hint>][ | <cost-basis>]`

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{CardRequest, Game, TrackerError};

static QUANTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[xX]\s+(.+)$").expect("valid quantity regex"));

static COLLECTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s+#\s*(\S+)$").expect("valid collector regex"));

static ANNOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid annotation regex"));

/// Line counts before and after cleaning a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    pub before: usize,
    pub after: usize,
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Strip every line, drop blanks and repeats of an earlier line.
///
/// First occurrence wins and order is otherwise preserved. Every kept line
/// is newline-terminated, so the output is a fixed point of this function.
pub fn dedup_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || !seen.insert(stripped) {
            continue;
        }
        out.push_str(stripped);
        out.push('\n');
    }

    out
}

/// Deduplicate a collection file in place.
pub fn clean_file(path: &Path) -> Result<CleanStats> {
    if !path.exists() {
        return Err(TrackerError::InputMissing {
            path: path.display().to_string(),
        }
        .into());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cleaned = dedup_lines(&text);

    let stats = CleanStats {
        before: text.lines().count(),
        after: cleaned.lines().count(),
    };

    if cleaned != text {
        std::fs::write(path, &cleaned)
            .with_context(|| format!("Failed to rewrite {}", path.display()))?;
    }

    info!(
        path = %path.display(),
        before = stats.before,
        after = stats.after,
        "Cleaned input file"
    );

    Ok(stats)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a cost-basis suffix. Anything that isn't a non-negative number is
/// treated as absent.
fn parse_cost(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let text = text.strip_prefix('$').unwrap_or(text).trim();
    text.parse::<Decimal>().ok().filter(|d| !d.is_sign_negative())
}

/// Split a leading `<n>x ` quantity off the card text.
fn split_quantity(text: &str) -> (u32, &str) {
    if let Some(caps) = QUANTITY_RE.captures(text) {
        if let (Some(n), Some(rest)) = (caps.get(1), caps.get(2)) {
            if let Ok(qty) = n.as_str().parse::<u32>() {
                return (qty.max(1), rest.as_str().trim());
            }
        }
    }
    (1, text)
}

/// Split a trailing ` - <set>` hint off the card text.
fn split_set_hint(text: &str) -> (&str, Option<String>) {
    match text.rsplit_once(" - ") {
        Some((name, hint)) if !hint.trim().is_empty() && !name.trim().is_empty() => {
            (name.trim(), Some(hint.trim().to_string()))
        }
        _ => (text, None),
    }
}

/// Split a trailing `#<number>` off the card text.
fn split_collector_number(text: &str) -> (&str, Option<String>) {
    match COLLECTOR_RE.captures(text) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(name), Some(number)) => (name.as_str().trim(), Some(number.as_str().to_string())),
            _ => (text, None),
        },
        None => (text, None),
    }
}

/// Parse one collection line. Returns `None` for blank lines and lines
/// with no card name left after stripping.
pub fn parse_line(line: &str, game: Game, position: usize) -> Option<CardRequest> {
    let raw = line.trim();
    if raw.is_empty() {
        return None;
    }

    let (card_text, cost_basis) = match raw.split_once('|') {
        Some((card, cost)) => (card.trim(), parse_cost(cost)),
        None => (raw, None),
    };

    let (quantity, rest) = split_quantity(card_text);
    // Yu-Gi-Oh! names carry ` - ` themselves; only Magic lines take a set hint
    let (rest, set_hint) = match game {
        Game::Magic => split_set_hint(rest),
        Game::YuGiOh => (rest, None),
    };
    let (name_part, collector_number) = split_collector_number(rest);
    let name = ANNOTATION_RE.replace_all(name_part, "").trim().to_string();

    if name.is_empty() {
        debug!(line = raw, "No card name on line");
        return None;
    }

    Some(CardRequest {
        raw_line: raw.to_string(),
        game,
        name,
        quantity,
        collector_number,
        set_hint,
        cost_basis,
        position,
    })
}

/// Clean a collection file and parse every line.
///
/// Positions are numbered from `start_position` so requests from several
/// files keep a single run-wide order.
pub fn load_requests(path: &Path, game: Game, start_position: usize) -> Result<Vec<CardRequest>> {
    clean_file(path)?;

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let requests: Vec<CardRequest> = text
        .lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(line, game, start_position + i))
        .collect();

    info!(game = %game, count = requests.len(), "Card requests loaded");
    Ok(requests)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
