//! Valuation aggregator — line totals, profit/loss and collection totals.
//!
//! Pairs every resolved card with the request it came from, prices each
//! line, sums the collection and fixes the order used by every report.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;

use crate::types::{CardRequest, Game, Price, ResolvedCard};

// ---------------------------------------------------------------------------
// Valuation line
// ---------------------------------------------------------------------------

/// One priced line of the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationLine {
    pub card: ResolvedCard,
    pub quantity: u32,
    /// Per-unit acquisition price from the input line.
    pub cost_basis: Option<Decimal>,
    pub line_total: Price,
    /// Present only when both a cost basis and a unit price are known.
    pub profit_loss: Option<Decimal>,
    /// Input order, kept as the tie-breaker.
    pub position: usize,
}

impl ValuationLine {
    pub fn new(request: &CardRequest, card: ResolvedCard) -> Self {
        let quantity = Decimal::from(request.quantity);
        let line_total = card.unit_price.times(request.quantity);

        // A cost basis too large to multiply out counts as absent
        let cost_basis = request.cost_basis.filter(|c| c.checked_mul(quantity).is_some());
        let profit_loss = match (line_total.amount(), cost_basis) {
            (Some(total), Some(cost)) => cost
                .checked_mul(quantity)
                .and_then(|paid| total.checked_sub(paid)),
            _ => None,
        };

        Self {
            card,
            quantity: request.quantity,
            cost_basis,
            line_total,
            profit_loss,
            position: request.position,
        }
    }

    /// Sort key: the line total, or -1 when unpriced so it sorts last.
    pub fn sort_value(&self) -> Decimal {
        self.line_total.amount().unwrap_or(Decimal::NEGATIVE_ONE)
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// The whole collection, priced and ordered for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valuation {
    /// Descending by line total; unpriced lines last; ties in input order.
    pub lines: Vec<ValuationLine>,
    pub total_value: Decimal,
    pub total_profit_loss: Decimal,
    /// Sum of known line totals per game.
    pub game_totals: BTreeMap<Game, Decimal>,
}

impl Valuation {
    /// Price every (request, card) pair and order the result.
    pub fn from_matches(matches: Vec<(CardRequest, ResolvedCard)>) -> Self {
        let mut lines: Vec<ValuationLine> = matches
            .into_iter()
            .map(|(request, card)| ValuationLine::new(&request, card))
            .collect();

        lines.sort_by(|a, b| {
            b.sort_value()
                .cmp(&a.sort_value())
                .then(a.position.cmp(&b.position))
        });

        let mut total_value = Decimal::ZERO;
        let mut total_profit_loss = Decimal::ZERO;
        let mut game_totals = BTreeMap::new();

        for line in &lines {
            if let Some(total) = line.line_total.amount() {
                total_value = total_value.saturating_add(total);
                let game_total = game_totals.entry(line.card.game).or_insert(Decimal::ZERO);
                *game_total = game_total.saturating_add(total);
            }
            if let Some(pl) = line.profit_loss {
                total_profit_loss = total_profit_loss.saturating_add(pl);
            }
        }

        let valuation = Self {
            lines,
            total_value,
            total_profit_loss,
            game_totals,
        };

        info!(
            cards = valuation.lines.len(),
            priced = valuation.priced_count(),
            unpriced = valuation.unpriced_count(),
            total = format!("${:.2}", valuation.total_value.round_dp(2)),
            profit_loss = format!("${:.2}", valuation.total_profit_loss.round_dp(2)),
            "Collection valued"
        );

        valuation
    }

    pub fn priced_count(&self) -> usize {
        self.lines.iter().filter(|l| l.line_total.is_known()).count()
    }

    pub fn unpriced_count(&self) -> usize {
        self.lines.len() - self.priced_count()
    }

    /// Whether any line carries a profit/loss figure.
    pub fn has_profit_loss(&self) -> bool {
        self.lines.iter().any(|l| l.profit_loss.is_some())
    }

    /// Total number of physical cards (sum of quantities).
    pub fn card_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
