//! Card Tracker — collection value tracking for Magic: The Gathering and
//! Yu-Gi-Oh! cards.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod input;
pub mod catalog;
pub mod engine;
pub mod storage;
pub mod alerts;
pub mod report;
