//! Study-partner matching: compatibility scoring, candidate selection, and the
//! mutual-interest ledger that turns one-sided likes into chat threads.

pub mod config;
pub mod error;
pub mod matching;
pub mod telemetry;
