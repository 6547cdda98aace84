//! Core ledger logic - framework-agnostic services over the entities.
//!
//! Every operation takes a [`context::LedgerContext`] (or a bare connection for
//! reads), does its reads and writes inside one transaction, and runs audit and
//! notification side effects only after the commit.

pub mod approval;
pub mod audit;
pub mod budget;
pub mod budget_request;
pub mod context;
pub mod effects;
pub mod expense;
pub mod invoice;
pub mod invoice_items;
pub mod notification;
pub mod numbering;
pub mod payment;
pub mod project;
pub mod project_plan;
pub mod user;

use crate::errors::{Error, Result};
use chrono::NaiveDate;

pub use context::{Actor, LedgerContext};

/// Rounds a monetary value to two decimals.
///
/// Totals are rounded so that sums of cent amounts compare exactly.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a `YYYY-MM-DD` business date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("Invalid date '{value}', expected YYYY-MM-DD")))
}
