//! Invoice numbers.
//!
//! The final number embeds the row id, which only exists after the insert.
//! Creation therefore inserts with a unique placeholder and stamps the real
//! number in the same transaction.

use crate::{entities::invoice, errors::Result};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use std::sync::atomic::{AtomicU64, Ordering};

static PLACEHOLDER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique throwaway number used between insert and stamp.
#[must_use]
pub fn placeholder_number() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let sequence = PLACEHOLDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("TEMP-{nanos}-{sequence}")
}

/// `INV/<company>/<YYYY>/<MM>/<id:05>`.
#[must_use]
pub fn format_invoice_number(
    company_code: &str,
    invoice_date: NaiveDate,
    invoice_id: i64,
) -> String {
    format!(
        "INV/{}/{:04}/{:02}/{:05}",
        company_code,
        invoice_date.year(),
        invoice_date.month(),
        invoice_id
    )
}

/// Replaces the placeholder of a freshly inserted invoice with its final number.
pub async fn stamp_invoice_number<C>(
    db: &C,
    invoice: invoice::Model,
    company_code: &str,
) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    let number = format_invoice_number(company_code, invoice.invoice_date, invoice.id);
    let mut active: invoice::ActiveModel = invoice.into();
    active.invoice_number = Set(number);
    Ok(active.update(db).await?)
}
