//! Invoice entity - a bill issued for a project.
//!
//! `invoice_number` is stamped after insertion because it embeds the row id.
//! `paid_amount` and `payment_status` are derived from `invoice_payments` and are
//! recomputed from scratch whenever a payment is added or removed.

use super::enums::{ApprovalStatus, InvoiceType, PaymentStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable number, unique across all invoices
    #[sea_orm(unique)]
    pub invoice_number: String,
    /// Billing stage
    pub invoice_type: InvoiceType,
    /// Project being billed
    pub project_id: i64,
    /// Billed party
    pub recipient_name: String,
    /// Billed party address
    #[sea_orm(column_type = "Text")]
    pub recipient_address: String,
    /// Contact person at the billed party
    pub attention: String,
    /// Customer purchase order reference
    pub po_number: String,
    /// Issue date
    pub invoice_date: Date,
    /// Optional payment deadline
    pub due_date: Option<Date>,
    /// Down payment percentage for `DP` invoices
    pub dp_percentage: Option<f64>,
    /// Sum of all line item subtotals
    pub subtotal: f64,
    /// Tax rate in percent
    pub tax_percentage: f64,
    /// `subtotal * tax_percentage / 100`
    pub tax_amount: f64,
    /// `subtotal + tax_amount`
    pub amount: f64,
    /// Free-form notes printed on the invoice
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    /// Language code used when rendering
    pub language: String,
    /// Approval state
    pub status: ApprovalStatus,
    /// Sum of recorded payments (derived)
    pub paid_amount: f64,
    /// Payment progress (derived)
    pub payment_status: PaymentStatus,
    /// User who created the invoice
    pub created_by: i64,
    /// Reviewer, set when the invoice is resolved
    pub approved_by: Option<i64>,
    /// Reason given on rejection
    #[sea_orm(column_type = "Text", nullable)]
    pub reject_notes: Option<String>,
    /// When the invoice was created
    pub created_at: DateTimeUtc,
    /// When the invoice was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Amount still owed.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.amount - self.paid_amount
    }
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invoice bills one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Line items and labels
    #[sea_orm(has_many = "super::invoice_item::Entity")]
    Items,
    /// Recorded payments
    #[sea_orm(has_many = "super::invoice_payment::Entity")]
    Payments,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::invoice_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::invoice_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
