//! Invoice payment entity - append-only ledger of money received for an invoice.

use super::enums::PaymentMethod;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_payments")]
pub struct Model {
    /// Unique identifier, also the tie-breaker for same-day payments
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Invoice being paid
    pub invoice_id: i64,
    /// Amount received, always positive
    pub amount: f64,
    /// Date the money arrived
    pub payment_date: Date,
    /// How the money arrived
    pub payment_method: PaymentMethod,
    /// Optional link to a transfer slip or receipt
    pub proof_url: Option<String>,
    /// Free-form notes
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    /// User who recorded the payment
    pub created_by: i64,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between InvoicePayment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one invoice
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id",
        on_delete = "Cascade"
    )]
    Invoice,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
