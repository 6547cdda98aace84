//! Invoice item entity - one row of an invoice's two-level item tree.
//!
//! A row is either a label (`is_label = true`, no monetary value) or a line item.
//! Line items directly under the invoice have no parent; line items grouped
//! under a label point at it through `parent_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning invoice
    pub invoice_id: i64,
    /// Label this item is grouped under
    pub parent_id: Option<i64>,
    /// Grouping node without monetary value
    pub is_label: bool,
    /// Text printed on the invoice
    pub description: String,
    /// Units billed
    pub quantity: f64,
    /// Unit of measure (e.g. "m2", "pcs")
    pub unit: String,
    /// Price per unit
    pub unit_price: f64,
    /// `quantity * unit_price`, zero for labels
    pub subtotal: f64,
    /// Position among its siblings
    pub sort_order: i32,
}

/// Defines relationships between InvoiceItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one invoice
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id",
        on_delete = "Cascade"
    )]
    Invoice,
    /// Label a child item is grouped under
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
