//! Invoice line items.
//!
//! An invoice body is a flat list of lines where each line is either a priced
//! item or a label grouping priced items. Labels nest exactly one level deep;
//! the shape is enforced by [`InvoiceLine`] rather than checked at runtime.
//! Label rows carry no amount of their own.
//!
//! Project plans store the same shape, so the row storage is generic over
//! [`LineTree`] tables.

use crate::{
    core::round_cents,
    entities::{InvoiceItem, invoice_item},
    errors::{Error, Result},
};
use sea_orm::{IntoActiveModel, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A priced line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// What is billed
    pub description: String,
    /// Billed quantity
    pub quantity: f64,
    /// Unit of the quantity, e.g. `"m2"`
    pub unit: String,
    /// Price per unit
    pub unit_price: f64,
}

impl LineItem {
    /// `quantity * unit_price`, rounded to cents.
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        round_cents(self.quantity * self.unit_price)
    }

    fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::validation("Item description cannot be empty"));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(Error::validation(format!(
                "Invalid quantity {} for item '{}'",
                self.quantity, self.description
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(Error::validation(format!(
                "Invalid unit price {} for item '{}'",
                self.unit_price, self.description
            )));
        }
        Ok(())
    }
}

/// Top-level line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvoiceLine {
    /// Standalone priced item
    Item(LineItem),
    /// Heading that groups priced items
    Label {
        /// Heading text
        description: String,
        /// Items under the heading
        items: Vec<LineItem>,
    },
}

impl InvoiceLine {
    /// Sum of the priced items in this line.
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        match self {
            Self::Item(item) => item.subtotal(),
            Self::Label { items, .. } => {
                round_cents(items.iter().map(LineItem::subtotal).sum())
            }
        }
    }
}

/// Monetary totals derived from an item tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    /// Sum of all priced items
    pub subtotal: f64,
    /// Tax on the subtotal
    pub tax_amount: f64,
    /// Subtotal plus tax
    pub amount: f64,
}

/// Checks every item and label description in `lines`.
pub fn validate_lines(lines: &[InvoiceLine]) -> Result<()> {
    for line in lines {
        match line {
            InvoiceLine::Item(item) => item.validate()?,
            InvoiceLine::Label { description, items } => {
                if description.trim().is_empty() {
                    return Err(Error::validation("Label description cannot be empty"));
                }
                for item in items {
                    item.validate()?;
                }
            }
        }
    }
    Ok(())
}

/// Sum of the priced items in `lines`, rounded to cents.
#[must_use]
pub fn lines_subtotal(lines: &[InvoiceLine]) -> f64 {
    round_cents(lines.iter().map(InvoiceLine::subtotal).sum())
}

/// Validates the lines and derives subtotal, tax and grand total.
pub fn compute_totals(lines: &[InvoiceLine], tax_percentage: f64) -> Result<InvoiceTotals> {
    if lines.is_empty() {
        return Err(Error::validation("At least one item or label is required"));
    }
    if !tax_percentage.is_finite() || !(0.0..=100.0).contains(&tax_percentage) {
        return Err(Error::validation(format!(
            "Tax percentage must be between 0 and 100, got {tax_percentage}"
        )));
    }
    validate_lines(lines)?;

    let subtotal = lines_subtotal(lines);
    let tax_amount = round_cents(subtotal * tax_percentage / 100.0);
    Ok(InvoiceTotals {
        subtotal,
        tax_amount,
        amount: round_cents(subtotal + tax_amount),
    })
}

/// Column values of one stored row of a line tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    /// Invoice or project the row belongs to
    pub owner_id: i64,
    /// Label the row is grouped under
    pub parent_id: Option<i64>,
    /// Whether the row is a label
    pub is_label: bool,
    /// Description, quantity, unit and price; zeroed for labels
    pub line: LineItem,
    /// `quantity * unit_price`, zero for labels
    pub subtotal: f64,
    /// Position among its siblings
    pub sort_order: i32,
}

impl TreeRow {
    fn label(owner_id: i64, description: &str, sort_order: i32) -> Self {
        Self {
            owner_id,
            parent_id: None,
            is_label: true,
            line: LineItem {
                description: description.trim().to_string(),
                quantity: 0.0,
                unit: String::new(),
                unit_price: 0.0,
            },
            subtotal: 0.0,
            sort_order,
        }
    }

    fn item(owner_id: i64, parent_id: Option<i64>, item: &LineItem, sort_order: i32) -> Self {
        Self {
            owner_id,
            parent_id,
            is_label: false,
            line: LineItem {
                description: item.description.trim().to_string(),
                ..item.clone()
            },
            subtotal: item.subtotal(),
            sort_order,
        }
    }
}

/// A table storing two-level line trees, keyed by an owner id.
pub trait LineTree: EntityTrait {
    /// Column referencing the owner
    fn owner_column() -> Self::Column;
    /// Column referencing the parent label
    fn parent_column() -> Self::Column;
    /// Sibling position column
    fn sort_column() -> Self::Column;
    /// Primary key column
    fn id_column() -> Self::Column;
    /// Builds an unsaved row.
    fn to_active(row: TreeRow) -> Self::ActiveModel;
    /// Id and column values of a stored row.
    fn from_model(model: &Self::Model) -> (i64, TreeRow);
}

impl LineTree for InvoiceItem {
    fn owner_column() -> invoice_item::Column {
        invoice_item::Column::InvoiceId
    }

    fn parent_column() -> invoice_item::Column {
        invoice_item::Column::ParentId
    }

    fn sort_column() -> invoice_item::Column {
        invoice_item::Column::SortOrder
    }

    fn id_column() -> invoice_item::Column {
        invoice_item::Column::Id
    }

    fn to_active(row: TreeRow) -> invoice_item::ActiveModel {
        invoice_item::ActiveModel {
            invoice_id: Set(row.owner_id),
            parent_id: Set(row.parent_id),
            is_label: Set(row.is_label),
            description: Set(row.line.description),
            quantity: Set(row.line.quantity),
            unit: Set(row.line.unit),
            unit_price: Set(row.line.unit_price),
            subtotal: Set(row.subtotal),
            sort_order: Set(row.sort_order),
            ..Default::default()
        }
    }

    fn from_model(model: &invoice_item::Model) -> (i64, TreeRow) {
        let row = TreeRow {
            owner_id: model.invoice_id,
            parent_id: model.parent_id,
            is_label: model.is_label,
            line: LineItem {
                description: model.description.clone(),
                quantity: model.quantity,
                unit: model.unit.clone(),
                unit_price: model.unit_price,
            },
            subtotal: model.subtotal,
            sort_order: model.sort_order,
        };
        (model.id, row)
    }
}

/// Deletes every row owned by `owner_id`, children before their labels.
pub async fn delete_tree<E, C>(db: &C, owner_id: i64) -> Result<()>
where
    E: LineTree,
    C: ConnectionTrait,
{
    E::delete_many()
        .filter(E::owner_column().eq(owner_id))
        .filter(E::parent_column().is_not_null())
        .exec(db)
        .await?;
    E::delete_many()
        .filter(E::owner_column().eq(owner_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn insert_row<E, C>(db: &C, row: TreeRow) -> Result<i64>
where
    E: LineTree,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: Send + 'static,
    C: ConnectionTrait,
{
    let model = E::to_active(row).insert(db).await?;
    Ok(E::from_model(&model).0)
}

/// Replaces the rows owned by `owner_id` with `lines`.
///
/// `sort_order` follows the order of `lines`, and of the items within a label.
pub async fn replace_tree<E, C>(db: &C, owner_id: i64, lines: &[InvoiceLine]) -> Result<()>
where
    E: LineTree,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: Send + 'static,
    C: ConnectionTrait,
{
    delete_tree::<E, C>(db, owner_id).await?;

    for (position, line) in (0_i32..).zip(lines) {
        match line {
            InvoiceLine::Item(item) => {
                insert_row::<E, C>(db, TreeRow::item(owner_id, None, item, position)).await?;
            }
            InvoiceLine::Label { description, items } => {
                let label_id =
                    insert_row::<E, C>(db, TreeRow::label(owner_id, description, position))
                        .await?;
                for (child_position, item) in (0_i32..).zip(items) {
                    let row = TreeRow::item(owner_id, Some(label_id), item, child_position);
                    insert_row::<E, C>(db, row).await?;
                }
            }
        }
    }
    Ok(())
}

/// Stored rows owned by `owner_id` in display order.
pub async fn list_tree_rows<E, C>(db: &C, owner_id: i64) -> Result<Vec<E::Model>>
where
    E: LineTree,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::owner_column().eq(owner_id))
        .order_by_asc(E::sort_column())
        .order_by_asc(E::id_column())
        .all(db)
        .await
        .map_err(Into::into)
}

/// Rebuilds the line tree owned by `owner_id` from its stored rows.
pub async fn load_tree<E, C>(db: &C, owner_id: i64) -> Result<Vec<InvoiceLine>>
where
    E: LineTree,
    C: ConnectionTrait,
{
    let rows: Vec<(i64, TreeRow)> = list_tree_rows::<E, C>(db, owner_id)
        .await?
        .iter()
        .map(E::from_model)
        .collect();

    let mut children: HashMap<i64, Vec<LineItem>> = HashMap::new();
    for (_, row) in &rows {
        if let Some(parent_id) = row.parent_id {
            children.entry(parent_id).or_default().push(row.line.clone());
        }
    }

    Ok(rows
        .into_iter()
        .filter(|(_, row)| row.parent_id.is_none())
        .map(|(id, row)| {
            if row.is_label {
                InvoiceLine::Label {
                    description: row.line.description,
                    items: children.remove(&id).unwrap_or_default(),
                }
            } else {
                InvoiceLine::Item(row.line)
            }
        })
        .collect())
}

/// Deletes every item of an invoice.
pub async fn delete_item_tree<C>(db: &C, invoice_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    delete_tree::<InvoiceItem, C>(db, invoice_id).await
}

/// Replaces the stored items of an invoice with `lines`.
///
/// Meant to run inside the transaction that writes the invoice totals.
pub async fn replace_item_tree<C>(db: &C, invoice_id: i64, lines: &[InvoiceLine]) -> Result<()>
where
    C: ConnectionTrait,
{
    replace_tree::<InvoiceItem, C>(db, invoice_id, lines).await
}

/// Stored item rows of an invoice in display order.
pub async fn list_item_rows<C>(db: &C, invoice_id: i64) -> Result<Vec<invoice_item::Model>>
where
    C: ConnectionTrait,
{
    list_tree_rows::<InvoiceItem, C>(db, invoice_id).await
}

/// Rebuilds the item tree of an invoice from its stored rows.
pub async fn load_item_tree<C>(db: &C, invoice_id: i64) -> Result<Vec<InvoiceLine>>
where
    C: ConnectionTrait,
{
    load_tree::<InvoiceItem, C>(db, invoice_id).await
}
