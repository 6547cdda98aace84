//! Expense approval entity - the decision record written with every expense
//! approval or rejection, in the same transaction as the status change.

use super::enums::ApprovalStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense approval database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_approvals")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Expense the decision applies to
    pub expense_id: i64,
    /// Reviewer
    pub approved_by: i64,
    /// `Approved` or `Rejected`
    pub status: ApprovalStatus,
    /// Reviewer notes
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    /// When the decision was taken
    pub created_at: DateTimeUtc,
}

/// Defines relationships between ExpenseApproval and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each decision belongs to one expense
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::Id",
        on_delete = "Cascade"
    )]
    Expense,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
