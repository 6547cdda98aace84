//! Expense entity - money spent on a project, pending review.
//!
//! Expenses can be edited or deleted only while pending. Approval adds the
//! amount to the project's `spent_amount`.

use super::enums::ApprovalStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project the expense is charged to
    pub project_id: i64,
    /// What was bought
    pub description: String,
    /// Amount spent, always positive
    pub amount: f64,
    /// Spending category (e.g. "material", "transport")
    pub category: String,
    /// Optional link to an uploaded receipt
    pub receipt_url: Option<String>,
    /// Approval state
    pub status: ApprovalStatus,
    /// User who submitted the expense
    pub created_by: i64,
    /// When the expense was submitted
    pub created_at: DateTimeUtc,
    /// When the expense was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense is charged to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Decisions taken on this expense
    #[sea_orm(has_many = "super::expense_approval::Entity")]
    Approvals,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::expense_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Approvals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
