//! Budget request entity - a request to raise a project's total budget.
//!
//! Approval adds `amount` to `project_budgets.total_budget`; rejection has no
//! monetary effect. Both are terminal.

use super::enums::ApprovalStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_requests")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project whose budget should grow
    pub project_id: i64,
    /// User who submitted the request
    pub requested_by: i64,
    /// Requested increase, always positive
    pub amount: f64,
    /// Why the increase is needed
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// Approval state
    pub status: ApprovalStatus,
    /// Reviewer, set when the request is resolved
    pub approved_by: Option<i64>,
    /// Reviewer notes given at approval or rejection time
    #[sea_orm(column_type = "Text", nullable)]
    pub approval_notes: Option<String>,
    /// When the request was submitted
    pub created_at: DateTimeUtc,
    /// When the request was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between BudgetRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request targets one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
