//! Project budget entity - the running totals of a project.
//!
//! `total_budget` only grows through approved budget requests and `spent_amount`
//! only moves through approved expenses. Both are changed with single
//! `UPDATE ... SET col = col + x` statements, never by writing back a value read
//! into memory.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_budgets")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning project, one budget per project
    #[sea_orm(unique)]
    pub project_id: i64,
    /// Approved budget ceiling
    pub total_budget: f64,
    /// Sum of approved expenses
    pub spent_amount: f64,
    /// When the totals last changed
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Budget still available for spending.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.total_budget - self.spent_amount
    }
}

/// Defines relationships between ProjectBudget and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each budget belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
