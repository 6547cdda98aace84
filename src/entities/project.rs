//! Project entity - the unit that owns a budget and collects expenses,
//! budget requests and invoices.

use super::enums::ProjectStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    /// Unique identifier for the project
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project name
    pub name: String,
    /// Free-form description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Lifecycle status
    pub status: ProjectStatus,
    /// User who created (owns) the project
    pub created_by: i64,
    /// When the project was created
    pub created_at: DateTimeUtc,
    /// When the project was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Project and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Every project has exactly one budget row
    #[sea_orm(has_one = "super::project_budget::Entity")]
    Budget,
    /// Members allowed to submit items
    #[sea_orm(has_many = "super::project_member::Entity")]
    Members,
}

impl Related<super::project_budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl Related<super::project_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
