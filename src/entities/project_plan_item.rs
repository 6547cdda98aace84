//! Project plan item entity - one row of a project's planned cost breakdown.
//!
//! Same two-level shape as invoice items: labels group line items through
//! `parent_id`, line items without a parent sit directly under the project.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project plan item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_plan_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning project
    pub project_id: i64,
    /// Label this item is grouped under
    pub parent_id: Option<i64>,
    /// Grouping node without monetary value
    pub is_label: bool,
    /// Planned work or material
    pub description: String,
    /// Planned units
    pub quantity: f64,
    /// Unit of measure
    pub unit: String,
    /// Estimated price per unit
    pub unit_price: f64,
    /// `quantity * unit_price`, zero for labels
    pub subtotal: f64,
    /// Position among its siblings
    pub sort_order: i32,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between ProjectPlanItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each plan item belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    /// Label a child item is grouped under
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
