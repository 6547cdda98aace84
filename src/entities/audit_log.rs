//! Audit log entity - immutable record of who did what to which entity.

use super::enums::AuditAction;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Acting user
    pub user_id: i64,
    /// What happened
    pub action: AuditAction,
    /// Table-level name of the affected entity (e.g. `"expense"`)
    pub entity_type: String,
    /// Id of the affected entity
    pub entity_id: i64,
    /// Short human-readable detail string
    #[sea_orm(column_type = "Text")]
    pub details: String,
    /// When it happened
    pub created_at: DateTimeUtc,
}

/// Audit entries are standalone.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
