//! Audit trail - append-only record of every state-changing action.
//!
//! Entries are written after the business transaction commits, so a failure
//! here never undoes a committed change. See [`crate::core::effects`].

use crate::{
    entities::{AuditAction, AuditLog, audit_log},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Entity type names used in audit rows and error messages.
pub mod entity_types {
    /// Users
    pub const USER: &str = "user";
    /// Projects, their members and plans
    pub const PROJECT: &str = "project";
    /// Budget increase requests
    pub const BUDGET_REQUEST: &str = "budget_request";
    /// Expenses
    pub const EXPENSE: &str = "expense";
    /// Invoices
    pub const INVOICE: &str = "invoice";
    /// Invoice payments
    pub const INVOICE_PAYMENT: &str = "invoice_payment";
}

/// Appends an audit row.
pub async fn record_audit_entry<C>(
    db: &C,
    user_id: i64,
    action: AuditAction,
    entity_type: &str,
    entity_id: i64,
    details: String,
) -> Result<audit_log::Model>
where
    C: ConnectionTrait,
{
    let entry = audit_log::ActiveModel {
        user_id: Set(user_id),
        action: Set(action),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        details: Set(details),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

/// All audit rows, newest first.
pub async fn list_audit_logs(db: &DatabaseConnection) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Audit rows for one entity type, newest first.
pub async fn list_audit_logs_by_entity_type(
    db: &DatabaseConnection,
    entity_type: &str,
) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .filter(audit_log::Column::EntityType.eq(entity_type))
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// History of a single entity, oldest first.
pub async fn list_audit_logs_for_entity(
    db: &DatabaseConnection,
    entity_type: &str,
    entity_id: i64,
) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .filter(audit_log::Column::EntityType.eq(entity_type))
        .filter(audit_log::Column::EntityId.eq(entity_id))
        .order_by_asc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
