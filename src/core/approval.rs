//! Generic PENDING -> APPROVED | REJECTED state machine.
//!
//! Budget requests, expenses and invoices share one transition routine. Each
//! of them implements [`ApprovalWorkflow`] to say how the decision is written
//! and what it changes elsewhere; [`transition`] supplies the locking, the
//! state check, the transaction and the post-commit side effects.

use crate::{
    core::{context::LedgerContext, effects, notification::NotificationDraft},
    entities::{ApprovalStatus, AuditAction},
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{
    ActiveEnum, DatabaseTransaction, EntityTrait, PrimaryKeyTrait, QuerySelect, TransactionTrait,
};
use tracing::{info, instrument};

/// Reviewer decision on a pending item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Accept, with optional notes
    Approve {
        /// Reviewer notes
        notes: Option<String>,
    },
    /// Refuse, with the reason
    Reject {
        /// Reason given to the requester
        notes: String,
    },
}

impl Decision {
    /// Status the item ends up in.
    #[must_use]
    pub const fn status(&self) -> ApprovalStatus {
        match self {
            Self::Approve { .. } => ApprovalStatus::Approved,
            Self::Reject { .. } => ApprovalStatus::Rejected,
        }
    }

    /// Audit action matching the decision.
    #[must_use]
    pub const fn audit_action(&self) -> AuditAction {
        match self {
            Self::Approve { .. } => AuditAction::Approve,
            Self::Reject { .. } => AuditAction::Reject,
        }
    }

    /// Verb used in error messages and logs.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
        }
    }

    /// Notes attached to the decision, if any.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        match self {
            Self::Approve { notes } => notes.as_deref(),
            Self::Reject { notes } => Some(notes.as_str()),
        }
    }

    /// Whether this is an approval.
    #[must_use]
    pub const fn is_approval(&self) -> bool {
        matches!(self, Self::Approve { .. })
    }
}

/// Per-entity half of the approval state machine, implemented on the model.
#[async_trait]
pub trait ApprovalWorkflow: Sized + Send + Sync {
    /// Entity type name used in audit rows and errors.
    const ENTITY_TYPE: &'static str;

    /// Primary key.
    fn id(&self) -> i64;

    /// Current approval status.
    fn status(&self) -> ApprovalStatus;

    /// User who submitted the item and is told about the decision.
    fn requester(&self) -> i64;

    /// Reads the row with an exclusive lock held until the transaction ends.
    async fn lock(txn: &DatabaseTransaction, id: i64) -> Result<Option<Self>>;

    /// Persists the new status, reviewer and notes.
    async fn write_decision(
        self,
        txn: &DatabaseTransaction,
        actor_id: i64,
        decision: &Decision,
    ) -> Result<Self>;

    /// Applies the aggregate effect of the decision inside the same transaction.
    async fn apply_effect(
        &self,
        _txn: &DatabaseTransaction,
        _actor_id: i64,
        _decision: &Decision,
    ) -> Result<()> {
        Ok(())
    }

    /// Notification sent to the requester once the decision is committed.
    fn notification(&self, decision: &Decision) -> NotificationDraft;

    /// Free-text audit details.
    fn audit_details(&self, decision: &Decision) -> String {
        match decision.notes() {
            Some(notes) if !notes.is_empty() => {
                format!("{} {}: {notes}", decision.verb(), Self::ENTITY_TYPE)
            }
            _ => format!("{} {}", decision.verb(), Self::ENTITY_TYPE),
        }
    }
}

/// `SELECT ... FOR UPDATE` by primary key.
///
/// The lock clause is not emitted for SQLite, whose single writer already
/// serialises concurrent transactions.
pub async fn lock_for_update<E>(txn: &DatabaseTransaction, id: i64) -> Result<Option<E::Model>>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i64>,
{
    Ok(E::find_by_id(id).lock_exclusive().one(txn).await?)
}

/// Moves a pending item to the decided status.
///
/// Lock, check, write and effect share one transaction; a second decision on
/// the same item fails with [`Error::InvalidStateTransition`] and changes
/// nothing. Audit and notification run after the commit and never fail the call.
#[instrument(skip(ctx, decision), fields(entity = W::ENTITY_TYPE, action = decision.verb()))]
pub async fn transition<W>(
    ctx: &LedgerContext,
    id: i64,
    actor_id: i64,
    decision: Decision,
) -> Result<W>
where
    W: ApprovalWorkflow,
{
    let txn = ctx.db.begin().await?;

    let Some(current) = W::lock(&txn, id).await? else {
        txn.rollback().await?;
        return Err(Error::NotFound {
            entity: W::ENTITY_TYPE,
            id,
        });
    };

    let status = current.status();
    if status != ApprovalStatus::Pending {
        txn.rollback().await?;
        return Err(Error::InvalidStateTransition {
            entity: W::ENTITY_TYPE,
            id,
            status: status.to_value(),
            action: decision.verb(),
        });
    }

    let updated = current.write_decision(&txn, actor_id, &decision).await?;
    updated.apply_effect(&txn, actor_id, &decision).await?;
    txn.commit().await?;

    info!(id = updated.id(), actor_id, status = ?updated.status(), "Decision committed");

    effects::record_audit(
        ctx,
        actor_id,
        decision.audit_action(),
        W::ENTITY_TYPE,
        id,
        updated.audit_details(&decision),
    )
    .await;
    effects::notify_user(ctx, updated.requester(), &updated.notification(&decision)).await;

    Ok(updated)
}
