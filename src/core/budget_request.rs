//! Budget requests - asking reviewers to raise a project's total budget.

use crate::{
    core::{
        approval::{self, ApprovalWorkflow, Decision},
        audit::entity_types,
        budget,
        context::{Actor, LedgerContext},
        effects,
        notification::NotificationDraft,
        project,
    },
    entities::{
        ApprovalStatus, AuditAction, BudgetRequest, NotificationType, UserRole, budget_request,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

#[async_trait]
impl ApprovalWorkflow for budget_request::Model {
    const ENTITY_TYPE: &'static str = entity_types::BUDGET_REQUEST;

    fn id(&self) -> i64 {
        self.id
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn requester(&self) -> i64 {
        self.requested_by
    }

    async fn lock(txn: &DatabaseTransaction, id: i64) -> Result<Option<Self>> {
        approval::lock_for_update::<BudgetRequest>(txn, id).await
    }

    async fn write_decision(
        self,
        txn: &DatabaseTransaction,
        actor_id: i64,
        decision: &Decision,
    ) -> Result<Self> {
        let mut request: budget_request::ActiveModel = self.into();
        request.status = Set(decision.status());
        request.approved_by = Set(Some(actor_id));
        request.approval_notes = Set(decision.notes().map(str::to_string));
        request.updated_at = Set(Utc::now());
        Ok(request.update(txn).await?)
    }

    async fn apply_effect(
        &self,
        txn: &DatabaseTransaction,
        _actor_id: i64,
        decision: &Decision,
    ) -> Result<()> {
        if decision.is_approval() {
            budget::increase_total_budget(txn, self.project_id, self.amount).await?;
        }
        Ok(())
    }

    fn notification(&self, decision: &Decision) -> NotificationDraft {
        if decision.is_approval() {
            NotificationDraft::new(
                NotificationType::BudgetApproved,
                "Budget Request Approved",
                format!("Your budget request of {:.2} has been approved", self.amount),
                self.id,
            )
        } else {
            NotificationDraft::new(
                NotificationType::BudgetRejected,
                "Budget Request Rejected",
                format!(
                    "Your budget request of {:.2} has been rejected: {}",
                    self.amount,
                    decision.notes().unwrap_or_default()
                ),
                self.id,
            )
        }
    }
}

/// Submits a request to raise the project's total budget by `amount`.
#[instrument(skip(ctx, reason))]
pub async fn create_budget_request(
    ctx: &LedgerContext,
    actor: &Actor,
    project_id: i64,
    amount: f64,
    reason: &str,
) -> Result<budget_request::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    project::ensure_project_access(&ctx.db, actor, project_id, "request budget").await?;

    let now = Utc::now();
    let request = budget_request::ActiveModel {
        project_id: Set(project_id),
        requested_by: Set(actor.user_id),
        amount: Set(amount),
        reason: Set(reason.trim().to_string()),
        status: Set(ApprovalStatus::Pending),
        approved_by: Set(None),
        approval_notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;
    info!(request_id = request.id, project_id, amount, "Budget request submitted");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Create,
        entity_types::BUDGET_REQUEST,
        request.id,
        format!("Requested {amount:.2} for project {project_id}"),
    )
    .await;
    effects::notify_roles(
        ctx,
        &UserRole::REVIEWERS,
        &NotificationDraft::new(
            NotificationType::BudgetRequest,
            "New Budget Request",
            format!("A budget request of {amount:.2} needs your review"),
            request.id,
        ),
    )
    .await;

    Ok(request)
}

/// Fetches a budget request by id.
pub async fn get_budget_request(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<budget_request::Model> {
    BudgetRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::BUDGET_REQUEST,
            id: request_id,
        })
}

/// Budget requests of a project, newest first.
pub async fn list_budget_requests(
    db: &DatabaseConnection,
    project_id: i64,
) -> Result<Vec<budget_request::Model>> {
    BudgetRequest::find()
        .filter(budget_request::Column::ProjectId.eq(project_id))
        .order_by_desc(budget_request::Column::CreatedAt)
        .order_by_desc(budget_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Approves a pending request and raises the project's total budget.
pub async fn approve_budget_request(
    ctx: &LedgerContext,
    request_id: i64,
    actor_id: i64,
    notes: Option<String>,
) -> Result<budget_request::Model> {
    approval::transition(ctx, request_id, actor_id, Decision::Approve { notes }).await
}

/// Rejects a pending request. The budget is left unchanged.
pub async fn reject_budget_request(
    ctx: &LedgerContext,
    request_id: i64,
    actor_id: i64,
    notes: String,
) -> Result<budget_request::Model> {
    approval::transition(ctx, request_id, actor_id, Decision::Reject { notes }).await
}
