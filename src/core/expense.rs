//! Expenses - money spent on a project, pending review.
//!
//! An expense only counts against the budget once approved: approval adds its
//! amount to `spent_amount` in the same transaction as the status change.
//! Every decision also leaves an `expense_approvals` row.

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
        ApprovalStatus, AuditAction, Expense, ExpenseApproval, NotificationType, UserRole,
        expense, expense_approval,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveEnum, DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*,
};
use tracing::{info, instrument};

/// Input for [`create_expense`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// Project the money was spent on
    pub project_id: i64,
    /// What was bought
    pub description: String,
    /// Amount spent, must be positive
    pub amount: f64,
    /// Free-form category
    pub category: String,
    /// Link to the uploaded receipt
    pub receipt_url: Option<String>,
}

/// Partial update for [`update_expense`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseChanges {
    /// New description
    pub description: Option<String>,
    /// New amount, must be positive
    pub amount: Option<f64>,
    /// New category
    pub category: Option<String>,
    /// New receipt link
    pub receipt_url: Option<String>,
}

#[async_trait]
impl ApprovalWorkflow for expense::Model {
    const ENTITY_TYPE: &'static str = entity_types::EXPENSE;

    fn id(&self) -> i64 {
        self.id
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn requester(&self) -> i64 {
        self.created_by
    }

    async fn lock(txn: &DatabaseTransaction, id: i64) -> Result<Option<Self>> {
        approval::lock_for_update::<Expense>(txn, id).await
    }

    async fn write_decision(
        self,
        txn: &DatabaseTransaction,
        _actor_id: i64,
        decision: &Decision,
    ) -> Result<Self> {
        let mut expense: expense::ActiveModel = self.into();
        expense.status = Set(decision.status());
        expense.updated_at = Set(Utc::now());
        Ok(expense.update(txn).await?)
    }

    async fn apply_effect(
        &self,
        txn: &DatabaseTransaction,
        actor_id: i64,
        decision: &Decision,
    ) -> Result<()> {
        if decision.is_approval() {
            budget::adjust_spent_amount(txn, self.project_id, self.amount).await?;
        }

        expense_approval::ActiveModel {
            expense_id: Set(self.id),
            approved_by: Set(actor_id),
            status: Set(decision.status()),
            notes: Set(decision.notes().map(str::to_string)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(())
    }

    fn notification(&self, decision: &Decision) -> NotificationDraft {
        if decision.is_approval() {
            NotificationDraft::new(
                NotificationType::ExpenseApproved,
                "Expense Approved",
                format!("Your expense '{}' has been approved", self.description),
                self.id,
            )
        } else {
            NotificationDraft::new(
                NotificationType::ExpenseRejected,
                "Expense Rejected",
                format!(
                    "Your expense '{}' has been rejected: {}",
                    self.description,
                    decision.notes().unwrap_or_default()
                ),
                self.id,
            )
        }
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Submits an expense for review.
///
/// The project budget is untouched until the expense is approved.
#[instrument(skip(ctx, input), fields(project_id = input.project_id, amount = input.amount))]
pub async fn create_expense(
    ctx: &LedgerContext,
    actor: &Actor,
    input: NewExpense,
) -> Result<expense::Model> {
    validate_amount(input.amount)?;
    let description = input.description.trim().to_string();
    if description.is_empty() {
        return Err(Error::validation("Expense description cannot be empty"));
    }
    project::ensure_project_access(&ctx.db, actor, input.project_id, "create expense").await?;

    let now = Utc::now();
    let expense = expense::ActiveModel {
        project_id: Set(input.project_id),
        description: Set(description),
        amount: Set(input.amount),
        category: Set(input.category.trim().to_string()),
        receipt_url: Set(input.receipt_url),
        status: Set(ApprovalStatus::Pending),
        created_by: Set(actor.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;
    info!(expense_id = expense.id, "Expense submitted");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Create,
        entity_types::EXPENSE,
        expense.id,
        format!("Created expense '{}' of {:.2}", expense.description, expense.amount),
    )
    .await;
    effects::notify_roles(
        ctx,
        &UserRole::REVIEWERS,
        &NotificationDraft::new(
            NotificationType::ExpenseCreated,
            "New Expense Submitted",
            format!(
                "Expense '{}' of {:.2} needs your review",
                expense.description, expense.amount
            ),
            expense.id,
        ),
    )
    .await;

    Ok(expense)
}

/// Fetches an expense by id.
pub async fn get_expense(db: &DatabaseConnection, expense_id: i64) -> Result<expense::Model> {
    Expense::find_by_id(expense_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::EXPENSE,
            id: expense_id,
        })
}

/// Expenses of a project, newest first.
pub async fn list_expenses(
    db: &DatabaseConnection,
    project_id: i64,
) -> Result<Vec<expense::Model>> {
    Expense::find()
        .filter(expense::Column::ProjectId.eq(project_id))
        .order_by_desc(expense::Column::CreatedAt)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Review history of an expense, oldest first.
pub async fn list_expense_approvals(
    db: &DatabaseConnection,
    expense_id: i64,
) -> Result<Vec<expense_approval::Model>> {
    ExpenseApproval::find()
        .filter(expense_approval::Column::ExpenseId.eq(expense_id))
        .order_by_asc(expense_approval::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Locks an expense for editing and checks it is still pending and owned by
/// `actor` when the actor is a supervisor.
async fn lock_editable(
    txn: &DatabaseTransaction,
    actor: &Actor,
    expense_id: i64,
    action: &'static str,
) -> Result<expense::Model> {
    let expense = approval::lock_for_update::<Expense>(txn, expense_id)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::EXPENSE,
            id: expense_id,
        })?;

    if actor.role == UserRole::Spv && expense.created_by != actor.user_id {
        return Err(Error::Forbidden {
            user_id: actor.user_id,
            action: format!("{action} expense {expense_id}"),
        });
    }
    if expense.status != ApprovalStatus::Pending {
        return Err(Error::InvalidStateTransition {
            entity: entity_types::EXPENSE,
            id: expense_id,
            status: expense.status.to_value(),
            action,
        });
    }
    Ok(expense)
}

/// Edits a pending expense.
#[instrument(skip(ctx, changes))]
pub async fn update_expense(
    ctx: &LedgerContext,
    actor: &Actor,
    expense_id: i64,
    changes: ExpenseChanges,
) -> Result<expense::Model> {
    if let Some(amount) = changes.amount {
        validate_amount(amount)?;
    }

    let txn = ctx.db.begin().await?;
    let current = lock_editable(&txn, actor, expense_id, "update").await?;

    let mut expense: expense::ActiveModel = current.into();
    if let Some(description) = changes.description {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(Error::validation("Expense description cannot be empty"));
        }
        expense.description = Set(description);
    }
    if let Some(amount) = changes.amount {
        expense.amount = Set(amount);
    }
    if let Some(category) = changes.category {
        expense.category = Set(category.trim().to_string());
    }
    if let Some(receipt_url) = changes.receipt_url {
        expense.receipt_url = Set(Some(receipt_url));
    }
    expense.updated_at = Set(Utc::now());
    let updated = expense.update(&txn).await?;
    txn.commit().await?;
    info!(expense_id, "Expense updated");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Update,
        entity_types::EXPENSE,
        expense_id,
        format!("Updated expense '{}' to {:.2}", updated.description, updated.amount),
    )
    .await;

    Ok(updated)
}

/// Deletes a pending expense.
#[instrument(skip(ctx))]
pub async fn delete_expense(ctx: &LedgerContext, actor: &Actor, expense_id: i64) -> Result<()> {
    let txn = ctx.db.begin().await?;
    let expense = lock_editable(&txn, actor, expense_id, "delete").await?;
    Expense::delete_by_id(expense.id).exec(&txn).await?;
    txn.commit().await?;
    info!(expense_id, "Expense deleted");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Delete,
        entity_types::EXPENSE,
        expense_id,
        format!("Deleted expense '{}'", expense.description),
    )
    .await;
    Ok(())
}

/// Approves a pending expense and adds its amount to the project's spending.
pub async fn approve_expense(
    ctx: &LedgerContext,
    expense_id: i64,
    actor_id: i64,
    notes: Option<String>,
) -> Result<expense::Model> {
    approval::transition(ctx, expense_id, actor_id, Decision::Approve { notes }).await
}

/// Rejects a pending expense.
pub async fn reject_expense(
    ctx: &LedgerContext,
    expense_id: i64,
    actor_id: i64,
    notes: String,
) -> Result<expense::Model> {
    approval::transition(ctx, expense_id, actor_id, Decision::Reject { notes }).await
}
