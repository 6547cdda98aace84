//! Invoices - bills issued for a project.
//!
//! Totals are always derived from the item tree and the tax percentage. An
//! invoice can be edited or deleted by its creator while pending; once
//! approved it accepts payments (see [`crate::core::payment`]).

use crate::{
    core::{
        approval::{self, ApprovalWorkflow, Decision},
        audit::entity_types,
        context::{Actor, LedgerContext},
        effects,
        invoice_items::{self, InvoiceLine},
        notification::NotificationDraft,
        numbering, payment, project,
    },
    entities::{
        ApprovalStatus, AuditAction, Invoice, InvoiceType, NotificationType, PaymentStatus,
        UserRole, invoice, invoice_payment,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveEnum, DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Input for [`create_invoice`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    /// Billing stage of the invoice
    pub invoice_type: InvoiceType,
    /// Project being billed
    pub project_id: i64,
    /// Billed party
    pub recipient_name: String,
    /// Postal address of the billed party
    pub recipient_address: String,
    /// Contact person at the billed party
    pub attention: String,
    /// Customer purchase order reference
    pub po_number: String,
    /// Issue date, also used in the invoice number
    pub invoice_date: NaiveDate,
    /// Payment deadline, not before `invoice_date`
    pub due_date: Option<NaiveDate>,
    /// Share of the contract billed by a down-payment invoice
    pub dp_percentage: Option<f64>,
    /// Tax rate applied to the subtotal, 0 to 100
    pub tax_percentage: f64,
    /// Free text printed on the invoice
    pub notes: String,
    /// Language the document is rendered in, e.g. `"id"` or `"en"`
    pub language: String,
    /// Item tree; at least one line is required
    pub lines: Vec<InvoiceLine>,
}

/// Partial update for [`update_invoice`]; `None` leaves a field unchanged.
///
/// Supplying `lines` replaces the whole item tree. Totals are recomputed
/// whenever the lines or the tax percentage change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceChanges {
    /// New billing stage
    pub invoice_type: Option<InvoiceType>,
    /// New billed party
    pub recipient_name: Option<String>,
    /// New recipient address
    pub recipient_address: Option<String>,
    /// New contact person
    pub attention: Option<String>,
    /// New purchase order reference
    pub po_number: Option<String>,
    /// New issue date
    pub invoice_date: Option<NaiveDate>,
    /// New payment deadline
    pub due_date: Option<NaiveDate>,
    /// New down-payment share
    pub dp_percentage: Option<f64>,
    /// New tax rate
    pub tax_percentage: Option<f64>,
    /// New notes
    pub notes: Option<String>,
    /// New document language
    pub language: Option<String>,
    /// Replacement item tree
    pub lines: Option<Vec<InvoiceLine>>,
}

/// An invoice with its item tree and payments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDetail {
    /// The invoice row
    pub invoice: invoice::Model,
    /// Item tree in display order
    pub lines: Vec<InvoiceLine>,
    /// Payments by payment date
    pub payments: Vec<invoice_payment::Model>,
}

#[async_trait]
impl ApprovalWorkflow for invoice::Model {
    const ENTITY_TYPE: &'static str = entity_types::INVOICE;

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
        approval::lock_for_update::<Invoice>(txn, id).await
    }

    async fn write_decision(
        self,
        txn: &DatabaseTransaction,
        actor_id: i64,
        decision: &Decision,
    ) -> Result<Self> {
        let mut invoice: invoice::ActiveModel = self.into();
        invoice.status = Set(decision.status());
        invoice.approved_by = Set(Some(actor_id));
        if let Decision::Reject { notes } = decision {
            invoice.reject_notes = Set(Some(notes.clone()));
        }
        invoice.updated_at = Set(Utc::now());
        Ok(invoice.update(txn).await?)
    }

    fn notification(&self, decision: &Decision) -> NotificationDraft {
        if decision.is_approval() {
            NotificationDraft::new(
                NotificationType::InvoiceApproved,
                "Invoice Approved",
                format!("Invoice {} has been approved", self.invoice_number),
                self.id,
            )
        } else {
            NotificationDraft::new(
                NotificationType::InvoiceRejected,
                "Invoice Rejected",
                format!(
                    "Invoice {} has been rejected: {}",
                    self.invoice_number,
                    decision.notes().unwrap_or_default()
                ),
                self.id,
            )
        }
    }
}

fn validate_dp_percentage(dp_percentage: Option<f64>) -> Result<()> {
    match dp_percentage {
        Some(pct) if !pct.is_finite() || !(0.0..=100.0).contains(&pct) => Err(Error::validation(
            format!("Down payment percentage must be between 0 and 100, got {pct}"),
        )),
        _ => Ok(()),
    }
}

fn validate_due_date(invoice_date: NaiveDate, due_date: Option<NaiveDate>) -> Result<()> {
    match due_date {
        Some(due) if due < invoice_date => Err(Error::validation(format!(
            "Due date {due} is before invoice date {invoice_date}"
        ))),
        _ => Ok(()),
    }
}

/// Creates a pending invoice and assigns its number.
///
/// Reviewers may invoice any project; other roles only projects they belong to.
#[instrument(skip(ctx, input), fields(project_id = input.project_id))]
pub async fn create_invoice(
    ctx: &LedgerContext,
    actor: &Actor,
    input: NewInvoice,
) -> Result<invoice::Model> {
    if input.recipient_name.trim().is_empty() {
        return Err(Error::validation("Recipient name cannot be empty"));
    }
    validate_dp_percentage(input.dp_percentage)?;
    validate_due_date(input.invoice_date, input.due_date)?;
    let totals = invoice_items::compute_totals(&input.lines, input.tax_percentage)?;
    if totals.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: totals.amount,
        });
    }
    project::ensure_project_access(&ctx.db, actor, input.project_id, "create invoice").await?;

    let now = Utc::now();
    let txn = ctx.db.begin().await?;

    let inserted = invoice::ActiveModel {
        invoice_number: Set(numbering::placeholder_number()),
        invoice_type: Set(input.invoice_type),
        project_id: Set(input.project_id),
        recipient_name: Set(input.recipient_name.trim().to_string()),
        recipient_address: Set(input.recipient_address),
        attention: Set(input.attention),
        po_number: Set(input.po_number),
        invoice_date: Set(input.invoice_date),
        due_date: Set(input.due_date),
        dp_percentage: Set(input.dp_percentage),
        subtotal: Set(totals.subtotal),
        tax_percentage: Set(input.tax_percentage),
        tax_amount: Set(totals.tax_amount),
        amount: Set(totals.amount),
        notes: Set(input.notes),
        language: Set(input.language),
        status: Set(ApprovalStatus::Pending),
        paid_amount: Set(0.0),
        payment_status: Set(PaymentStatus::Unpaid),
        created_by: Set(actor.user_id),
        approved_by: Set(None),
        reject_notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    invoice_items::replace_item_tree(&txn, inserted.id, &input.lines).await?;
    let invoice = numbering::stamp_invoice_number(&txn, inserted, &ctx.company_code).await?;
    txn.commit().await?;
    info!(
        invoice_id = invoice.id,
        invoice_number = %invoice.invoice_number,
        amount = invoice.amount,
        "Invoice created"
    );

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Create,
        entity_types::INVOICE,
        invoice.id,
        format!("Created invoice {} for {:.2}", invoice.invoice_number, invoice.amount),
    )
    .await;
    effects::notify_roles(
        ctx,
        &UserRole::REVIEWERS,
        &NotificationDraft::new(
            NotificationType::InvoiceCreated,
            "New Invoice Created",
            format!(
                "Invoice {} for {} ({:.2}) needs your review",
                invoice.invoice_number, invoice.recipient_name, invoice.amount
            ),
            invoice.id,
        ),
    )
    .await;

    Ok(invoice)
}

/// Fetches an invoice by id.
pub async fn get_invoice<C>(db: &C, invoice_id: i64) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    Invoice::find_by_id(invoice_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::INVOICE,
            id: invoice_id,
        })
}

/// Fetches an invoice with its items and payments.
pub async fn get_invoice_detail(db: &DatabaseConnection, invoice_id: i64) -> Result<InvoiceDetail> {
    let invoice = get_invoice(db, invoice_id).await?;
    let lines = invoice_items::load_item_tree(db, invoice_id).await?;
    let payments = payment::list_payments(db, invoice_id).await?;
    Ok(InvoiceDetail {
        invoice,
        lines,
        payments,
    })
}

/// Invoices of a project, newest first.
pub async fn list_invoices(
    db: &DatabaseConnection,
    project_id: i64,
) -> Result<Vec<invoice::Model>> {
    Invoice::find()
        .filter(invoice::Column::ProjectId.eq(project_id))
        .order_by_desc(invoice::Column::CreatedAt)
        .order_by_desc(invoice::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Locks an invoice and checks that `actor` created it and that it is pending.
async fn lock_editable(
    txn: &DatabaseTransaction,
    actor: &Actor,
    invoice_id: i64,
    action: &'static str,
) -> Result<invoice::Model> {
    let invoice = approval::lock_for_update::<Invoice>(txn, invoice_id)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::INVOICE,
            id: invoice_id,
        })?;

    if invoice.created_by != actor.user_id {
        return Err(Error::Forbidden {
            user_id: actor.user_id,
            action: format!("{action} invoice {invoice_id}"),
        });
    }
    if invoice.status != ApprovalStatus::Pending {
        return Err(Error::InvalidStateTransition {
            entity: entity_types::INVOICE,
            id: invoice_id,
            status: invoice.status.to_value(),
            action,
        });
    }
    Ok(invoice)
}

/// Edits a pending invoice.
#[instrument(skip(ctx, changes))]
pub async fn update_invoice(
    ctx: &LedgerContext,
    actor: &Actor,
    invoice_id: i64,
    changes: InvoiceChanges,
) -> Result<invoice::Model> {
    validate_dp_percentage(changes.dp_percentage)?;

    let txn = ctx.db.begin().await?;
    let current = lock_editable(&txn, actor, invoice_id, "update").await?;

    let invoice_date = changes.invoice_date.unwrap_or(current.invoice_date);
    validate_due_date(invoice_date, changes.due_date.or(current.due_date))?;

    let tax_percentage = changes.tax_percentage.unwrap_or(current.tax_percentage);
    let totals = match &changes.lines {
        Some(lines) => Some(invoice_items::compute_totals(lines, tax_percentage)?),
        None if changes.tax_percentage.is_some() => {
            let lines = invoice_items::load_item_tree(&txn, invoice_id).await?;
            Some(invoice_items::compute_totals(&lines, tax_percentage)?)
        }
        None => None,
    };
    if let Some(amount) = totals.map(|t| t.amount).filter(|amount| *amount <= 0.0) {
        return Err(Error::InvalidAmount { amount });
    }

    let mut invoice: invoice::ActiveModel = current.into();
    if let Some(invoice_type) = changes.invoice_type {
        invoice.invoice_type = Set(invoice_type);
    }
    if let Some(recipient_name) = changes.recipient_name {
        if recipient_name.trim().is_empty() {
            return Err(Error::validation("Recipient name cannot be empty"));
        }
        invoice.recipient_name = Set(recipient_name.trim().to_string());
    }
    if let Some(recipient_address) = changes.recipient_address {
        invoice.recipient_address = Set(recipient_address);
    }
    if let Some(attention) = changes.attention {
        invoice.attention = Set(attention);
    }
    if let Some(po_number) = changes.po_number {
        invoice.po_number = Set(po_number);
    }
    if let Some(invoice_date) = changes.invoice_date {
        invoice.invoice_date = Set(invoice_date);
    }
    if let Some(due_date) = changes.due_date {
        invoice.due_date = Set(Some(due_date));
    }
    if let Some(dp_percentage) = changes.dp_percentage {
        invoice.dp_percentage = Set(Some(dp_percentage));
    }
    if let Some(notes) = changes.notes {
        invoice.notes = Set(notes);
    }
    if let Some(language) = changes.language {
        invoice.language = Set(language);
    }
    if let Some(totals) = totals {
        invoice.tax_percentage = Set(tax_percentage);
        invoice.subtotal = Set(totals.subtotal);
        invoice.tax_amount = Set(totals.tax_amount);
        invoice.amount = Set(totals.amount);
    }
    if let Some(lines) = &changes.lines {
        invoice_items::replace_item_tree(&txn, invoice_id, lines).await?;
    }
    invoice.updated_at = Set(Utc::now());

    let updated = invoice.update(&txn).await?;
    txn.commit().await?;
    info!(invoice_id, amount = updated.amount, "Invoice updated");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Update,
        entity_types::INVOICE,
        invoice_id,
        format!("Updated invoice {}", updated.invoice_number),
    )
    .await;

    Ok(updated)
}

/// Deletes a pending invoice and its items.
#[instrument(skip(ctx))]
pub async fn delete_invoice(ctx: &LedgerContext, actor: &Actor, invoice_id: i64) -> Result<()> {
    let txn = ctx.db.begin().await?;
    let invoice = lock_editable(&txn, actor, invoice_id, "delete").await?;
    invoice_items::delete_item_tree(&txn, invoice_id).await?;
    Invoice::delete_by_id(invoice_id).exec(&txn).await?;
    txn.commit().await?;
    info!(invoice_id, "Invoice deleted");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Delete,
        entity_types::INVOICE,
        invoice_id,
        format!("Deleted invoice {}", invoice.invoice_number),
    )
    .await;
    Ok(())
}

/// Approves a pending invoice so it can receive payments.
pub async fn approve_invoice(
    ctx: &LedgerContext,
    invoice_id: i64,
    actor_id: i64,
) -> Result<invoice::Model> {
    approval::transition(ctx, invoice_id, actor_id, Decision::Approve { notes: None }).await
}

/// Rejects a pending invoice, keeping `notes` as the reason.
pub async fn reject_invoice(
    ctx: &LedgerContext,
    invoice_id: i64,
    actor_id: i64,
    notes: String,
) -> Result<invoice::Model> {
    approval::transition(ctx, invoice_id, actor_id, Decision::Reject { notes }).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::invoice_items::LineItem;
    use crate::core::notification::list_notifications;
    use crate::test_utils::{
        create_test_project, create_test_user, new_test_invoice, setup_context,
    };
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_create_assigns_number_and_totals() {
        let (ctx, sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let owner = create_test_user(&ctx, UserRole::Owner).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let actor = Actor::new(finance.id, finance.role);

        let invoice = create_invoice(&ctx, &actor, new_test_invoice(project.id, 1000.0))
            .await
            .unwrap();

        assert_eq!(
            invoice.invoice_number,
            format!("INV/CMP/2024/05/{:05}", invoice.id)
        );
        assert_eq!(invoice.status, ApprovalStatus::Pending);
        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
        assert_eq!(invoice.subtotal, 1000.0);
        assert_eq!(invoice.tax_amount, 0.0);
        assert_eq!(invoice.amount, 1000.0);

        let notes = list_notifications(&ctx.db, owner.id).await.unwrap();
        assert_eq!(notes[0].notification_type, NotificationType::InvoiceCreated);
        assert_eq!(sink.events_for(owner.id).len(), 1);
    }

    #[tokio::test]
    async fn test_item_tree_round_trip_through_store() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let actor = Actor::new(finance.id, finance.role);

        let mut input = new_test_invoice(project.id, 100.0);
        input.tax_percentage = 10.0;
        input.lines.push(InvoiceLine::Label {
            description: "Structure".to_string(),
            items: vec![
                LineItem {
                    description: "Columns".to_string(),
                    quantity: 4.0,
                    unit: "pcs".to_string(),
                    unit_price: 50.0,
                },
                LineItem {
                    description: "Beams".to_string(),
                    quantity: 2.0,
                    unit: "pcs".to_string(),
                    unit_price: 25.0,
                },
            ],
        });
        let lines = input.lines.clone();

        let invoice = create_invoice(&ctx, &actor, input).await.unwrap();
        assert_eq!(invoice.subtotal, 350.0);
        assert_eq!(invoice.tax_amount, 35.0);
        assert_eq!(invoice.amount, 385.0);

        let detail = get_invoice_detail(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(detail.lines, lines);
        assert!(detail.payments.is_empty());

        let rows = invoice_items::list_item_rows(&ctx.db, invoice.id).await.unwrap();
        let label = rows.iter().find(|r| r.is_label).unwrap();
        assert_eq!(label.subtotal, 0.0);
        assert_eq!(
            rows.iter().filter(|r| r.parent_id == Some(label.id)).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_unique_numbers() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let actor = Actor::new(finance.id, finance.role);

        let mut handles = Vec::new();
        for n in 0..8 {
            let ctx = ctx.clone();
            let input = new_test_invoice(project.id, 100.0 + f64::from(n));
            handles.push(tokio::spawn(async move {
                create_invoice(&ctx, &actor, input).await
            }));
        }

        let mut numbers = HashSet::new();
        for handle in handles {
            let invoice = handle.await.unwrap().unwrap();
            assert!(!invoice.invoice_number.starts_with("TEMP-"));
            numbers.insert(invoice.invoice_number);
        }
        assert_eq!(numbers.len(), 8);
        assert_eq!(list_invoices(&ctx.db, project.id).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_create_access_and_validation() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let outsider = create_test_user(&ctx, UserRole::Spv).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();

        let outsider = Actor::new(outsider.id, outsider.role);
        assert!(matches!(
            create_invoice(&ctx, &outsider, new_test_invoice(project.id, 10.0)).await,
            Err(Error::Forbidden { .. })
        ));

        let actor = Actor::new(finance.id, finance.role);
        let mut empty = new_test_invoice(project.id, 10.0);
        empty.lines.clear();
        assert!(matches!(
            create_invoice(&ctx, &actor, empty).await,
            Err(Error::Validation { .. })
        ));

        assert!(matches!(
            create_invoice(&ctx, &actor, new_test_invoice(project.id, 0.0)).await,
            Err(Error::InvalidAmount { .. })
        ));

        let mut late = new_test_invoice(project.id, 10.0);
        late.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(
            create_invoice(&ctx, &actor, late).await,
            Err(Error::Validation { .. })
        ));

        assert!(matches!(
            create_invoice(&ctx, &actor, new_test_invoice(999, 10.0)).await,
            Err(Error::NotFound { entity: "project", .. })
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_items_and_recomputes() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let actor = Actor::new(finance.id, finance.role);
        let invoice = create_invoice(&ctx, &actor, new_test_invoice(project.id, 400.0))
            .await
            .unwrap();

        let updated = update_invoice(
            &ctx,
            &actor,
            invoice.id,
            InvoiceChanges {
                tax_percentage: Some(10.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.subtotal, 400.0);
        assert_eq!(updated.amount, 440.0);

        let new_lines = vec![InvoiceLine::Item(LineItem {
            description: "Revised".to_string(),
            quantity: 3.0,
            unit: "ls".to_string(),
            unit_price: 100.0,
        })];
        let updated = update_invoice(
            &ctx,
            &actor,
            invoice.id,
            InvoiceChanges {
                lines: Some(new_lines.clone()),
                recipient_name: Some("PT Baru".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.amount, 330.0);
        assert_eq!(updated.recipient_name, "PT Baru");
        assert_eq!(updated.invoice_number, invoice.invoice_number);

        let detail = get_invoice_detail(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(detail.lines, new_lines);
    }

    #[tokio::test]
    async fn test_only_creator_edits_pending_invoice() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let owner = create_test_user(&ctx, UserRole::Owner).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let creator = Actor::new(finance.id, finance.role);
        let other = Actor::new(owner.id, owner.role);

        let invoice = create_invoice(&ctx, &creator, new_test_invoice(project.id, 50.0))
            .await
            .unwrap();
        assert!(matches!(
            update_invoice(&ctx, &other, invoice.id, InvoiceChanges::default()).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            delete_invoice(&ctx, &other, invoice.id).await,
            Err(Error::Forbidden { .. })
        ));

        let rejected = reject_invoice(&ctx, invoice.id, owner.id, "wrong PO".to_string())
            .await
            .unwrap();
        assert_eq!(rejected.reject_notes.as_deref(), Some("wrong PO"));
        assert_eq!(rejected.approved_by, Some(owner.id));
        assert!(matches!(
            delete_invoice(&ctx, &creator, invoice.id).await,
            Err(Error::InvalidStateTransition { action: "delete", .. })
        ));

        let pending = create_invoice(&ctx, &creator, new_test_invoice(project.id, 60.0))
            .await
            .unwrap();
        delete_invoice(&ctx, &creator, pending.id).await.unwrap();
        assert!(matches!(
            get_invoice(&ctx.db, pending.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(invoice_items::list_item_rows(&ctx.db, pending.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_approve_twice() {
        let (ctx, sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let actor = Actor::new(finance.id, finance.role);
        let invoice = create_invoice(&ctx, &actor, new_test_invoice(project.id, 50.0))
            .await
            .unwrap();

        let approved = approve_invoice(&ctx, invoice.id, 77).await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert!(sink
            .events_for(finance.id)
            .iter()
            .any(|e| e.event_type == NotificationType::InvoiceApproved));

        assert!(matches!(
            approve_invoice(&ctx, invoice.id, 77).await,
            Err(Error::InvalidStateTransition { .. })
        ));
    }
}
