//! Invoice payment ledger.
//!
//! Payments are append-only rows under an approved invoice. The invoice's
//! `paid_amount` is never adjusted incrementally: after every insert or delete
//! it is recomputed as the sum of the remaining rows, under the invoice row
//! lock, in the same transaction.

use crate::{
    core::{
        approval,
        audit::entity_types,
        context::LedgerContext,
        effects,
        notification::NotificationDraft,
        round_cents,
    },
    entities::{
        ApprovalStatus, AuditAction, Invoice, InvoicePayment, NotificationType, PaymentMethod,
        PaymentStatus, invoice, invoice_payment,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveEnum, DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
};
use tracing::{info, instrument};

/// Input for [`record_payment`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    /// Invoice being paid
    pub invoice_id: i64,
    /// Amount received, at most the remaining balance
    pub amount: f64,
    /// Date the money arrived
    pub payment_date: NaiveDate,
    /// How the money was paid
    pub payment_method: PaymentMethod,
    /// Link to the uploaded transfer slip
    pub proof_url: Option<String>,
    /// Free-form remarks
    pub notes: Option<String>,
}

/// Payments of an invoice, by payment date then entry order.
pub async fn list_payments<C>(db: &C, invoice_id: i64) -> Result<Vec<invoice_payment::Model>>
where
    C: ConnectionTrait,
{
    InvoicePayment::find()
        .filter(invoice_payment::Column::InvoiceId.eq(invoice_id))
        .order_by_asc(invoice_payment::Column::PaymentDate)
        .order_by_asc(invoice_payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of the payments recorded against an invoice.
pub async fn total_paid<C>(db: &C, invoice_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = InvoicePayment::find()
        .select_only()
        .column_as(invoice_payment::Column::Amount.sum(), "total")
        .filter(invoice_payment::Column::InvoiceId.eq(invoice_id))
        .into_tuple()
        .one(db)
        .await?;
    Ok(round_cents(total.flatten().unwrap_or(0.0)))
}

/// Rewrites `paid_amount` and `payment_status` from the payment rows.
///
/// Call with the invoice row already locked by the surrounding transaction.
pub async fn recompute_invoice_payments<C>(
    db: &C,
    invoice: invoice::Model,
) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    let paid_amount = total_paid(db, invoice.id).await?;
    let payment_status = PaymentStatus::from_totals(paid_amount, invoice.amount);

    let mut active: invoice::ActiveModel = invoice.into();
    active.paid_amount = Set(paid_amount);
    active.payment_status = Set(payment_status);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

async fn lock_invoice(txn: &DatabaseTransaction, invoice_id: i64) -> Result<invoice::Model> {
    approval::lock_for_update::<Invoice>(txn, invoice_id)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::INVOICE,
            id: invoice_id,
        })
}

/// Records a payment against an approved invoice.
///
/// Fails without writing anything if the invoice is not approved, already
/// paid, or if `amount` exceeds what is still owed.
#[instrument(skip(ctx, input), fields(invoice_id = input.invoice_id, amount = input.amount))]
pub async fn record_payment(
    ctx: &LedgerContext,
    actor_id: i64,
    input: NewPayment,
) -> Result<invoice_payment::Model> {
    if !input.amount.is_finite() || input.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: input.amount,
        });
    }

    let txn = ctx.db.begin().await?;
    let invoice = lock_invoice(&txn, input.invoice_id).await?;

    if invoice.status != ApprovalStatus::Approved {
        return Err(Error::InvalidStateTransition {
            entity: entity_types::INVOICE,
            id: invoice.id,
            status: invoice.status.to_value(),
            action: "record payment for",
        });
    }
    if invoice.payment_status == PaymentStatus::Paid {
        return Err(Error::InvalidStateTransition {
            entity: entity_types::INVOICE,
            id: invoice.id,
            status: invoice.payment_status.to_value(),
            action: "record payment for",
        });
    }

    let remaining = round_cents(invoice.remaining());
    if round_cents(input.amount) > remaining {
        return Err(Error::AmountExceedsRemaining {
            amount: input.amount,
            remaining,
        });
    }

    let payment = invoice_payment::ActiveModel {
        invoice_id: Set(invoice.id),
        amount: Set(input.amount),
        payment_date: Set(input.payment_date),
        payment_method: Set(input.payment_method),
        proof_url: Set(input.proof_url),
        notes: Set(input.notes),
        created_by: Set(actor_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let invoice = recompute_invoice_payments(&txn, invoice).await?;
    txn.commit().await?;
    info!(
        payment_id = payment.id,
        paid_amount = invoice.paid_amount,
        payment_status = ?invoice.payment_status,
        "Payment recorded"
    );

    effects::record_audit(
        ctx,
        actor_id,
        AuditAction::Create,
        entity_types::INVOICE_PAYMENT,
        payment.id,
        format!(
            "Recorded {:.2} ({:?}) on invoice {}",
            payment.amount, payment.payment_method, invoice.invoice_number
        ),
    )
    .await;

    let progress = if invoice.payment_status == PaymentStatus::Paid {
        "Fully Paid"
    } else {
        "Partial Payment"
    };
    effects::notify_user(
        ctx,
        invoice.created_by,
        &NotificationDraft::new(
            NotificationType::PaymentRecorded,
            format!("Payment Recorded - {progress}"),
            format!(
                "A payment of {:.2} was recorded on invoice {}. Paid {:.2} of {:.2}",
                payment.amount, invoice.invoice_number, invoice.paid_amount, invoice.amount
            ),
            invoice.id,
        ),
    )
    .await;

    Ok(payment)
}

/// Removes a payment and recomputes the invoice totals.
///
/// The payment must belong to `invoice_id`.
#[instrument(skip(ctx))]
pub async fn delete_payment(
    ctx: &LedgerContext,
    payment_id: i64,
    invoice_id: i64,
    actor_id: i64,
) -> Result<invoice::Model> {
    let txn = ctx.db.begin().await?;
    let invoice = lock_invoice(&txn, invoice_id).await?;

    let payment = InvoicePayment::find_by_id(payment_id)
        .filter(invoice_payment::Column::InvoiceId.eq(invoice_id))
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::INVOICE_PAYMENT,
            id: payment_id,
        })?;

    InvoicePayment::delete_by_id(payment.id).exec(&txn).await?;
    let invoice = recompute_invoice_payments(&txn, invoice).await?;
    txn.commit().await?;
    info!(
        paid_amount = invoice.paid_amount,
        payment_status = ?invoice.payment_status,
        "Payment deleted"
    );

    effects::record_audit(
        ctx,
        actor_id,
        AuditAction::Delete,
        entity_types::INVOICE_PAYMENT,
        payment_id,
        format!(
            "Deleted payment of {:.2} from invoice {}",
            payment.amount, invoice.invoice_number
        ),
    )
    .await;

    Ok(invoice)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::invoice::{create_invoice, get_invoice, reject_invoice};
    use crate::core::notification::list_notifications;
    use crate::core::context::Actor;
    use crate::entities::UserRole;
    use crate::test_utils::{
        create_approved_invoice, create_test_project, create_test_user, new_test_invoice,
        setup_context,
    };

    fn pay(invoice_id: i64, amount: f64, day: u32) -> NewPayment {
        NewPayment {
            invoice_id,
            amount,
            payment_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            payment_method: PaymentMethod::Transfer,
            proof_url: None,
            notes: None,
        }
    }

    async fn assert_ledger_consistent(ctx: &LedgerContext, invoice_id: i64) {
        let invoice = get_invoice(&ctx.db, invoice_id).await.unwrap();
        let payments = list_payments(&ctx.db, invoice_id).await.unwrap();
        let sum: f64 = payments.iter().map(|p| p.amount).sum();
        assert_eq!(invoice.paid_amount, round_cents(sum));
        assert_eq!(
            invoice.payment_status == PaymentStatus::Paid,
            invoice.paid_amount >= invoice.amount
        );
        assert_eq!(
            invoice.payment_status == PaymentStatus::Unpaid,
            invoice.paid_amount == 0.0
        );
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let (ctx, sink) = setup_context().await.unwrap();
        let (invoice, creator) = create_approved_invoice(&ctx, 1000.0).await.unwrap();

        record_payment(&ctx, 9, pay(invoice.id, 400.0, 1)).await.unwrap();
        let current = get_invoice(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(current.paid_amount, 400.0);
        assert_eq!(current.payment_status, PaymentStatus::PartialPaid);
        assert_ledger_consistent(&ctx, invoice.id).await;

        record_payment(&ctx, 9, pay(invoice.id, 600.0, 2)).await.unwrap();
        let current = get_invoice(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(current.paid_amount, 1000.0);
        assert_eq!(current.payment_status, PaymentStatus::Paid);
        assert_ledger_consistent(&ctx, invoice.id).await;

        let notes = list_notifications(&ctx.db, creator.id).await.unwrap();
        assert_eq!(notes[0].notification_type, NotificationType::PaymentRecorded);
        assert!(notes[0].title.contains("Fully Paid"));
        assert!(notes[1].title.contains("Partial Payment"));
        assert!(sink
            .events_for(creator.id)
            .iter()
            .any(|e| e.event_type == NotificationType::PaymentRecorded));

        // Nothing left to pay
        assert!(matches!(
            record_payment(&ctx, 9, pay(invoice.id, 1.0, 3)).await,
            Err(Error::InvalidStateTransition { ref status, .. }) if status == "PAID"
        ));
    }

    #[tokio::test]
    async fn test_overpayment_rejected_and_paid_unchanged() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (invoice, _) = create_approved_invoice(&ctx, 1000.0).await.unwrap();
        record_payment(&ctx, 9, pay(invoice.id, 900.0, 1)).await.unwrap();

        let err = record_payment(&ctx, 9, pay(invoice.id, 101.0, 2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AmountExceedsRemaining { amount, remaining }
                if amount == 101.0 && remaining == 100.0
        ));

        let current = get_invoice(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(current.paid_amount, 900.0);
        assert_eq!(list_payments(&ctx.db, invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_all_payments_restores_unpaid() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (invoice, _) = create_approved_invoice(&ctx, 500.0).await.unwrap();
        let first = record_payment(&ctx, 9, pay(invoice.id, 200.0, 5)).await.unwrap();
        let second = record_payment(&ctx, 9, pay(invoice.id, 300.0, 4)).await.unwrap();

        let listed = list_payments(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(listed[0].id, second.id);

        let after_first = delete_payment(&ctx, first.id, invoice.id, 9).await.unwrap();
        assert_eq!(after_first.paid_amount, 300.0);
        assert_eq!(after_first.payment_status, PaymentStatus::PartialPaid);
        assert_ledger_consistent(&ctx, invoice.id).await;

        let after_all = delete_payment(&ctx, second.id, invoice.id, 9).await.unwrap();
        assert_eq!(after_all.paid_amount, 0.0);
        assert_eq!(after_all.payment_status, PaymentStatus::Unpaid);
        assert_ledger_consistent(&ctx, invoice.id).await;
    }

    #[tokio::test]
    async fn test_delete_payment_of_other_invoice_is_not_found() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (invoice, _) = create_approved_invoice(&ctx, 500.0).await.unwrap();
        let (other, _) = create_approved_invoice(&ctx, 500.0).await.unwrap();
        let payment = record_payment(&ctx, 9, pay(invoice.id, 100.0, 1)).await.unwrap();

        assert!(matches!(
            delete_payment(&ctx, payment.id, other.id, 9).await,
            Err(Error::NotFound { entity: "invoice_payment", .. })
        ));
        assert!(matches!(
            delete_payment(&ctx, payment.id, 4040, 9).await,
            Err(Error::NotFound { entity: "invoice", .. })
        ));
        assert_ledger_consistent(&ctx, invoice.id).await;
    }

    #[tokio::test]
    async fn test_payment_requires_approved_invoice() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let finance = create_test_user(&ctx, UserRole::Finance).await.unwrap();
        let project = create_test_project(&ctx, &finance, 0.0).await.unwrap();
        let actor = Actor::new(finance.id, finance.role);
        let pending = create_invoice(&ctx, &actor, new_test_invoice(project.id, 100.0))
            .await
            .unwrap();

        assert!(matches!(
            record_payment(&ctx, 9, pay(pending.id, 10.0, 1)).await,
            Err(Error::InvalidStateTransition { ref status, .. }) if status == "PENDING"
        ));

        reject_invoice(&ctx, pending.id, 9, "duplicate".to_string())
            .await
            .unwrap();
        assert!(matches!(
            record_payment(&ctx, 9, pay(pending.id, 10.0, 1)).await,
            Err(Error::InvalidStateTransition { ref status, .. }) if status == "REJECTED"
        ));

        assert!(matches!(
            record_payment(&ctx, 9, pay(pending.id, -10.0, 1)).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            record_payment(&ctx, 9, pay(5050, 10.0, 1)).await,
            Err(Error::NotFound { entity: "invoice", id: 5050 })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_payments_never_overpay() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (invoice, _) = create_approved_invoice(&ctx, 1000.0).await.unwrap();

        let mut handles = Vec::new();
        for day in 1..=3 {
            let ctx = ctx.clone();
            let input = pay(invoice.id, 400.0, day);
            handles.push(tokio::spawn(async move { record_payment(&ctx, 9, input).await }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert!(matches!(e, Error::AmountExceedsRemaining { .. })),
            }
        }
        assert_eq!(accepted, 2);

        let current = get_invoice(&ctx.db, invoice.id).await.unwrap();
        assert_eq!(current.paid_amount, 800.0);
        assert_ledger_consistent(&ctx, invoice.id).await;
    }
}
