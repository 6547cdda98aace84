//! Shared test utilities for the ledger.
//!
//! Provides an in-memory database, a recording event sink in place of the live
//! hub, and helpers that create users, projects and invoices with sensible
//! defaults.

use crate::{
    core::{
        context::{Actor, LedgerContext},
        invoice::{self, NewInvoice},
        invoice_items::{InvoiceLine, LineItem},
        project, user,
    },
    entities::{self, InvoiceType, UserRole},
    errors::Result,
    hub::{Event, EventSink},
};
use chrono::NaiveDate;
use sea_orm::{ConnectOptions, DatabaseConnection};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool is pinned to a single connection: every `SQLite` memory connection
/// is its own database, and one connection also serialises concurrent
/// transactions the way row locks do on a server database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Event sink that remembers everything published to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(i64, Event)>>,
}

impl RecordingSink {
    /// Events published to `user_id`, oldest first.
    pub fn events_for(&self, user_id: i64) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(recipient, _)| *recipient == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, user_id: i64, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((user_id, event));
    }
}

/// Creates a test database wrapped in a context whose events are recorded.
pub async fn setup_context() -> Result<(LedgerContext, Arc<RecordingSink>)> {
    let db = setup_test_db().await?;
    let sink = Arc::new(RecordingSink::default());
    let ctx = LedgerContext::new(db, Arc::clone(&sink) as Arc<dyn EventSink>, "CMP");
    Ok((ctx, sink))
}

/// Creates a user with a unique email.
pub async fn create_test_user(
    ctx: &LedgerContext,
    role: UserRole,
) -> Result<entities::user::Model> {
    let n = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    user::create_user(
        ctx,
        0,
        &format!("Test User {n}"),
        &format!("user{n}@example.com"),
        role,
    )
    .await
}

/// Creates a project owned by `creator`, who is also added as a member.
pub async fn create_test_project(
    ctx: &LedgerContext,
    creator: &entities::user::Model,
    total_budget: f64,
) -> Result<entities::project::Model> {
    let (project, _) =
        project::create_project(ctx, creator.id, "Test Project", "", total_budget).await?;
    project::add_member(&ctx.db, project.id, creator.id).await?;
    Ok(project)
}

/// Invoice input with a single item worth `amount`, dated 2024-05-15, untaxed.
pub fn new_test_invoice(project_id: i64, amount: f64) -> NewInvoice {
    NewInvoice {
        invoice_type: InvoiceType::Dp,
        project_id,
        recipient_name: "PT Test Client".to_string(),
        recipient_address: "Jl. Contoh 1".to_string(),
        attention: "Procurement".to_string(),
        po_number: "PO-001".to_string(),
        invoice_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap_or_default(),
        due_date: None,
        dp_percentage: Some(30.0),
        tax_percentage: 0.0,
        notes: String::new(),
        language: "id".to_string(),
        lines: vec![InvoiceLine::Item(LineItem {
            description: "Work".to_string(),
            quantity: 1.0,
            unit: "ls".to_string(),
            unit_price: amount,
        })],
    }
}

/// Creates and approves an invoice worth `amount` on a fresh project.
///
/// Returns the approved invoice and the finance user who created it.
pub async fn create_approved_invoice(
    ctx: &LedgerContext,
    amount: f64,
) -> Result<(entities::invoice::Model, entities::user::Model)> {
    let finance = create_test_user(ctx, UserRole::Finance).await?;
    let owner = create_test_user(ctx, UserRole::Owner).await?;
    let project = create_test_project(ctx, &finance, 0.0).await?;
    let actor = Actor::new(finance.id, finance.role);

    let created = invoice::create_invoice(ctx, &actor, new_test_invoice(project.id, amount)).await?;
    let approved = invoice::approve_invoice(ctx, created.id, owner.id).await?;
    Ok((approved, finance))
}
