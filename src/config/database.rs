//! Database configuration module.
//!
//! Opens the `SeaORM` connection and creates every table from the entity
//! definitions with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust models without hand-written DDL.

use crate::entities::{
    AuditLog, BudgetRequest, Expense, ExpenseApproval, Invoice, InvoiceItem, InvoicePayment,
    Notification, Project, ProjectBudget, ProjectMember, ProjectPlanItem, User,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Establishes a connection to the database at `database_url`.
#[instrument(skip(database_url))]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables if they do not exist yet.
///
/// Parents are created before children so foreign keys always reference an
/// existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Project).await?;
    create_table(db, &schema, ProjectMember).await?;
    create_table(db, &schema, ProjectBudget).await?;
    create_table(db, &schema, ProjectPlanItem).await?;
    create_table(db, &schema, BudgetRequest).await?;
    create_table(db, &schema, Expense).await?;
    create_table(db, &schema, ExpenseApproval).await?;
    create_table(db, &schema, Invoice).await?;
    create_table(db, &schema, InvoiceItem).await?;
    create_table(db, &schema, InvoicePayment).await?;
    create_table(db, &schema, AuditLog).await?;
    create_table(db, &schema, Notification).await?;

    info!("Database tables ensured");
    Ok(())
}
