#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use project_ledger::{
    config::{self, database},
    core::LedgerContext,
    errors::Result,
    hub::{EventSink, NotificationHub},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load the application configuration (file, then environment overrides)
    let app_config = config::load_app_configuration()?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Wire the live hub into the ledger
    let hub: Arc<dyn EventSink> = Arc::new(NotificationHub::new(app_config.notification_buffer));
    let ctx = LedgerContext::from_config(db, hub, &app_config);
    info!(company_code = %ctx.company_code, "Ledger ready");

    // 6. Serve until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    ctx.db.close().await?;

    Ok(())
}
