//! Shared handles passed to every ledger operation.

use crate::config::AppConfig;
use crate::entities::UserRole;
use crate::hub::EventSink;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Authenticated caller of a ledger operation.
///
/// Authentication happens outside this crate; the ledger only relies on the
/// id and role the caller was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Acting user id
    pub user_id: i64,
    /// Role of the acting user
    pub role: UserRole,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Whether the actor reviews items across all projects.
    #[must_use]
    pub const fn is_reviewer(&self) -> bool {
        matches!(self.role, UserRole::Finance | UserRole::Owner)
    }
}

/// Database connection plus the injected side-effect sinks.
///
/// Built once at startup and cloned into whatever serves requests. Cloning is
/// cheap: the connection is a pool handle and the sink is reference counted.
#[derive(Clone)]
pub struct LedgerContext {
    /// Connection pool to the backing store
    pub db: DatabaseConnection,
    /// Live notification fan-out
    pub events: Arc<dyn EventSink>,
    /// Issuing company code embedded in invoice numbers
    pub company_code: String,
}

impl LedgerContext {
    /// Creates a context from its parts.
    pub fn new(
        db: DatabaseConnection,
        events: Arc<dyn EventSink>,
        company_code: impl Into<String>,
    ) -> Self {
        Self {
            db,
            events,
            company_code: company_code.into(),
        }
    }

    /// Creates a context using the settings from `config`.
    #[must_use]
    pub fn from_config(
        db: DatabaseConnection,
        events: Arc<dyn EventSink>,
        config: &AppConfig,
    ) -> Self {
        Self::new(db, events, config.company_code.clone())
    }
}

impl std::fmt::Debug for LedgerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerContext")
            .field("company_code", &self.company_code)
            .finish_non_exhaustive()
    }
}
