//! Post-commit side effects: audit rows, stored notifications and live events.
//!
//! Everything here runs after the business transaction has committed and is
//! best effort. A failure is logged and swallowed so the caller still sees the
//! committed result.

use crate::{
    core::{
        audit,
        context::LedgerContext,
        notification::{self, NotificationDraft},
        user,
    },
    entities::{AuditAction, UserRole},
    hub::{Event, EventData},
};
use tracing::{debug, error};

/// Appends an audit row, logging instead of failing.
pub async fn record_audit(
    ctx: &LedgerContext,
    actor_id: i64,
    action: AuditAction,
    entity_type: &'static str,
    entity_id: i64,
    details: String,
) {
    if let Err(e) =
        audit::record_audit_entry(&ctx.db, actor_id, action, entity_type, entity_id, details).await
    {
        error!(
            actor_id,
            ?action,
            entity_type,
            entity_id,
            "Failed to write audit log: {}",
            e
        );
    }
}

/// Stores a notification for `user_id` and pushes it to their live subscribers.
///
/// The live push only happens once the row exists, so every event carries a
/// real notification id.
pub async fn notify_user(ctx: &LedgerContext, user_id: i64, draft: &NotificationDraft) {
    match notification::create_notification(&ctx.db, user_id, draft).await {
        Ok(row) => {
            ctx.events.publish(
                user_id,
                Event {
                    event_type: row.notification_type,
                    data: EventData {
                        id: row.id,
                        title: row.title,
                        message: row.message,
                        reference_id: row.reference_id,
                    },
                },
            );
            debug!(user_id, notification_id = row.id, "Notification delivered");
        }
        Err(e) => {
            error!(
                user_id,
                notification_type = ?draft.notification_type,
                "Failed to store notification: {}",
                e
            );
        }
    }
}

/// Notifies every user holding one of `roles`.
pub async fn notify_roles(ctx: &LedgerContext, roles: &[UserRole], draft: &NotificationDraft) {
    let recipients = match user::find_users_by_roles(&ctx.db, roles).await {
        Ok(users) => users,
        Err(e) => {
            error!(?roles, "Failed to look up notification recipients: {}", e);
            return;
        }
    };

    for recipient in recipients {
        notify_user(ctx, recipient.id, draft).await;
    }
}
