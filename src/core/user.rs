//! Users and role lookups.

use crate::{
    core::{audit::entity_types, context::LedgerContext, effects},
    entities::{AuditAction, User, UserRole, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Creates a user. `created_by` is recorded as the audit actor.
#[instrument(skip(ctx))]
pub async fn create_user(
    ctx: &LedgerContext,
    created_by: i64,
    full_name: &str,
    email: &str,
    role: UserRole,
) -> Result<user::Model> {
    let full_name = full_name.trim();
    let email = email.trim().to_lowercase();
    if full_name.is_empty() {
        return Err(Error::validation("Full name cannot be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation(format!("Invalid email address: {email}")));
    }

    let existing = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&ctx.db)
        .await?;
    if existing.is_some() {
        return Err(Error::validation(format!("Email {email} is already registered")));
    }

    let user = user::ActiveModel {
        full_name: Set(full_name.to_string()),
        email: Set(email),
        role: Set(role),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;
    info!(user_id = user.id, ?role, "Created user");

    effects::record_audit(
        ctx,
        created_by,
        AuditAction::Create,
        entity_types::USER,
        user.id,
        format!("Created user {} ({:?})", user.email, user.role),
    )
    .await;

    Ok(user)
}

/// Fetches a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::USER,
            id: user_id,
        })
}

/// All users holding any of `roles`, ordered by id.
pub async fn find_users_by_roles(
    db: &DatabaseConnection,
    roles: &[UserRole],
) -> Result<Vec<user::Model>> {
    if roles.is_empty() {
        return Ok(Vec::new());
    }
    User::find()
        .filter(user::Column::Role.is_in(roles.iter().copied()))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::audit::list_audit_logs_by_entity_type;
    use crate::test_utils::setup_context;

    #[tokio::test]
    async fn test_create_user_is_audited() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let user = create_user(&ctx, 1, " Ana ", "Ana@Example.com", UserRole::Finance)
            .await
            .unwrap();

        assert_eq!(user.full_name, "Ana");
        assert_eq!(user.email, "ana@example.com");

        let logs = list_audit_logs_by_entity_type(&ctx.db, entity_types::USER)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].entity_id, user.id);
        assert_eq!(logs[0].user_id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (ctx, _sink) = setup_context().await.unwrap();
        create_user(&ctx, 1, "Ana", "ana@example.com", UserRole::Spv)
            .await
            .unwrap();
        let err = create_user(&ctx, 1, "Other", "ana@example.com", UserRole::Owner)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_find_users_by_roles() {
        let (ctx, _sink) = setup_context().await.unwrap();
        create_user(&ctx, 1, "Spv", "spv@example.com", UserRole::Spv).await.unwrap();
        create_user(&ctx, 1, "Fin", "fin@example.com", UserRole::Finance).await.unwrap();
        create_user(&ctx, 1, "Own", "own@example.com", UserRole::Owner).await.unwrap();

        let reviewers = find_users_by_roles(&ctx.db, &UserRole::REVIEWERS).await.unwrap();
        assert_eq!(reviewers.len(), 2);
        assert!(reviewers.iter().all(|u| u.role != UserRole::Spv));
        assert!(find_users_by_roles(&ctx.db, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let err = get_user(&ctx.db, 99).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", id: 99 }));
    }
}
