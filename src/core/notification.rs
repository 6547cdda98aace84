//! Durable per-user notifications.
//!
//! Rows are created by [`crate::core::effects`] after a business transaction
//! commits; the same content is then pushed to live subscribers.

use crate::{
    entities::{Notification, NotificationType, notification},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::Expr};

/// Content of a notification before it is addressed to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Category, doubles as the live event type
    pub notification_type: NotificationType,
    /// Entity the notification is about
    pub reference_id: Option<i64>,
}

impl NotificationDraft {
    /// Creates a draft referring to entity `reference_id`.
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        reference_id: i64,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            reference_id: Some(reference_id),
        }
    }
}

/// Stores an unread notification for `user_id`.
pub async fn create_notification<C>(
    db: &C,
    user_id: i64,
    draft: &NotificationDraft,
) -> Result<notification::Model>
where
    C: ConnectionTrait,
{
    let row = notification::ActiveModel {
        user_id: Set(user_id),
        title: Set(draft.title.clone()),
        message: Set(draft.message.clone()),
        notification_type: Set(draft.notification_type),
        reference_id: Set(draft.reference_id),
        is_read: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Notifications of a user, newest first.
pub async fn list_notifications(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<notification::Model>> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of unread notifications of a user.
pub async fn count_unread(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Marks one notification as read.
///
/// Only the recipient may do this; any other user gets `NotFound`, the same
/// as for an unknown id.
pub async fn mark_as_read(
    db: &DatabaseConnection,
    notification_id: i64,
    user_id: i64,
) -> Result<()> {
    let result = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::Id.eq(notification_id))
        .filter(notification::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "notification",
            id: notification_id,
        });
    }
    Ok(())
}

/// Marks every unread notification of a user as read. Returns how many changed.
pub async fn mark_all_as_read(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    let result = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    fn draft(reference_id: i64) -> NotificationDraft {
        NotificationDraft::new(
            NotificationType::ExpenseCreated,
            "New Expense Submitted",
            "An expense awaits review",
            reference_id,
        )
    }

    #[tokio::test]
    async fn test_unread_count_and_mark_as_read() {
        let db = setup_test_db().await.unwrap();
        let first = create_notification(&db, 1, &draft(1)).await.unwrap();
        create_notification(&db, 1, &draft(2)).await.unwrap();
        create_notification(&db, 2, &draft(3)).await.unwrap();

        assert_eq!(count_unread(&db, 1).await.unwrap(), 2);

        mark_as_read(&db, first.id, 1).await.unwrap();
        assert_eq!(count_unread(&db, 1).await.unwrap(), 1);

        let listed = list_notifications(&db, 1).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].reference_id, Some(2));
        assert!(listed[1].is_read);
    }

    #[tokio::test]
    async fn test_mark_as_read_by_other_user_is_not_found() {
        let db = setup_test_db().await.unwrap();
        let row = create_notification(&db, 1, &draft(1)).await.unwrap();

        let err = mark_as_read(&db, row.id, 2).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "notification", .. }));
        assert_eq!(count_unread(&db, 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_as_read() {
        let db = setup_test_db().await.unwrap();
        for id in 0..3 {
            create_notification(&db, 5, &draft(id)).await.unwrap();
        }
        create_notification(&db, 6, &draft(9)).await.unwrap();

        assert_eq!(mark_all_as_read(&db, 5).await.unwrap(), 3);
        assert_eq!(count_unread(&db, 5).await.unwrap(), 0);
        assert_eq!(count_unread(&db, 6).await.unwrap(), 1);
        assert_eq!(mark_all_as_read(&db, 5).await.unwrap(), 0);
    }
}
