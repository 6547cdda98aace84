//! Notification entity - durable copy of every message pushed to a user.

use super::enums::NotificationType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    /// Short title
    pub title: String,
    /// Message body
    #[sea_orm(column_type = "Text")]
    pub message: String,
    /// Category, mirrored as the live event type
    pub notification_type: NotificationType,
    /// Id of the entity the notification is about
    pub reference_id: Option<i64>,
    /// Whether the recipient has read it
    pub is_read: bool,
    /// When it was created
    pub created_at: DateTimeUtc,
}

/// Notifications are standalone.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
