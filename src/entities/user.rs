//! User entity - people who submit and review ledger items.
//!
//! Credentials live outside this crate; the ledger only needs identity and role
//! to decide who may act and who gets notified.

use super::enums::UserRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub full_name: String,
    /// Login email, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// Organisation role
    pub role: UserRole,
    /// When the user was created
    pub created_at: DateTimeUtc,
}

/// Users are referenced by id only; no foreign keys point here.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
