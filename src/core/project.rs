//! Projects, their members and the budget row created alongside them.

use crate::{
    core::{
        audit::entity_types,
        budget,
        context::{Actor, LedgerContext},
        effects,
    },
    entities::{
        AuditAction, Project, ProjectMember, ProjectStatus, User, UserRole, project,
        project_budget, project_member, user,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*,
};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Partial update for [`update_project`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectChanges {
    /// New name, must not be blank
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New lifecycle status
    pub status: Option<ProjectStatus>,
}

/// Creates a project together with its budget row.
///
/// Both rows are written in one transaction so a project never exists without
/// a budget.
#[instrument(skip(ctx))]
pub async fn create_project(
    ctx: &LedgerContext,
    created_by: i64,
    name: &str,
    description: &str,
    total_budget: f64,
) -> Result<(project::Model, project_budget::Model)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Project name cannot be empty"));
    }
    if !total_budget.is_finite() || total_budget < 0.0 {
        return Err(Error::InvalidAmount {
            amount: total_budget,
        });
    }

    let txn = ctx.db.begin().await?;
    let (project, budget) =
        insert_project_with_budget(&txn, created_by, name, description, total_budget).await?;
    txn.commit().await?;
    info!(project_id = project.id, total_budget, "Created project");

    effects::record_audit(
        ctx,
        created_by,
        AuditAction::Create,
        entity_types::PROJECT,
        project.id,
        format!("Created project '{}' with budget {total_budget:.2}", project.name),
    )
    .await;

    Ok((project, budget))
}

/// Inserts a project row and its budget row on `txn`.
pub(crate) async fn insert_project_with_budget(
    txn: &DatabaseTransaction,
    created_by: i64,
    name: &str,
    description: &str,
    total_budget: f64,
) -> Result<(project::Model, project_budget::Model)> {
    let now = Utc::now();
    let project = project::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        status: Set(ProjectStatus::Active),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let budget = budget::create_budget(txn, project.id, total_budget).await?;
    Ok((project, budget))
}

/// Fetches a project by id.
pub async fn get_project<C>(db: &C, project_id: i64) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    Project::find_by_id(project_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: entity_types::PROJECT,
            id: project_id,
        })
}

/// Lists the projects visible to `actor`.
///
/// Supervisors see the projects they belong to, reviewers see every project.
pub async fn list_projects(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<project::Model>> {
    let mut query = Project::find().order_by_asc(project::Column::Id);
    if actor.role == UserRole::Spv {
        let project_ids: Vec<i64> = ProjectMember::find()
            .filter(project_member::Column::UserId.eq(actor.user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|m| m.project_id)
            .collect();
        query = query.filter(project::Column::Id.is_in(project_ids));
    }
    query.all(db).await.map_err(Into::into)
}

/// Renames a project, edits its description or moves it to another status.
///
/// Only reviewers may change a project. The budget is never touched here.
#[instrument(skip(ctx, changes))]
pub async fn update_project(
    ctx: &LedgerContext,
    actor: &Actor,
    project_id: i64,
    changes: ProjectChanges,
) -> Result<project::Model> {
    if !actor.is_reviewer() {
        return Err(Error::Forbidden {
            user_id: actor.user_id,
            action: format!("update project {project_id}"),
        });
    }

    let name = match changes.name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::validation("Project name cannot be empty"));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };

    let existing = get_project(&ctx.db, project_id).await?;
    let mut active: project::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(status) = changes.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&ctx.db).await?;
    info!(project_id, status = ?updated.status, "Updated project");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Update,
        entity_types::PROJECT,
        project_id,
        format!("Updated project '{}' ({:?})", updated.name, updated.status),
    )
    .await;

    Ok(updated)
}

/// Adds `user_id` to the project. Adding an existing member is a no-op.
pub async fn add_member(
    db: &DatabaseConnection,
    project_id: i64,
    user_id: i64,
) -> Result<project_member::Model> {
    get_project(db, project_id).await?;

    if let Some(existing) = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        debug!(project_id, user_id, "Already a project member");
        return Ok(existing);
    }

    let member = project_member::ActiveModel {
        project_id: Set(project_id),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(project_id, user_id, "Added project member");
    Ok(member)
}

/// Removes `user_id` from the project.
pub async fn remove_member(db: &DatabaseConnection, project_id: i64, user_id: i64) -> Result<()> {
    let result = ProjectMember::delete_many()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "project_member",
            id: user_id,
        });
    }
    info!(project_id, user_id, "Removed project member");
    Ok(())
}

/// Users belonging to the project, in the order they were added.
pub async fn list_members(db: &DatabaseConnection, project_id: i64) -> Result<Vec<user::Model>> {
    get_project(db, project_id).await?;

    let user_ids: Vec<i64> = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .order_by_asc(project_member::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect();

    let mut users: HashMap<i64, user::Model> = User::find()
        .filter(user::Column::Id.is_in(user_ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(user_ids.iter().filter_map(|id| users.remove(id)).collect())
}

/// Whether `user_id` is a member of the project.
pub async fn is_member<C>(db: &C, project_id: i64, user_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Checks that the project exists and that `actor` may submit items to it.
///
/// Reviewers may act on every project; supervisors only on projects they
/// belong to.
pub async fn ensure_project_access<C>(
    db: &C,
    actor: &Actor,
    project_id: i64,
    action: &str,
) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    let project = get_project(db, project_id).await?;
    if actor.role == UserRole::Spv && !is_member(db, project_id, actor.user_id).await? {
        return Err(Error::Forbidden {
            user_id: actor.user_id,
            action: format!("{action} in project {project_id}"),
        });
    }
    Ok(project)
}
