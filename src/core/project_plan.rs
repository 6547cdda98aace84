//! Project plans - the planned cost breakdown of a project.
//!
//! A plan has the same label/item shape as an invoice body and is stored the
//! same way: every update replaces the whole tree. The plan is informational
//! once the project exists; only approved budget requests move the budget.

use crate::{
    core::{
        audit::entity_types,
        context::{Actor, LedgerContext},
        effects,
        invoice_items::{self, InvoiceLine, LineItem, LineTree, TreeRow},
        project,
    },
    entities::{AuditAction, ProjectPlanItem, project_budget, project_plan_item},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// A top-level plan line: a planned item or a label grouping planned items.
pub type PlanLine = InvoiceLine;

impl LineTree for ProjectPlanItem {
    fn owner_column() -> project_plan_item::Column {
        project_plan_item::Column::ProjectId
    }

    fn parent_column() -> project_plan_item::Column {
        project_plan_item::Column::ParentId
    }

    fn sort_column() -> project_plan_item::Column {
        project_plan_item::Column::SortOrder
    }

    fn id_column() -> project_plan_item::Column {
        project_plan_item::Column::Id
    }

    fn to_active(row: TreeRow) -> project_plan_item::ActiveModel {
        project_plan_item::ActiveModel {
            project_id: Set(row.owner_id),
            parent_id: Set(row.parent_id),
            is_label: Set(row.is_label),
            description: Set(row.line.description),
            quantity: Set(row.line.quantity),
            unit: Set(row.line.unit),
            unit_price: Set(row.line.unit_price),
            subtotal: Set(row.subtotal),
            sort_order: Set(row.sort_order),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    fn from_model(model: &project_plan_item::Model) -> (i64, TreeRow) {
        let row = TreeRow {
            owner_id: model.project_id,
            parent_id: model.parent_id,
            is_label: model.is_label,
            line: LineItem {
                description: model.description.clone(),
                quantity: model.quantity,
                unit: model.unit.clone(),
                unit_price: model.unit_price,
            },
            subtotal: model.subtotal,
            sort_order: model.sort_order,
        };
        (model.id, row)
    }
}

fn ensure_reviewer(actor: &Actor, action: String) -> Result<()> {
    if actor.is_reviewer() {
        Ok(())
    } else {
        Err(Error::Forbidden {
            user_id: actor.user_id,
            action,
        })
    }
}

/// Creates a project whose initial total budget is the sum of its plan.
#[instrument(skip(ctx, actor, lines))]
pub async fn create_project_with_plan(
    ctx: &LedgerContext,
    actor: &Actor,
    name: &str,
    description: &str,
    lines: &[PlanLine],
) -> Result<(project_budget::Model, Vec<PlanLine>)> {
    ensure_reviewer(actor, "create project".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Project name cannot be empty"));
    }
    if lines.is_empty() {
        return Err(Error::validation("At least one plan item or label is required"));
    }
    invoice_items::validate_lines(lines)?;
    let total_budget = invoice_items::lines_subtotal(lines);

    let txn = ctx.db.begin().await?;
    let (project, budget) =
        project::insert_project_with_budget(&txn, actor.user_id, name, description, total_budget)
            .await?;
    invoice_items::replace_tree::<ProjectPlanItem, _>(&txn, project.id, lines).await?;
    let plan = invoice_items::load_tree::<ProjectPlanItem, _>(&txn, project.id).await?;
    txn.commit().await?;
    info!(project_id = project.id, total_budget, "Created project from plan");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Create,
        entity_types::PROJECT,
        project.id,
        format!(
            "Created project '{}' with planned budget {total_budget:.2}",
            project.name
        ),
    )
    .await;

    Ok((budget, plan))
}

/// The stored plan of a project. A project without a plan yields no lines.
pub async fn get_plan(db: &DatabaseConnection, project_id: i64) -> Result<Vec<PlanLine>> {
    project::get_project(db, project_id).await?;
    invoice_items::load_tree::<ProjectPlanItem, _>(db, project_id).await
}

/// Replaces the whole plan of a project with `lines`.
///
/// An empty `lines` clears the plan. The project budget is left untouched.
#[instrument(skip(ctx, actor, lines))]
pub async fn replace_plan(
    ctx: &LedgerContext,
    actor: &Actor,
    project_id: i64,
    lines: &[PlanLine],
) -> Result<Vec<PlanLine>> {
    ensure_reviewer(actor, format!("update plan of project {project_id}"))?;
    invoice_items::validate_lines(lines)?;

    let txn = ctx.db.begin().await?;
    project::get_project(&txn, project_id).await?;
    invoice_items::replace_tree::<ProjectPlanItem, _>(&txn, project_id, lines).await?;
    let plan = invoice_items::load_tree::<ProjectPlanItem, _>(&txn, project_id).await?;
    txn.commit().await?;

    let planned = invoice_items::lines_subtotal(&plan);
    info!(project_id, lines = plan.len(), planned, "Replaced project plan");

    effects::record_audit(
        ctx,
        actor.user_id,
        AuditAction::Update,
        entity_types::PROJECT,
        project_id,
        format!("Replaced plan with {} lines totalling {planned:.2}", plan.len()),
    )
    .await;

    Ok(plan)
}
