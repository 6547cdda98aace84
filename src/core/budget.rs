//! Project budget aggregate.
//!
//! `total_budget` and `spent_amount` are only ever changed with single-statement
//! column expressions inside the caller's transaction, so concurrent writers
//! cannot lose each other's updates.

use crate::{
    entities::{ApprovalStatus, Expense, ProjectBudget, expense, project_budget},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    QuerySelect, Set,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use tracing::debug;

const ENTITY: &str = "project_budget";

/// Inserts the budget row of a freshly created project.
pub async fn create_budget<C>(
    db: &C,
    project_id: i64,
    total_budget: f64,
) -> Result<project_budget::Model>
where
    C: ConnectionTrait,
{
    let budget = project_budget::ActiveModel {
        project_id: Set(project_id),
        total_budget: Set(total_budget),
        spent_amount: Set(0.0),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(budget.insert(db).await?)
}

/// Fetches the budget row of a project.
pub async fn get_project_budget<C>(db: &C, project_id: i64) -> Result<project_budget::Model>
where
    C: ConnectionTrait,
{
    ProjectBudget::find()
        .filter(project_budget::Column::ProjectId.eq(project_id))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: ENTITY,
            id: project_id,
        })
}

/// Atomically adds `amount` to the project's total budget.
///
/// Issues `UPDATE project_budgets SET total_budget = total_budget + ?`.
pub async fn increase_total_budget<C>(db: &C, project_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = ProjectBudget::update_many()
        .col_expr(
            project_budget::Column::TotalBudget,
            Expr::col(project_budget::Column::TotalBudget).add(amount),
        )
        .col_expr(project_budget::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(project_budget::Column::ProjectId.eq(project_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: ENTITY,
            id: project_id,
        });
    }
    debug!(project_id, amount, "Increased total budget");
    Ok(())
}

/// Atomically adds `delta` to the project's spent amount, flooring at zero.
///
/// The floor is part of the statement:
/// `SET spent_amount = CASE WHEN spent_amount + ? < 0 THEN 0 ELSE spent_amount + ? END`.
pub async fn adjust_spent_amount<C>(db: &C, project_id: i64, delta: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let adjusted = Expr::col(project_budget::Column::SpentAmount).add(delta);
    let floored: SimpleExpr = Expr::case(Expr::expr(adjusted.clone()).lt(0.0), Expr::value(0.0))
        .finally(adjusted)
        .into();

    let result = ProjectBudget::update_many()
        .col_expr(project_budget::Column::SpentAmount, floored)
        .col_expr(project_budget::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(project_budget::Column::ProjectId.eq(project_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: ENTITY,
            id: project_id,
        });
    }
    debug!(project_id, delta, "Adjusted spent amount");
    Ok(())
}

/// Sum of the project's approved expenses.
pub async fn approved_expense_total<C>(db: &C, project_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = Expense::find()
        .select_only()
        .column_as(expense::Column::Amount.sum(), "total")
        .filter(expense::Column::ProjectId.eq(project_id))
        .filter(expense::Column::Status.eq(ApprovalStatus::Approved))
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0.0))
}

/// Rewrites `spent_amount` from the approved expenses of the project.
///
/// Repair tool for data written outside the ledger; regular operation keeps
/// the two in step through [`adjust_spent_amount`].
pub async fn reconcile_spent_amount<C>(db: &C, project_id: i64) -> Result<project_budget::Model>
where
    C: ConnectionTrait,
{
    let total = approved_expense_total(db, project_id).await?;
    let mut budget: project_budget::ActiveModel = get_project_budget(db, project_id).await?.into();
    budget.spent_amount = Set(total);
    budget.updated_at = Set(Utc::now());
    Ok(budget.update(db).await?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::project::create_project;
    use crate::test_utils::setup_context;

    #[tokio::test]
    async fn test_increase_total_budget() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (project, _) = create_project(&ctx, 1, "Site", "", 1000.0).await.unwrap();

        increase_total_budget(&ctx.db, project.id, 250.0).await.unwrap();
        increase_total_budget(&ctx.db, project.id, 50.5).await.unwrap();

        let budget = get_project_budget(&ctx.db, project.id).await.unwrap();
        assert_eq!(budget.total_budget, 1300.5);
        assert_eq!(budget.spent_amount, 0.0);
    }

    #[tokio::test]
    async fn test_adjust_spent_amount_floors_at_zero() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (project, _) = create_project(&ctx, 1, "Site", "", 1000.0).await.unwrap();

        adjust_spent_amount(&ctx.db, project.id, 300.0).await.unwrap();
        adjust_spent_amount(&ctx.db, project.id, -100.0).await.unwrap();
        assert_eq!(
            get_project_budget(&ctx.db, project.id).await.unwrap().spent_amount,
            200.0
        );

        adjust_spent_amount(&ctx.db, project.id, -500.0).await.unwrap();
        assert_eq!(
            get_project_budget(&ctx.db, project.id).await.unwrap().spent_amount,
            0.0
        );
    }

    #[tokio::test]
    async fn test_missing_budget_row_is_not_found() {
        let (ctx, _sink) = setup_context().await.unwrap();
        assert!(matches!(
            increase_total_budget(&ctx.db, 42, 1.0).await,
            Err(Error::NotFound { entity: "project_budget", id: 42 })
        ));
        assert!(matches!(
            adjust_spent_amount(&ctx.db, 42, 1.0).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            get_project_budget(&ctx.db, 42).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reconcile_without_expenses_resets_to_zero() {
        let (ctx, _sink) = setup_context().await.unwrap();
        let (project, _) = create_project(&ctx, 1, "Site", "", 1000.0).await.unwrap();
        adjust_spent_amount(&ctx.db, project.id, 75.0).await.unwrap();

        let budget = reconcile_spent_amount(&ctx.db, project.id).await.unwrap();
        assert_eq!(budget.spent_amount, 0.0);
        assert_eq!(approved_expense_total(&ctx.db, project.id).await.unwrap(), 0.0);
    }
}
