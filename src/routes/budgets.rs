use axum::extract::State;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::models::budget::{Budget, BudgetPlan, BudgetRequest};
use crate::response::ApiResponse;

const NOT_FOUND: &str = "Budget not found or access denied";

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn owned_budget(db: &Database, id: i64, user_id: Uuid) -> ApiResult<Budget> {
    sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub async fn list_budgets(State(db): State<Database>, auth: AuthUser) -> ApiResult<ApiResponse> {
    let budgets =
        sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE user_id = $1 ORDER BY id")
            .bind(auth.id)
            .fetch_all(&db)
            .await?;

    Ok(ApiResponse::ok("Budgets retrieved successfully").with_data(budgets))
}

pub async fn get_budget(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let budget = owned_budget(&db, id, auth.id).await?;
    Ok(ApiResponse::ok("Budget retrieved successfully").with_data(budget))
}

/// Sum of `current` over all of the user's budgets.
pub async fn total_balance(db: &Database, user_id: Uuid) -> ApiResult<Decimal> {
    let total: Decimal =
        sqlx::query_scalar("SELECT COALESCE(SUM(current), 0) FROM budgets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;
    Ok(total)
}

pub async fn get_balance(State(db): State<Database>, auth: AuthUser) -> ApiResult<ApiResponse> {
    let total = total_balance(&db, auth.id).await?;
    Ok(ApiResponse::ok("Total balance retrieved successfully")
        .with_data(json!({ "total_balance": total })))
}

pub async fn create_budget(
    State(db): State<Database>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<BudgetRequest>,
) -> ApiResult<ApiResponse> {
    let budget = payload.validate(today())?;

    let created = sqlx::query_as::<_, Budget>(
        "INSERT INTO budgets (user_id, name, initial, current, goal, created_at, end_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(auth.id)
    .bind(&budget.name)
    .bind(budget.initial)
    .bind(budget.current)
    .bind(budget.goal)
    .bind(budget.created_at)
    .bind(budget.end_at)
    .fetch_one(&db)
    .await?;

    tracing::info!(user_id = %auth.id, budget_id = created.id, "budget created");

    Ok(ApiResponse::created("Budget created successfully").with_data(created))
}

pub async fn update_budget(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<BudgetRequest>,
) -> ApiResult<ApiResponse> {
    owned_budget(&db, id, auth.id).await?;
    let budget = payload.validate(today())?;

    let updated = sqlx::query_as::<_, Budget>(
        "UPDATE budgets SET name = $1, initial = $2, current = $3, goal = $4, created_at = $5, end_at = $6 \
         WHERE id = $7 AND user_id = $8 RETURNING *",
    )
    .bind(&budget.name)
    .bind(budget.initial)
    .bind(budget.current)
    .bind(budget.goal)
    .bind(budget.created_at)
    .bind(budget.end_at)
    .bind(id)
    .bind(auth.id)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::ok("Budget updated successfully").with_data(updated))
}

pub async fn delete_budget(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    owned_budget(&db, id, auth.id).await?;

    // Transaksi milik budget ikut terhapus (ON DELETE CASCADE)
    sqlx::query("DELETE FROM budgets WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.id)
        .execute(&db)
        .await?;

    tracing::info!(user_id = %auth.id, budget_id = id, "budget deleted");

    Ok(ApiResponse::ok("Budget deleted successfully"))
}

pub async fn get_plan(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let budget = owned_budget(&db, id, auth.id).await?;
    let plan = BudgetPlan::compute(&budget, today())?;

    Ok(ApiResponse::ok("Budget plan calculated successfully").with_data(plan))
}
