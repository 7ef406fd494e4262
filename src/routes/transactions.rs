use axum::extract::State;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction as DbTransaction};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::models::budget::Budget;
use crate::models::category::Category;
use crate::models::transaction::{
    rebalance, Transaction, TransactionRequest, TransactionType, TypedTransactions,
};
use crate::response::ApiResponse;
use crate::routes::budgets::owned_budget;
use crate::routes::categories::owned_category;

const NOT_FOUND: &str = "Transaction not found or access denied";

fn check_category(category: &Category, kind: TransactionType) -> ApiResult<()> {
    if category.category_type.accepts(kind) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Category type does not match transaction type".to_string(),
        ))
    }
}

/// Budget row locked until the surrounding transaction ends.
async fn lock_budget(
    tx: &mut DbTransaction<'_, Postgres>,
    id: i64,
    user_id: Uuid,
) -> ApiResult<Budget> {
    sqlx::query_as::<_, Budget>(
        "SELECT * FROM budgets WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Budget not found or access denied".to_string()))
}

async fn lock_transaction(
    tx: &mut DbTransaction<'_, Postgres>,
    id: i64,
    user_id: Uuid,
) -> ApiResult<Transaction> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

async fn set_budget_current(
    tx: &mut DbTransaction<'_, Postgres>,
    budget_id: i64,
    current: Decimal,
) -> ApiResult<()> {
    sqlx::query("UPDATE budgets SET current = $1 WHERE id = $2")
        .bind(current)
        .bind(budget_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn list_transactions(
    State(db): State<Database>,
    auth: AuthUser,
) -> ApiResult<ApiResponse> {
    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(auth.id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok("Transactions retrieved successfully").with_data(transactions))
}

pub async fn get_transaction(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let transaction =
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(auth.id)
            .fetch_optional(&db)
            .await?
            .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))?;

    Ok(ApiResponse::ok("Transaction retrieved successfully").with_data(transaction))
}

pub async fn create_transaction(
    State(db): State<Database>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<TransactionRequest>,
) -> ApiResult<ApiResponse> {
    let (category_id, budget_id) = payload.validate_for_create()?;

    let category = owned_category(&db, category_id, auth.id).await?;
    check_category(&category, payload.transaction_type)?;

    // Insert transaksi dan update saldo budget dalam satu transaksi database
    let mut tx = db.begin().await?;

    let budget = lock_budget(&mut tx, budget_id, auth.id).await?;
    let current = rebalance(
        budget.current,
        None,
        Some((payload.transaction_type, payload.amount)),
    )?;

    let created = sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (user_id, category_id, budget_id, amount, description, created_at, type) \
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()::timestamp), $7) RETURNING *",
    )
    .bind(auth.id)
    .bind(category_id)
    .bind(budget_id)
    .bind(payload.amount)
    .bind(&payload.description)
    .bind(payload.created_at)
    .bind(payload.transaction_type)
    .fetch_one(&mut *tx)
    .await?;

    set_budget_current(&mut tx, budget_id, current).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %auth.id,
        transaction_id = created.id,
        budget_id,
        "transaction created"
    );

    Ok(ApiResponse::created("Transaction created successfully").with_data(created))
}

pub async fn update_transaction(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TransactionRequest>,
) -> ApiResult<ApiResponse> {
    payload.validate()?;

    let mut tx = db.begin().await?;
    let existing = lock_transaction(&mut tx, id, auth.id).await?;

    let category_id = payload.category_id.unwrap_or(existing.category_id);
    let category = owned_category(&mut *tx, category_id, auth.id).await?;
    check_category(&category, payload.transaction_type)?;

    let budget = lock_budget(&mut tx, existing.budget_id, auth.id).await?;
    let current = rebalance(
        budget.current,
        Some((existing.transaction_type, existing.amount)),
        Some((payload.transaction_type, payload.amount)),
    )?;

    let updated = sqlx::query_as::<_, Transaction>(
        "UPDATE transactions SET category_id = $1, amount = $2, description = $3, \
            created_at = COALESCE($4, created_at), type = $5 \
         WHERE id = $6 AND user_id = $7 RETURNING *",
    )
    .bind(category_id)
    .bind(payload.amount)
    .bind(&payload.description)
    .bind(payload.created_at)
    .bind(payload.transaction_type)
    .bind(id)
    .bind(auth.id)
    .fetch_one(&mut *tx)
    .await?;

    set_budget_current(&mut tx, budget.id, current).await?;
    tx.commit().await?;

    Ok(ApiResponse::ok("Transaction updated successfully").with_data(updated))
}

pub async fn delete_transaction(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let mut tx = db.begin().await?;
    let existing = lock_transaction(&mut tx, id, auth.id).await?;

    let budget = lock_budget(&mut tx, existing.budget_id, auth.id).await?;
    let current = rebalance(
        budget.current,
        Some((existing.transaction_type, existing.amount)),
        None,
    )?;

    sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.id)
        .execute(&mut *tx)
        .await?;

    set_budget_current(&mut tx, budget.id, current).await?;
    tx.commit().await?;

    tracing::info!(user_id = %auth.id, transaction_id = id, "transaction deleted");

    Ok(ApiResponse::ok("Transaction deleted successfully"))
}

async fn typed_for_budget(
    db: &Database,
    user_id: Uuid,
    budget_id: i64,
    kind: TransactionType,
) -> ApiResult<TypedTransactions> {
    owned_budget(db, budget_id, user_id).await?;

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE budget_id = $1 AND user_id = $2 AND type = $3 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(budget_id)
    .bind(user_id)
    .bind(kind)
    .fetch_all(db)
    .await?;

    Ok(TypedTransactions::new(kind, transactions))
}

pub async fn list_incomes(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(budget_id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let incomes = typed_for_budget(&db, auth.id, budget_id, TransactionType::Income).await?;
    Ok(ApiResponse::ok("Income transactions retrieved successfully").with_data(incomes.into_json()))
}

pub async fn list_expenses(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(budget_id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let expenses = typed_for_budget(&db, auth.id, budget_id, TransactionType::Expense).await?;
    Ok(ApiResponse::ok("Expense transactions retrieved successfully").with_data(expenses.into_json()))
}

pub async fn list_by_category(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(category_id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    owned_category(&db, category_id, auth.id).await?;

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE category_id = $1 AND user_id = $2 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(category_id)
    .bind(auth.id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok("Transactions retrieved successfully").with_data(transactions))
}
