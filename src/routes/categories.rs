use axum::extract::State;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::models::category::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use crate::response::ApiResponse;

const NOT_FOUND: &str = "Category not found or access denied";

/// Category owned by `user_id`, or 404. Takes a pool or an open transaction.
pub async fn owned_category<'e, E>(executor: E, id: i64, user_id: Uuid) -> ApiResult<Category>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub async fn list_categories(
    State(db): State<Database>,
    auth: AuthUser,
) -> ApiResult<ApiResponse> {
    let categories =
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE user_id = $1 ORDER BY id")
            .bind(auth.id)
            .fetch_all(&db)
            .await?;

    Ok(ApiResponse::ok("Categories retrieved successfully").with_data(categories))
}

pub async fn get_category(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    let category = owned_category(&db, id, auth.id).await?;
    Ok(ApiResponse::ok("Category retrieved successfully").with_data(category))
}

pub async fn create_category(
    State(db): State<Database>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreateCategoryRequest>,
) -> ApiResult<ApiResponse> {
    payload.validate()?;

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (user_id, name, description, type) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(auth.id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.category_type)
    .fetch_one(&db)
    .await?;

    tracing::info!(user_id = %auth.id, category_id = category.id, "category created");

    Ok(ApiResponse::created("Category created successfully").with_data(category))
}

pub async fn update_category(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<ApiResponse> {
    payload.validate()?;
    owned_category(&db, id, auth.id).await?;

    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = COALESCE($1, name), description = COALESCE($2, description) \
         WHERE id = $3 AND user_id = $4 RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(id)
    .bind(auth.id)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::ok("Category updated successfully").with_data(category))
}

pub async fn delete_category(
    State(db): State<Database>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiResponse> {
    owned_category(&db, id, auth.id).await?;

    // Kategori yang masih dipakai transaksi tidak boleh dihapus
    let in_use: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM transactions WHERE category_id = $1)")
            .bind(id)
            .fetch_one(&db)
            .await?;
    if in_use {
        return Err(ApiError::BadRequest(
            "Cannot delete category with existing transactions".to_string(),
        ));
    }

    sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(auth.id)
        .execute(&db)
        .await?;

    tracing::info!(user_id = %auth.id, category_id = id, "category deleted");

    Ok(ApiResponse::ok("Category deleted successfully"))
}
