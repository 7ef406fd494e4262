use axum::{extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::auth::{session_cookie, AuthUser, JwtManager};
use crate::database::{is_unique_violation, Database};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::models::user::{UpdateUserRequest, User, UserResponse};
use crate::response::ApiResponse;

/// Loads the user behind a session. A session whose user is gone is ended.
pub async fn current_user(db: &Database, id: Uuid) -> ApiResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::EndSession {
            code: StatusCode::NOT_FOUND,
            message: "User not found".to_string(),
        })
}

pub async fn get_me(State(db): State<Database>, auth: AuthUser) -> ApiResult<ApiResponse> {
    let user = current_user(&db, auth.id).await?;

    if user.user_type != auth.user_type {
        tracing::warn!(user_id = %user.id, "user type in token does not match stored type");
        return Err(ApiError::EndSession {
            code: StatusCode::FORBIDDEN,
            message: "Forbidden: User type mismatch".to_string(),
        });
    }

    Ok(ApiResponse::ok("User retrieved successfully").with_data(UserResponse::from(&user)))
}

pub async fn update_me(
    State(db): State<Database>,
    State(jwt): State<JwtManager>,
    auth: AuthUser,
    jar: CookieJar,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<(CookieJar, ApiResponse)> {
    if payload.is_empty() {
        return Err(ApiError::BadRequest("No data provided for update".to_string()));
    }
    payload.validate()?;

    let user = current_user(&db, auth.id).await?;

    // Email dan username harus unik di antara user lain
    let existing = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE (email = $1 OR username = $2) AND id <> $3 LIMIT 1",
    )
    .bind(&payload.email)
    .bind(&payload.username)
    .bind(user.id)
    .fetch_optional(&db)
    .await?;

    if let Some(other) = existing {
        if payload.email.as_deref() == Some(other.email.as_str()) {
            return Err(ApiError::Conflict("User with this email already exists".to_string()));
        }
        return Err(ApiError::Conflict("User with this username already exists".to_string()));
    }

    if payload.changes_nothing(&user) {
        return Err(ApiError::BadRequest(
            "In one or more fields, no changes were made".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET \
            username = COALESCE($1, username), \
            email = COALESCE($2, email), \
            type = COALESCE($3, type), \
            updated_at = NOW() \
         WHERE id = $4 RETURNING *",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(payload.user_type)
    .bind(user.id)
    .fetch_one(&db)
    .await
    .map_err(|err| {
        if is_unique_violation(&err, "users_email_key") {
            ApiError::Conflict("User with this email already exists".to_string())
        } else if is_unique_violation(&err, "users_username_key") {
            ApiError::Conflict("User with this username already exists".to_string())
        } else {
            ApiError::Database(err)
        }
    })?;

    tracing::info!(user_id = %updated.id, "user updated");

    // Token membawa tipe user, jadi diterbitkan ulang
    let token = jwt.issue(updated.id, updated.user_type)?;
    let jar = jar.add(session_cookie(token, jwt.cookie_secure));

    Ok((
        jar,
        ApiResponse::ok("User updated successfully").with_data(UserResponse::from(&updated)),
    ))
}
