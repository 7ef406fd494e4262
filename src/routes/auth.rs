use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{hash_password, removal_cookie, session_cookie, verify_password, AuthUser, JwtManager};
use crate::database::{is_unique_violation, Database};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::models::category::DEFAULT_CATEGORIES;
use crate::models::user::{ChangePasswordRequest, LoginRequest, RegisterRequest, User, UserResponse};
use crate::response::ApiResponse;
use crate::routes::users::current_user;

pub async fn register(
    State(db): State<Database>,
    State(jwt): State<JwtManager>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(CookieJar, ApiResponse)> {
    payload.validate()?;

    // Cek apakah email / username sudah terdaftar
    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&payload.email)
            .fetch_one(&db)
            .await?;
    if email_taken {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let username_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(&payload.username)
            .fetch_one(&db)
            .await?;
    if username_taken {
        return Err(ApiError::Conflict("User with this username already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;

    // User dan kategori default dibuat dalam satu transaksi
    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, username, email, password_hash, type) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(payload.user_type)
    .fetch_one(&mut *tx)
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

    for (name, description, category_type) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO categories (user_id, name, description, type) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(*name)
            .bind(*description)
            .bind(*category_type)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "user registered");

    let token = jwt.issue(user.id, user.user_type)?;
    let jar = jar.add(session_cookie(token, jwt.cookie_secure));

    Ok((
        jar,
        ApiResponse::created("User registered successfully").with_data(UserResponse::from(&user)),
    ))
}

pub async fn login(
    State(db): State<Database>,
    State(jwt): State<JwtManager>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse)> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&db)
        .await?;

    let user = match user {
        Some(user) if verify_password(&payload.password, &user.password_hash) => user,
        _ => {
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
    };

    tracing::info!(user_id = %user.id, "user logged in");

    let token = jwt.issue(user.id, user.user_type)?;
    let jar = jar.add(session_cookie(token, jwt.cookie_secure));

    Ok((
        jar,
        ApiResponse::ok("Login successful").with_data(UserResponse::from(&user)),
    ))
}

pub async fn logout(auth: AuthUser, jar: CookieJar) -> (CookieJar, ApiResponse) {
    tracing::info!(user_id = %auth.id, "user logged out");
    (jar.add(removal_cookie()), ApiResponse::ok("Logout successful"))
}

pub async fn change_password(
    State(db): State<Database>,
    auth: AuthUser,
    jar: CookieJar,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<(CookieJar, ApiResponse)> {
    payload.validate()?;

    let user = current_user(&db, auth.id).await?;

    if verify_password(&payload.new_password, &user.password_hash) {
        return Err(ApiError::BadRequest(
            "New password must be different from the current password".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(user.id)
        .execute(&db)
        .await?;

    tracing::info!(user_id = %user.id, "password changed");

    // Sesi lama ditutup, user harus login ulang
    Ok((
        jar.add(removal_cookie()),
        ApiResponse::ok("Password changed successfully, please log in again"),
    ))
}
