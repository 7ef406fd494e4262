//! Session handling: password hashing, JWT issuing and the cookie that carries it.

pub mod cookie;
pub mod jwt;
pub mod password;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::user::UserType;

pub use cookie::{removal_cookie, session_cookie, COOKIE_NAME};
pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};

/// Logged-in user, taken from the session cookie.
///
/// Only the token is checked here, the user row is not loaded. Handlers that
/// read the user go through `routes::users::current_user`, and writes owned by
/// a deleted user surface as a foreign key violation that `ApiError` turns into
/// 404 "User not found" with the cookie removed.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub user_type: UserType,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtManager: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized("Authorization token is missing or invalid".to_string())
            })?;

        let claims = JwtManager::from_ref(state).decode(&token)?;

        Ok(AuthUser {
            id: claims.sub,
            user_type: claims.user_type,
        })
    }
}
