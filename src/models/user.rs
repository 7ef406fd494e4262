use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::validation::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Default,
    Premium,
    Admin,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(rename = "type")]
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public shape of a user; the password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub user_type: UserType,
}

impl RegisterRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.length("username", &self.username, 3, 50);
        v.email("email", &self.email);
        if self.password.chars().count() < 8 {
            v.fail("password", "must be at least 8 characters long");
        }
        v.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.email("email", &self.email);
        v.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if self.new_password.chars().count() < 8 {
            v.fail("new_password", "must be at least 8 characters long");
        }
        v.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub user_type: Option<UserType>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if let Some(username) = &self.username {
            v.length("username", username, 3, 50);
        }
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        v.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.user_type.is_none()
    }

    /// True when every provided field already equals the stored value.
    pub fn changes_nothing(&self, user: &User) -> bool {
        self.username.as_ref().map_or(true, |u| *u == user.username)
            && self.email.as_ref().map_or(true, |e| *e == user.email)
            && self.user_type.map_or(true, |t| t == user.user_type)
    }
}
