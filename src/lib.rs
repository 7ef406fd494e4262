//! Personal finance backend: accounts, categories, budgets, transactions,
//! calculators, analytics and feedback behind a cookie-session JSON API.

pub mod analytics;
pub mod auth;
pub mod calculators;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod mail;
pub mod models;
pub mod response;
pub mod routes;
pub mod validation;

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::auth::JwtManager;
use crate::config::Config;
use crate::database::Database;
use crate::mail::Mailer;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: Arc<Config>,
    pub mailer: Option<Mailer>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expires_secs, config.cookie_secure);
        let mailer = config.mail.as_ref().and_then(|mail| match Mailer::new(mail) {
            Ok(mailer) => Some(mailer),
            Err(err) => {
                tracing::warn!(error = %err, "SMTP settings are invalid, feedback e-mail disabled");
                None
            }
        });
        Self {
            db,
            jwt,
            config: Arc::new(config),
            mailer,
        }
    }
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(%frontend_url, "FRONTEND_URL is not a valid origin, CORS disabled");
            cors
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let router = Router::new().nest("/api", routes::api_router());

    // Frontend statis (kalau ada) melayani semua path di luar /api
    let router = match &state.config.static_dir {
        Some(dir) => {
            let index = Path::new(dir).join("index.html");
            router.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)))
        }
        None => router.fallback(routes::api_not_found),
    };

    router
        .layer(cors_layer(&state.config.frontend_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
