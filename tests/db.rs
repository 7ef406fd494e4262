//! Request tests against PostgreSQL. `sqlx::test` hands every test a fresh,
//! migrated database, so `DATABASE_URL` has to point at a server.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tower::ServiceExt;

mod common;

use common::config;
use finance_be::{create_app, AppState};

struct Reply {
    status: StatusCode,
    body: Value,
    set_cookie: Option<String>,
}

fn app(pool: PgPool) -> Router {
    create_app(AppState::new(pool, config()))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: &str,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookie.is_empty() {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        set_cookie,
    }
}

/// Registers a user and returns the `name=value` part of its session cookie.
async fn register(app: &Router, username: &str) -> String {
    let reply = call(
        app,
        Method::POST,
        "/api/auth/register",
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct-horse"
        })),
        "",
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    let set_cookie = reply.set_cookie.unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn category_id(app: &Router, cookie: &str, name: &str) -> i64 {
    let reply = call(app, Method::GET, "/api/categories", None, cookie).await;
    reply.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == name)
        .and_then(|c| c["id"].as_i64())
        .unwrap()
}

async fn create_budget(app: &Router, cookie: &str, body: Value) -> i64 {
    let reply = call(app, Method::POST, "/api/budgets", Some(body), cookie).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["data"]["id"].as_i64().unwrap()
}

async fn budget_current(app: &Router, cookie: &str, id: i64) -> Value {
    let reply = call(app, Method::GET, &format!("/api/budgets/{id}"), None, cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.body["data"]["current"].clone()
}

#[sqlx::test(migrations = "./migrations")]
async fn register_creates_default_categories(pool: PgPool) {
    let app = app(pool.clone());
    let cookie = register(&app, "olena").await;

    let reply = call(&app, Method::GET, "/api/categories", None, &cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
    let categories = reply.body["data"].as_array().unwrap();
    assert_eq!(categories.len(), 13);
    let incomes = categories.iter().filter(|c| c["type"] == "incomes").count();
    assert_eq!(incomes, 5);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn transactions_keep_budget_in_step(pool: PgPool) {
    let app = app(pool);
    let cookie = register(&app, "olena").await;
    let groceries = category_id(&app, &cookie, "Groceries").await;
    let salary = category_id(&app, &cookie, "Salary").await;
    let budget = create_budget(&app, &cookie, json!({"name": "Wallet", "initial": 100})).await;

    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({
            "amount": 12.35,
            "type": "expense",
            "category_id": groceries,
            "budget_id": budget,
            "description": "Market"
        })),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let id = reply.body["data"]["id"].as_i64().unwrap();
    assert_eq!(budget_current(&app, &cookie, budget).await, 87.65);

    // expense 12.35 becomes income 10
    let reply = call(
        &app,
        Method::PUT,
        &format!("/api/transactions/{id}"),
        Some(json!({"amount": 10, "type": "income", "category_id": salary})),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(budget_current(&app, &cookie, budget).await, 110.0);

    let reply = call(&app, Method::DELETE, &format!("/api/transactions/{id}"), None, &cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(budget_current(&app, &cookie, budget).await, 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn sub_cent_amount_leaves_budget_untouched(pool: PgPool) {
    let app = app(pool);
    let cookie = register(&app, "olena").await;
    let groceries = category_id(&app, &cookie, "Groceries").await;
    let budget = create_budget(&app, &cookie, json!({"name": "Wallet", "initial": 100})).await;

    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({
            "amount": 12.345,
            "type": "expense",
            "category_id": groceries,
            "budget_id": budget
        })),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["details"][0]["field"], "amount");
    assert_eq!(budget_current(&app, &cookie, budget).await, 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn overdraft_and_wrong_category_are_rejected(pool: PgPool) {
    let app = app(pool.clone());
    let cookie = register(&app, "olena").await;
    let groceries = category_id(&app, &cookie, "Groceries").await;
    let budget = create_budget(&app, &cookie, json!({"name": "Wallet", "initial": 100})).await;

    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({"amount": 150, "type": "expense", "category_id": groceries, "budget_id": budget})),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Insufficient funds in the budget");

    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({"amount": 20, "type": "income", "category_id": groceries, "budget_id": budget})),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Category type does not match transaction type");

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
    assert_eq!(budget_current(&app, &cookie, budget).await, 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn other_users_data_is_not_found(pool: PgPool) {
    let app = app(pool);
    let owner = register(&app, "olena").await;
    let stranger = register(&app, "taras").await;

    let groceries = category_id(&app, &owner, "Groceries").await;
    let budget = create_budget(&app, &owner, json!({"name": "Wallet", "initial": 100})).await;
    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({"amount": 5, "type": "expense", "category_id": groceries, "budget_id": budget})),
        &owner,
    )
    .await;
    let transaction = reply.body["data"]["id"].as_i64().unwrap();

    for uri in [
        format!("/api/categories/{groceries}"),
        format!("/api/budgets/{budget}"),
        format!("/api/budgets/{budget}/plan"),
        format!("/api/transactions/{transaction}"),
        format!("/api/transactions/incomes/{budget}"),
    ] {
        let reply = call(&app, Method::GET, &uri, None, &stranger).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
    }

    let reply = call(
        &app,
        Method::DELETE,
        &format!("/api/transactions/{transaction}"),
        None,
        &stranger,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    // stranger's own category on the owner's transaction
    let own = category_id(&app, &stranger, "Groceries").await;
    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({"amount": 5, "type": "expense", "category_id": own, "budget_id": budget})),
        &stranger,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(budget_current(&app, &owner, budget).await, 95.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn category_in_use_is_kept(pool: PgPool) {
    let app = app(pool);
    let cookie = register(&app, "olena").await;
    let groceries = category_id(&app, &cookie, "Groceries").await;
    let health = category_id(&app, &cookie, "Health").await;
    let budget = create_budget(&app, &cookie, json!({"name": "Wallet", "initial": 100})).await;
    call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({"amount": 5, "type": "expense", "category_id": groceries, "budget_id": budget})),
        &cookie,
    )
    .await;

    let reply = call(&app, Method::DELETE, &format!("/api/categories/{groceries}"), None, &cookie).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Cannot delete category with existing transactions");

    let reply = call(&app, Method::DELETE, &format!("/api/categories/{health}"), None, &cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn plan_uses_stored_budget(pool: PgPool) {
    let app = app(pool);
    let cookie = register(&app, "olena").await;
    let end_at = Utc::now().date_naive() + chrono::Duration::days(30);
    let budget = create_budget(
        &app,
        &cookie,
        json!({"name": "Holiday", "initial": 100, "goal": 1000, "end_at": end_at.to_string()}),
    )
    .await;

    let reply = call(&app, Method::GET, &format!("/api/budgets/{budget}/plan"), None, &cookie).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["days_remaining"], 30);
    assert_eq!(reply.body["data"]["daily_plan"], 30.0);

    let reply = call(&app, Method::GET, "/api/budgets/balance", None, &cookie).await;
    assert_eq!(reply.body["data"]["total_balance"], 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_runs_on_one_connection(
    pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let pool = pool_options
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(2))
        .connect_with(connect_options)
        .await
        .unwrap();
    let app = app(pool);
    let cookie = register(&app, "olena").await;
    let groceries = category_id(&app, &cookie, "Groceries").await;
    let budget = create_budget(&app, &cookie, json!({"name": "Wallet", "initial": 100})).await;
    let reply = call(
        &app,
        Method::POST,
        "/api/transactions",
        Some(json!({"amount": 5, "type": "expense", "category_id": groceries, "budget_id": budget})),
        &cookie,
    )
    .await;
    let id = reply.body["data"]["id"].as_i64().unwrap();

    let reply = call(
        &app,
        Method::PUT,
        &format!("/api/transactions/{id}"),
        Some(json!({"amount": 7, "type": "expense", "category_id": groceries})),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(budget_current(&app, &cookie, budget).await, 93.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleted_user_session_ends(pool: PgPool) {
    let app = app(pool.clone());
    let cookie = register(&app, "olena").await;
    sqlx::query("DELETE FROM users").execute(&pool).await.unwrap();

    let reply = call(
        &app,
        Method::POST,
        "/api/categories",
        Some(json!({"name": "Books", "type": "expenses"})),
        &cookie,
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "User not found");
    assert!(reply.set_cookie.unwrap().contains("Max-Age=0"));
}

#[sqlx::test(migrations = "./migrations")]
async fn feedback_is_stored_without_mail(pool: PgPool) {
    let app = app(pool);
    let reply = call(
        &app,
        Method::POST,
        "/api/feedback",
        Some(json!({
            "name": "Olena",
            "email": "olena@example.com",
            "rating": 4,
            "feedback": "Charts are great",
            "category": "ui"
        })),
        "",
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["emails_sent"], false);
    assert_eq!(reply.body["data"]["confirmation_sent"], false);

    let cookie = register(&app, "olena").await;
    let reply = call(&app, Method::GET, "/api/feedback/stats", None, &cookie).await;
    assert_eq!(reply.body["data"]["total_feedback"], 1);
    assert_eq!(reply.body["data"]["categories"]["ui"], 1);
}
