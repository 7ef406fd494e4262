pub mod analytics;
pub mod auth;
pub mod budgets;
pub mod calculators;
pub mod categories;
pub mod feedback;
pub mod transactions;
pub mod users;

use axum::{
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::AppState;

/// Every `/api` endpoint, relative to the `/api` prefix.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change_password", post(auth::change_password))
        // User
        .route("/users/me", get(users::get_me))
        .route("/users", put(users::update_me))
        .route("/users/", put(users::update_me))
        // Kategori
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Budget
        .route("/budgets", get(budgets::list_budgets).post(budgets::create_budget))
        .route("/budgets/", get(budgets::list_budgets).post(budgets::create_budget))
        .route("/budgets/balance", get(budgets::get_balance))
        .route(
            "/budgets/:id",
            get(budgets::get_budget)
                .put(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route("/budgets/:id/plan", get(budgets::get_plan))
        // Transaksi
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/transactions/incomes/:budget_id", get(transactions::list_incomes))
        .route("/transactions/expenses/:budget_id", get(transactions::list_expenses))
        .route("/transactions/category/:category_id", get(transactions::list_by_category))
        // Kalkulator
        .route("/calculators/savings", post(calculators::savings))
        .route("/calculators/credit", post(calculators::credit))
        .route("/calculators/pension", post(calculators::pension))
        .route("/calculators/tax-fop", post(calculators::tax_fop))
        .route("/calculators/balance-forecast", post(calculators::balance_forecast))
        // Analitik
        .route("/analytics/overview", get(analytics::overview))
        .route("/analytics/report", get(analytics::report))
        .route("/analytics/report.csv", get(analytics::report_csv))
        // Feedback
        .route("/feedback", post(feedback::submit_feedback))
        .route("/feedback/", post(feedback::submit_feedback))
        .route("/feedback/stats", get(feedback::feedback_stats))
        .route("/health", get(health))
        .fallback(api_not_found)
}

async fn health() -> ApiResponse {
    ApiResponse::ok("Service is healthy").with_data(json!({ "service": "finance_be" }))
}

pub async fn api_not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}
