use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::analytics::{self, Names, Period, Report, ReportQuery};
use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{invalid, ApiResult};
use crate::extract::ApiQuery;
use crate::models::transaction::Transaction;
use crate::response::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    #[serde(default)]
    pub period: Period,
    pub year: Option<i32>,
}

async fn load_names(db: &Database, user_id: Uuid) -> ApiResult<Names> {
    let categories: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM categories WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(db)
            .await?;
    let budgets: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM budgets WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(db)
            .await?;

    Ok(Names {
        categories: categories.into_iter().collect(),
        budgets: budgets.into_iter().collect(),
    })
}

pub async fn overview(
    State(db): State<Database>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<OverviewQuery>,
) -> ApiResult<ApiResponse> {
    let now = Utc::now().naive_utc();
    let year = query.year.unwrap_or_else(|| now.year());

    let bounds = NaiveDate::from_ymd_opt(year, 1, 1)
        .zip(year.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1)))
        .and_then(|(start, end)| start.and_hms_opt(0, 0, 0).zip(end.and_hms_opt(0, 0, 0)));
    let Some((start, end)) = bounds else {
        return Err(invalid("year", "is out of range"));
    };

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
    )
    .bind(auth.id)
    .bind(start)
    .bind(end)
    .fetch_all(&db)
    .await?;
    let names = load_names(&db, auth.id).await?;

    let overview = analytics::overview(&transactions, &names, query.period, year, now);

    Ok(ApiResponse::ok("Analytics retrieved successfully").with_data(overview))
}

async fn build(db: &Database, user_id: Uuid, query: &ReportQuery) -> ApiResult<Report> {
    let (from, to): (NaiveDateTime, NaiveDateTime) = query.range()?;

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE user_id = $1 AND created_at BETWEEN $2 AND $3 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;
    let names = load_names(db, user_id).await?;

    Ok(analytics::build_report(
        query.kind,
        query.period_label(),
        &transactions,
        &names,
    ))
}

pub async fn report(
    State(db): State<Database>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<ApiResponse> {
    let report = build(&db, auth.id, &query).await?;
    Ok(ApiResponse::ok("Report generated successfully").with_data(report))
}

pub async fn report_csv(
    State(db): State<Database>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Response> {
    let report = build(&db, auth.id, &query).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        analytics::csv_filename(query.kind, &query)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        analytics::to_csv(&report),
    )
        .into_response())
}
