use axum::extract::State;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::mail::{FeedbackDelivery, Mailer};
use crate::models::feedback::{FeedbackRequest, FeedbackStats};
use crate::response::ApiResponse;

pub async fn submit_feedback(
    State(db): State<Database>,
    State(mailer): State<Option<Mailer>>,
    ApiJson(payload): ApiJson<FeedbackRequest>,
) -> ApiResult<ApiResponse> {
    let feedback = payload.normalize()?;

    let submitted_at: DateTime<Utc> = sqlx::query_scalar(
        "INSERT INTO feedback (name, email, rating, feedback, category) \
         VALUES ($1, $2, $3, $4, $5) RETURNING submitted_at",
    )
    .bind(&feedback.name)
    .bind(&feedback.email)
    .bind(feedback.rating as i16)
    .bind(&feedback.feedback)
    .bind(&feedback.category)
    .fetch_one(&db)
    .await?;

    tracing::info!(rating = feedback.rating, category = %feedback.category, "feedback received");

    let delivery = match &mailer {
        Some(mailer) => mailer.send_feedback(&feedback, submitted_at).await,
        None => FeedbackDelivery::default(),
    };

    Ok(ApiResponse::ok("Feedback submitted successfully. Thank you!").with_data(json!({
        "submitted_at": submitted_at,
        "emails_sent": delivery.emails_sent,
        "confirmation_sent": delivery.confirmation_sent,
    })))
}

pub async fn feedback_stats(State(db): State<Database>, _auth: AuthUser) -> ApiResult<ApiResponse> {
    let groups: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT category, COUNT(*), SUM(rating)::BIGINT FROM feedback GROUP BY category ORDER BY category",
    )
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok("Feedback statistics").with_data(FeedbackStats::from_groups(&groups)))
}
