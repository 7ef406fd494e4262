use axum::extract::State;
use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::auth::AuthUser;
use crate::calculators::{
    self, CreditInput, ForecastInput, PensionInput, SavingsInput, TaxFopInput,
};
use crate::database::Database;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::models::transaction::TransactionType;
use crate::response::ApiResponse;
use crate::routes::budgets::total_balance;

pub async fn savings(
    _auth: AuthUser,
    ApiJson(input): ApiJson<SavingsInput>,
) -> ApiResult<ApiResponse> {
    input.validate()?;
    Ok(ApiResponse::ok("Savings calculated successfully").with_data(calculators::savings(&input)))
}

pub async fn credit(
    _auth: AuthUser,
    ApiJson(input): ApiJson<CreditInput>,
) -> ApiResult<ApiResponse> {
    input.validate()?;
    Ok(ApiResponse::ok("Credit calculated successfully").with_data(calculators::credit(&input)))
}

pub async fn pension(
    _auth: AuthUser,
    ApiJson(input): ApiJson<PensionInput>,
) -> ApiResult<ApiResponse> {
    input.validate()?;
    Ok(ApiResponse::ok("Pension savings calculated successfully")
        .with_data(calculators::pension(&input)))
}

pub async fn tax_fop(
    _auth: AuthUser,
    ApiJson(input): ApiJson<TaxFopInput>,
) -> ApiResult<ApiResponse> {
    input.validate()?;
    Ok(ApiResponse::ok("FOP tax calculated successfully").with_data(calculators::tax_fop(&input)))
}

pub async fn balance_forecast(
    State(db): State<Database>,
    auth: AuthUser,
    ApiJson(input): ApiJson<ForecastInput>,
) -> ApiResult<ApiResponse> {
    input.validate()?;

    // Total per bulan kalender, hanya bulan yang punya transaksi
    let monthly: Vec<(TransactionType, Decimal)> = sqlx::query_as(
        "SELECT type, SUM(amount) FROM transactions WHERE user_id = $1 \
         GROUP BY date_trunc('month', created_at), type",
    )
    .bind(auth.id)
    .fetch_all(&db)
    .await?;

    let totals_of = |kind: TransactionType| -> Vec<f64> {
        monthly
            .iter()
            .filter(|(t, _)| *t == kind)
            .map(|(_, sum)| sum.to_f64().unwrap_or_default())
            .collect()
    };
    let incomes = totals_of(TransactionType::Income);
    let expenses = totals_of(TransactionType::Expense);

    let balance = total_balance(&db, auth.id).await?.to_f64().unwrap_or_default();

    let forecast = calculators::forecast(balance, &incomes, &expenses, input.forecast_months);

    Ok(ApiResponse::ok("Balance forecast calculated successfully").with_data(forecast))
}
