//! Financial calculators: savings, credit, pension, FOP tax and balance forecast.
//!
//! Every function here is pure; the HTTP layer only validates input and,
//! for the forecast, loads the user's history.

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::validation::Validator;

/// Rounds half away from zero to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---- savings ----

#[derive(Debug, Deserialize)]
pub struct SavingsInput {
    pub initial_sum: f64,
    pub term_months: i64,
    pub annual_rate: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SavingsResult {
    pub final_amount: f64,
}

impl SavingsInput {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.at_least("initial_sum", self.initial_sum, 0.0);
        v.int_range("term_months", self.term_months, 1, 120);
        v.float_range("annual_rate", self.annual_rate, 0.0, 100.0);
        v.finish()
    }
}

/// Deposit compounded monthly at `annual_rate / 12`.
pub fn savings(input: &SavingsInput) -> SavingsResult {
    let monthly_rate = input.annual_rate / 100.0 / 12.0;
    let final_amount = input.initial_sum * (1.0 + monthly_rate).powi(input.term_months as i32);
    SavingsResult {
        final_amount: round2(final_amount),
    }
}

// ---- credit ----

#[derive(Debug, Deserialize)]
pub struct CreditInput {
    pub principal: f64,
    pub annual_rate: f64,
    pub term_months: i64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub month: i64,
    pub monthly_payment: f64,
    pub principal_payment: f64,
    pub interest_payment: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CreditResult {
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_overpayment: f64,
    pub payment_schedule: Vec<ScheduleRow>,
}

/// Longest schedule we are willing to build (100 years).
pub const MAX_CREDIT_TERM: i64 = 1200;

impl CreditInput {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.at_least("principal", self.principal, 1.0);
        v.float_range("annual_rate", self.annual_rate, 0.0, 100.0);
        v.int_range("term_months", self.term_months, 1, MAX_CREDIT_TERM);
        v.finish()
    }
}

/// Annuity loan: fixed monthly payment and its amortization schedule.
pub fn credit(input: &CreditInput) -> CreditResult {
    let principal = input.principal;
    let n = input.term_months;
    let i = input.annual_rate / 100.0 / 12.0;

    let monthly_payment = if i == 0.0 {
        principal / n as f64
    } else {
        let growth = (1.0 + i).powi(n as i32);
        principal * (i * growth) / (growth - 1.0)
    };
    let total_payment = monthly_payment * n as f64;

    let mut remaining = principal;
    let payment_schedule = (1..=n)
        .map(|month| {
            let interest = remaining * i;
            let principal_part = monthly_payment - interest;
            remaining -= principal_part;
            ScheduleRow {
                month,
                monthly_payment: round2(monthly_payment),
                principal_payment: round2(principal_part),
                interest_payment: round2(interest),
                remaining_balance: round2(remaining.max(0.0)),
            }
        })
        .collect();

    CreditResult {
        monthly_payment: round2(monthly_payment),
        total_payment: round2(total_payment),
        total_overpayment: round2(total_payment - principal),
        payment_schedule,
    }
}

// ---- pension ----

#[derive(Debug, Deserialize)]
pub struct PensionInput {
    #[serde(default)]
    pub initial_sum: f64,
    pub monthly_contribution: f64,
    pub annual_rate: f64,
    pub term_years: i64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PensionResult {
    pub final_amount: f64,
}

impl PensionInput {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.at_least("initial_sum", self.initial_sum, 0.0);
        v.at_least("monthly_contribution", self.monthly_contribution, 0.0);
        v.float_range("annual_rate", self.annual_rate, 0.0, 100.0);
        v.int_range("term_years", self.term_years, 1, 60);
        v.finish()
    }
}

/// Initial sum plus monthly contributions, compounded monthly.
pub fn pension(input: &PensionInput) -> PensionResult {
    let i = input.annual_rate / 100.0 / 12.0;
    let n = (input.term_years * 12) as i32;
    let growth = (1.0 + i).powi(n);

    let contributions = if i == 0.0 {
        input.monthly_contribution * n as f64
    } else {
        input.monthly_contribution * ((growth - 1.0) / i)
    };

    PensionResult {
        final_amount: round2(input.initial_sum * growth + contributions),
    }
}

// ---- FOP tax ----

#[derive(Debug, Deserialize)]
pub struct TaxFopInput {
    pub income: f64,
    pub tax_group: i64,
    pub unified_social_contribution: Option<f64>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct TaxFopResult {
    pub tax_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unified_social_contribution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tax: Option<f64>,
}

impl TaxFopInput {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.at_least("income", self.income, 0.0);
        if !matches!(self.tax_group, 3 | 5) {
            v.fail("tax_group", "must be 3 or 5");
        }
        if let Some(usc) = self.unified_social_contribution {
            v.at_least("unified_social_contribution", usc, 0.0);
        }
        v.finish()
    }
}

/// Flat single tax: the group number is the percentage of income.
pub fn tax_fop(input: &TaxFopInput) -> TaxFopResult {
    let tax = input.income * (input.tax_group as f64 / 100.0);
    TaxFopResult {
        tax_amount: round2(tax),
        unified_social_contribution: input.unified_social_contribution,
        total_tax: input.unified_social_contribution.map(|usc| round2(tax + usc)),
    }
}

// ---- balance forecast ----

#[derive(Debug, Deserialize)]
pub struct ForecastInput {
    pub forecast_months: i64,
}

impl ForecastInput {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.int_range("forecast_months", self.forecast_months, 1, 120);
        v.finish()
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ForecastResult {
    pub current_balance: f64,
    pub avg_monthly_income: f64,
    pub avg_monthly_expense: f64,
    pub monthly_surplus: f64,
    pub forecasted_balance: f64,
}

/// Averages over the given per-month totals; an empty history averages to zero.
pub fn average(monthly_totals: &[f64]) -> f64 {
    if monthly_totals.is_empty() {
        0.0
    } else {
        monthly_totals.iter().sum::<f64>() / monthly_totals.len() as f64
    }
}

/// Linear projection of the current balance by the average monthly surplus.
pub fn forecast(
    current_balance: f64,
    monthly_incomes: &[f64],
    monthly_expenses: &[f64],
    months: i64,
) -> ForecastResult {
    let avg_income = average(monthly_incomes);
    let avg_expense = average(monthly_expenses);
    let surplus = avg_income - avg_expense;

    ForecastResult {
        current_balance: round2(current_balance),
        avg_monthly_income: round2(avg_income),
        avg_monthly_expense: round2(avg_expense),
        monthly_surplus: round2(surplus),
        forecasted_balance: round2(current_balance + surplus * months as f64),
    }
}
