use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;

/// Upper bound for any budget amount.
pub const MAX_BUDGET_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// A named pot of money ("savings" in the web client).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Budget {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub initial: Decimal,
    pub current: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Decimal>,
    pub created_at: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<NaiveDate>,
}

/// Body of both create and update; an update replaces every field.
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub name: String,
    pub initial: Decimal,
    pub current: Option<Decimal>,
    pub goal: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub created_at: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub end_at: Option<NaiveDate>,
}

/// Request after defaults are filled in and every rule has passed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBudget {
    pub name: String,
    pub initial: Decimal,
    pub current: Decimal,
    pub goal: Option<Decimal>,
    pub created_at: NaiveDate,
    pub end_at: Option<NaiveDate>,
}

impl BudgetRequest {
    pub fn validate(self, today: NaiveDate) -> ApiResult<ValidBudget> {
        let current = self.current.unwrap_or(self.initial);
        let created_at = self.created_at.unwrap_or(today);

        let mut v = Validator::new();
        v.length("name", &self.name, 3, 30);
        v.decimal_range("initial", self.initial, Decimal::ZERO, MAX_BUDGET_AMOUNT);
        v.decimal_range("current", current, Decimal::ZERO, MAX_BUDGET_AMOUNT);
        if let Some(goal) = self.goal {
            v.decimal_range("goal", goal, Decimal::ZERO, MAX_BUDGET_AMOUNT);
            if goal < current {
                v.fail("goal", "Goal amount must be greater than or equal to current amount");
            }
        }
        if self.goal.is_some() != self.end_at.is_some() {
            v.fail("end_at", "Both 'goal' and 'end_at' must be provided together");
        }
        if let Some(end_at) = self.end_at {
            if end_at < created_at {
                v.fail("end_at", "End date must be greater than or equal to creation date");
            }
            if end_at < today {
                v.fail("end_at", "End date must be in the future or today");
            }
        }
        v.finish()?;

        Ok(ValidBudget {
            name: self.name,
            initial: self.initial,
            current,
            goal: self.goal,
            created_at,
            end_at: self.end_at,
        })
    }
}

/// How much has to be put aside per day to reach the goal on time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetPlan {
    pub daily_plan: Decimal,
    pub days_remaining: i64,
    pub end_at: NaiveDate,
    pub goal: Decimal,
    pub current: Decimal,
}

impl BudgetPlan {
    pub fn compute(budget: &Budget, today: NaiveDate) -> ApiResult<Self> {
        let (goal, end_at) = match (budget.goal, budget.end_at) {
            (Some(goal), Some(end_at)) => (goal, end_at),
            _ => {
                return Err(ApiError::BadRequest(
                    "Budget has no goal or end date".to_string(),
                ))
            }
        };

        if today > end_at {
            return Err(ApiError::BadRequest(
                "Budget end date has already passed".to_string(),
            ));
        }

        let days_remaining = (end_at - today).num_days();
        if days_remaining <= 0 {
            return Err(ApiError::BadRequest(
                "No days left until the budget end date".to_string(),
            ));
        }

        let daily_plan = (goal - budget.current) / Decimal::from(days_remaining);
        if daily_plan.is_sign_negative() && !daily_plan.is_zero() {
            return Err(ApiError::BadRequest(
                "Budget already exceeds its goal, no plan needed".to_string(),
            ));
        }

        Ok(Self {
            daily_plan: daily_plan.round_dp(2),
            days_remaining,
            end_at,
            goal,
            current: budget.current,
        })
    }
}

/// Accepts `2025-06-01` as well as a full ISO timestamp such as `2025-06-01T10:00:00`.
fn flexible_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => {
            let date_part = s.get(..10).unwrap_or(&s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
