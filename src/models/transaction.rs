use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::budget::MAX_BUDGET_AMOUNT;
use crate::validation::Validator;

pub const MAX_TRANSACTION_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Signed change this transaction makes to its budget's running total.
    pub fn effect(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Income => amount,
            TransactionType::Expense => -amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: Uuid,
    pub category_id: i64,
    pub budget_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// Body for create and update. `budget_id` is only read on create.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category_id: Option<i64>,
    pub budget_id: Option<i64>,
}

impl TransactionRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.decimal_range("amount", self.amount, Decimal::ZERO, MAX_TRANSACTION_AMOUNT);
        if let Some(description) = &self.description {
            v.length("description", description, 3, 200);
        }
        v.finish()
    }

    pub fn validate_for_create(&self) -> ApiResult<(i64, i64)> {
        let mut v = Validator::new();
        if self.category_id.is_none() {
            v.fail("category_id", "is required");
        }
        if self.budget_id.is_none() {
            v.fail("budget_id", "is required");
        }
        v.finish()?;
        self.validate()?;
        Ok((self.category_id.unwrap_or_default(), self.budget_id.unwrap_or_default()))
    }
}

/// New running total of a budget after undoing `old` and applying `new`.
///
/// The total has to stay within `0..=MAX_BUDGET_AMOUNT`, the same bounds the
/// budgets table enforces.
pub fn rebalance(
    current: Decimal,
    old: Option<(TransactionType, Decimal)>,
    new: Option<(TransactionType, Decimal)>,
) -> ApiResult<Decimal> {
    let mut total = current;
    if let Some((kind, amount)) = old {
        total -= kind.effect(amount);
    }
    if let Some((kind, amount)) = new {
        total += kind.effect(amount);
    }

    if total.is_sign_negative() && !total.is_zero() {
        return Err(ApiError::BadRequest(
            "Insufficient funds in the budget".to_string(),
        ));
    }
    if total > MAX_BUDGET_AMOUNT {
        return Err(ApiError::BadRequest(
            "Budget amount would exceed the allowed maximum".to_string(),
        ));
    }
    Ok(total)
}

/// Income/expense listing for one budget, with its total.
#[derive(Debug)]
pub struct TypedTransactions {
    pub kind: TransactionType,
    pub total: Decimal,
    pub transactions: Vec<Transaction>,
}

impl TypedTransactions {
    pub fn new(kind: TransactionType, transactions: Vec<Transaction>) -> Self {
        let total = transactions
            .iter()
            .filter(|t| t.transaction_type == kind)
            .map(|t| t.amount)
            .sum();
        Self {
            kind,
            total,
            transactions,
        }
    }

    /// `{"total_income": ..}` or `{"total_expense": ..}` plus the list.
    pub fn into_json(self) -> serde_json::Value {
        let key = match self.kind {
            TransactionType::Income => "total_income",
            TransactionType::Expense => "total_expense",
        };
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), serde_json::json!(self.total));
        body.insert("transactions".to_string(), serde_json::json!(self.transactions));
        serde_json::Value::Object(body)
    }
}

/// Accepts RFC 3339, naive ISO timestamps and bare dates.
fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_datetime(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid datetime: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn income_adds_expense_subtracts() {
        assert_eq!(
            rebalance(dec(100), None, Some((TransactionType::Income, dec(50)))).unwrap(),
            dec(150)
        );
        assert_eq!(
            rebalance(dec(100), None, Some((TransactionType::Expense, dec(30)))).unwrap(),
            dec(70)
        );
    }

    #[test]
    fn update_reverts_old_effect_first() {
        // was an expense of 40 (balance 60), now an income of 10
        let total = rebalance(
            dec(60),
            Some((TransactionType::Expense, dec(40))),
            Some((TransactionType::Income, dec(10))),
        )
        .unwrap();
        assert_eq!(total, dec(110));
    }

    #[test]
    fn delete_only_reverts() {
        let total = rebalance(dec(150), Some((TransactionType::Income, dec(50))), None).unwrap();
        assert_eq!(total, dec(100));
    }

    #[test]
    fn balance_cannot_go_negative() {
        let err = rebalance(dec(20), None, Some((TransactionType::Expense, dec(21)))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(
            rebalance(dec(20), None, Some((TransactionType::Expense, dec(20)))).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn create_requires_category_and_budget() {
        let req: TransactionRequest =
            serde_json::from_str(r#"{"amount":12.5,"type":"expense","category_id":3}"#).unwrap();
        assert!(req.validate_for_create().is_err());

        let req: TransactionRequest = serde_json::from_str(
            r#"{"amount":12.5,"type":"expense","category_id":3,"budget_id":9,"description":"Lunch"}"#,
        )
        .unwrap();
        assert_eq!(req.validate_for_create().unwrap(), (3, 9));
    }

    #[test]
    fn amount_and_description_limits() {
        let req: TransactionRequest =
            serde_json::from_str(r#"{"amount":1000001,"type":"income","description":"ok"}"#)
                .unwrap();
        match req.validate() {
            Err(ApiError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn amount_keeps_cent_precision() {
        let req: TransactionRequest =
            serde_json::from_str(r#"{"amount":12.345,"type":"expense"}"#).unwrap();
        match req.validate() {
            Err(ApiError::Validation(errors)) => assert_eq!(errors[0].field, "amount"),
            other => panic!("unexpected: {other:?}"),
        }

        let req: TransactionRequest =
            serde_json::from_str(r#"{"amount":12.35,"type":"expense"}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn typed_listing_totals_matching_kind() {
        let tx = |amount: i64| Transaction {
            id: amount,
            user_id: Uuid::nil(),
            category_id: 1,
            budget_id: 1,
            amount: dec(amount),
            description: None,
            created_at: parse_datetime("2025-06-01").unwrap(),
            transaction_type: TransactionType::Income,
        };
        let json = TypedTransactions::new(TransactionType::Income, vec![tx(10), tx(15)]).into_json();
        assert_eq!(json["total_income"], 25.0);
        assert_eq!(json["transactions"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn parses_client_timestamps() {
        assert!(parse_datetime("2025-06-01T10:15:00.123Z").is_ok());
        assert!(parse_datetime("2025-06-01T10:15:00").is_ok());
        assert!(parse_datetime("2025-06-01T10:15").is_ok());
        assert_eq!(
            parse_datetime("2025-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_datetime("yesterday").is_err());
    }
}
