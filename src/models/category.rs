use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::transaction::TransactionType;
use crate::validation::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "category_type", rename_all = "lowercase")]
pub enum CategoryType {
    Incomes,
    Expenses,
}

impl CategoryType {
    /// `incomes` categories only take `income` transactions, and so on.
    pub fn accepts(self, kind: TransactionType) -> bool {
        matches!(
            (self, kind),
            (CategoryType::Incomes, TransactionType::Income)
                | (CategoryType::Expenses, TransactionType::Expense)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.length("name", &self.name, 3, 20);
        if let Some(description) = &self.description {
            v.length("description", description, 3, 200);
        }
        v.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateCategoryRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if self.name.is_none() && self.description.is_none() {
            v.fail("body", "No fields to update");
        }
        if let Some(name) = &self.name {
            v.length("name", name, 3, 20);
        }
        if let Some(description) = &self.description {
            v.length("description", description, 3, 200);
        }
        v.finish()
    }
}

/// Categories every new account starts with.
pub const DEFAULT_CATEGORIES: &[(&str, &str, CategoryType)] = &[
    ("Salary", "Main income from work", CategoryType::Incomes),
    ("Freelance", "Extra income from side projects", CategoryType::Incomes),
    ("Investments", "Returns on investments", CategoryType::Incomes),
    ("Gifts", "Gifts and money received", CategoryType::Incomes),
    ("Other", "Other sources of income", CategoryType::Incomes),
    ("Groceries", "Food and groceries", CategoryType::Expenses),
    ("Transport", "Transport and fuel", CategoryType::Expenses),
    ("Housing", "Rent and utilities", CategoryType::Expenses),
    ("Health", "Medical costs and medicine", CategoryType::Expenses),
    ("Entertainment", "Cinema, restaurants, hobbies", CategoryType::Expenses),
    ("Clothing", "Clothes and shoes", CategoryType::Expenses),
    ("Education", "Courses, books, studying", CategoryType::Expenses),
    ("Other", "Other expenses", CategoryType::Expenses),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_type_must_match_transaction_type() {
        assert!(CategoryType::Incomes.accepts(TransactionType::Income));
        assert!(CategoryType::Expenses.accepts(TransactionType::Expense));
        assert!(!CategoryType::Incomes.accepts(TransactionType::Expense));
        assert!(!CategoryType::Expenses.accepts(TransactionType::Income));
    }

    #[test]
    fn defaults_fit_schema_limits() {
        let incomes = DEFAULT_CATEGORIES
            .iter()
            .filter(|(_, _, t)| *t == CategoryType::Incomes)
            .count();
        assert_eq!(incomes, 5);
        assert_eq!(DEFAULT_CATEGORIES.len() - incomes, 8);

        for (name, description, category_type) in DEFAULT_CATEGORIES {
            let req = CreateCategoryRequest {
                name: name.to_string(),
                description: Some(description.to_string()),
                category_type: *category_type,
            };
            assert!(req.validate().is_ok(), "{name}");
        }
    }

    #[test]
    fn update_needs_at_least_one_field() {
        let req = UpdateCategoryRequest {
            name: None,
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn parses_type_field() {
        let req: CreateCategoryRequest =
            serde_json::from_str(r#"{"name":"Coffee","type":"expenses"}"#).unwrap();
        assert_eq!(req.category_type, CategoryType::Expenses);
        assert!(req.description.is_none());
    }
}
