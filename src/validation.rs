//! Input validation helpers shared by the request types.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{ApiError, FieldError};

/// Collects every field problem of one request before rejecting it.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Character count (not bytes) must fall within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.fail(
                field,
                format!("must be between {min} and {max} characters long"),
            );
        }
    }

    pub fn not_blank(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.fail(field, "is required");
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if let Err(message) = validate_email(value) {
            self.fail(field, message);
        }
    }

    /// Money amount: within `min..=max` and with at most two decimal places,
    /// the precision of the `NUMERIC(12,2)` columns.
    pub fn decimal_range(&mut self, field: &str, value: Decimal, min: Decimal, max: Decimal) {
        if value < min || value > max {
            self.fail(field, format!("must be between {min} and {max}"));
        } else if value.normalize().scale() > 2 {
            self.fail(field, "must have at most 2 decimal places");
        }
    }

    pub fn float_range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.fail(field, format!("must be between {min} and {max}"));
        }
    }

    pub fn at_least(&mut self, field: &str, value: f64, min: f64) {
        if !value.is_finite() || value < min {
            self.fail(field, format!("must be greater than or equal to {min}"));
        }
    }

    pub fn int_range(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.fail(field, format!("must be between {min} and {max}"));
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("is required".to_string());
    }

    if email.chars().count() > 100 {
        return Err("must be at most 100 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("is not a valid email address".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(validate_email("olena@example.com").is_ok());
        assert!(validate_email("olena.example.com").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(95))).is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut v = Validator::new();
        // 3 huruf Kiril = 6 byte
        v.length("name", "Їжа", 3, 20);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.length("name", "ab", 3, 20);
        assert!(v.finish().is_err());
    }

    #[test]
    fn money_allows_two_decimal_places() {
        let max = Decimal::from(1_000);

        let mut v = Validator::new();
        v.decimal_range("amount", Decimal::new(1235, 2), Decimal::ZERO, max);
        // 12.500 is still 12.5
        v.decimal_range("amount", Decimal::new(12500, 3), Decimal::ZERO, max);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.decimal_range("amount", Decimal::new(12345, 3), Decimal::ZERO, max);
        match v.finish() {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors[0].message, "must have at most 2 decimal places")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn collects_all_failures() {
        let mut v = Validator::new();
        v.not_blank("name", "  ");
        v.int_range("rating", 9, 1, 5);
        v.float_range("rate", f64::NAN, 0.0, 100.0);

        match v.finish() {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "rating", "rate"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
