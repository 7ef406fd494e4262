use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub name: String,
    pub email: String,
    pub rating: i64,
    pub feedback: String,
    pub category: String,
}

impl FeedbackRequest {
    /// Trims every string field, then checks it.
    pub fn normalize(self) -> ApiResult<Self> {
        let request = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            rating: self.rating,
            feedback: self.feedback.trim().to_string(),
            category: self.category.trim().to_string(),
        };

        let mut v = Validator::new();
        v.not_blank("name", &request.name);
        v.email("email", &request.email);
        v.int_range("rating", request.rating, 1, 5);
        v.not_blank("feedback", &request.feedback);
        v.not_blank("category", &request.category);
        v.finish()?;

        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub average_rating: f64,
    pub categories: BTreeMap<String, i64>,
}

impl FeedbackStats {
    /// Builds the stats from `(category, count, rating_sum)` groups.
    pub fn from_groups(groups: &[(String, i64, i64)]) -> Self {
        let total_feedback: i64 = groups.iter().map(|(_, count, _)| count).sum();
        let rating_sum: i64 = groups.iter().map(|(_, _, sum)| sum).sum();
        let average_rating = if total_feedback == 0 {
            0.0
        } else {
            ((rating_sum as f64 / total_feedback as f64) * 100.0).round() / 100.0
        };

        Self {
            total_feedback,
            average_rating,
            categories: groups
                .iter()
                .map(|(category, count, _)| (category.clone(), *count))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_before_validating() {
        let req: FeedbackRequest = serde_json::from_str(
            r#"{"name":"  Olena ","email":" olena@example.com ","rating":5,"feedback":" Great app ","category":"general"}"#,
        )
        .unwrap();
        let req = req.normalize().unwrap();
        assert_eq!(req.name, "Olena");
        assert_eq!(req.email, "olena@example.com");
        assert_eq!(req.feedback, "Great app");
    }

    #[test]
    fn rejects_blank_text_and_bad_rating() {
        let req = FeedbackRequest {
            name: "   ".into(),
            email: "olena@example.com".into(),
            rating: 6,
            feedback: "ok".into(),
            category: "bug".into(),
        };
        assert!(req.normalize().is_err());
    }

    #[test]
    fn stats_from_groups() {
        let stats = FeedbackStats::from_groups(&[
            ("bug".to_string(), 2, 5),
            ("general".to_string(), 1, 5),
        ]);
        assert_eq!(stats.total_feedback, 3);
        assert_eq!(stats.average_rating, 3.33);
        assert_eq!(stats.categories.get("bug"), Some(&2));

        let empty = FeedbackStats::from_groups(&[]);
        assert_eq!(empty.average_rating, 0.0);
        assert!(empty.categories.is_empty());
    }
}
