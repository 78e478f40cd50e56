// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Valid option labels, in display order.
pub const OPTION_LABELS: [&str; 4] = ["a", "b", "c", "d"];

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text shown to the student.
    pub prompt: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// One of 'a', 'b', 'c', 'd'. Never leaves the admin API.
    pub correct_option: String,
}

/// DTO for sending a question to a student (excludes the correct option).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
        }
    }
}

/// DTO for creating or replacing a question. All fields are required.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(max = 1000), custom(function = not_blank))]
    pub prompt: String,
    #[validate(length(max = 500), custom(function = not_blank))]
    pub option_a: String,
    #[validate(length(max = 500), custom(function = not_blank))]
    pub option_b: String,
    #[validate(length(max = 500), custom(function = not_blank))]
    pub option_c: String,
    #[validate(length(max = 500), custom(function = not_blank))]
    pub option_d: String,
    #[validate(custom(function = validate_option_label))]
    pub correct_option: String,
}

impl QuestionRequest {
    /// Correct option as stored: trimmed and lowercase.
    pub fn normalized_correct_option(&self) -> String {
        self.correct_option.trim().to_ascii_lowercase()
    }
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("required"));
    }
    Ok(())
}

fn validate_option_label(label: &str) -> Result<(), validator::ValidationError> {
    let label = label.trim().to_ascii_lowercase();
    if !OPTION_LABELS.contains(&label.as_str()) {
        let mut err = validator::ValidationError::new("invalid_option");
        err.message = Some("Correct answer must be a, b, c, or d".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(correct: &str) -> QuestionRequest {
        QuestionRequest {
            prompt: "What is the capital of France?".to_string(),
            option_a: "London".to_string(),
            option_b: "Berlin".to_string(),
            option_c: "Paris".to_string(),
            option_d: "Madrid".to_string(),
            correct_option: correct.to_string(),
        }
    }

    #[test]
    fn test_correct_option_is_case_insensitive() {
        let req = request("C");
        assert!(req.validate().is_ok());
        assert_eq!(req.normalized_correct_option(), "c");
    }

    #[test]
    fn test_rejects_unknown_label() {
        assert!(request("e").validate().is_err());
    }

    #[test]
    fn test_rejects_blank_option() {
        let mut req = request("a");
        req.option_b = "   ".to_string();
        assert!(req.validate().is_err());
    }
}
