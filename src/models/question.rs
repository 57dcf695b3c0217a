// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A submitted or stored answer value.
///
/// Choice questions carry a zero-based option index, free-response questions
/// carry text. The underlying JSON column is loosely typed (a legacy bank may
/// hold the numeric string "2" where the index 2 is meant), so equality goes
/// through the coercing comparison in [`crate::scoring`], never through
/// `PartialEq` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Index(i64),
    Text(String),
}

impl AnswerValue {
    /// Numeric view: an index as-is, or text that parses as an integer
    /// after trimming.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            AnswerValue::Index(n) => Some(*n),
            AnswerValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Textual view, trimmed. Indexes render as their decimal form.
    pub fn as_text(&self) -> String {
        match self {
            AnswerValue::Index(n) => n.to_string(),
            AnswerValue::Text(s) => s.trim().to_string(),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// Owning exam. Moving a question between exams repoints this key.
    pub exam_id: String,

    /// Free-text grouping label used by analytics.
    pub category: String,

    /// The text content of the question.
    pub content: String,

    /// Ordered option strings; empty for free-response questions.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer: option index or free text.
    pub answer: Json<AnswerValue>,

    pub image_url: Option<String>,

    /// Per-option image URLs, parallel to `options`.
    pub option_images: Option<Json<Vec<String>>>,

    /// Explanation shown during wrong-answer review.
    pub explanation: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to an exam taker (excludes answer and explanation).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub exam_id: String,
    pub category: String,
    pub content: String,
    pub options: Json<Vec<String>>,
    pub image_url: Option<String>,
    pub option_images: Option<Json<Vec<String>>>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            exam_id: q.exam_id.clone(),
            category: q.category.clone(),
            content: q.content.clone(),
            options: q.options.clone(),
            image_url: q.image_url.clone(),
            option_images: q.option_images.clone(),
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub exam_id: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub category: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: AnswerValue,
    pub image_url: Option<String>,
    pub option_images: Option<Vec<String>>,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub category: Option<String>,
    pub content: Option<String>,
    pub options: Option<Vec<String>>,
    pub answer: Option<AnswerValue>,
    pub image_url: Option<String>,
    pub option_images: Option<Vec<String>>,
    pub explanation: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.len() > 1000 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
