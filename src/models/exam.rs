// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Default pass threshold on the normalized 0-100 scale.
pub const DEFAULT_PASS_SCORE: i64 = 60;

/// Represents the 'exams' table in the database.
///
/// Question bodies are loaded lazily: list queries count them, the detail
/// query joins them in.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub course_id: String,
    /// Denormalized at creation time; not refreshed when the course renames.
    pub course_name: String,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub topic: Option<String>,
    pub round: Option<String>,
    /// Minutes; 0 = unlimited.
    pub time_limit: i64,
    pub pass_score: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// List-endpoint row: exam metadata plus a question count, no bodies.
#[derive(Debug, Serialize, FromRow)]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub course_id: String,
    pub course_name: String,
    pub subject_name: Option<String>,
    pub topic: Option<String>,
    pub round: Option<String>,
    pub time_limit: i64,
    pub pass_score: i64,
    pub question_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Detail-endpoint payload: full metadata plus taker-safe question bodies.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    pub id: String,
    pub title: String,
    pub course_id: String,
    pub course_name: String,
    pub subject_name: Option<String>,
    pub topic: Option<String>,
    pub round: Option<String>,
    pub time_limit: i64,
    pub pass_score: i64,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub course_id: String,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub topic: Option<String>,
    pub round: Option<String>,
    /// Minutes; 0 = unlimited.
    #[serde(default)]
    pub time_limit: i64,
    pub pass_score: Option<i64>,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateExamRequest {
    pub title: Option<String>,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub topic: Option<String>,
    pub round: Option<String>,
    pub time_limit: Option<i64>,
    pub pass_score: Option<i64>,
}
