// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use std::collections::HashMap;

use crate::models::question::AnswerValue;

/// Represents the 'attempts' table in the database.
///
/// Rows are append-only: a retake inserts a new row, nothing ever updates
/// one. Wrong-answer derivation replays these rows against the current
/// question catalog, which is why the raw `answers` payload is persisted
/// alongside the score.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub user_id: i64,
    pub exam_id: String,
    /// Question id -> submitted value, as the taker sent it.
    pub answers: Json<HashMap<String, AnswerValue>>,
    /// Normalized to 0-100 at submission time.
    pub score: i64,
    pub total_questions: i64,
    pub passed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Attempt-history row joined with exam metadata. The exam may have been
/// deleted since; the joined fields are then absent and the client shows
/// "Unknown".
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptHistoryEntry {
    pub id: String,
    pub exam_id: String,
    pub exam_title: Option<String>,
    pub course_name: Option<String>,
    pub score: i64,
    pub total_questions: i64,
    pub passed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting answers to an exam (or an active review exam).
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub exam_id: String,

    /// Question id -> chosen value (option index or free text).
    pub answers: HashMap<String, AnswerValue>,
}
