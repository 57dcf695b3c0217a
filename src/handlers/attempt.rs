// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::types::Json as SqlJson;

use crate::{
    error::AppError,
    handlers::exam::load_catalog,
    models::{
        attempt::{AttemptHistoryEntry, SubmitAttemptRequest},
        exam::Exam,
    },
    scoring::{answers_match, score_exam},
    state::AppState,
    utils::jwt::Claims,
};

/// Submits answers for an exam.
///
/// Scores the submission against the current catalog and appends one
/// immutable attempt row; a retake appends another. When the target id is
/// the caller's active review exam, nothing is appended: correctly answered
/// questions have their wrong-problem ids marked mastered instead.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    if let Some(session) = state.review.finish(user_id, &req.exam_id) {
        let mut mastered = 0_i64;
        for question in &session.questions {
            let correct = req
                .answers
                .get(&question.id)
                .is_some_and(|submitted| answers_match(&question.answer, submitted));
            if !correct {
                continue;
            }
            if let Some(wp_ids) = session.wrong_problem_ids.get(&question.id) {
                // Clear every wrong problem this question originated,
                // across all attempts it was missed in.
                for wp_id in wp_ids {
                    state.review.mark_mastered(user_id, wp_id);
                }
                mastered += 1;
            }
        }

        let total = session.questions.len() as i64;
        tracing::info!(
            "Review reconciled for user {}: {}/{} mastered",
            user_id,
            mastered,
            total
        );
        return Ok(Json(json!({
            "review": true,
            "mastered": mastered,
            "remaining": total - mastered,
            "total_questions": total,
            "message": "Review reconciled"
        })));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, title, course_id, course_name, subject_id, subject_name,
               topic, round, time_limit, pass_score, created_at
        FROM exams
        WHERE id = ?
        "#,
    )
    .bind(&req.exam_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam for submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = load_catalog(&state.pool, &exam.id).await?;
    let outcome = score_exam(&questions, &req.answers, exam.pass_score);

    let attempt_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO attempts (id, user_id, exam_id, answers, score, total_questions, passed, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&attempt_id)
    .bind(user_id)
    .bind(&exam.id)
    .bind(SqlJson(&req.answers))
    .bind(outcome.normalized_score)
    .bind(questions.len() as i64)
    .bind(outcome.passed)
    .bind(chrono::Utc::now())
    .execute(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "score": outcome.normalized_score,
        "correct_count": outcome.raw_correct,
        "total_questions": questions.len(),
        "passed": outcome.passed,
        "message": "Exam submitted successfully"
    })))
}

/// Lists the caller's attempt history, most recent first.
///
/// Exams deleted since the attempt still show up; their joined title and
/// course are null and rendered as "Unknown" by the client.
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, AttemptHistoryEntry>(
        r#"
        SELECT
            a.id, a.exam_id,
            e.title AS exam_title,
            e.course_name AS course_name,
            a.score, a.total_questions, a.passed, a.created_at
        FROM attempts a
        LEFT JOIN exams e ON e.id = a.exam_id
        WHERE a.user_id = ?
        ORDER BY a.created_at DESC, a.id
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::OK, Json(attempts)))
}
