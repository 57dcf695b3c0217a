// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        course::Course,
        exam::{Exam, ExamDetail, ExamSummary},
        question::{PublicQuestion, Question},
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Lists all courses.
pub async fn list_courses(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
        "SELECT id, name, created_at FROM courses ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(courses))
}

/// Lists exam summaries with question counts. Question bodies are loaded
/// lazily by the detail endpoint.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT
            e.id, e.title, e.course_id, e.course_name,
            e.subject_name, e.topic, e.round,
            e.time_limit, e.pass_score,
            COUNT(q.id) AS question_count,
            e.created_at
        FROM exams e
        LEFT JOIN questions q ON q.exam_id = e.id
        GROUP BY e.id
        ORDER BY e.created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(exams))
}

/// Fetches one exam with its questions, answers withheld.
///
/// Also resolves the caller's active review exam: the id handed out by
/// `start_review` is served here with the same shape, so the exam-taking
/// client needs no special handling.
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(session) = state.review.get(claims.user_id()?, &id) {
        let detail = ExamDetail {
            id: session.exam_id,
            title: session.title,
            course_id: String::new(),
            course_name: "Review".to_string(),
            subject_name: None,
            topic: None,
            round: None,
            time_limit: session.time_limit,
            pass_score: session.pass_score,
            questions: session.questions.iter().map(PublicQuestion::from).collect(),
        };
        return Ok(Json(detail));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, title, course_id, course_name, subject_id, subject_name,
               topic, round, time_limit, pass_score, created_at
        FROM exams
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = load_catalog(&state.pool, &id).await?;

    let detail = ExamDetail {
        id: exam.id,
        title: exam.title,
        course_id: exam.course_id,
        course_name: exam.course_name,
        subject_name: exam.subject_name,
        topic: exam.topic,
        round: exam.round,
        time_limit: exam.time_limit,
        pass_score: exam.pass_score,
        questions: questions.iter().map(PublicQuestion::from).collect(),
    };

    Ok(Json(detail))
}

/// Loads the current question catalog of one exam, in insertion order.
pub async fn load_catalog(pool: &SqlitePool, exam_id: &str) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, category, content, options, answer,
               image_url, option_images, explanation, created_at
        FROM questions
        WHERE exam_id = ?
        ORDER BY rowid
        "#,
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions for exam {}: {:?}", exam_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(questions)
}
