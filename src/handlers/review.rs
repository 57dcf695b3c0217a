// src/handlers/review.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::exam::load_catalog,
    models::attempt::Attempt,
    review::{ReviewStore, WrongProblem, derive_wrong_problems, synthesize_review},
    state::AppState,
    utils::jwt::Claims,
};

/// Replays the user's attempt history against the current catalogs and
/// returns the problems still missed, mastered marks already filtered out.
/// Recomputed fresh on every call; nothing is cached server-side.
async fn load_wrong_problems(
    pool: &SqlitePool,
    review: &ReviewStore,
    user_id: i64,
) -> Result<Vec<WrongProblem>, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, user_id, exam_id, answers, score, total_questions, passed, created_at
        FROM attempts
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch attempts for user {}: {:?}", user_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut catalogs: HashMap<String, Vec<_>> = HashMap::new();
    for attempt in &attempts {
        if catalogs.contains_key(&attempt.exam_id) {
            continue;
        }
        let questions = load_catalog(pool, &attempt.exam_id).await?;
        catalogs.insert(attempt.exam_id.clone(), questions);
    }

    let ignored = review.ignored_for(user_id);
    Ok(derive_wrong_problems(&attempts, &catalogs, &ignored))
}

/// Lists the caller's current wrong problems.
pub async fn list_wrong_problems(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let wrong = load_wrong_problems(&state.pool, &state.review, claims.user_id()?).await?;
    Ok(Json(wrong))
}

/// Marks one wrong problem as mastered. Idempotent, fire-and-forget: the
/// underlying attempt row is untouched, the problem is only excluded from
/// future derivations.
pub async fn mark_mastered(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.review.mark_mastered(claims.user_id()?, &id);
    Ok(StatusCode::NO_CONTENT)
}

/// DTO for starting a review exam. An empty id list means "all current
/// wrong problems".
#[derive(Debug, Deserialize)]
pub struct StartReviewRequest {
    #[serde(default)]
    pub wrong_problem_ids: Vec<String>,
}

/// Synthesizes an ephemeral review exam from the caller's wrong problems
/// and installs it as their active session, replacing any previous one.
/// The returned id is served by the regular exam-detail and submit paths.
pub async fn start_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut wrong = load_wrong_problems(&state.pool, &state.review, user_id).await?;

    if !req.wrong_problem_ids.is_empty() {
        wrong.retain(|wp| req.wrong_problem_ids.contains(&wp.id));
    }

    if wrong.is_empty() {
        return Err(AppError::BadRequest(
            "No wrong problems to review".to_string(),
        ));
    }

    let session = synthesize_review(user_id, wrong);
    let response = json!({
        "exam_id": session.exam_id,
        "title": session.title,
        "question_count": session.questions.len(),
        "time_limit": session.time_limit,
        "pass_score": session.pass_score,
    });
    state.review.start(session);

    Ok((StatusCode::CREATED, Json(response)))
}

/// One row of the per-category wrong-problem breakdown.
#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub count: i64,
}

/// Per-category counts of the caller's current wrong problems, for the
/// analytics view.
pub async fn review_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let wrong = load_wrong_problems(&state.pool, &state.review, claims.user_id()?).await?;

    let mut counts: HashMap<String, i64> = HashMap::new();
    for wp in &wrong {
        *counts.entry(wp.question.category.clone()).or_default() += 1;
    }

    let mut summary: Vec<CategorySummary> = counts
        .into_iter()
        .map(|(category, count)| CategorySummary { category, count })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));

    Ok(Json(summary))
}
