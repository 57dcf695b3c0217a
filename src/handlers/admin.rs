// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        course::{Course, CreateCourseRequest},
        exam::{CreateExamRequest, Exam, UpdateExamRequest},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
        user::User,
    },
    utils::{hash::hash_password, jwt::Claims},
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// DTO for Admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username length must be between 3 and 50 characters."))]
    pub username: String,
    #[validate(length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."))]
    pub password: String,
    pub role: String, // 'user' or 'admin'
}

/// Creates a new user with specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, password, role, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(&payload.role)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub username: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Perform updates sequentially if fields are present
    if let Some(new_username) = payload.username {
        sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(new_username)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(new_role) = payload.role {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(new_role)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(new_password) = payload.password {
        let hashed = hash_password(&new_password)?;
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(hashed)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Prevent self-deletion
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new course.
/// Admin only.
pub async fn create_course(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (id, name, created_at)
        VALUES (?, ?, ?)
        RETURNING id, name, created_at
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&payload.name)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Creates a new exam under a course. The course name is denormalized into
/// the exam row at creation time.
/// Admin only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course = sqlx::query_as::<_, Course>("SELECT id, name, created_at FROM courses WHERE id = ?")
        .bind(&payload.course_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams
        (id, title, course_id, course_name, subject_id, subject_name, topic, round, time_limit, pass_score, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, title, course_id, course_name, subject_id, subject_name,
                  topic, round, time_limit, pass_score, created_at
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&payload.title)
    .bind(&course.id)
    .bind(&course.name)
    .bind(&payload.subject_id)
    .bind(&payload.subject_name)
    .bind(&payload.topic)
    .bind(&payload.round)
    .bind(payload.time_limit)
    .bind(payload.pass_score.unwrap_or(crate::models::exam::DEFAULT_PASS_SCORE))
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Updates an exam's metadata.
/// Admin only.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.is_none()
        && payload.subject_id.is_none()
        && payload.subject_name.is_none()
        && payload.topic.is_none()
        && payload.round.is_none()
        && payload.time_limit.is_none()
        && payload.pass_score.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(subject_id) = payload.subject_id {
        separated.push("subject_id = ");
        separated.push_bind_unseparated(subject_id);
    }

    if let Some(subject_name) = payload.subject_name {
        separated.push("subject_name = ");
        separated.push_bind_unseparated(subject_name);
    }

    if let Some(topic) = payload.topic {
        separated.push("topic = ");
        separated.push_bind_unseparated(topic);
    }

    if let Some(round) = payload.round {
        separated.push("round = ");
        separated.push_bind_unseparated(round);
    }

    if let Some(time_limit) = payload.time_limit {
        separated.push("time_limit = ");
        separated.push_bind_unseparated(time_limit);
    }

    if let Some(pass_score) = payload.pass_score {
        separated.push("pass_score = ");
        separated.push_bind_unseparated(pass_score);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(&id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an exam and its questions. Historical attempts are left in place
/// pointing at the missing exam id.
/// Admin only.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    sqlx::query("DELETE FROM questions WHERE exam_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Duplicates an exam: same content, fresh exam id, every question copied
/// under a fresh id so editing the copy never mutates the original.
/// Admin only.
pub async fn copy_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, title, course_id, course_name, subject_id, subject_name,
               topic, round, time_limit, pass_score, created_at
        FROM exams
        WHERE id = ?
        "#,
    )
    .bind(&id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, exam_id, category, content, options, answer,
               image_url, option_images, explanation, created_at
        FROM questions
        WHERE exam_id = ?
        ORDER BY rowid
        "#,
    )
    .bind(&id)
    .fetch_all(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let new_exam_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO exams
        (id, title, course_id, course_name, subject_id, subject_name, topic, round, time_limit, pass_score, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new_exam_id)
    .bind(&exam.title)
    .bind(&exam.course_id)
    .bind(&exam.course_name)
    .bind(&exam.subject_id)
    .bind(&exam.subject_name)
    .bind(&exam.topic)
    .bind(&exam.round)
    .bind(exam.time_limit)
    .bind(exam.pass_score)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to copy exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    for question in &questions {
        sqlx::query(
            r#"
            INSERT INTO questions
            (id, exam_id, category, content, options, answer, image_url, option_images, explanation, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&new_exam_id)
        .bind(&question.category)
        .bind(&question.content)
        .bind(&question.options)
        .bind(&question.answer)
        .bind(&question.image_url)
        .bind(&question.option_images)
        .bind(&question.explanation)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to copy question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": new_exam_id,
            "question_count": questions.len()
        })),
    ))
}

/// Creates a new question in an exam's catalog.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query_scalar::<_, String>("SELECT id FROM exams WHERE id = ?")
        .bind(&payload.exam_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO questions
        (id, exam_id, category, content, options, answer, image_url, option_images, explanation, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&payload.exam_id)
    .bind(&payload.category)
    .bind(&payload.content)
    .bind(SqlJson(&payload.options))
    .bind(SqlJson(&payload.answer))
    .bind(&payload.image_url)
    .bind(payload.option_images.as_ref().map(SqlJson))
    .bind(&payload.explanation)
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a question. Historical attempts are replayed against the edited
/// definition, so changing the answer key retroactively changes wrong-answer
/// derivation.
/// Admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.category.is_none()
        && payload.content.is_none()
        && payload.options.is_none()
        && payload.answer.is_none()
        && payload.image_url.is_none()
        && payload.option_images.is_none()
        && payload.explanation.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category);
    }

    if let Some(content) = payload.content {
        separated.push("content = ");
        separated.push_bind_unseparated(content);
    }

    if let Some(options) = payload.options {
        separated.push("options = ");
        separated.push_bind_unseparated(serde_json::to_string(&options)?);
    }

    if let Some(answer) = payload.answer {
        separated.push("answer = ");
        separated.push_bind_unseparated(serde_json::to_string(&answer)?);
    }

    if let Some(image_url) = payload.image_url {
        separated.push("image_url = ");
        separated.push_bind_unseparated(image_url);
    }

    if let Some(option_images) = payload.option_images {
        separated.push("option_images = ");
        separated.push_bind_unseparated(serde_json::to_string(&option_images)?);
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(explanation);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(&id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question. Attempts that referenced it keep their answer
/// payload; derivation just stops emitting entries for it.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(&id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
