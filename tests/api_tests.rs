// tests/api_tests.rs

use cbt_backend::{config::Config, review::ReviewStore, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

struct TestApp {
    address: String,
    pool: SqlitePool,
}

/// Helper function to spawn the app on a random port for testing.
/// Uses an isolated in-memory SQLite database per test.
async fn spawn_app() -> TestApp {
    // A single connection keeps the in-memory database alive and shared
    // between the server and the test's own seeding queries.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        review: ReviewStore::new(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

/// Registers a fresh user and returns their bearer token.
async fn register_and_login(app: &TestApp, client: &reqwest::Client) -> String {
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");

    let login_resp = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login_resp["token"].as_str().expect("Token not found").to_string()
}

/// Registers a user, promotes them to admin directly in the database, and
/// logs in again so the token carries the admin role.
async fn admin_token(app: &TestApp, client: &reqwest::Client) -> String {
    let unique_name = format!("a_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");

    sqlx::query("UPDATE users SET role = 'admin' WHERE username = ?")
        .bind(&unique_name)
        .execute(&app.pool)
        .await
        .expect("Failed to promote user");

    let login_resp = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login_resp["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    // Act
    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");

    // Act
    let response = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "not_the_password"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_token() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act & Assert: every student surface rejects anonymous calls
    for path in [
        "/api/attempts",
        "/api/courses",
        "/api/exams",
        "/api/exams/e1",
        "/api/review/wrong-problems",
    ] {
        let response = client
            .get(format!("{}{}", app.address, path))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 401, "{path} was not protected");
    }
}

#[tokio::test]
async fn tokens_with_non_numeric_subject_are_rejected() {
    // Arrange: a correctly signed token whose subject is not a user id.
    // This service never issues one, but it must not be attributed to
    // some fallback user if presented.
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
        + 600;
    let claims = cbt_backend::utils::jwt::Claims {
        sub: "not-a-number".to_string(),
        role: "user".to_string(),
        exp,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret("test_secret_for_integration_tests".as_bytes()),
    )
    .unwrap();

    // Act
    let response = client
        .get(format!("{}/api/attempts", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&app, &client).await;

    // Act
    let response = client
        .get(format!("{}/api/admin/users", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_can_manage_courses_exams_and_questions() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&app, &client).await;

    // 1. Create a course
    let course: serde_json::Value = client
        .post(format!("{}/api/admin/courses", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"name": "Information Processing"}))
        .send()
        .await
        .expect("Create course failed")
        .json()
        .await
        .unwrap();
    let course_id = course["id"].as_str().unwrap();

    // 2. Create an exam in that course
    let exam: serde_json::Value = client
        .post(format!("{}/api/admin/exams", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "2024 Round 1",
            "course_id": course_id,
            "topic": "databases",
            "time_limit": 30
        }))
        .send()
        .await
        .expect("Create exam failed")
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_str().unwrap();
    assert_eq!(exam["course_name"], "Information Processing");
    assert_eq!(exam["pass_score"], 60);

    // 3. Add a question
    let question: serde_json::Value = client
        .post(format!("{}/api/admin/questions", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "exam_id": exam_id,
            "category": "db",
            "content": "Pick the third option",
            "options": ["a", "b", "c", "d"],
            "answer": 2,
            "explanation": "It is the third one."
        }))
        .send()
        .await
        .expect("Create question failed")
        .json()
        .await
        .unwrap();
    let question_id = question["id"].as_str().unwrap();

    // 4. The exam list reports a count, not question bodies
    let exams: Vec<serde_json::Value> = client
        .get(format!("{}/api/exams", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("List exams failed")
        .json()
        .await
        .unwrap();
    let listed = exams.iter().find(|e| e["id"] == exam_id).unwrap();
    assert_eq!(listed["question_count"], 1);
    assert!(listed.get("questions").is_none());

    // 5. The exam detail withholds answers and explanations
    let detail: serde_json::Value = client
        .get(format!("{}/api/exams/{}", app.address, exam_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Exam detail failed")
        .json()
        .await
        .unwrap();
    let questions = detail["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert!(questions[0].get("answer").is_none());
    assert!(questions[0].get("explanation").is_none());

    // 6. Update then delete the question
    let update = client
        .put(format!("{}/api/admin/questions/{}", app.address, question_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"answer": 1}))
        .send()
        .await
        .expect("Update question failed");
    assert_eq!(update.status().as_u16(), 200);

    let delete = client
        .delete(format!("{}/api/admin/questions/{}", app.address, question_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Delete question failed");
    assert_eq!(delete.status().as_u16(), 204);
}

#[tokio::test]
async fn copying_an_exam_duplicates_questions_under_fresh_ids() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&app, &client).await;

    sqlx::query("INSERT INTO courses (id, name) VALUES ('c1', 'Course')")
        .execute(&app.pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO exams (id, title, course_id, course_name) VALUES ('e1', 'Original', 'c1', 'Course')",
    )
    .execute(&app.pool)
    .await
    .unwrap();
    for i in 0..2 {
        sqlx::query(
            "INSERT INTO questions (id, exam_id, content, options, answer) VALUES (?, 'e1', ?, '[\"a\",\"b\"]', '0')",
        )
        .bind(format!("q{i}"))
        .bind(format!("question {i}"))
        .execute(&app.pool)
        .await
        .unwrap();
    }

    // Act
    let copy: serde_json::Value = client
        .post(format!("{}/api/admin/exams/e1/copy", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Copy exam failed")
        .json()
        .await
        .unwrap();

    // Assert
    let new_exam_id = copy["id"].as_str().unwrap();
    assert_ne!(new_exam_id, "e1");
    assert_eq!(copy["question_count"], 2);

    let copied_ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM questions WHERE exam_id = ?")
            .bind(new_exam_id)
            .fetch_all(&app.pool)
            .await
            .unwrap();
    assert_eq!(copied_ids.len(), 2);
    assert!(!copied_ids.contains(&"q0".to_string()));
    assert!(!copied_ids.contains(&"q1".to_string()));

    // Editing the copy never mutates the original
    let original_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = 'e1'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(original_count, 2);
}
