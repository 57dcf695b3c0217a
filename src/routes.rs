// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, auth, exam, review},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, courses, exams, attempts, review, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Review Store).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let course_routes = Router::new()
        .route("/", get(exam::list_courses))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Exam detail also resolves review-exam ids for the caller
    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let attempt_routes = Router::new()
        .route("/", post(attempt::submit_attempt).get(attempt::list_attempts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let review_routes = Router::new()
        .route("/wrong-problems", get(review::list_wrong_problems))
        .route(
            "/wrong-problems/{id}/mastered",
            post(review::mark_mastered),
        )
        .route("/start", post(review::start_review))
        .route("/summary", get(review::review_summary))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/courses", post(admin::create_course))
        .route("/exams", post(admin::create_exam))
        .route(
            "/exams/{id}",
            put(admin::update_exam).delete(admin::delete_exam),
        )
        .route("/exams/{id}/copy", post(admin::copy_exam))
        .route("/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            delete(admin::delete_question).put(admin::update_question),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/review", review_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
