// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::MAX_BODY_BYTES,
    handlers::{admin, attempt, auth, exams, health, student, subjects},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, admin portal, student portal).
/// * Protects the portals with auth + role middleware.
/// * Applies global middleware (Trace, CORS, body limit).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/students", get(admin::list_students))
        .route("/students/{id}", delete(admin::delete_student))
        .route(
            "/subjects",
            get(subjects::list_subjects).post(subjects::create_subject),
        )
        .route(
            "/subjects/{id}",
            put(subjects::update_subject).delete(subjects::delete_subject),
        )
        .route("/exams", get(exams::list_exams).post(exams::create_exam))
        .route(
            "/exams/{id}",
            get(exams::get_exam)
                .put(exams::update_exam)
                .delete(exams::delete_exam),
        )
        .route(
            "/exams/{id}/questions",
            get(exams::list_questions).post(exams::create_question),
        )
        .route("/exams/{id}/results", get(admin::list_exam_results))
        .route(
            "/questions/{id}",
            put(exams::update_question).delete(exams::delete_question),
        )
        .route("/results", get(admin::list_results))
        .route("/results/{id}", delete(admin::delete_result))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let student_routes = Router::new()
        .route("/dashboard", get(student::dashboard))
        .route("/exams", get(student::list_available_exams))
        .route("/exams/{id}/start", post(attempt::start_exam))
        .route("/exams/{id}/attempt", get(attempt::get_attempt))
        .route("/exams/{id}/answers", put(attempt::save_answer))
        .route("/exams/{id}/submit", post(attempt::submit_exam))
        .route("/results/{id}", get(student::get_result))
        .route("/history", get(student::history))
        .route("/profile", get(student::profile))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/student", student_routes)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
