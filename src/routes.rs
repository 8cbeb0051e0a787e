// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{exam, progress};
use crate::state::AppState;

/// Assembles the main application router.
///
/// * Merges all sub-routers (exam, progress).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (engines, stores, catalog).
pub fn create_router(state: AppState) -> Router {
    let origins: [HeaderValue; 2] = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let exam_routes = Router::new()
        .route("/start", post(exam::start_exam))
        .route("/{user_id}", get(exam::exam_state))
        .route("/{user_id}/answer", post(exam::submit_answer))
        .route("/{user_id}/advance", post(exam::advance))
        .route("/{user_id}/jump", post(exam::jump))
        .route("/{user_id}/leave", post(exam::leave_exam))
        .route("/{user_id}/result", get(exam::exam_result));

    let progress_routes = Router::new().route("/{user_id}", get(progress::category_progress));

    Router::new()
        .nest("/api/exam", exam_routes)
        .nest("/api/progress", progress_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
