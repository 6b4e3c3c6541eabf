// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, quiz, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quizzes, final tests, sessions, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (attempt service + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let quiz_routes = Router::new()
        .route("/{id}", get(quiz::get_quiz))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/{id}/attempts", post(quiz::start_quiz))
                .route("/{id}/history", get(quiz::quiz_history))
                .layer(auth.clone()),
        );

    let final_test_routes = Router::new()
        .route("/{id}", get(quiz::get_final_test))
        .merge(
            Router::new()
                .route("/{id}/attempts", post(quiz::start_final_test))
                .route("/{id}/history", get(quiz::final_test_history))
                .layer(auth.clone()),
        );

    let session_routes = Router::new()
        .route("/{sid}", get(session::get_session).delete(session::abandon))
        .route("/{sid}/answers", put(session::record_answer))
        .route("/{sid}/navigate", post(session::navigate))
        .route("/{sid}/submit", post(session::submit))
        .layer(auth.clone());

    let admin_routes = Router::new()
        .route("/quizzes", post(admin::create_quiz))
        .route("/final-tests", post(admin::create_final_test))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth);

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/final-tests", final_test_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
