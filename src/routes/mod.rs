//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API used by the chat UI and the admin
//! dashboard. The UI itself is an opaque static bundle; when `STATIC_DIR`
//! is set it is served as the fallback at `/`.

pub mod admin;
pub mod auth;
pub mod chat;

use std::path::PathBuf;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes shared by the chat view and the admin dashboard.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/sessions", get(chat::list_sessions).post(chat::create_session))
        .route("/api/sessions/{id}", get(chat::get_session))
        .route("/api/sessions/{id}/messages", post(chat::send_message))
        .route("/api/sessions/{id}/stream", post(chat::stream_message))
        .route("/api/sessions/{id}/messages/{index}/feedback", put(chat::set_feedback))
        .route("/api/admin/sessions", get(admin::list_sessions))
        .route("/api/admin/feedback", get(admin::feedback_summary))
        .route("/api/admin/feedback/{session_id}", get(admin::session_feedback))
        .route("/api/admin/usage", get(admin::usage))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Full application: API routes plus the optional static UI bundle.
pub fn app(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let router = api_routes(state);
    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
