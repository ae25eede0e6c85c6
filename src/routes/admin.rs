//! Admin routes: cross-user browsing and dashboard data.
//!
//! Every handler takes `AdminUser`, so non-admins are turned away before the
//! log directory is read.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::auth::AdminUser;
use crate::error::ApiError;
use crate::services::feedback::{self, FeedbackSummary, SessionFeedback};
use crate::services::preview::{self, SessionPreview};
use crate::services::store::StoreError;
use crate::services::usage::{self, UsageStats};
use crate::state::AppState;

pub(crate) fn store_error_to_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::StorageUnavailable { .. } | StoreError::MalformedRecord { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn store_error(err: StoreError) -> ApiError {
    ApiError::new(store_error_to_status(&err), &err)
}

#[derive(Deserialize)]
pub struct SessionsQuery {
    /// Only include sessions owned by this user.
    pub user: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminSessions {
    /// Every user with at least one non-empty session, sorted.
    pub users: Vec<String>,
    pub sessions: Vec<SessionPreview>,
}

/// `GET /api/admin/sessions?user=`: previews across all users.
pub async fn list_sessions(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<AdminSessions>, ApiError> {
    debug!(admin = %admin.user.username, user = ?query.user, "admin session listing");
    let mut sessions = preview::list_all(&state.store).map_err(store_error)?;
    let users: BTreeSet<String> = sessions.iter().map(|p| p.username.clone()).collect();
    if let Some(user) = query.user.as_deref().filter(|u| !u.is_empty()) {
        sessions.retain(|p| p.username == user);
    }
    Ok(Json(AdminSessions { users: users.into_iter().collect(), sessions }))
}

/// `GET /api/admin/feedback`
pub async fn feedback_summary(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<FeedbackSummary>, ApiError> {
    debug!(admin = %admin.user.username, "feedback summary requested");
    feedback::summarize(&state.store).map(Json).map_err(store_error)
}

/// `GET /api/admin/feedback/{session_id}`
pub async fn session_feedback(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionFeedback>, ApiError> {
    debug!(admin = %admin.user.username, %session_id, "session feedback requested");
    feedback::session_feedback(&state.store, &session_id)
        .map(Json)
        .map_err(store_error)
}

/// `GET /api/admin/usage`: totals plus the last seven days.
pub async fn usage(State(state): State<AppState>, AdminUser(admin): AdminUser) -> Result<Json<UsageStats>, ApiError> {
    debug!(admin = %admin.user.username, "usage stats requested");
    let today = chrono::Local::now().date_naive();
    usage::usage_stats(&state.store, today).map(Json).map_err(store_error)
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
