//! Chat routes: a user's own sessions and the turns within them.
//!
//! DESIGN
//! ======
//! Sessions are addressed by UUID path segments and always resolved against
//! the caller's username, so a user can only ever reach their own files.
//! A freshly created session exists only as the login's `current_session`
//! id until its first turn is saved; resolving that id yields an empty
//! session instead of a 404.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::{ApiError, ErrorCode};
use crate::services::chat::{self as chat_svc, ChatError, ChatSession, Feedback};
use crate::services::preview::{self, RecencyBuckets};
use crate::services::store::StoreError;
use crate::state::AppState;

/// Buffered SSE events between the reply task and the response body.
const STREAM_CHANNEL_CAPACITY: usize = 64;

pub(crate) fn chat_error_to_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::Store(StoreError::NotFound(_)) | ChatError::MessageIndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        ChatError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ChatError::EmptyPrompt | ChatError::NotAssistantMessage { .. } => StatusCode::BAD_REQUEST,
        ChatError::FeedbackAlreadySet { .. } => StatusCode::CONFLICT,
    }
}

fn chat_error(err: ChatError) -> ApiError {
    ApiError::new(chat_error_to_status(&err), &err)
}

/// Load one of the caller's sessions. The login's current, not yet saved
/// session resolves to an empty one.
fn resolve_session(state: &AppState, auth: &AuthUser, session_id: Uuid) -> Result<ChatSession, ChatError> {
    let session_id = session_id.to_string();
    match state.store.find(&auth.user.username, &session_id) {
        Err(StoreError::NotFound(_)) if session_id == auth.user.current_session => {
            Ok(ChatSession::new(auth.user.username.clone(), session_id))
        }
        other => other.map_err(ChatError::from),
    }
}

#[derive(Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Deserialize)]
pub struct FeedbackBody {
    pub value: Feedback,
}

#[derive(Serialize)]
struct DeltaEvent {
    text: String,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/sessions`: the caller's previews split into today / recent.
pub async fn list_sessions(State(state): State<AppState>, auth: AuthUser) -> Result<Json<RecencyBuckets>, ApiError> {
    let previews = preview::list_for_user(&state.store, &auth.user.username)
        .map_err(|e| chat_error(ChatError::Store(e)))?;
    let now = chrono::Local::now().naive_local();
    Ok(Json(preview::bucket_by_recency(previews, now)))
}

/// `POST /api/sessions`: start an empty session and make it current.
pub async fn create_session(State(state): State<AppState>, auth: AuthUser) -> (StatusCode, Json<ChatSession>) {
    let session = chat_svc::create_session(&state.store, &auth.user.username);
    state.logins.set_current(&auth.token, &session.session_id).await;
    info!(username = %auth.user.username, session_id = %session.session_id, "chat session started");
    (StatusCode::CREATED, Json(session))
}

/// `GET /api/sessions/{id}`: open one of the caller's sessions.
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ChatSession>, ApiError> {
    let session = resolve_session(&state, &auth, session_id).map_err(chat_error)?;
    state.logins.set_current(&auth.token, &session.session_id).await;
    Ok(Json(session))
}

/// `POST /api/sessions/{id}/messages`: run one turn and return the saved session.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Json<ChatSession>, ApiError> {
    chat_svc::validate_prompt(&body.message).map_err(chat_error)?;
    let session = resolve_session(&state, &auth, session_id).map_err(chat_error)?;
    let session = chat_svc::send_turn(&state.store, state.responder.as_ref(), session, &body.message)
        .await
        .map_err(chat_error)?;
    state.logins.set_current(&auth.token, &session.session_id).await;
    Ok(Json(session))
}

/// `POST /api/sessions/{id}/stream`: the same turn as `send_message`, with
/// the reply streamed as SSE `delta` events and a final `done` (or `error`).
///
/// The turn is saved once the whole reply has been produced, even if the
/// client stops listening part way.
pub async fn stream_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    chat_svc::validate_prompt(&body.message).map_err(chat_error)?;
    let session = resolve_session(&state, &auth, session_id).map_err(chat_error)?;
    state.logins.set_current(&auth.token, &session.session_id).await;

    let (tx, rx) = mpsc::channel::<Event>(STREAM_CHANNEL_CAPACITY);
    let prompt = body.message;
    tokio::spawn(async move {
        let mut chars = state.responder.stream(&prompt);
        let mut reply = String::new();
        let mut listening = true;
        while let Some(c) = chars.next().await {
            reply.push(c);
            if listening && tx.send(json_event("delta", &DeltaEvent { text: c.to_string() })).await.is_err() {
                listening = false;
            }
        }

        let last = match chat_svc::record_turn(&state.store, session, &prompt, reply) {
            Ok(session) => json_event("done", &session),
            Err(e) => {
                warn!(error = %e, "streamed turn could not be saved");
                json_event("error", &serde_json::json!({ "code": e.error_code(), "message": e.to_string() }))
            }
        };
        let _ = tx.send(last).await;
    });

    let events = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// `PUT /api/sessions/{id}/messages/{index}/feedback`: rate one assistant reply.
pub async fn set_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((session_id, index)): Path<(Uuid, usize)>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<ChatSession>, ApiError> {
    let session = resolve_session(&state, &auth, session_id).map_err(chat_error)?;
    let session = chat_svc::set_feedback(&state.store, session, index, body.value).map_err(chat_error)?;
    Ok(Json(session))
}

fn json_event<T: Serialize>(name: &str, data: &T) -> Event {
    Event::default().event(name).json_data(data).unwrap_or_else(|e| {
        warn!(error = %e, event = name, "failed to encode SSE event");
        Event::default().event("error").data("encoding failed")
    })
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
