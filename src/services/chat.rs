//! Chat sessions: the persisted record types and their lifecycle.
//!
//! DESIGN
//! ======
//! A `ChatSession` is an explicit value: callers pass it in and get the
//! updated session back. Nothing here remembers a "current" session; the
//! HTTP layer owns that reference.
//!
//! Each turn appends a user message and a synthetic assistant reply, then
//! overwrites the session file. Feedback follows a one-shot state machine
//! (`unset -> positive | negative`); a second vote is rejected here rather
//! than relying on the UI to disable the control.
//!
//! READING RECORDS
//! ===============
//! Only `username`, `session_id` and `chat_history` are required. Records
//! written by other tools are read leniently:
//! - an unparseable `timestamp` reads as absent
//! - roles other than `user`/`assistant` are kept verbatim
//! - feedback equal to `1` or `0` (including `true`/`false` and `1.0`/`0.0`)
//!   is normalised to the integer form; any other value reads as "no
//!   feedback" and is dropped the next time the session is saved

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::echo::{self, ResponseSource};
use crate::services::store::{SessionStore, StoreError};

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Author of a message. Stored as a lowercase string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    /// Any other role found on disk, written back unchanged.
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::User => "user".to_owned(),
            Role::Assistant => "assistant".to_owned(),
            Role::Other(raw) => raw,
        }
    }
}

/// Thumbs up / thumbs down on an assistant message. Stored as `1` / `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Feedback {
    Negative,
    Positive,
}

impl Feedback {
    /// Interpret a raw JSON feedback value. Booleans and numbers equal to
    /// `1` or `0` count; anything else (including `null`) means "no feedback".
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(true) => Some(Self::Positive),
            serde_json::Value::Bool(false) => Some(Self::Negative),
            serde_json::Value::Number(n) => match n.as_f64()? {
                x if x == 1.0 => Some(Self::Positive),
                x if x == 0.0 => Some(Self::Negative),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<Feedback> for u8 {
    fn from(value: Feedback) -> Self {
        match value {
            Feedback::Negative => 0,
            Feedback::Positive => 1,
        }
    }
}

impl TryFrom<u8> for Feedback {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Positive),
            0 => Ok(Self::Negative),
            other => Err(format!("feedback must be 0 or 1, got {other}")),
        }
    }
}

fn lenient_feedback<'de, D>(deserializer: D) -> Result<Option<Feedback>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Feedback::from_json))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp))
}

/// Parse an ISO-8601 timestamp as local wall-clock time. Offsets are
/// converted to the local zone; blank or unparseable input yields `None`.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.with_timezone(&Local).naive_local())
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub message: String,
    #[serde(default, deserialize_with = "lenient_feedback", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self { role, message: message.into(), feedback: None }
    }
}

/// One conversation, persisted as one file. Field order matches the file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub username: String,
    pub session_id: String,
    /// Local time of the most recent save (no offset). Absent until first save.
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    pub chat_history: Vec<ChatMessage>,
}

impl ChatSession {
    #[must_use]
    pub fn new(username: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self { username: username.into(), session_id: session_id.into(), timestamp: None, chat_history: Vec::new() }
    }

    /// First message written by the user, if any.
    #[must_use]
    pub fn first_user_message(&self) -> Option<&str> {
        self.chat_history
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.message.as_str())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("message must not be empty")]
    EmptyPrompt,
    #[error("message index {index} out of range (session has {len} messages)")]
    MessageIndexOutOfRange { index: usize, len: usize },
    #[error("message {index} is not an assistant message")]
    NotAssistantMessage { index: usize },
    #[error("feedback already recorded for message {index}")]
    FeedbackAlreadySet { index: usize },
}

impl crate::error::ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::EmptyPrompt => "E_EMPTY_PROMPT",
            Self::MessageIndexOutOfRange { .. } => "E_MESSAGE_NOT_FOUND",
            Self::NotAssistantMessage { .. } => "E_NOT_ASSISTANT_MESSAGE",
            Self::FeedbackAlreadySet { .. } => "E_FEEDBACK_ALREADY_SET",
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Start a new, empty session for `username`. Nothing is written until the
/// first turn. The identifier is regenerated if a file already uses it, so a
/// fresh session can never silently overwrite an old one.
#[must_use]
pub fn create_session(store: &SessionStore, username: &str) -> ChatSession {
    loop {
        let session_id = Uuid::new_v4().to_string();
        if !store.exists(username, &session_id) {
            return ChatSession::new(username, session_id);
        }
        warn!(username, %session_id, "generated session id already on disk; regenerating");
    }
}

/// Append one message to the session. Pure; does not persist.
#[must_use]
pub fn append_message(mut session: ChatSession, role: Role, text: impl Into<String>) -> ChatSession {
    session.chat_history.push(ChatMessage::new(role, text));
    session
}

/// Reject prompts that are empty after trimming.
pub fn validate_prompt(prompt: &str) -> Result<&str, ChatError> {
    if prompt.trim().is_empty() {
        return Err(ChatError::EmptyPrompt);
    }
    Ok(prompt)
}

/// Append a completed user/assistant exchange and overwrite the session file.
pub fn record_turn(
    store: &SessionStore,
    session: ChatSession,
    prompt: &str,
    reply: String,
) -> Result<ChatSession, ChatError> {
    let session = append_message(session, Role::User, prompt);
    let mut session = append_message(session, Role::Assistant, reply);
    store.save(&mut session)?;
    info!(
        username = %session.username,
        session_id = %session.session_id,
        messages = session.chat_history.len(),
        "chat turn recorded"
    );
    Ok(session)
}

/// Run one full turn: user message, synthetic reply (fully consumed), save.
pub async fn send_turn(
    store: &SessionStore,
    responder: &dyn ResponseSource,
    session: ChatSession,
    prompt: &str,
) -> Result<ChatSession, ChatError> {
    let prompt = validate_prompt(prompt)?;
    let reply = echo::collect_response(responder.stream(prompt)).await;
    record_turn(store, session, prompt, reply)
}

/// Record feedback on the assistant message at `index` and persist immediately.
///
/// Other messages are left untouched. Feedback can be given once per message.
pub fn set_feedback(
    store: &SessionStore,
    mut session: ChatSession,
    index: usize,
    value: Feedback,
) -> Result<ChatSession, ChatError> {
    let len = session.chat_history.len();
    let Some(message) = session.chat_history.get_mut(index) else {
        return Err(ChatError::MessageIndexOutOfRange { index, len });
    };
    if message.role != Role::Assistant {
        return Err(ChatError::NotAssistantMessage { index });
    }
    if message.feedback.is_some() {
        return Err(ChatError::FeedbackAlreadySet { index });
    }
    message.feedback = Some(value);

    store.save(&mut session)?;
    info!(
        username = %session.username,
        session_id = %session.session_id,
        index,
        feedback = u8::from(value),
        "feedback recorded"
    );
    Ok(session)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
