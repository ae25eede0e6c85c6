//! Preview index: lightweight session summaries for sidebars and pickers.
//!
//! DESIGN
//! ======
//! There is no persistent index. Every listing re-scans the log directory
//! and derives previews on the fly, which is fine for a single small team.
//! Output follows directory enumeration order; callers that need a stable
//! order must sort.
//!
//! Recency buckets compare local calendar dates, not elapsed hours: a
//! session saved at 23:59 seven days ago is still "recent" and one saved
//! at 00:01 today is "today".

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::services::chat::ChatSession;
use crate::services::store::{SessionStore, StoreError, StoredRecord};

/// Preview text for sessions without any user message.
pub const NO_MESSAGE: &str = "No message";

/// How many calendar days before today count as "recent".
pub const RECENT_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPreview {
    pub username: String,
    pub session_id: String,
    /// First user message, or [`NO_MESSAGE`].
    pub preview: String,
    pub full_data: ChatSession,
    pub filename: String,
}

impl SessionPreview {
    /// Build a preview from a stored record. Sessions with an empty history
    /// have nothing to show and yield `None`.
    #[must_use]
    pub fn from_record(record: StoredRecord) -> Option<Self> {
        if record.session.chat_history.is_empty() {
            return None;
        }
        Some(Self {
            username: record.session.username.clone(),
            session_id: record.session.session_id.clone(),
            preview: preview_text(&record.session).to_owned(),
            full_data: record.session,
            filename: record.filename,
        })
    }
}

/// First user message of the session, or [`NO_MESSAGE`].
#[must_use]
pub fn preview_text(session: &ChatSession) -> &str {
    session.first_user_message().unwrap_or(NO_MESSAGE)
}

/// Previews for every non-empty session in the store.
pub fn list_all(store: &SessionStore) -> Result<Vec<SessionPreview>, StoreError> {
    Ok(store
        .scan()?
        .into_iter()
        .filter_map(SessionPreview::from_record)
        .collect())
}

/// Previews owned by `username` (exact, case-sensitive match).
pub fn list_for_user(store: &SessionStore, username: &str) -> Result<Vec<SessionPreview>, StoreError> {
    let mut previews = list_all(store)?;
    previews.retain(|p| p.username == username);
    Ok(previews)
}

// =============================================================================
// RECENCY BUCKETS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecencyBuckets {
    /// Saved on the same local calendar date as `now`.
    pub today: Vec<SessionPreview>,
    /// Saved 1 to 7 calendar days before `now`.
    pub recent: Vec<SessionPreview>,
}

/// Split previews into `today` and `recent`. Anything older, newer than
/// `now`, or without a timestamp is dropped.
#[must_use]
pub fn bucket_by_recency(previews: Vec<SessionPreview>, now: NaiveDateTime) -> RecencyBuckets {
    let today = now.date();
    let oldest = today
        .checked_sub_days(Days::new(RECENT_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);

    let mut buckets = RecencyBuckets::default();
    for preview in previews {
        let Some(saved) = preview.full_data.timestamp else {
            continue;
        };
        let date = saved.date();
        if date == today {
            buckets.today.push(preview);
        } else if date >= oldest && date < today {
            buckets.recent.push(preview);
        }
    }
    buckets
}

#[cfg(test)]
#[path = "preview_test.rs"]
mod tests;
