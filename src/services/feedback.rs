//! Feedback aggregation across all stored sessions.
//!
//! DESIGN
//! ======
//! `summarize` walks every record once and produces a global tally plus a
//! per-session breakdown keyed by `session_id`. Only assistant messages
//! count: feedback `1` is positive, `0` is negative, anything else is
//! ignored.
//!
//! EDGE CASES
//! ==========
//! Two files can carry the same `session_id` (e.g. hand-edited or copied
//! records). The first record scanned keeps the key; later ones are left
//! out of both tallies and reported in `collisions`, so nothing is
//! overwritten silently and `overall` always equals the per-session sum.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use crate::services::chat::{ChatSession, Feedback, Role};
use crate::services::preview::preview_text;
use crate::services::store::{SessionStore, StoreError, StoredRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackCounts {
    pub positive: u64,
    pub negative: u64,
}

impl AddAssign for FeedbackCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.positive += rhs.positive;
        self.negative += rhs.negative;
    }
}

/// Per-session breakdown with enough data for drill-down display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFeedback {
    pub username: String,
    pub timestamp: Option<NaiveDateTime>,
    pub positive: u64,
    pub negative: u64,
    pub preview: String,
    pub full_data: ChatSession,
    pub filename: String,
}

impl SessionFeedback {
    fn new(record: StoredRecord, counts: FeedbackCounts) -> Self {
        Self {
            username: record.session.username.clone(),
            timestamp: record.session.timestamp,
            positive: counts.positive,
            negative: counts.negative,
            preview: preview_text(&record.session).to_owned(),
            full_data: record.session,
            filename: record.filename,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackSummary {
    pub overall: FeedbackCounts,
    pub per_session: BTreeMap<String, SessionFeedback>,
    /// Files skipped because their `session_id` was already taken.
    pub collisions: Vec<String>,
}

/// Count positive and negative feedback on the session's assistant messages.
#[must_use]
pub fn count(session: &ChatSession) -> FeedbackCounts {
    let mut counts = FeedbackCounts::default();
    for message in session.chat_history.iter().filter(|m| m.role == Role::Assistant) {
        match message.feedback {
            Some(Feedback::Positive) => counts.positive += 1,
            Some(Feedback::Negative) => counts.negative += 1,
            None => {}
        }
    }
    counts
}

/// Global and per-session feedback tallies over every readable record.
pub fn summarize(store: &SessionStore) -> Result<FeedbackSummary, StoreError> {
    Ok(summarize_records(store.scan()?))
}

pub(crate) fn summarize_records(records: Vec<StoredRecord>) -> FeedbackSummary {
    let mut summary = FeedbackSummary::default();
    for record in records {
        if let Some(existing) = summary.per_session.get(&record.session.session_id) {
            warn!(
                session_id = %record.session.session_id,
                kept = %existing.filename,
                skipped = %record.filename,
                "duplicate session id; excluding later record from feedback summary"
            );
            summary.collisions.push(record.filename);
            continue;
        }

        let counts = count(&record.session);
        summary.overall += counts;
        summary
            .per_session
            .insert(record.session.session_id.clone(), SessionFeedback::new(record, counts));
    }
    summary
}

/// Breakdown for a single session, looked up by identifier.
pub fn session_feedback(store: &SessionStore, session_id: &str) -> Result<SessionFeedback, StoreError> {
    summarize(store)?
        .per_session
        .remove(session_id)
        .ok_or_else(|| StoreError::NotFound(session_id.to_owned()))
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
