//! Usage statistics for the admin dashboard.
//!
//! Every readable record counts as a session, including ones with an empty
//! history. Daily counts cover the last seven local calendar dates ending
//! today, oldest first; records without a timestamp only count toward the
//! totals.

use std::collections::{BTreeSet, HashMap};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::services::chat::ChatSession;
use crate::services::store::{SessionStore, StoreError};

pub const DASHBOARD_DAYS: u64 = 7;
pub const TOP_USERS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCount {
    pub username: String,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub total_users: usize,
    pub total_sessions: usize,
    pub daily: Vec<DailyCount>,
    pub top_users: Vec<UserCount>,
}

/// Scan the store and compute dashboard statistics relative to `today`.
pub fn usage_stats(store: &SessionStore, today: NaiveDate) -> Result<UsageStats, StoreError> {
    let records = store.scan()?;
    Ok(compute(records.iter().map(|r| &r.session), today))
}

pub(crate) fn compute<'a>(sessions: impl IntoIterator<Item = &'a ChatSession>, today: NaiveDate) -> UsageStats {
    let mut users = BTreeSet::new();
    let mut per_user: HashMap<&str, usize> = HashMap::new();
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    let mut total_sessions = 0;

    for session in sessions {
        total_sessions += 1;
        users.insert(session.username.as_str());
        *per_user.entry(session.username.as_str()).or_default() += 1;
        if let Some(ts) = session.timestamp {
            *per_day.entry(ts.date()).or_default() += 1;
        }
    }

    let daily = (0..DASHBOARD_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| DailyCount { date, sessions: per_day.get(&date).copied().unwrap_or(0) })
        .collect();

    let mut top_users: Vec<UserCount> = per_user
        .into_iter()
        .map(|(username, sessions)| UserCount { username: username.to_owned(), sessions })
        .collect();
    top_users.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.username.cmp(&b.username)));
    top_users.truncate(TOP_USERS_LIMIT);

    UsageStats { total_users: users.len(), total_sessions, daily, top_users }
}

#[cfg(test)]
#[path = "usage_test.rs"]
mod tests;
