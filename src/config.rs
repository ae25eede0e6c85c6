//! Process configuration parsed from environment variables.

use std::path::PathBuf;

use crate::services::auth::DEFAULT_USERS_FILE;
use crate::services::echo::DEFAULT_STREAM_DELAY_MS;
use crate::services::store::DEFAULT_LOG_DIR;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Directory holding one `chat_*.json` file per session.
    pub log_dir: PathBuf,
    /// Static admin credential file, read once at startup.
    pub users_file: PathBuf,
    /// Pause between characters of the synthetic reply stream.
    pub stream_delay_ms: u64,
    /// Optional directory of static UI assets served at `/`.
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// - `PORT`: default 3000
    /// - `CHAT_LOG_DIR`: default `chat_logs` (relative to the working directory)
    /// - `USERS_FILE`: default `users.json`
    /// - `STREAM_DELAY_MS`: default 20
    /// - `STATIC_DIR`: unset disables static file serving
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            log_dir: env_path("CHAT_LOG_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            users_file: env_path("USERS_FILE").unwrap_or_else(|| PathBuf::from(DEFAULT_USERS_FILE)),
            stream_delay_ms: env_parse("STREAM_DELAY_MS", DEFAULT_STREAM_DELAY_MS),
            static_dir: env_path("STATIC_DIR"),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
