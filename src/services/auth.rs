//! Admin credentials and login rules.
//!
//! The credential file maps admin names to plaintext passwords and is read
//! once at startup. Regular users need no password: any non-empty name other
//! than `admin` is accepted. Names end up inside file names, so path
//! separators and control characters are refused.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_USERS_FILE: &str = "users.json";

/// Name regular users may never log in as.
pub const RESERVED_ADMIN_NAME: &str = "admin";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid admin credentials")]
    InvalidCredentials,
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),
    #[error("login required")]
    NotLoggedIn,
    #[error("you are not authorized to view this page")]
    Unauthorized,
    #[error("failed to read credentials file {path}: {reason}")]
    CredentialsFile { path: String, reason: String },
}

impl crate::error::ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::InvalidUsername(_) => "E_INVALID_USERNAME",
            Self::NotLoggedIn => "E_NOT_LOGGED_IN",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::CredentialsFile { .. } => "E_CREDENTIALS_FILE",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CredentialEntry {
    password: String,
}

/// Parsed admin credentials: admin name -> password.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    admins: HashMap<String, String>,
}

impl Credentials {
    /// Parse `{"<name>": {"password": "<password>"}, ...}`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let entries: HashMap<String, CredentialEntry> = serde_json::from_str(raw)?;
        let admins = entries
            .into_iter()
            .map(|(name, entry)| (name, entry.password))
            .collect();
        Ok(Self { admins })
    }

    /// Load the credential file. A missing file means no admin can log in.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "credentials file not found; admin login disabled");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AuthError::CredentialsFile { path: path.display().to_string(), reason: e.to_string() });
            }
        };
        Self::from_json(&raw)
            .map_err(|e| AuthError::CredentialsFile { path: path.display().to_string(), reason: e.to_string() })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }

    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.admins.get(username).is_some_and(|expected| expected == password)
    }
}

/// Who a successful login belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub is_admin: bool,
}

/// Check a username for use in session file names.
pub fn validate_username(username: &str) -> Result<&str, AuthError> {
    let name = username.trim();
    let unsafe_char = |c: char| c == '/' || c == '\\' || c.is_control();
    if name.is_empty() || name == "." || name == ".." || name.chars().any(unsafe_char) {
        return Err(AuthError::InvalidUsername(username.to_owned()));
    }
    Ok(name)
}

/// Apply the login rules. Inputs are trimmed before comparison.
///
/// - admin: name and password must match the credential file
/// - regular: any valid name except `admin` (case-insensitive)
pub fn authenticate(
    credentials: &Credentials,
    username: &str,
    password: Option<&str>,
    as_admin: bool,
) -> Result<Identity, AuthError> {
    if as_admin {
        let name = username.trim();
        let password = password.map(str::trim).unwrap_or_default();
        if !credentials.verify(name, password) {
            return Err(AuthError::InvalidCredentials);
        }
        let name = validate_username(name)?;
        return Ok(Identity { username: name.to_owned(), is_admin: true });
    }

    let name = validate_username(username)?;
    if name.eq_ignore_ascii_case(RESERVED_ADMIN_NAME) {
        return Err(AuthError::InvalidUsername(username.to_owned()));
    }
    Ok(Identity { username: name.to_owned(), is_admin: false })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
