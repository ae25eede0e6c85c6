//! Auth routes: login/logout handlers and the cookie extractors.

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use tracing::{info, warn};

use crate::config::env_bool;
use crate::error::ApiError;
use crate::services::auth::{self as auth_svc, AuthError};
use crate::services::chat;
use crate::services::session::LoginUser;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

pub(crate) fn cookie_secure() -> bool {
    env_bool("COOKIE_SECURE").unwrap_or(false)
}

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
        AuthError::InvalidUsername(_) => StatusCode::BAD_REQUEST,
        AuthError::Unauthorized => StatusCode::FORBIDDEN,
        AuthError::CredentialsFile { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn auth_error(err: AuthError) -> ApiError {
    ApiError::new(auth_error_to_status(&err), &err)
}

fn session_cookie(value: String, max_age: Option<Duration>) -> Cookie<'static> {
    let mut cookie = Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .build();
    if let Some(max_age) = max_age {
        cookie.set_max_age(max_age);
    }
    cookie
}

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Logged-in user extracted from the session cookie.
/// Use as a handler parameter to require a login.
pub struct AuthUser {
    pub user: LoginUser,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(|c| c.value().to_owned()).unwrap_or_default();
        if token.is_empty() {
            return Err(auth_error(AuthError::NotLoggedIn));
        }

        let app_state = AppState::from_ref(state);
        let user = app_state
            .logins
            .get(&token)
            .await
            .ok_or_else(|| auth_error(AuthError::NotLoggedIn))?;

        Ok(Self { user, token })
    }
}

/// Logged-in admin. Non-admins are rejected before the handler runs, so
/// admin-only handlers never touch the store on their behalf.
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin {
            warn!(username = %auth.user.username, "non-admin denied admin access");
            return Err(auth_error(AuthError::Unauthorized));
        }
        Ok(Self(auth))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginBody {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Log in through the admin credential check.
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub is_admin: bool,
    pub session_id: String,
}

/// `POST /api/auth/login`: check credentials and open a fresh chat session.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let identity = auth_svc::authenticate(&state.credentials, &body.username, body.password.as_deref(), body.admin)
        .map_err(|e| {
            warn!(error = %e, admin = body.admin, "login rejected");
            auth_error(e)
        })?;

    let session = chat::create_session(&state.store, &identity.username);
    let token = state
        .logins
        .create(LoginUser {
            username: identity.username.clone(),
            is_admin: identity.is_admin,
            current_session: session.session_id.clone(),
        })
        .await;
    info!(username = %identity.username, is_admin = identity.is_admin, "user logged in");

    let jar = CookieJar::new().add(session_cookie(token, None));
    Ok((
        jar,
        Json(LoginResponse {
            username: identity.username,
            is_admin: identity.is_admin,
            session_id: session.session_id,
        }),
    ))
}

/// `GET /api/auth/me`: return the current login.
pub async fn me(auth: AuthUser) -> Json<LoginUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout`: drop the login, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    state.logins.remove(&auth.token).await;
    let active = state.logins.active_count().await;
    info!(username = %auth.user.username, active, "user logged out");

    let jar = CookieJar::new().add(session_cookie(String::new(), Some(Duration::ZERO)));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
