use super::*;
use axum::body::Body;
use axum::http::Request;
use serde_json::json;
use tower::ServiceExt;

use crate::state::test_helpers::{self, ADMIN_NAME, ADMIN_PASSWORD, call};

fn app(dir: &std::path::Path) -> (AppState, axum::Router) {
    let state = test_helpers::test_app_state(dir);
    let router = crate::routes::app(state.clone(), None);
    (state, router)
}

// =============================================================================
// auth_error_to_status
// =============================================================================

#[test]
fn auth_errors_map_to_statuses() {
    assert_eq!(auth_error_to_status(&AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::NotLoggedIn), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::Unauthorized), StatusCode::FORBIDDEN);
    assert_eq!(auth_error_to_status(&AuthError::InvalidUsername("a/b".into())), StatusCode::BAD_REQUEST);
    assert_eq!(
        auth_error_to_status(&AuthError::CredentialsFile { path: "users.json".into(), reason: "bad".into() }),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn regular_login_opens_session_and_registers_token() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (state, router) = app(tmp.path());

    let (status, body) = call(&router, "POST", "/api/auth/login", None, Some(json!({ "username": "  alice " }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["session_id"].as_str().map(str::len), Some(36));
    assert_eq!(state.logins.active_count().await, 1);
    // Nothing is written until the first turn.
    assert!(state.store.scan().unwrap().is_empty());
}

#[tokio::test]
async fn login_sets_http_only_cookie() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_state, router) = app(tmp.path());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"username":"bob"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn regular_login_rejects_admin_name_and_empty_name() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (state, router) = app(tmp.path());

    for name in ["admin", "ADMIN", "   ", "../etc"] {
        let (status, body) = call(&router, "POST", "/api/auth/login", None, Some(json!({ "username": name }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "name {name:?}");
        assert_eq!(body["code"], "E_INVALID_USERNAME");
    }
    assert_eq!(state.logins.active_count().await, 0);
}

#[tokio::test]
async fn admin_login_checks_password() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_state, router) = app(tmp.path());

    let wrong = json!({ "username": ADMIN_NAME, "password": "nope", "admin": true });
    let (status, body) = call(&router, "POST", "/api/auth/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E_INVALID_CREDENTIALS");

    let right = json!({ "username": ADMIN_NAME, "password": ADMIN_PASSWORD, "admin": true });
    let (status, body) = call(&router, "POST", "/api/auth/login", None, Some(right)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_admin"], true);
}

// =============================================================================
// me / logout
// =============================================================================

#[tokio::test]
async fn me_requires_cookie() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_state, router) = app(tmp.path());

    let (status, body) = call(&router, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E_NOT_LOGGED_IN");

    let (status, _) = call(&router, "GET", "/api/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_login_and_logout_ends_it() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (state, router) = app(tmp.path());
    let token = test_helpers::login_as(&state, "carol", false).await;

    let (status, body) = call(&router, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "carol");
    assert_eq!(body["is_admin"], false);

    let (status, _) = call(&router, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.logins.active_count().await, 0);

    let (status, _) = call(&router, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn assert_send<T: Send>(_: T) {}

#[test]
fn handler_futures_are_send() {
    let tmp = tempfile::TempDir::new().unwrap();
    let state = test_helpers::test_app_state(tmp.path());
    let auth = || AuthUser {
        user: LoginUser { username: "dave".into(), is_admin: false, current_session: "s".into() },
        token: "t".into(),
    };

    // Futures are built but never polled; only the `Send` bound is checked.
    assert_send(logout(State(state.clone()), auth()));
    assert_send(me(auth()));
    assert_send(login(
        State(state),
        Json(LoginBody { username: "dave".into(), password: None, admin: false }),
    ));
}

#[tokio::test]
async fn logout_leaves_other_logins_active() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (state, router) = app(tmp.path());
    let first = test_helpers::login_as(&state, "erin", false).await;
    let second = test_helpers::login_as(&state, "frank", false).await;

    let (status, _) = call(&router, "POST", "/api/auth/logout", Some(&first), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.logins.active_count().await, 1);

    let (status, body) = call(&router, "GET", "/api/auth/me", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "frank");
}
