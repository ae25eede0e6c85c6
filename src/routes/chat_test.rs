use super::*;
use axum::Router;
use serde_json::{Value, json};

use crate::services::echo::echo_reply;
use crate::state::test_helpers::{self, call};

struct Fixture {
    _tmp: tempfile::TempDir,
    state: AppState,
    router: Router,
    token: String,
}

async fn logged_in(username: &str) -> Fixture {
    let tmp = tempfile::TempDir::new().unwrap();
    let state = test_helpers::test_app_state(tmp.path());
    let router = crate::routes::app(state.clone(), None);
    let token = test_helpers::login_as(&state, username, false).await;
    Fixture { _tmp: tmp, state, router, token }
}

async fn current_session(fx: &Fixture) -> String {
    fx.state.logins.get(&fx.token).await.unwrap().current_session
}

async fn say(fx: &Fixture, session_id: &str, message: &str) -> (StatusCode, Value) {
    let uri = format!("/api/sessions/{session_id}/messages");
    call(&fx.router, "POST", &uri, Some(&fx.token), Some(json!({ "message": message }))).await
}

// =============================================================================
// chat_error_to_status
// =============================================================================

#[test]
fn chat_errors_map_to_statuses() {
    let missing = ChatError::Store(StoreError::NotFound("x".into()));
    let malformed = ChatError::Store(StoreError::MalformedRecord { filename: "f".into(), reason: "r".into() });
    assert_eq!(chat_error_to_status(&missing), StatusCode::NOT_FOUND);
    assert_eq!(chat_error_to_status(&malformed), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(chat_error_to_status(&ChatError::EmptyPrompt), StatusCode::BAD_REQUEST);
    assert_eq!(chat_error_to_status(&ChatError::MessageIndexOutOfRange { index: 3, len: 2 }), StatusCode::NOT_FOUND);
    assert_eq!(chat_error_to_status(&ChatError::NotAssistantMessage { index: 0 }), StatusCode::BAD_REQUEST);
    assert_eq!(chat_error_to_status(&ChatError::FeedbackAlreadySet { index: 1 }), StatusCode::CONFLICT);
}

// =============================================================================
// sessions
// =============================================================================

#[tokio::test]
async fn routes_require_login() {
    let fx = logged_in("alice").await;
    let (status, _) = call(&fx.router, "GET", "/api/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn created_session_is_current_and_empty_until_first_turn() {
    let fx = logged_in("alice").await;

    let (status, created) = call(&fx.router, "POST", "/api/sessions", Some(&fx.token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["session_id"].as_str().unwrap().to_owned();
    assert_eq!(current_session(&fx).await, id);

    let (status, body) = call(&fx.router, "GET", &format!("/api/sessions/{id}"), Some(&fx.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["chat_history"], json!([]));
    assert!(fx.state.store.scan().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let fx = logged_in("alice").await;
    let id = uuid::Uuid::new_v4();

    let (status, body) = call(&fx.router, "GET", &format!("/api/sessions/{id}"), Some(&fx.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E_SESSION_NOT_FOUND");
}

#[tokio::test]
async fn non_uuid_session_id_is_rejected() {
    let fx = logged_in("alice").await;
    let (status, _) = call(&fx.router, "GET", "/api/sessions/..%2Fusers", Some(&fx.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_sessions_are_unreachable() {
    let fx = logged_in("alice").await;
    let bob = test_helpers::seed(
        &fx.state.store,
        test_helpers::session_with_turns("bob", &["hello"]),
        "2026-03-10 09:00:00",
    );

    let uri = format!("/api/sessions/{}", bob.session_id);
    let (status, _) = call(&fx.router, "GET", &uri, Some(&fx.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sending_a_message_records_turn_and_lists_it_today() {
    let fx = logged_in("alice").await;
    let id = current_session(&fx).await;

    let (status, body) = say(&fx, &id, "hi there").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chat_history"][0], json!({ "role": "user", "message": "hi there" }));
    assert_eq!(body["chat_history"][1]["role"], "assistant");
    assert_eq!(body["chat_history"][1]["message"], echo_reply("hi there"));

    let saved = fx.state.store.find("alice", &id).unwrap();
    assert_eq!(saved.chat_history.len(), 2);

    let (status, buckets) = call(&fx.router, "GET", "/api/sessions", Some(&fx.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(buckets["today"].as_array().unwrap().len(), 1);
    assert_eq!(buckets["today"][0]["preview"], "hi there");
    assert_eq!(buckets["recent"], json!([]));
}

#[tokio::test]
async fn empty_message_is_rejected_without_saving() {
    let fx = logged_in("alice").await;
    let id = current_session(&fx).await;

    let (status, body) = say(&fx, &id, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "E_EMPTY_PROMPT");
    assert!(fx.state.store.scan().unwrap().is_empty());
}

#[tokio::test]
async fn stream_sends_deltas_then_done_and_saves() {
    let fx = logged_in("alice").await;
    let id = current_session(&fx).await;

    let uri = format!("/api/sessions/{id}/stream");
    let (status, body) = call(&fx.router, "POST", &uri, Some(&fx.token), Some(json!({ "message": "ping" }))).await;
    assert_eq!(status, StatusCode::OK);

    let text = body.as_str().unwrap();
    let event_lines = |name: &str| {
        text.lines()
            .filter(|line| line.starts_with("event:") && line.trim_end().ends_with(name))
            .count()
    };
    assert_eq!(event_lines("delta"), echo_reply("ping").chars().count());
    assert_eq!(event_lines("done"), 1);

    let saved = fx.state.store.find("alice", &id).unwrap();
    assert_eq!(saved.chat_history[1].message, echo_reply("ping"));
}

// =============================================================================
// feedback
// =============================================================================

#[tokio::test]
async fn feedback_is_set_once_on_assistant_messages() {
    let fx = logged_in("alice").await;
    let id = current_session(&fx).await;
    say(&fx, &id, "first").await;
    say(&fx, &id, "second").await;

    let put = |index: usize, value: Value| {
        let uri = format!("/api/sessions/{id}/messages/{index}/feedback");
        let router = fx.router.clone();
        let token = fx.token.clone();
        async move { call(&router, "PUT", &uri, Some(&token), Some(json!({ "value": value }))).await }
    };

    let (status, body) = put(1, json!(1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chat_history"][1]["feedback"], 1);
    assert!(body["chat_history"][3].get("feedback").is_none());

    let saved = fx.state.store.find("alice", &id).unwrap();
    assert_eq!(saved.chat_history[1].feedback, Some(Feedback::Positive));
    assert_eq!(saved.chat_history[3].feedback, None);

    let (status, body) = put(1, json!(0)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E_FEEDBACK_ALREADY_SET");

    let (status, _) = put(0, json!(1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put(9, json!(1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = put(3, json!(5)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
