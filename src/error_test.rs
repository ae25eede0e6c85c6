use super::*;

#[derive(Debug, thiserror::Error)]
#[error("widget {0} is missing")]
struct MissingWidget(u32);

impl ErrorCode for MissingWidget {
    fn error_code(&self) -> &'static str {
        "E_WIDGET_MISSING"
    }
}

#[test]
fn api_error_copies_code_and_message() {
    let err = ApiError::new(StatusCode::NOT_FOUND, &MissingWidget(7));
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.code, "E_WIDGET_MISSING");
    assert_eq!(err.message, "widget 7 is missing");
}

#[tokio::test]
async fn api_error_renders_json_body() {
    let response = ApiError::new(StatusCode::CONFLICT, &MissingWidget(1)).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "E_WIDGET_MISSING");
    assert_eq!(body["message"], "widget 1 is missing");
}
