mod config;
mod error;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use services::auth::Credentials;
use services::echo::EchoResponder;
use services::store::SessionStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env();

    let store = SessionStore::new(&config.log_dir);
    store.ensure_dir().expect("chat log directory must be writable");

    let credentials = Credentials::load(&config.users_file).expect("credentials file must be valid JSON");
    if credentials.is_empty() {
        tracing::warn!(users_file = %config.users_file.display(), "no admin accounts configured");
    } else {
        tracing::info!(admins = credentials.len(), users_file = %config.users_file.display(), "credentials loaded");
    }

    let responder = match config.stream_delay_ms {
        0 => EchoResponder::instant(),
        ms => EchoResponder::new(Duration::from_millis(ms)),
    };
    tracing::info!(delay = ?responder.delay(), "echo responder ready");
    let responder = Arc::new(responder);
    let log_dir = store.dir().to_path_buf();
    let state = state::AppState::new(store, credentials, responder);

    let app = routes::app(state, config.static_dir.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, log_dir = %log_dir.display(), "scm-chat listening");
    axum::serve(listener, app).await.expect("server failed");
}
