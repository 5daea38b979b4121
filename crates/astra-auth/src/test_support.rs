//! Local mock endpoints shared by the unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use tokio::net::TcpListener;

use crate::config::TransportConfig;

/// Serve `router` on an ephemeral local port, returning its base URL.
pub(crate) async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Endpoint answering every request with a fixed status and body.
pub(crate) async fn spawn_json_endpoint(status: StatusCode, body: &str) -> String {
    let body = body.to_owned();
    let router = Router::new().fallback(move || {
        let body = body.clone();
        async move { (status, [(header::CONTENT_TYPE, "application/json")], body) }
    });
    spawn_router(router).await
}

/// Endpoint that accepts connections and never answers.
pub(crate) async fn spawn_hanging_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            });
        }
    });
    format!("http://{addr}")
}

/// A request as seen by the capturing endpoint.
#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Endpoint that records each request and issues `token-for-{username}`.
pub(crate) async fn spawn_token_endpoint() -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured: Arc<Mutex<Vec<CapturedRequest>>> = Arc::default();
    let router = Router::new()
        .fallback(issue_token)
        .with_state(captured.clone());
    (spawn_router(router).await, captured)
}

async fn issue_token(
    State(captured): State<Arc<Mutex<Vec<CapturedRequest>>>>,
    request: axum::extract::Request,
) -> impl IntoResponse {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let headers = request.headers().clone();
    let bytes = axum::body::to_bytes(request.into_body(), 64 * 1024)
        .await
        .unwrap_or_default();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
    let username = body["username"].as_str().unwrap_or_default().to_owned();

    captured.lock().unwrap().push(CapturedRequest {
        method,
        path,
        headers,
        body,
    });

    axum::Json(serde_json::json!({
        "authToken": format!("token-for-{username}"),
        "expiresIn": 1800,
    }))
}

/// Policy with one-second deadlines so timeout tests finish quickly.
pub(crate) fn fast_config() -> TransportConfig {
    TransportConfig {
        request_timeout_secs: 1,
        connect_timeout_secs: 1,
        tls_handshake_timeout_secs: 1,
        response_header_timeout_secs: 1,
        ..TransportConfig::default()
    }
}
