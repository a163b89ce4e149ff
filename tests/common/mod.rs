#![allow(dead_code)]

pub mod contract;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use notify_prefs::auth::{AccessClaims, JwtAuthenticator, TOKEN_TYPE_ACCESS};
use notify_prefs::database::{MemoryStore, PreferenceStore};
use notify_prefs::server::{self, AppState};

pub const SIGN_KEY: &str = "integration-test-key";

/// Router over `store`, verifying tokens signed with [`SIGN_KEY`].
pub fn app_with_store(store: Arc<dyn PreferenceStore>) -> Router {
    let state = AppState::new(store, Arc::new(JwtAuthenticator::new(SIGN_KEY)));
    server::app(state, Duration::from_secs(5))
}

pub fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (app_with_store(store.clone()), store)
}

pub fn mint_token(user_id: i64, admin: bool) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        token_type: TOKEN_TYPE_ACCESS.to_string(),
        user_id,
        admin,
        iss: Some("accounts".to_string()),
        jti: Some(uuid::Uuid::new_v4().to_string()),
        iat: Some(now),
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SIGN_KEY.as_bytes()),
    )
    .expect("failed to sign test token")
}

/// POST /query through the router and decode the JSON answer.
pub async fn post_query(app: &Router, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
    let mut request = Request::post("/query").header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = request.body(Body::from(body.to_string()))?;

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let json = serde_json::from_slice(&bytes).context("response is not JSON")?;
    Ok((status, json))
}

/// A router served on a real local port.
pub struct TestServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(app: Router) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let handle = tokio::spawn(async move {
            let _ = server::serve(listener, app, std::future::pending(), Duration::from_secs(1)).await;
        });

        let server = Self { base_url, handle };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
