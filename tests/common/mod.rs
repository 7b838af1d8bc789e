//! Shared harness: the full router wired against a wiremock tenant.
//!
//! Access tokens are HS256 so the tests can mint them; the token endpoint,
//! the upstream API and the calendar API all live on one mock server.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use mcp_token_bridge::app::build_router;
use mcp_token_bridge::config::Config;
use mcp_token_bridge::middleware::auth::AccessGuard;
use mcp_token_bridge::services::auth::factory::{build_exchanger, build_vault, exchange_profile};
use mcp_token_bridge::services::auth::verifier::JwtVerifier;
use mcp_token_bridge::services::downstream::DownstreamClient;
use mcp_token_bridge::services::session::{MemorySessionStore, SessionStore};
use mcp_token_bridge::state::AppState;
use mcp_token_bridge::tools::ToolRegistry;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::MockServer;

pub const SECRET: &[u8] = b"integration-test-secret";
pub const AUDIENCE: &str = "http://localhost:3001/";
pub const API_AUDIENCE: &str = "https://api.example/private";
pub const SERVER_URL: &str = "http://mcp.test";

pub struct TestApp {
    pub router: Router,
    pub config: Config,
    pub sessions: Arc<MemorySessionStore>,
}

pub fn config(server: &MockServer) -> Config {
    let uri = server.uri();
    let env = HashMap::from([
        ("AUTH0_DOMAIN", uri.clone()),
        ("AUTH0_AUDIENCE", AUDIENCE.to_string()),
        ("MCP_SERVER_URL", SERVER_URL.to_string()),
        ("MCP_AUTH0_CLIENT_ID", "mcp-client".to_string()),
        ("MCP_AUTH0_CLIENT_SECRET", "mcp-secret".to_string()),
        ("MCP_AUTH0_SUBJECT_TOKEN_TYPE", "urn:mcp-token-bridge:mcp".to_string()),
        ("API_AUTH0_AUDIENCE", API_AUDIENCE.to_string()),
        ("API_BASE_URL", uri.clone()),
        ("CALENDAR_API_URL", format!("{}/calendar/events", uri)),
        ("HTTP_TIMEOUT_SECONDS", "1".to_string()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

pub fn app(server: &MockServer) -> TestApp {
    let config = config(server);
    let sessions = Arc::new(MemorySessionStore::new());

    let verifier = JwtVerifier::from_secret(SECRET, &config.provider.issuer(), AUDIENCE, 0);
    let access = AccessGuard::new(Arc::new(verifier))
        .with_resource_metadata(config.resource_metadata_url())
        .with_exchange(build_exchanger(&config).unwrap(), exchange_profile(&config));

    let state = AppState::new(
        Arc::new(config.clone()),
        access,
        build_vault(&config).unwrap(),
        DownstreamClient::new(&config.http).unwrap(),
        ToolRegistry::from_config(&config),
        sessions.clone() as Arc<dyn SessionStore>,
    );

    TestApp {
        router: build_router(state, &config),
        config,
        sessions,
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn claims(config: &Config, scope: &str) -> Value {
    json!({
        "iss": config.provider.issuer(),
        "aud": AUDIENCE,
        "sub": "auth0|123",
        "azp": "mcp-client",
        "name": "Ada",
        "scope": scope,
        "exp": now() + 3600,
    })
}

pub fn mint(claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

pub fn token(config: &Config, scope: &str) -> String {
    mint(&claims(config, scope))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn challenge(&self) -> &str {
        self.headers
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Reply {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        headers,
        body,
    }
}

pub fn rpc(token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn call_tool(token: &str, name: &str, arguments: Value) -> Request<Body> {
    rpc(
        Some(token),
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }),
    )
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
