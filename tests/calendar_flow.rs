mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{app, get, send};
use mcp_token_bridge::services::auth::token::BearerToken;
use mcp_token_bridge::services::session::{SessionStore, UserSession};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header as header_is, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events.readonly";

fn with_session(uri: &str, session_id: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("theme=dark; session={}", session_id))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &common::TestApp) {
    app.sessions
        .insert(UserSession {
            session_id: "s-1".to_string(),
            user_id: "auth0|123".to_string(),
            refresh_token: BearerToken::new("user-refresh-token"),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn no_session_is_login_required() {
    let server = MockServer::start().await;
    let app = app(&server);

    let reply = send(&app.router, get("/api/v1/calendar/events")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "login_required");

    let reply = send(&app.router, with_session("/api/v1/calendar/events", "unknown")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn linked_account_lists_events_and_reuses_the_token() {
    let server = MockServer::start().await;
    let app = app(&server);
    login(&app).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("subject_token=user-refresh-token"))
        .and(body_string_contains("connection=google-oauth2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "google-token",
            "scope": CALENDAR_SCOPE,
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/calendar/events"))
        .and(header_is("authorization", "Bearer google-token"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "e1",
                "summary": "Standup",
                "start": {"dateTime": "2026-03-04T09:00:00Z"},
                "end": {"dateTime": "2026-03-04T09:15:00Z"}
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    for _ in 0..2 {
        let reply = send(&app.router, with_session("/api/v1/calendar/events", "s-1")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["calendarId"], "primary");
        assert_eq!(reply.body["events"][0]["summary"], "Standup");
    }
}

#[tokio::test]
async fn unlinked_account_gets_connect_params() {
    let server = MockServer::start().await;
    let app = app(&server);
    login(&app).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "federated_connection_not_linked",
            "error_description": "User has not linked the connection"
        })))
        .mount(&server)
        .await;

    let reply = send(&app.router, with_session("/api/v1/calendar/events", "s-1")).await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], "connection_not_linked");
    assert_eq!(reply.body["connection"], "google-oauth2");
    assert_eq!(reply.body["connect_endpoint"], "/auth/connect");
    assert_eq!(reply.body["connect_params"]["connection"], "google-oauth2");
    assert_eq!(reply.body["connect_params"]["scopes"], json!([CALENDAR_SCOPE]));
}

#[tokio::test]
async fn inverted_window_is_bad_request() {
    let server = MockServer::start().await;
    let app = app(&server);
    login(&app).await;

    let reply = send(
        &app.router,
        with_session(
            "/api/v1/calendar/events?start=2026-03-05T00:00:00Z&end=2026-03-04T00:00:00Z",
            "s-1",
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_is_public() {
    let server = MockServer::start().await;
    let app = app(&server);

    for uri in ["/health", "/api/v1/health"] {
        let reply = send(&app.router, get(uri)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["status"], "ok");
    }
}
