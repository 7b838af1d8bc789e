/*
 * Responsibility
 * - URL layout
 *   - /.well-known/oauth-protected-resource   public
 *   - /mcp                                     bearer token (access middleware)
 *   - /api/v1/health                           public
 *   - /api/v1/calendar/events                  session cookie
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    calendar::list_events, health::health, mcp::mcp, metadata::protected_resource_metadata,
};
use crate::middleware::auth::access;
use crate::state::AppState;

pub const METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

/// Mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/calendar/events", get(list_events))
}

/// Mounted at the root: metadata discovery and the MCP endpoint.
pub fn root_routes(state: &AppState) -> Router<AppState> {
    let mcp_routes = access::apply(
        Router::new().route("/mcp", post(mcp)),
        state.access.clone(),
    );

    Router::new()
        .route(METADATA_PATH, get(protected_resource_metadata))
        // path-suffixed form for clients that derive it from the resource URL
        .route(
            &format!("{}/mcp", METADATA_PATH),
            get(protected_resource_metadata),
        )
        .route("/health", get(health))
        .merge(mcp_routes)
}
