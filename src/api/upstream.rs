/*
 * Responsibility
 * - Routes of the upstream-api binary
 *   - GET /api/private-scope   bearer token for API_AUTH0_AUDIENCE + read:private
 *
 * Notes
 * - Same access middleware and scope guard as the MCP server; only the
 *   verifier's audience differs
 */
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::api::v1::extractors::Auth;
use crate::middleware::auth::{AccessGuard, access, scope};
use crate::services::auth::scope::RequiredScopes;

pub const PRIVATE_SCOPE_PATH: &str = "/api/private-scope";
pub const PRIVATE_SCOPE: &str = "read:private";

pub fn routes(guard: AccessGuard) -> Router {
    let private = scope::require(
        Router::new().route(PRIVATE_SCOPE_PATH, get(private_scope)),
        RequiredScopes::new([PRIVATE_SCOPE]),
    );

    // scope guard inside, access middleware outside
    access::apply(private, guard)
}

async fn private_scope(Auth(auth): Auth) -> Json<Value> {
    Json(json!({
        "msg": "Hello from upstream API",
        "sub": auth.subject(),
        "scopes": auth.scopes(),
    }))
}
