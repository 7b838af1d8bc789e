/*
 * Responsibility
 * - GET /.well-known/oauth-protected-resource (RFC 9728), public
 * - scopes_supported is the union of every registered tool's required scopes
 */
use axum::{Json, extract::State};

use crate::api::v1::dto::metadata::ProtectedResourceMetadata;
use crate::state::AppState;

pub async fn protected_resource_metadata(
    State(state): State<AppState>,
) -> Json<ProtectedResourceMetadata> {
    Json(ProtectedResourceMetadata {
        resource: state.config.server_url.clone(),
        authorization_servers: vec![state.config.provider.issuer()],
        scopes_supported: state.tools.supported_scopes(),
        bearer_methods_supported: vec!["header"],
        resource_name: Some(env!("CARGO_PKG_NAME").to_string()),
    })
}
