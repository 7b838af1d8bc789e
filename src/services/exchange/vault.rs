/*
 * Responsibility
 * - Token Vault: obtain an access token for a federated connection
 *   (e.g. google-oauth2) on behalf of a user
 * - Tell "the user never linked / must re-consent" apart from hard failures
 * - Session path: reuse a cached connection token while it is still fresh
 */
use async_trait::async_trait;
use chrono::Utc;

use crate::error::AppError;
use crate::services::auth::context::parse_scopes;
use crate::services::auth::token::BearerToken;
use crate::services::session::{SessionStore, UserSession};

use super::endpoint::TokenEndpoint;
use super::types::{
    ConnectionToken, ConnectionTokenRequest, ExchangeError, FEDERATED_CONNECTION_GRANT,
    FEDERATED_CONNECTION_TOKEN_TYPE, VaultSubject, expiry_after,
};

/// Provider error codes meaning the user has no usable link for the connection.
const NOT_LINKED_CODES: [&str; 2] = [
    "federated_connection_refresh_token_not_found",
    "federated_connection_not_linked",
];

#[async_trait]
pub trait ConnectionTokenProvider: Send + Sync {
    async fn connection_token(
        &self,
        request: &ConnectionTokenRequest,
    ) -> Result<ConnectionToken, ExchangeError>;

    /// Where clients start the linking flow.
    fn connect_endpoint(&self) -> &str;

    fn not_linked(&self, connection: &str, required_scopes: &[String]) -> ExchangeError {
        ExchangeError::NotLinked {
            connection: connection.to_string(),
            connect_endpoint: self.connect_endpoint().to_string(),
            required_scopes: required_scopes.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenVault {
    endpoint: TokenEndpoint,
    connect_endpoint: String,
}

impl TokenVault {
    pub fn new(endpoint: TokenEndpoint, connect_endpoint: impl Into<String>) -> Self {
        Self {
            endpoint,
            connect_endpoint: connect_endpoint.into(),
        }
    }
}

#[async_trait]
impl ConnectionTokenProvider for TokenVault {
    async fn connection_token(
        &self,
        request: &ConnectionTokenRequest,
    ) -> Result<ConnectionToken, ExchangeError> {
        let form = vec![
            ("grant_type", FEDERATED_CONNECTION_GRANT.to_string()),
            ("subject_token", request.subject.token().expose().to_string()),
            ("subject_token_type", request.subject.token_type().to_string()),
            (
                "requested_token_type",
                FEDERATED_CONNECTION_TOKEN_TYPE.to_string(),
            ),
            ("connection", request.connection.clone()),
        ];

        tracing::debug!(
            connection = %request.connection,
            subject = %request.subject.token().fingerprint(),
            "token vault exchange"
        );

        let response = match self.endpoint.grant(form).await {
            Ok(response) => response,
            Err(ExchangeError::Rejected {
                code, description, ..
            }) if is_not_linked(&code, description.as_deref()) => {
                tracing::info!(connection = %request.connection, code = %code, "connection not linked");
                return Err(self.not_linked(&request.connection, &request.required_scopes));
            }
            Err(err) => return Err(err),
        };

        let expires_at = response.expires_in.and_then(|s| {
            let at = expiry_after(Utc::now(), s);
            if at.is_none() {
                tracing::warn!(connection = %request.connection, expires_in = s, "ignoring out-of-range expires_in");
            }
            at
        });

        let token = ConnectionToken {
            connection: request.connection.clone(),
            scopes: response.scope.as_deref().map(parse_scopes),
            expires_at,
            access_token: BearerToken::new(response.access_token),
        };

        if !token.covers(&request.required_scopes) {
            tracing::info!(
                connection = %request.connection,
                "connection token lacks required scopes, re-consent needed"
            );
            return Err(self.not_linked(&request.connection, &request.required_scopes));
        }

        Ok(token)
    }

    fn connect_endpoint(&self) -> &str {
        &self.connect_endpoint
    }
}

fn is_not_linked(code: &str, description: Option<&str>) -> bool {
    if NOT_LINKED_CODES.contains(&code) {
        return true;
    }

    matches!(code, "access_denied" | "unauthorized" | "invalid_grant")
        && description
            .map(|d| d.to_ascii_lowercase())
            .is_some_and(|d| {
                d.contains("federated connection") && (d.contains("not found") || d.contains("not linked"))
            })
}

/// Session-based lookup: cached token if fresh and sufficient, otherwise a
/// new exchange using the session's refresh token (then cached).
pub async fn connection_token_for_session(
    provider: &dyn ConnectionTokenProvider,
    store: &dyn SessionStore,
    session: &UserSession,
    connection: &str,
    required_scopes: &[String],
) -> Result<ConnectionToken, AppError> {
    if let Some(cached) = store.connection_token(&session.session_id, connection).await?
        && cached.covers(required_scopes)
    {
        tracing::debug!(connection = %connection, "reusing cached connection token");
        return Ok(cached);
    }

    let request = ConnectionTokenRequest {
        connection: connection.to_string(),
        subject: VaultSubject::RefreshToken(session.refresh_token.clone()),
        required_scopes: required_scopes.to_vec(),
    };

    let token = provider.connection_token(&request).await?;
    store
        .store_connection_token(&session.session_id, token.clone())
        .await?;

    Ok(token)
}
