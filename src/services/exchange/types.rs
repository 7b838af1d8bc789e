use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::services::auth::context::parse_scopes;
use crate::services::auth::token::BearerToken;

pub const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const FEDERATED_CONNECTION_GRANT: &str =
    "urn:auth0:params:oauth:grant-type:token-exchange:federated-connection-access-token";
pub const FEDERATED_CONNECTION_TOKEN_TYPE: &str =
    "http://auth0.com/oauth/token-type/federated-connection-access-token";
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";
pub const REFRESH_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:refresh_token";

/// Custom Token Exchange input.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub subject_token: BearerToken,
    pub subject_token_type: String,
    pub target_audience: String,
    pub requested_scope: Option<String>,
}

/// A freshly exchanged token. Used for one downstream call, never stored.
#[derive(Debug, Clone)]
pub struct ExchangeResult {
    pub access_token: BearerToken,
    pub granted_scope: BTreeSet<String>,
    pub expires_in: Option<u64>,
}

/// What the Token Vault exchange uses as its subject.
#[derive(Debug, Clone)]
pub enum VaultSubject {
    /// Inbound API access token (MCP tool path).
    AccessToken(BearerToken),
    /// The logged-in session's refresh token (web path).
    RefreshToken(BearerToken),
}

impl VaultSubject {
    pub fn token(&self) -> &BearerToken {
        match self {
            VaultSubject::AccessToken(t) | VaultSubject::RefreshToken(t) => t,
        }
    }

    pub fn token_type(&self) -> &'static str {
        match self {
            VaultSubject::AccessToken(_) => ACCESS_TOKEN_TYPE,
            VaultSubject::RefreshToken(_) => REFRESH_TOKEN_TYPE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionTokenRequest {
    pub connection: String,
    pub subject: VaultSubject,
    /// Scopes the connection token must carry; missing ones mean the user has to re-consent.
    pub required_scopes: Vec<String>,
}

/// Access token for a third-party connection (e.g. Google).
#[derive(Debug, Clone)]
pub struct ConnectionToken {
    pub connection: String,
    pub access_token: BearerToken,
    /// `None` when the provider did not echo `scope`.
    pub scopes: Option<BTreeSet<String>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ConnectionToken {
    /// Reuse margin before expiry.
    pub const EXPIRY_MARGIN_SECONDS: i64 = 30;

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp - Duration::seconds(Self::EXPIRY_MARGIN_SECONDS) > now,
            None => false,
        }
    }

    /// Without a scope echo there is nothing to compare against.
    pub fn covers(&self, scopes: &[String]) -> bool {
        match &self.scopes {
            Some(granted) => scopes.iter().all(|s| granted.contains(s)),
            None => true,
        }
    }
}

/// `now + expires_in`, or `None` when the provider's value does not fit.
pub(crate) fn expiry_after(now: DateTime<Utc>, expires_in: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(expires_in).ok()?;
    now.checked_add_signed(Duration::try_seconds(seconds)?)
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token endpoint rejected the exchange ({status}): {code}")]
    Rejected {
        code: String,
        description: Option<String>,
        status: u16,
    },
    #[error("connection '{connection}' is not linked")]
    NotLinked {
        connection: String,
        connect_endpoint: String,
        required_scopes: Vec<String>,
    },
    #[error("token endpoint timed out")]
    Timeout,
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    #[error("unexpected token endpoint response: {0}")]
    InvalidResponse(String),
}

/// Successful `/oauth/token` body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    pub(crate) fn granted_scope(&self) -> BTreeSet<String> {
        self.scope.as_deref().map(parse_scopes).unwrap_or_default()
    }
}

/// RFC 6749 §5.2 error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
