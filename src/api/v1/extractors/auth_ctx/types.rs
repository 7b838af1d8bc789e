/*
 * Responsibility
 * - Authenticated request context as seen by handlers and tools
 * - Built once by the access middleware from verified claims; read-only afterwards
 *
 * Notes
 * - Scopes here are the ones granted to the *inbound* token. Tokens obtained
 *   through an exchange carry their own, unrelated scope set.
 */
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::services::auth::token::BearerToken;

/// Claims copied into [`AuthContext::extra_claims`] when present.
pub const EXTRA_CLAIM_NAMES: [&str; 5] = ["sub", "azp", "name", "email", "client_id"];

#[derive(Debug, Clone)]
pub struct AuthContext {
    subject: String,
    client_id: String,
    scopes: BTreeSet<String>,
    token: BearerToken,
    expires_at: Option<DateTime<Utc>>,
    extra_claims: serde_json::Map<String, Value>,
}

impl AuthContext {
    pub(crate) fn new(
        subject: String,
        client_id: String,
        scopes: BTreeSet<String>,
        token: BearerToken,
        expires_at: Option<DateTime<Utc>>,
        extra_claims: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            subject,
            client_id,
            scopes,
            token,
            expires_at,
            extra_claims,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// The verified inbound token, used as the subject of token exchanges.
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn extra_claims(&self) -> &serde_json::Map<String, Value> {
        &self.extra_claims
    }

    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.extra_claims.get(name).and_then(Value::as_str)
    }
}
