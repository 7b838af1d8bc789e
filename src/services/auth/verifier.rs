//! Access-token verification.
//!
//! [`TokenVerifier`] is the seam to the identity provider: it checks
//! signature, `exp`/`nbf`, issuer and audience, then the caller's list of
//! required claims, and hands back the verified claim set. [`JwtVerifier`]
//! implements it with `jsonwebtoken`, either against the tenant's JWKS
//! (RS256, cached) or against a static key for tests and local runs.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::HttpSettings;

/// Verified claims, exactly as carried by the token.
pub type Claims = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token header has no 'kid'")]
    MissingKeyId,
    #[error("no signing key for kid '{0}'")]
    UnknownKeyId(String),
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token audience does not match")]
    InvalidAudience,
    #[error("token issuer does not match")]
    InvalidIssuer,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("missing required claim '{0}'")]
    MissingClaim(String),
    #[error("signing keys unavailable: {0}")]
    KeySource(String),
    #[error("jwt verification failed: {0}")]
    Jwt(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Jwt(e),
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and require every name in `required_claims` to be
    /// present and non-empty.
    async fn verify(&self, token: &str, required_claims: &[&str]) -> Result<Claims, VerifyError>;
}

#[derive(Clone)]
enum KeySource {
    Static(DecodingKey),
    Jwks(JwksCache),
}

/// JWKS fetched from the provider, shared read-only between requests and
/// refreshed when stale or when a token names a `kid` we have not seen.
#[derive(Clone)]
struct JwksCache {
    uri: String,
    http: reqwest::Client,
    ttl: Duration,
    cached: Arc<RwLock<Option<CachedKeys>>>,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

impl JwksCache {
    async fn key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        {
            let cached = self.cached.read().await;
            if let Some(cached) = cached.as_ref()
                && cached.is_fresh(self.ttl)
                && let Some(key) = cached.keys.get(kid)
            {
                return Ok(key.clone());
            }
        }

        // stale cache or unseen kid (key rotation)
        let keys = self.fetch().await?;
        let key = keys.get(kid).cloned();

        *self.cached.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key.ok_or_else(|| VerifyError::UnknownKeyId(kid.to_string()))
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, VerifyError> {
        tracing::debug!(jwks_uri = %self.uri, "fetching JWKS");

        let response = self
            .http
            .get(&self.uri)
            .send()
            .await
            .map_err(|e| VerifyError::KeySource(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerifyError::KeySource(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeySource(format!("unreadable JWKS: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => tracing::warn!(kid = %kid, error = %err, "skipping unusable JWK"),
            }
        }

        tracing::info!(jwks_uri = %self.uri, keys = keys.len(), "cached JWKS");
        Ok(keys)
    }
}

/// `jsonwebtoken`-backed verifier.
///
/// Key material is never printed via `Debug`.
#[derive(Clone)]
pub struct JwtVerifier {
    keys: KeySource,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.keys {
            KeySource::Static(_) => "static".to_string(),
            KeySource::Jwks(cache) => cache.uri.clone(),
        };
        f.debug_struct("JwtVerifier")
            .field("keys", &source)
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    /// RS256 tokens signed by keys published at `jwks_uri`.
    pub fn jwks(
        jwks_uri: impl Into<String>,
        issuer: &str,
        audience: &str,
        settings: &HttpSettings,
    ) -> Result<Self, VerifyError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| VerifyError::KeySource(e.to_string()))?;

        Ok(Self {
            keys: KeySource::Jwks(JwksCache {
                uri: jwks_uri.into(),
                http,
                ttl: settings.jwks_cache_ttl,
                cached: Arc::new(RwLock::new(None)),
            }),
            validation: Self::validation(Algorithm::RS256, issuer, audience, settings.leeway_seconds),
        })
    }

    /// HS256 tokens signed with a shared secret.
    pub fn from_secret(secret: &[u8], issuer: &str, audience: &str, leeway_seconds: u64) -> Self {
        Self {
            keys: KeySource::Static(DecodingKey::from_secret(secret)),
            validation: Self::validation(Algorithm::HS256, issuer, audience, leeway_seconds),
        }
    }

    fn validation(algorithm: Algorithm, issuer: &str, audience: &str, leeway: u64) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = leeway;
        validation
    }

    async fn decoding_key(&self, token: &str) -> Result<DecodingKey, VerifyError> {
        match &self.keys {
            KeySource::Static(key) => Ok(key.clone()),
            KeySource::Jwks(cache) => {
                let header = jsonwebtoken::decode_header(token)
                    .map_err(|e| VerifyError::Malformed(e.to_string()))?;
                let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;
                cache.key(&kid).await
            }
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str, required_claims: &[&str]) -> Result<Claims, VerifyError> {
        jsonwebtoken::decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;

        let key = self.decoding_key(token).await?;
        let data = jsonwebtoken::decode::<Claims>(token, &key, &self.validation)?;
        let claims = data.claims;

        for name in required_claims {
            if !claim_is_present(&claims, name) {
                return Err(VerifyError::MissingClaim((*name).to_string()));
            }
        }

        Ok(claims)
    }
}

fn claim_is_present(claims: &Claims, name: &str) -> bool {
    match claims.get(name) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}
