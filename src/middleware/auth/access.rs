//! Bearer access-token gate → AuthContext in request extensions.
//!
//! Runs before any protected handler:
//! - `Authorization` must be a `Bearer` credential (scheme case-insensitive),
//!   otherwise the request fails before the verifier is consulted
//! - the verifier checks signature/expiry/issuer/audience and requires `sub`
//! - `client_id` (or `azp`) must be present
//! - the resulting [`AuthContext`], and optionally a [`BoundExchange`] for the
//!   same token, are inserted into the request extensions
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::context::build_auth_context;
use crate::services::auth::token::BearerToken;
use crate::services::auth::verifier::TokenVerifier;
use crate::services::exchange::{BoundExchange, ExchangeProfile, TokenExchanger};

const REQUIRED_CLAIMS: [&str; 1] = ["sub"];

/// State of the access middleware.
#[derive(Clone)]
pub struct AccessGuard {
    verifier: Arc<dyn TokenVerifier>,
    resource_metadata: Option<String>,
    exchange: Option<(Arc<dyn TokenExchanger>, ExchangeProfile)>,
}

impl AccessGuard {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            resource_metadata: None,
            exchange: None,
        }
    }

    /// Advertise the metadata document in `WWW-Authenticate` challenges.
    pub fn with_resource_metadata(mut self, url: impl Into<String>) -> Self {
        self.resource_metadata = Some(url.into());
        self
    }

    /// Attach a [`BoundExchange`] to every authenticated request.
    pub fn with_exchange(mut self, exchanger: Arc<dyn TokenExchanger>, profile: ExchangeProfile) -> Self {
        self.exchange = Some((exchanger, profile));
        self
    }

    fn malformed(&self, reason: &'static str) -> AppError {
        AppError::MalformedAuthorizationRequest {
            reason,
            resource_metadata: self.resource_metadata.clone(),
        }
    }

    fn unauthenticated(&self) -> AppError {
        AppError::AuthenticationRequired {
            resource_metadata: self.resource_metadata.clone(),
        }
    }
}

/// Protect every route of `router`.
///
/// ```ignore
/// let mcp = Router::new().route("/mcp", post(mcp_handler));
/// let mcp = middleware::auth::access::apply(mcp, guard);
/// ```
pub fn apply<S>(router: Router<S>, guard: AccessGuard) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(guard, access_middleware))
}

/// `Bearer <token>` with a case-insensitive scheme; `None` otherwise.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, rest) = value.split_at_checked(7)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

async fn access_middleware(
    State(guard): State<AccessGuard>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| guard.malformed("Missing Authorization header"))?
        .to_str()
        .map_err(|_| guard.malformed("Invalid Authorization header format"))?;

    let token = bearer_token(header_value)
        .map(BearerToken::new)
        .ok_or_else(|| guard.malformed("Invalid Authorization header format"))?;

    let claims = match guard.verifier.verify(token.expose(), &REQUIRED_CLAIMS).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::info!(
                error = %err,
                token = %token.fingerprint(),
                "access token verification failed"
            );
            return Err(guard.unauthenticated());
        }
    };

    let auth_ctx = match build_auth_context(token.clone(), &claims) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::info!(error = %err, token = %token.fingerprint(), "access token rejected");
            return Err(guard.unauthenticated());
        }
    };

    tracing::debug!(
        sub = %auth_ctx.subject(),
        client_id = %auth_ctx.client_id(),
        token = %token.fingerprint(),
        "authenticated"
    );

    // middleware → extractor hand-off
    if let Some((exchanger, profile)) = &guard.exchange {
        req.extensions_mut()
            .insert(BoundExchange::new(exchanger.clone(), profile.clone(), token));
    }
    req.extensions_mut().insert(auth_ctx);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::api::v1::extractors::AuthContext;
    use crate::services::auth::verifier::{Claims, VerifyError};
    use async_trait::async_trait;
    use axum::{Extension, http::StatusCode, routing::get};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct Fixed {
        calls: Arc<AtomicUsize>,
        claims: Option<Value>,
    }

    #[async_trait]
    impl TokenVerifier for Fixed {
        async fn verify(&self, token: &str, required: &[&str]) -> Result<Claims, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(token, "good-token");
            assert!(required.contains(&"sub"));
            match &self.claims {
                Some(claims) => Ok(claims.as_object().unwrap().clone()),
                None => Err(VerifyError::Expired),
            }
        }
    }

    fn app(claims: Option<Value>) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let guard = AccessGuard::new(Arc::new(Fixed {
            calls: calls.clone(),
            claims,
        }))
        .with_resource_metadata("http://mcp/.well-known/oauth-protected-resource");

        let router = Router::new().route(
            "/",
            get(|Extension(ctx): Extension<AuthContext>| async move { ctx.subject().to_string() }),
        );
        (apply(router, guard), calls)
    }

    fn request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bEaReR   abc  "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bear"), None);
    }

    #[tokio::test]
    async fn missing_header_never_reaches_the_verifier() {
        let (app, calls) = app(Some(json!({"sub": "s", "azp": "c"})));
        let response = app.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.contains("error=\"invalid_token\""));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_malformed() {
        let (app, calls) = app(Some(json!({"sub": "s", "azp": "c"})));
        let response = app.oneshot(request(Some("Basic Zm9vOmJhcg=="))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_verification_is_unauthorized() {
        let (app, calls) = app(None);
        let response = app.oneshot(request(Some("Bearer good-token"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_without_client_identity_is_unauthorized() {
        let (app, _) = app(Some(json!({"sub": "s", "scope": "tool:whoami"})));
        let response = app.oneshot(request(Some("Bearer good-token"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn verified_token_reaches_the_handler() {
        let (app, _) = app(Some(json!({"sub": "auth0|123", "client_id": "c"})));
        let response = app.oneshot(request(Some("bearer  good-token "))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"auth0|123");
    }
}
