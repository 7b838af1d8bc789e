/*
 * Responsibility
 * - Custom Token Exchange: trade the inbound verified token for one issued
 *   to the downstream API's audience
 * - BoundExchange: the exchange handle the access middleware attaches to a
 *   request, already carrying that request's verified token
 *
 * Notes
 * - Results are never cached; two exchanges of the same subject are two grants.
 * - A requested scope the profile does not grant is whatever the provider
 *   answers (error or narrowed token); nothing is second-guessed here.
 */
use std::sync::Arc;

use async_trait::async_trait;

use crate::services::auth::token::BearerToken;

use super::endpoint::TokenEndpoint;
use super::types::{ExchangeError, ExchangeRequest, ExchangeResult, TOKEN_EXCHANGE_GRANT};

#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<ExchangeResult, ExchangeError>;
}

#[derive(Debug, Clone)]
pub struct CustomTokenExchange {
    endpoint: TokenEndpoint,
}

impl CustomTokenExchange {
    pub fn new(endpoint: TokenEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl TokenExchanger for CustomTokenExchange {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<ExchangeResult, ExchangeError> {
        let mut form = vec![
            ("grant_type", TOKEN_EXCHANGE_GRANT.to_string()),
            ("subject_token", request.subject_token.expose().to_string()),
            ("subject_token_type", request.subject_token_type.clone()),
            ("audience", request.target_audience.clone()),
        ];
        if let Some(scope) = &request.requested_scope {
            form.push(("scope", scope.clone()));
        }

        tracing::debug!(
            subject = %request.subject_token.fingerprint(),
            audience = %request.target_audience,
            "custom token exchange"
        );

        let response = self.endpoint.grant(form).await?;
        let granted_scope = response.granted_scope();

        Ok(ExchangeResult {
            access_token: BearerToken::new(response.access_token),
            granted_scope,
            expires_in: response.expires_in,
        })
    }
}

/// Static part of an exchange request, fixed by configuration.
#[derive(Debug, Clone)]
pub struct ExchangeProfile {
    pub subject_token_type: String,
    pub audience: String,
    pub scope: Option<String>,
}

impl ExchangeProfile {
    pub fn request_for(&self, subject_token: BearerToken) -> ExchangeRequest {
        ExchangeRequest {
            subject_token,
            subject_token_type: self.subject_token_type.clone(),
            target_audience: self.audience.clone(),
            requested_scope: self.scope.clone(),
        }
    }
}

/// Exchange client pre-bound to one request's verified token.
#[derive(Clone)]
pub struct BoundExchange {
    exchanger: Arc<dyn TokenExchanger>,
    profile: ExchangeProfile,
    subject: BearerToken,
}

impl std::fmt::Debug for BoundExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundExchange")
            .field("profile", &self.profile)
            .field("subject", &self.subject)
            .finish()
    }
}

impl BoundExchange {
    pub fn new(exchanger: Arc<dyn TokenExchanger>, profile: ExchangeProfile, subject: BearerToken) -> Self {
        Self {
            exchanger,
            profile,
            subject,
        }
    }

    /// Exchange for the configured downstream audience.
    pub async fn exchange(&self) -> Result<ExchangeResult, ExchangeError> {
        let request = self.profile.request_for(self.subject.clone());
        self.exchanger.exchange(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile(scope: Option<&str>) -> ExchangeProfile {
        ExchangeProfile {
            subject_token_type: "urn:mcp:token".into(),
            audience: "https://api.example/private".into(),
            scope: scope.map(str::to_string),
        }
    }

    fn exchanger(server: &MockServer) -> Arc<dyn TokenExchanger> {
        let endpoint = TokenEndpoint::new(
            format!("{}/oauth/token", server.uri()),
            "mcp-client",
            "mcp-secret",
            &HttpSettings::default(),
        )
        .unwrap();
        Arc::new(CustomTokenExchange::new(endpoint))
    }

    #[tokio::test]
    async fn sends_token_exchange_grant_and_reads_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Atoken-exchange"))
            .and(body_string_contains("subject_token=inbound-token"))
            .and(body_string_contains("audience=https%3A%2F%2Fapi.example%2Fprivate"))
            .and(body_string_contains("scope=read%3Aprivate"))
            .and(body_string_contains("client_id=mcp-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "exchanged",
                "scope": "read:private",
                "expires_in": 300,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bound = BoundExchange::new(
            exchanger(&server),
            profile(Some("read:private")),
            BearerToken::new("inbound-token"),
        );
        let result = bound.exchange().await.unwrap();

        assert_eq!(result.access_token.expose(), "exchanged");
        assert!(result.granted_scope.contains("read:private"));
        assert_eq!(result.expires_in, Some(300));
    }

    #[tokio::test]
    async fn scope_parameter_is_omitted_when_not_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "x"})))
            .mount(&server)
            .await;

        BoundExchange::new(exchanger(&server), profile(None), BearerToken::new("t"))
            .exchange()
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(!body.contains("scope="));
    }

    #[tokio::test]
    async fn provider_error_code_is_carried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": "unauthorized_client",
                "error_description": "audience not allowed for this profile"
            })))
            .mount(&server)
            .await;

        let err = BoundExchange::new(exchanger(&server), profile(None), BearerToken::new("t"))
            .exchange()
            .await
            .unwrap_err();

        match err {
            ExchangeError::Rejected { code, status, .. } => {
                assert_eq!(code, "unauthorized_client");
                assert_eq!(status, 403);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_exchanges_are_independent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "exchanged",
                "scope": "read:private"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let bound = BoundExchange::new(
            exchanger(&server),
            profile(Some("read:private")),
            BearerToken::new("same-subject"),
        );
        let (first, second) = tokio::join!(bound.exchange(), bound.exchange());
        let (mut first, second) = (first.unwrap(), second.unwrap());

        first.granted_scope.insert("mutated".into());
        assert!(!second.granted_scope.contains("mutated"));
        assert_eq!(second.access_token.expose(), "exchanged");
    }
}
