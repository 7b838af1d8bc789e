//! Confidential-client POSTs to the provider's `/oauth/token`.
use crate::config::HttpSettings;

use super::types::{ExchangeError, ProviderErrorBody, TokenResponse};

#[derive(Clone)]
pub struct TokenEndpoint {
    url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEndpoint")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenEndpoint {
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        settings: &HttpSettings,
    ) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http,
        })
    }

    /// Send one grant; client credentials are added here.
    pub(crate) async fn grant(
        &self,
        mut form: Vec<(&'static str, String)>,
    ) -> Result<TokenResponse, ExchangeError> {
        form.push(("client_id", self.client_id.clone()));
        form.push(("client_secret", self.client_secret.clone()));

        let response = self
            .http
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExchangeError::Timeout
                } else {
                    ExchangeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, description) = match serde_json::from_str::<ProviderErrorBody>(&text) {
                Ok(body) => (body.error, body.error_description),
                Err(_) => ("server_error".to_string(), None),
            };

            tracing::warn!(
                status = status.as_u16(),
                code = %code,
                description = description.as_deref().unwrap_or(""),
                "token endpoint rejected grant"
            );

            return Err(ExchangeError::Rejected {
                code,
                description,
                status: status.as_u16(),
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))
    }
}
