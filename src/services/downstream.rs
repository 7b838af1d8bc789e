//! Downstream invoker: exactly one outbound GET with an exchanged token,
//! JSON body handed back untouched.
use serde_json::Value;
use thiserror::Error;

use crate::config::HttpSettings;
use crate::services::auth::token::BearerToken;

#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("downstream request timed out")]
    Timeout,
    #[error("downstream request failed: {0}")]
    Transport(String),
    #[error("downstream returned {status}")]
    Status { status: u16 },
    #[error("downstream body is not JSON: {0}")]
    InvalidBody(String),
}

impl DownstreamError {
    /// The resource server refused the token itself.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DownstreamError::Status { status: 401 })
    }
}

#[derive(Debug, Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
}

impl DownstreamClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, DownstreamError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DownstreamError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    pub async fn get_json(&self, url: &str, token: &BearerToken) -> Result<Value, DownstreamError> {
        self.get_json_with_query(url, token, &[]).await
    }

    pub async fn get_json_with_query(
        &self,
        url: &str,
        token: &BearerToken,
        query: &[(&str, String)],
    ) -> Result<Value, DownstreamError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, token.authorization_value())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "downstream call failed");
            return Err(DownstreamError::Status {
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                DownstreamError::Timeout
            } else {
                DownstreamError::InvalidBody(e.to_string())
            }
        })
    }
}

fn classify(e: reqwest::Error) -> DownstreamError {
    if e.is_timeout() {
        DownstreamError::Timeout
    } else {
        DownstreamError::Transport(e.to_string())
    }
}
