/*
 * Responsibility
 * - Application-wide AppError taxonomy
 * - IntoResponse (HTTP status, JSON error body, WWW-Authenticate challenge)
 * - Conversions from scope / exchange / downstream / session errors
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::scope::ScopeError;
use crate::services::downstream::DownstreamError;
use crate::services::exchange::ExchangeError;
use crate::services::session::SessionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_params: Option<ConnectParams>,
}

/// Everything a client needs to start the account-linking flow.
#[derive(Debug, Serialize)]
pub struct ConnectParams {
    pub connection: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// No `Authorization` header, or not a `Bearer` credential.
    #[error("malformed authorization request: {reason}")]
    MalformedAuthorizationRequest {
        reason: &'static str,
        resource_metadata: Option<String>,
    },
    /// Token present but rejected by the verifier.
    #[error("authentication required")]
    AuthenticationRequired { resource_metadata: Option<String> },
    #[error("insufficient scope, missing: {}", .missing.join(" "))]
    InsufficientScope { missing: Vec<String> },
    #[error("token exchange failed: {code}")]
    ExchangeFailed { code: String },
    #[error("connection '{connection}' is not linked")]
    ConnectionNotLinked {
        connection: String,
        connect_endpoint: String,
        required_scopes: Vec<String>,
    },
    #[error("downstream unavailable (timed out: {timed_out})")]
    DownstreamUnavailable { timed_out: bool },
    #[error("login required")]
    SessionRequired,
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Stable machine-readable code, also used as the `error` body field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MalformedAuthorizationRequest { .. } | AppError::AuthenticationRequired { .. } => {
                "invalid_token"
            }
            AppError::InsufficientScope { .. } => "insufficient_scope",
            AppError::ExchangeFailed { .. } => "exchange_failed",
            AppError::ConnectionNotLinked { .. } => "connection_not_linked",
            AppError::DownstreamUnavailable { .. } => "downstream_unavailable",
            AppError::SessionRequired => "login_required",
            AppError::BadRequest(_) => "invalid_request",
            AppError::Internal => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedAuthorizationRequest { .. }
            | AppError::AuthenticationRequired { .. }
            | AppError::SessionRequired => StatusCode::UNAUTHORIZED,
            AppError::InsufficientScope { .. } | AppError::ConnectionNotLinked { .. } => {
                StatusCode::FORBIDDEN
            }
            AppError::ExchangeFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::DownstreamUnavailable { timed_out: true } => StatusCode::GATEWAY_TIMEOUT,
            AppError::DownstreamUnavailable { timed_out: false } => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn description(&self) -> String {
        match self {
            AppError::MalformedAuthorizationRequest { reason, .. } => (*reason).to_string(),
            AppError::AuthenticationRequired { .. } => "Invalid or expired access token".to_string(),
            AppError::InsufficientScope { missing } => {
                format!("Missing required scope: {}", missing.join(" "))
            }
            // upstream detail stays in the server log
            AppError::ExchangeFailed { .. } => "Token exchange was denied".to_string(),
            AppError::ConnectionNotLinked { connection, .. } => {
                format!("Please connect your {} account first", connection)
            }
            AppError::DownstreamUnavailable { timed_out: true } => {
                "Upstream service did not respond in time".to_string()
            }
            AppError::DownstreamUnavailable { timed_out: false } => {
                "Upstream service is unavailable".to_string()
            }
            AppError::SessionRequired => "A logged-in session is required".to_string(),
            AppError::BadRequest(message) => message.clone(),
            AppError::Internal => "Internal server error".to_string(),
        }
    }

    fn challenge(&self) -> Option<String> {
        match self {
            AppError::MalformedAuthorizationRequest {
                resource_metadata, ..
            }
            | AppError::AuthenticationRequired { resource_metadata } => {
                let mut value = format!(
                    "Bearer error=\"invalid_token\", error_description=\"{}\"",
                    self.description()
                );
                if let Some(url) = resource_metadata {
                    value.push_str(&format!(", resource_metadata=\"{}\"", url));
                }
                Some(value)
            }
            AppError::InsufficientScope { missing } => Some(format!(
                "Bearer error=\"insufficient_scope\", scope=\"{}\"",
                missing.join(" ")
            )),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut body = ErrorResponse {
            error: self.code(),
            error_description: self.description(),
            scope: None,
            connection: None,
            connect_endpoint: None,
            connect_params: None,
        };

        match &self {
            AppError::InsufficientScope { missing } => body.scope = Some(missing.join(" ")),
            AppError::ConnectionNotLinked {
                connection,
                connect_endpoint,
                required_scopes,
            } => {
                body.connection = Some(connection.clone());
                body.connect_endpoint = Some(connect_endpoint.clone());
                body.connect_params = Some(ConnectParams {
                    connection: connection.clone(),
                    scopes: required_scopes.clone(),
                });
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(value) = self.challenge().and_then(|v| HeaderValue::from_str(&v).ok()) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

impl From<ScopeError> for AppError {
    fn from(e: ScopeError) -> Self {
        AppError::InsufficientScope { missing: e.missing }
    }
}

impl From<ExchangeError> for AppError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::NotLinked {
                connection,
                connect_endpoint,
                required_scopes,
            } => AppError::ConnectionNotLinked {
                connection,
                connect_endpoint,
                required_scopes,
            },
            ExchangeError::Rejected { code, .. } => AppError::ExchangeFailed { code },
            ExchangeError::Timeout => AppError::ExchangeFailed {
                code: "timeout".to_string(),
            },
            ExchangeError::Transport(_) => AppError::ExchangeFailed {
                code: "temporarily_unavailable".to_string(),
            },
            ExchangeError::InvalidResponse(_) => AppError::ExchangeFailed {
                code: "invalid_response".to_string(),
            },
        }
    }
}

impl From<DownstreamError> for AppError {
    fn from(e: DownstreamError) -> Self {
        AppError::DownstreamUnavailable {
            timed_out: matches!(e, DownstreamError::Timeout),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(_: SessionError) -> Self {
        AppError::Internal
    }
}
