/*
 * Responsibility
 * - MCP tool trait and registry
 * - Every tool declares its required scopes at registration; the registry
 *   runs the scope guard before any tool body
 * - Aggregate required scopes for the protected resource metadata
 */
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::v1::dto::mcp::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::api::v1::extractors::AuthContext;
use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::scope::{self, RequiredScopes};
use crate::services::downstream::DownstreamClient;
use crate::services::exchange::{BoundExchange, ConnectionTokenProvider};

mod calendar_summary;
mod get_datetime;
mod greet;
mod whoami;

pub use calendar_summary::CalendarSummary;
pub use get_datetime::GetDatetime;
pub use greet::Greet;
pub use whoami::Whoami;

/// What a tool body gets to work with, passed explicitly per call.
pub struct ToolContext<'a> {
    pub auth: &'a AuthContext,
    pub exchange: &'a BoundExchange,
    pub vault: &'a dyn ConnectionTokenProvider,
    pub downstream: &'a DownstreamClient,
}

/// Static registration data for a tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
    pub required_scopes: RequiredScopes,
}

impl ToolSpec {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            title: Some(self.title.to_string()),
            description: self.description.to_string(),
            input_schema: self.input_schema.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

/// Read-only, idempotent, no side effects.
pub(crate) fn read_only(title: &str) -> ToolAnnotations {
    ToolAnnotations {
        title: Some(title.to_string()),
        read_only_hint: true,
        destructive_hint: false,
        idempotent_hint: true,
        open_world_hint: false,
    }
}

pub(crate) fn no_arguments() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    /// Invalid arguments come back as `AppError::BadRequest`.
    async fn call(&self, ctx: &ToolContext<'_>, arguments: Value) -> Result<CallToolResult, AppError>;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .register(Whoami::new())
            .register(Greet::new(&config.api_base_url))
            .register(GetDatetime::new())
            .register(CalendarSummary::new(
                &config.vault_connection,
                &config.calendar_api_url,
            ))
    }

    pub fn register(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.spec().name == name)
    }

    /// Tools whose required scopes the caller holds.
    pub fn visible_to(&self, auth: &AuthContext) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|t| t.spec().required_scopes.is_satisfied_by(auth.scopes()))
            .map(|t| t.spec().definition())
            .collect()
    }

    pub fn supported_scopes(&self) -> Vec<String> {
        scope::supported_scopes(self.tools.iter().map(|t| &t.spec().required_scopes))
    }

    /// Scope guard, then the tool body.
    pub async fn call(
        &self,
        tool: &dyn Tool,
        ctx: &ToolContext<'_>,
        arguments: Value,
    ) -> Result<CallToolResult, AppError> {
        scope::authorize(ctx.auth, &tool.spec().required_scopes)?;

        tracing::info!(tool = tool.spec().name, sub = %ctx.auth.subject(), "tool call");
        tool.call(ctx, arguments).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use crate::services::auth::context::build_auth_context;
    use crate::services::auth::token::BearerToken;
    use crate::services::exchange::{
        ConnectionToken, ConnectionTokenRequest, ExchangeError, ExchangeProfile, ExchangeRequest,
        ExchangeResult, TokenExchanger,
    };
    use serde_json::json;

    pub(crate) fn auth(scope: &str) -> AuthContext {
        let claims = json!({
            "sub": "auth0|123",
            "azp": "client-abc",
            "name": "Ada",
            "email": "ada@example.com",
            "scope": scope
        });
        build_auth_context(BearerToken::new("inbound"), claims.as_object().unwrap()).unwrap()
    }

    /// Exchanger that must never be reached.
    pub(crate) struct Unreachable;

    #[async_trait]
    impl TokenExchanger for Unreachable {
        async fn exchange(&self, _: &ExchangeRequest) -> Result<ExchangeResult, ExchangeError> {
            panic!("exchange must not run")
        }
    }

    #[async_trait]
    impl ConnectionTokenProvider for Unreachable {
        async fn connection_token(
            &self,
            _: &ConnectionTokenRequest,
        ) -> Result<ConnectionToken, ExchangeError> {
            panic!("vault must not run")
        }

        fn connect_endpoint(&self) -> &str {
            "/auth/connect"
        }
    }

    pub(crate) fn bound(exchanger: Arc<dyn TokenExchanger>) -> BoundExchange {
        BoundExchange::new(
            exchanger,
            ExchangeProfile {
                subject_token_type: "urn:mcp:token".into(),
                audience: "https://api.example/private".into(),
                scope: None,
            },
            BearerToken::new("inbound"),
        )
    }

    pub(crate) fn downstream() -> DownstreamClient {
        DownstreamClient::new(&HttpSettings::default()).unwrap()
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .register(Whoami::new())
            .register(Greet::new("http://127.0.0.1:9"))
            .register(GetDatetime::new())
            .register(CalendarSummary::new("google-oauth2", "http://127.0.0.1:9/events"))
    }

    #[test]
    fn supported_scopes_covers_every_tool() {
        assert_eq!(
            registry().supported_scopes(),
            vec!["tool:calendar_summary", "tool:greet", "tool:whoami"]
        );
    }

    #[test]
    fn listing_hides_tools_the_caller_cannot_call() {
        let names: Vec<_> = registry()
            .visible_to(&auth("tool:whoami"))
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["whoami", "get_datetime"]);
    }

    #[tokio::test]
    async fn guard_runs_before_the_tool_body() {
        let registry = registry();
        let auth = auth("tool:whoami");
        let exchange = bound(Arc::new(Unreachable));
        let downstream = downstream();
        let ctx = ToolContext {
            auth: &auth,
            exchange: &exchange,
            vault: &Unreachable,
            downstream: &downstream,
        };

        let greet = registry.get("greet").unwrap();
        let err = registry
            .call(greet.as_ref(), &ctx, json!({"name": "Ada"}))
            .await
            .unwrap_err();

        match err {
            AppError::InsufficientScope { missing } => assert_eq!(missing, vec!["tool:greet"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
