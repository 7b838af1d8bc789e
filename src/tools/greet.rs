use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::upstream::PRIVATE_SCOPE_PATH;
use crate::api::v1::dto::mcp::CallToolResult;
use crate::error::AppError;
use crate::services::auth::scope::RequiredScopes;

use super::{Tool, ToolContext, ToolSpec, read_only};

#[derive(Debug, Default, Deserialize)]
struct GreetArgs {
    #[serde(default)]
    name: Option<String>,
}

/// Exchanges the caller's token for the upstream API audience and greets
/// with what the upstream API says about the caller.
pub struct Greet {
    spec: ToolSpec,
    upstream_url: String,
}

impl Greet {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            spec: ToolSpec {
                name: "greet",
                title: "Greet User with Custom Token Exchange",
                description: "Greet a user with personalized authentication information retrieved from an upstream API using Custom Token Exchange.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "The name of the person to greet"}
                    }
                }),
                annotations: read_only("Greet User with Custom Token Exchange"),
                required_scopes: RequiredScopes::new(["tool:greet"]),
            },
            upstream_url: format!("{}{}", api_base_url.trim_end_matches('/'), PRIVATE_SCOPE_PATH),
        }
    }
}

#[async_trait]
impl Tool for Greet {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, ctx: &ToolContext<'_>, arguments: Value) -> Result<CallToolResult, AppError> {
        let args: GreetArgs = if arguments.is_null() {
            GreetArgs::default()
        } else {
            serde_json::from_value(arguments)
                .map_err(|e| AppError::bad_request(format!("invalid greet arguments: {}", e)))?
        };
        let name = args
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "there".to_string());
        let sub = ctx.auth.subject();

        tracing::info!(sub = %sub, "greet tool invoked");

        let exchanged = ctx.exchange.exchange().await?;
        let upstream = ctx
            .downstream
            .get_json(&self.upstream_url, &exchanged.access_token)
            .await?;

        tracing::debug!(upstream = %upstream, "upstream API response");

        let pretty = serde_json::to_string_pretty(&upstream).unwrap_or_else(|_| upstream.to_string());
        Ok(CallToolResult::text(format!(
            "Hello, {} ({})!\nUpstream API Response: {}",
            name, sub, pretty
        )))
    }
}
