use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::v1::dto::mcp::CallToolResult;
use crate::error::AppError;
use crate::services::auth::scope::RequiredScopes;

use super::{Tool, ToolContext, ToolSpec, no_arguments, read_only};

/// Echoes the caller's identity claims and inbound scopes.
pub struct Whoami {
    spec: ToolSpec,
}

impl Whoami {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec {
                name: "whoami",
                title: "Who Am I Tool",
                description: "Returns information about the authenticated user",
                input_schema: no_arguments(),
                annotations: read_only("Who Am I Tool"),
                required_scopes: RequiredScopes::new(["tool:whoami"]),
            },
        }
    }
}

#[async_trait]
impl Tool for Whoami {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, ctx: &ToolContext<'_>, _arguments: Value) -> Result<CallToolResult, AppError> {
        let body = json!({
            "user": ctx.auth.extra_claims(),
            "scopes": ctx.auth.scopes(),
        });
        Ok(CallToolResult::json(&body))
    }
}
