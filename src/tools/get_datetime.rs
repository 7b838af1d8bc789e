use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::api::v1::dto::mcp::CallToolResult;
use crate::error::AppError;
use crate::services::auth::scope::RequiredScopes;

use super::{Tool, ToolContext, ToolSpec, no_arguments, read_only};

/// Current UTC time. Needs no scope.
pub struct GetDatetime {
    spec: ToolSpec,
}

impl GetDatetime {
    pub fn new() -> Self {
        Self {
            spec: ToolSpec {
                name: "get_datetime",
                title: "Get DateTime Tool",
                description: "Returns the current UTC date and time",
                input_schema: no_arguments(),
                annotations: read_only("Get DateTime Tool"),
                required_scopes: RequiredScopes::none(),
            },
        }
    }
}

#[async_trait]
impl Tool for GetDatetime {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, _ctx: &ToolContext<'_>, _arguments: Value) -> Result<CallToolResult, AppError> {
        Ok(CallToolResult::text(
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }
}
