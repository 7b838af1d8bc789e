use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::api::v1::dto::mcp::CallToolResult;
use crate::error::AppError;
use crate::services::auth::scope::RequiredScopes;
use crate::services::calendar::{self, EventWindow};
use crate::services::exchange::{ConnectionTokenRequest, VaultSubject};

use super::{Tool, ToolContext, ToolSpec, no_arguments, read_only};

/// Today's events from the user's linked Google calendar, via Token Vault.
pub struct CalendarSummary {
    spec: ToolSpec,
    connection: String,
    events_url: String,
}

impl CalendarSummary {
    pub fn new(connection: &str, events_url: &str) -> Self {
        let mut annotations = read_only("What's on my Calendar?");
        annotations.open_world_hint = true;

        Self {
            spec: ToolSpec {
                name: "calendar_summary",
                title: "What's on my Calendar?",
                description: "Returns a summary of the user's Google Calendar events",
                input_schema: no_arguments(),
                annotations,
                required_scopes: RequiredScopes::new(["tool:calendar_summary"]),
            },
            connection: connection.to_string(),
            events_url: events_url.to_string(),
        }
    }
}

#[async_trait]
impl Tool for CalendarSummary {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, ctx: &ToolContext<'_>, _arguments: Value) -> Result<CallToolResult, AppError> {
        let request = ConnectionTokenRequest {
            connection: self.connection.clone(),
            subject: VaultSubject::AccessToken(ctx.auth.token().clone()),
            required_scopes: Vec::new(),
        };
        let token = ctx.vault.connection_token(&request).await?;

        let now = Utc::now();
        let window = EventWindow::day_of(now);
        let events = match calendar::list_events(ctx.downstream, &self.events_url, &token.access_token, window).await {
            Ok(events) => events,
            // revoked at the provider: the user has to link again
            Err(err) if err.is_unauthorized() => {
                return Err(ctx.vault.not_linked(&self.connection, &[]).into());
            }
            Err(err) => return Err(err.into()),
        };

        Ok(CallToolResult::text(calendar::summarize(window.start, &events)))
    }
}
