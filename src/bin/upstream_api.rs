/*
 * Responsibility
 * - Demo downstream API that only accepts exchanged tokens
 * - hand off to app::run_upstream() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    mcp_token_bridge::app::run_upstream().await
}
