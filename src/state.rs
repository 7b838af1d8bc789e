/*
 * Responsibility
 * - Shared, read-only application context attached to the Router (AppState)
 *   - verifier, exchange clients, downstream client, tools, session store
 * - Cheap to clone (Arc inside); built once at startup, never mutated
 */
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::auth::AccessGuard;
use crate::services::downstream::DownstreamClient;
use crate::services::exchange::ConnectionTokenProvider;
use crate::services::session::SessionStore;
use crate::tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub access: AccessGuard,
    pub vault: Arc<dyn ConnectionTokenProvider>,
    pub downstream: DownstreamClient,
    pub tools: Arc<ToolRegistry>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        access: AccessGuard,
        vault: Arc<dyn ConnectionTokenProvider>,
        downstream: DownstreamClient,
        tools: ToolRegistry,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            access,
            vault,
            downstream,
            tools: Arc::new(tools),
            sessions,
        }
    }
}
