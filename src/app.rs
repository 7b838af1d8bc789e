/*
 * Responsibility
 * - Config → services → AppState → Router
 * - Tracing subscriber and panic hook
 * - Transport middleware (request id, trace, limits, CORS)
 * - axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, UpstreamConfig};
use crate::error::AppError;
use crate::middleware::{self, auth::AccessGuard};
use crate::services::auth::factory::{build_exchanger, build_vault, build_verifier, exchange_profile};
use crate::services::downstream::DownstreamClient;
use crate::services::session::{MemorySessionStore, SessionStore};
use crate::state::AppState;
use crate::tools::ToolRegistry;

pub fn init_tracing() {
    // RUST_LOG wins, e.g.
    // RUST_LOG=info,mcp_token_bridge=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr may be hidden depending on how the process is launched
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting MCP server in {:?} mode on {} (resource {})",
        config.app_env,
        config.addr,
        config.server_url
    );

    let state = build_state(config.clone(), Arc::new(MemorySessionStore::new()))?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Process-level services, built once and shared read-only.
pub fn build_state(config: Config, sessions: Arc<dyn SessionStore>) -> Result<AppState, AppError> {
    let verifier = build_verifier(&config.provider, &config.audience, &config.http)?;
    let access = AccessGuard::new(verifier)
        .with_resource_metadata(config.resource_metadata_url())
        .with_exchange(build_exchanger(&config)?, exchange_profile(&config));

    let vault = build_vault(&config)?;
    let downstream = DownstreamClient::new(&config.http).map_err(|err| {
        tracing::error!(error = %err, "failed to build downstream client");
        AppError::Internal
    })?;
    let tools = ToolRegistry::from_config(&config);

    tracing::info!(
        sessions = sessions.backend_name(),
        scopes = ?tools.supported_scopes(),
        "services ready"
    );

    Ok(AppState::new(
        Arc::new(config),
        access,
        vault,
        downstream,
        tools,
        sessions,
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .merge(api::v1::root_routes(&state))
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    let router = middleware::cors::apply(router, config.app_env, &config.cors_allowed_origins);
    middleware::http::apply(router)
}

/// The upstream-api binary: token verification for `API_AUTH0_AUDIENCE` and
/// one scope-guarded route.
pub async fn run_upstream() -> Result<()> {
    init_tracing();
    let config = UpstreamConfig::from_env()?;
    init_panic_hook(false);

    tracing::info!(
        "starting upstream API on {} (audience {})",
        config.addr,
        config.audience
    );

    let verifier = build_verifier(&config.provider, &config.audience, &config.http)?;
    let app = middleware::http::apply(api::upstream::routes(AccessGuard::new(verifier)));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
