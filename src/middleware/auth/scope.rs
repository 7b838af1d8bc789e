//! Route-level scope guard.
//!
//! Must sit inside the access middleware: it reads the [`AuthContext`] the
//! access layer inserted and runs the shared scope check before the handler.
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthContext;
use crate::error::AppError;
use crate::services::auth::scope::{RequiredScopes, authorize};

/// Require `scopes` on every route of `router`.
pub fn require<S>(router: Router<S>, scopes: RequiredScopes) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(Arc::new(scopes), scope_middleware))
}

async fn scope_middleware(
    State(required): State<Arc<RequiredScopes>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = req.extensions().get::<AuthContext>().ok_or_else(|| {
        tracing::error!("scope guard mounted without the access middleware");
        AppError::Internal
    })?;

    authorize(ctx, &required)?;
    Ok(next.run(req).await)
}
