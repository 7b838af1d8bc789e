use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::exchange::BoundExchange;

use super::AuthContext;

/// Handler-side access to the [`AuthContext`] the access middleware inserted.
/// Missing context means the route was mounted without that middleware.
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Auth)
            .ok_or(AppError::AuthenticationRequired {
                resource_metadata: None,
            })
    }
}

/// The exchange handle bound to this request's verified token.
pub struct Exchange(pub BoundExchange);

impl<S> FromRequestParts<S> for Exchange
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<BoundExchange>()
            .cloned()
            .map(Exchange)
            .ok_or_else(|| {
                tracing::error!("no exchange handle on an authenticated route");
                AppError::Internal
            })
    }
}
