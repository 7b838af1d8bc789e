//! `session` cookie → [`UserSession`].
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::services::session::{SESSION_COOKIE, UserSession};
use crate::state::AppState;

pub struct CurrentSession(pub UserSession);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = session_id(&parts.headers).ok_or(AppError::SessionRequired)?;

        let session = state
            .sessions
            .get(&session_id)
            .await?
            .ok_or(AppError::SessionRequired)?;

        Ok(CurrentSession(session))
    }
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|v| !v.is_empty())
}
