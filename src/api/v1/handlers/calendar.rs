/*
 * Responsibility
 * - GET /api/v1/calendar/events: session-based Token Vault flow
 *   (session refresh token → google-oauth2 connection token → Calendar API)
 * - Not linked / revoked link → 403 connection_not_linked with connect info
 */
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::v1::extractors::CurrentSession;
use crate::error::AppError;
use crate::services::calendar::{self, CALENDAR_EVENTS_SCOPE, CalendarEvent, EventWindow};
use crate::services::exchange::connection_token_for_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub calendar_id: &'static str,
    pub events: Vec<CalendarEvent>,
}

pub async fn list_events(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::bad_request(e.body_text()))?;
    let window = window(&query, Utc::now())?;

    let connection = &state.config.vault_connection;
    let scopes = vec![CALENDAR_EVENTS_SCOPE.to_string()];

    let token = connection_token_for_session(
        state.vault.as_ref(),
        state.sessions.as_ref(),
        &session,
        connection,
        &scopes,
    )
    .await?;

    let events = match calendar::list_events(
        &state.downstream,
        &state.config.calendar_api_url,
        &token.access_token,
        window,
    )
    .await
    {
        Ok(events) => events,
        Err(err) if err.is_unauthorized() => {
            // the cached token was revoked upstream; drop it and ask for a new link
            state
                .sessions
                .evict_connection_token(&session.session_id, connection)
                .await?;
            return Err(state.vault.not_linked(connection, &scopes).into());
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Json(EventsResponse {
        calendar_id: "primary",
        events,
    }))
}

fn window(query: &EventsQuery, now: DateTime<Utc>) -> Result<EventWindow, AppError> {
    let today = EventWindow::day_of(now);
    let window = EventWindow {
        start: query.start.unwrap_or(today.start),
        end: query.end.unwrap_or(today.end),
    };

    if window.start >= window.end {
        return Err(AppError::bad_request("start must be before end"));
    }
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_to_today() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap();
        let w = window(&EventsQuery { start: None, end: None }, now).unwrap();
        assert_eq!(w, EventWindow::day_of(now));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let query = EventsQuery {
            start: Some(now),
            end: Some(now - chrono::Duration::hours(1)),
        };
        assert!(matches!(window(&query, now), Err(AppError::BadRequest(_))));
    }
}
