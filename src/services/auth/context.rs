//! Verified claims → [`AuthContext`].
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::api::v1::extractors::{AuthContext, EXTRA_CLAIM_NAMES};
use crate::services::auth::token::BearerToken;
use crate::services::auth::verifier::Claims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("token missing 'client_id' or 'azp' claim")]
    MissingClientId,
    #[error("token missing 'sub' claim")]
    MissingSubject,
}

pub fn build_auth_context(token: BearerToken, claims: &Claims) -> Result<AuthContext, ContextError> {
    let subject = non_empty_str(claims, "sub").ok_or(ContextError::MissingSubject)?;
    let client_id = non_empty_str(claims, "client_id")
        .or_else(|| non_empty_str(claims, "azp"))
        .ok_or(ContextError::MissingClientId)?;

    let scopes = claims
        .get("scope")
        .and_then(Value::as_str)
        .map(parse_scopes)
        .unwrap_or_default();

    let expires_at = claims
        .get("exp")
        .and_then(Value::as_i64)
        .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));

    let extra_claims = EXTRA_CLAIM_NAMES
        .iter()
        .filter_map(|name| claims.get(*name).map(|v| ((*name).to_string(), v.clone())))
        .collect();

    Ok(AuthContext::new(
        subject.to_string(),
        client_id.to_string(),
        scopes,
        token,
        expires_at,
        extra_claims,
    ))
}

/// Space-delimited `scope` claim → set. Empty string gives an empty set.
pub fn parse_scopes(raw: &str) -> BTreeSet<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn non_empty_str<'a>(claims: &'a Claims, name: &str) -> Option<&'a str> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .filter(|v| !v.trim().is_empty())
}
