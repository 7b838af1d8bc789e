//! Scope authorization guard.
//!
//! Operations declare a static [`RequiredScopes`] set at registration time;
//! [`authorize`] is the single check every protected operation goes through.
//! Required scopes are AND-ed: the operation runs iff `required ⊆ granted`.
use std::collections::BTreeSet;

use thiserror::Error;

use crate::api::v1::extractors::AuthContext;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredScopes(BTreeSet<String>);

impl RequiredScopes {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// `self \ granted`, sorted.
    pub fn missing_from(&self, granted: &BTreeSet<String>) -> Vec<String> {
        self.0.difference(granted).cloned().collect()
    }

    pub fn is_satisfied_by(&self, granted: &BTreeSet<String>) -> bool {
        self.0.is_subset(granted)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required scope(s): {}", .missing.join(" "))]
pub struct ScopeError {
    pub missing: Vec<String>,
}

/// Pure predicate over the inbound context; never touches the network.
pub fn authorize(ctx: &AuthContext, required: &RequiredScopes) -> Result<(), ScopeError> {
    let missing = required.missing_from(ctx.scopes());
    if missing.is_empty() {
        return Ok(());
    }

    tracing::info!(
        sub = %ctx.subject(),
        missing = %missing.join(" "),
        "insufficient scope"
    );
    Err(ScopeError { missing })
}

/// Union of every registered operation's required scopes (sorted, deduplicated),
/// as advertised in the protected resource metadata.
pub fn supported_scopes<'a, I>(registered: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a RequiredScopes>,
{
    registered
        .into_iter()
        .flat_map(|r| r.0.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::context::build_auth_context;
    use crate::services::auth::token::BearerToken;
    use serde_json::json;

    fn ctx(scope: &str) -> AuthContext {
        let claims = json!({"sub": "auth0|123", "azp": "c", "scope": scope});
        build_auth_context(BearerToken::new("t"), claims.as_object().unwrap()).unwrap()
    }

    #[test]
    fn subset_is_permitted() {
        let required = RequiredScopes::new(["tool:greet"]);
        assert!(authorize(&ctx("tool:whoami tool:greet"), &required).is_ok());
    }

    #[test]
    fn empty_requirement_is_always_permitted() {
        assert!(authorize(&ctx(""), &RequiredScopes::none()).is_ok());
    }

    #[test]
    fn missing_scope_is_named() {
        let err = authorize(&ctx("tool:whoami"), &RequiredScopes::new(["tool:greet"])).unwrap_err();
        assert_eq!(err.missing, vec!["tool:greet".to_string()]);
        assert!(err.to_string().contains("tool:greet"));
    }

    #[test]
    fn all_required_scopes_must_be_present() {
        let required = RequiredScopes::new(["b:write", "a:read", "c:admin"]);
        let err = authorize(&ctx("a:read"), &required).unwrap_err();
        assert_eq!(err.missing, vec!["b:write".to_string(), "c:admin".to_string()]);
    }

    #[test]
    fn supported_scopes_is_a_sorted_union() {
        let registered = [
            RequiredScopes::new(["tool:whoami"]),
            RequiredScopes::none(),
            RequiredScopes::new(["tool:greet", "tool:whoami"]),
        ];
        assert_eq!(
            supported_scopes(&registered),
            vec!["tool:greet".to_string(), "tool:whoami".to_string()]
        );
    }
}
