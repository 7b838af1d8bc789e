pub mod context;
pub mod factory;
pub mod scope;
pub mod token;
pub mod verifier;

pub use context::build_auth_context;
pub use scope::{RequiredScopes, authorize};
pub use token::BearerToken;
pub use verifier::{Claims, JwtVerifier, TokenVerifier, VerifyError};
