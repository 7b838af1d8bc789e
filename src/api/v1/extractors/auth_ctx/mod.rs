/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Hand the authenticated context (AuthContext) and its bound exchange
 *   client to handlers as explicit values
 * - axum-specific code lives in core, the type itself in types
 */

mod core;
mod types;

pub use core::{Auth, Exchange};
pub use types::{AuthContext, EXTRA_CLAIM_NAMES};
