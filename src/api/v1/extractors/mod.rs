pub mod auth_ctx;
pub mod session;

pub use auth_ctx::{Auth, AuthContext, EXTRA_CLAIM_NAMES, Exchange};
pub use session::CurrentSession;
