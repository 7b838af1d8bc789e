//! Token exchange clients: Custom Token Exchange and Token Vault.
mod custom;
mod endpoint;
mod types;
mod vault;

pub use custom::{BoundExchange, CustomTokenExchange, ExchangeProfile, TokenExchanger};
pub use endpoint::TokenEndpoint;
pub use types::{
    ACCESS_TOKEN_TYPE, ConnectionToken, ConnectionTokenRequest, ExchangeError, ExchangeRequest,
    ExchangeResult, REFRESH_TOKEN_TYPE, VaultSubject,
};
pub use vault::{ConnectionTokenProvider, TokenVault, connection_token_for_session};
