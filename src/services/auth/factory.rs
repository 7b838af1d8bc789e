/// Factory: build the token verifier and exchange clients from `Config`.
use std::sync::Arc;

use crate::config::{Config, HttpSettings, ProviderOrigin};
use crate::error::AppError;
use crate::services::auth::verifier::{JwtVerifier, TokenVerifier};
use crate::services::exchange::{
    ConnectionTokenProvider, CustomTokenExchange, ExchangeProfile, TokenEndpoint, TokenExchanger,
    TokenVault,
};

pub fn build_verifier(
    provider: &ProviderOrigin,
    audience: &str,
    http: &HttpSettings,
) -> Result<Arc<dyn TokenVerifier>, AppError> {
    let verifier = JwtVerifier::jwks(provider.jwks_uri(), &provider.issuer(), audience, http)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to build token verifier");
            AppError::Internal
        })?;

    Ok(Arc::new(verifier))
}

fn build_token_endpoint(config: &Config) -> Result<TokenEndpoint, AppError> {
    TokenEndpoint::new(
        config.provider.token_endpoint(),
        config.client_id.clone(),
        config.client_secret.clone(),
        &config.http,
    )
    .map_err(|err| {
        tracing::error!(error = %err, "failed to build token endpoint client");
        AppError::Internal
    })
}

pub fn build_exchanger(config: &Config) -> Result<Arc<dyn TokenExchanger>, AppError> {
    Ok(Arc::new(CustomTokenExchange::new(build_token_endpoint(config)?)))
}

pub fn build_vault(config: &Config) -> Result<Arc<dyn ConnectionTokenProvider>, AppError> {
    Ok(Arc::new(TokenVault::new(
        build_token_endpoint(config)?,
        config.connect_endpoint.clone(),
    )))
}

pub fn exchange_profile(config: &Config) -> ExchangeProfile {
    ExchangeProfile {
        subject_token_type: config.subject_token_type.clone(),
        audience: config.api_audience.clone(),
        scope: config.exchange_scope.clone(),
    }
}
