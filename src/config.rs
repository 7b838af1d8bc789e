/*
 * Responsibility
 * - Read environment configuration once at startup (Auth0 tenant, client
 *   credentials, exchange profile, upstream URLs, server host/port)
 * - Validate values; anything missing or malformed aborts startup
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_UPSTREAM_PORT: u16 = 8787;
pub const DEFAULT_CONNECTION: &str = "google-oauth2";
pub const DEFAULT_CONNECT_ENDPOINT: &str = "/auth/connect";
pub const DEFAULT_CALENDAR_API_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Authorization server location.
///
/// Accepts either a bare tenant host (`tenant.us.auth0.com`) or a full origin
/// (`http://127.0.0.1:9000`); the stored value never has a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOrigin(String);

impl ProviderOrigin {
    pub fn parse(domain: &str) -> Result<Self, ConfigError> {
        let domain = domain.trim().trim_end_matches('/');
        if domain.is_empty() {
            return Err(ConfigError::Invalid("AUTH0_DOMAIN"));
        }

        let origin = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };

        url::Url::parse(&origin).map_err(|_| ConfigError::Invalid("AUTH0_DOMAIN"))?;
        Ok(Self(origin))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Auth0 issues tokens with a trailing slash on `iss`.
    pub fn issuer(&self) -> String {
        format!("{}/", self.0)
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}/.well-known/jwks.json", self.0)
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.0)
    }
}

/// Knobs shared by every outbound HTTP client and the verifier.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub jwks_cache_ttl: Duration,
    pub leeway_seconds: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            jwks_cache_ttl: Duration::from_secs(3600),
            leeway_seconds: 60,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    /// Public URL of this MCP server; used as the protected-resource identifier.
    pub server_url: String,

    pub provider: ProviderOrigin,
    pub audience: String,

    // Confidential client used for Custom Token Exchange and Token Vault.
    pub client_id: String,
    pub client_secret: String,
    pub subject_token_type: String,
    pub exchange_scope: Option<String>,

    pub api_audience: String,
    pub api_base_url: String,

    pub vault_connection: String,
    pub connect_endpoint: String,
    pub calendar_api_url: String,

    pub http: HttpSettings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // client_secret stays out of logs
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("server_url", &self.server_url)
            .field("provider", &self.provider)
            .field("audience", &self.audience)
            .field("client_id", &self.client_id)
            .field("subject_token_type", &self.subject_token_type)
            .field("exchange_scope", &self.exchange_scope)
            .field("api_audience", &self.api_audience)
            .field("api_base_url", &self.api_base_url)
            .field("vault_connection", &self.vault_connection)
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port: u16 = match lookup("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => DEFAULT_PORT,
        };
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let addr = SocketAddr::from_str(&format!("{}:{}", host.trim(), port))
            .map_err(|_| ConfigError::Invalid("HOST"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));
        let cors_allowed_origins = split_list(lookup("CORS_ORIGINS").unwrap_or_default());

        let server_url = lookup("MCP_SERVER_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let provider = ProviderOrigin::parse(&required("AUTH0_DOMAIN")?)?;
        let audience = required("AUTH0_AUDIENCE")?;

        let client_id = required("MCP_AUTH0_CLIENT_ID")?;
        let client_secret = required("MCP_AUTH0_CLIENT_SECRET")?;
        let subject_token_type = required("MCP_AUTH0_SUBJECT_TOKEN_TYPE")?;
        let exchange_scope = lookup("MCP_AUTH0_EXCHANGE_SCOPE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let api_audience = required("API_AUTH0_AUDIENCE")?;
        let api_base_url = lookup("API_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", DEFAULT_UPSTREAM_PORT))
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_base_url).map_err(|_| ConfigError::Invalid("API_BASE_URL"))?;

        let vault_connection =
            lookup("TOKEN_VAULT_CONNECTION").unwrap_or_else(|| DEFAULT_CONNECTION.to_string());
        let connect_endpoint = lookup("TOKEN_VAULT_CONNECT_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_CONNECT_ENDPOINT.to_string());
        let calendar_api_url =
            lookup("CALENDAR_API_URL").unwrap_or_else(|| DEFAULT_CALENDAR_API_URL.to_string());
        url::Url::parse(&calendar_api_url)
            .map_err(|_| ConfigError::Invalid("CALENDAR_API_URL"))?;

        let http = http_settings(&lookup)?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            server_url,
            provider,
            audience,
            client_id,
            client_secret,
            subject_token_type,
            exchange_scope,
            api_audience,
            api_base_url,
            vault_connection,
            connect_endpoint,
            calendar_api_url,
            http,
        })
    }

    /// `{server_url}/.well-known/oauth-protected-resource`
    pub fn resource_metadata_url(&self) -> String {
        format!(
            "{}/.well-known/oauth-protected-resource",
            self.server_url.trim_end_matches('/')
        )
    }
}

/// Settings for the `upstream-api` binary: it only verifies tokens.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub addr: SocketAddr,
    pub provider: ProviderOrigin,
    pub audience: String,
    pub http: HttpSettings,
}

impl UpstreamConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("UPSTREAM_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("UPSTREAM_PORT"))?,
            None => DEFAULT_UPSTREAM_PORT,
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let domain = lookup("AUTH0_DOMAIN").ok_or(ConfigError::Missing("AUTH0_DOMAIN"))?;
        let provider = ProviderOrigin::parse(&domain)?;
        let audience = lookup("API_AUTH0_AUDIENCE")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("API_AUTH0_AUDIENCE"))?;

        Ok(Self {
            addr,
            provider,
            audience,
            http: http_settings(&lookup)?,
        })
    }
}

fn http_settings<F>(lookup: &F) -> Result<HttpSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = HttpSettings::default();

    let timeout = match lookup("HTTP_TIMEOUT_SECONDS") {
        Some(v) => Duration::from_secs(
            v.trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("HTTP_TIMEOUT_SECONDS"))?,
        ),
        None => defaults.timeout,
    };

    let jwks_cache_ttl = lookup("JWKS_CACHE_TTL_SECONDS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(defaults.jwks_cache_ttl);

    let leeway_seconds = lookup("ACCESS_TOKEN_LEEWAY_SECONDS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(defaults.leeway_seconds);

    Ok(HttpSettings {
        timeout,
        jwks_cache_ttl,
        leeway_seconds,
    })
}

fn split_list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
