use std::env;
use std::path::PathBuf;

use url::Url;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const MIN_PASSWORD_LEN: usize = 8;
const MIN_TOKEN_SECRET_LEN: usize = 16;

/// Connection settings for the hosted backend that owns all site records.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Base URL of the hosted backend, normalized to carry no trailing slash.
    pub url: String,
    /// Service API key, sent as both `apikey` and bearer credential.
    pub key: String,
}

impl SupabaseConfig {
    /// Validate and normalize a raw url/key pair.
    pub fn new(url: &str, key: &str) -> Result<Self, ConfigError> {
        let url = url.trim().trim_end_matches('/').to_string();
        let key = key.trim().to_string();

        if url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SUPABASE_URL must not be empty".to_string(),
            ));
        }
        if key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SUPABASE_KEY must not be empty".to_string(),
            ));
        }

        let parsed = Url::parse(&url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(url));
        }

        Ok(Self { url, key })
    }

    /// Load the backend settings from `SUPABASE_URL` / `SUPABASE_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("SUPABASE_URL".to_string()))?;
        let key = env::var("SUPABASE_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("SUPABASE_KEY".to_string()))?;
        Self::new(&url, &key)
    }

    /// Same validation as [`SupabaseConfig::from_env`], with the error swallowed.
    pub fn is_configured() -> bool {
        Self::from_env().is_ok()
    }
}

/// Server configuration loaded once at startup from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address (0.0.0.0 for public, 127.0.0.1 for local-only)
    pub bind_addr: String,
    /// Hosted backend connection settings
    pub supabase: SupabaseConfig,
    /// Admin dashboard login name
    pub admin_username: String,
    /// Admin dashboard password
    pub admin_password: String,
    /// Secret used to sign admin session tokens
    pub token_secret: String,
    /// CORS allowed origins (comma-separated in env var; empty means permissive)
    pub cors_origins: Vec<String>,
    /// Body cap for the admin upload route; the rest of the API uses a 1 MiB cap
    pub max_upload_body_bytes: usize,
    /// Directory with the built website, served with an SPA fallback when set
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Admin credentials and the token-signing secret are required with no
    /// fallback values; a deployment that omits them must not come up.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let supabase = SupabaseConfig::from_env()?;

        let admin_username = env::var("ADMIN_USERNAME")
            .map_err(|_| ConfigError::MissingEnvVar("ADMIN_USERNAME".to_string()))?;
        let admin_password = env::var("ADMIN_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("ADMIN_PASSWORD".to_string()))?;
        let token_secret = env::var("ADMIN_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("ADMIN_TOKEN_SECRET".to_string()))?;
        validate_admin_settings(&admin_username, &admin_password, &token_secret)?;

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            supabase,
            admin_username,
            admin_password,
            token_secret,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            max_upload_body_bytes: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
        })
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn validate_admin_settings(
    username: &str,
    password: &str,
    token_secret: &str,
) -> Result<(), ConfigError> {
    if username.is_empty() {
        return Err(ConfigError::InvalidValue(
            "ADMIN_USERNAME must not be empty".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ConfigError::InvalidValue(format!(
            "ADMIN_PASSWORD must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if token_secret.len() < MIN_TOKEN_SECRET_LEN {
        return Err(ConfigError::InvalidValue(format!(
            "ADMIN_TOKEN_SECRET must be at least {MIN_TOKEN_SECRET_LEN} characters"
        )));
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Not a valid http(s) URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
