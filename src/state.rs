use std::time::Instant;

use crate::auth::{LoginRateLimiter, TokenCodec};
use crate::config::ServerConfig;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Main server state shared across all handlers
pub struct AppState {
    pub config: ServerConfig,
    pub supabase: SupabaseClient,
    pub tokens: TokenCodec,
    pub login_limiter: LoginRateLimiter,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, SupabaseError> {
        let supabase = SupabaseClient::new(&config.supabase)?;
        let tokens = TokenCodec::new(config.token_secret.clone());

        Ok(Self {
            config,
            supabase,
            tokens,
            login_limiter: LoginRateLimiter::default(),
            start_time: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
