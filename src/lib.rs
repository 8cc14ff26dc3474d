pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod supabase;

pub use config::{ConfigError, ServerConfig, SupabaseConfig};
pub use error::ApiError;
pub use state::AppState;
