pub mod middleware;
pub mod rate_limit;
pub mod token;

pub use middleware::{constant_time_eq, require_admin, AdminPrincipal, AuthMethod};
pub use rate_limit::LoginRateLimiter;
pub use token::{TokenClaims, TokenCodec};
