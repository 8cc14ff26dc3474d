use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::supabase::{Query, SupabaseError};

/// Authenticated admin identity attached to the request after the gate.
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub username: String,
    pub method: AuthMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    LocalToken,
    Delegated,
}

/// Why a strategy did not produce a principal. `InvalidCredentials` lets the
/// next strategy try; the other two end the request immediately.
#[derive(Debug)]
pub enum AuthFailure {
    InvalidCredentials,
    NotAdmin(String),
    Backend(SupabaseError),
}

/// One way of turning a bearer token into an admin identity. The middleware
/// composes strategies in order; exactly one has to succeed.
#[async_trait]
trait AdminAuthStrategy: Sync {
    async fn authenticate(&self, state: &AppState, token: &str)
        -> Result<AdminPrincipal, AuthFailure>;
}

/// Verifies the server's own HMAC-signed token. Purely local, no network.
struct LocalToken;

#[async_trait]
impl AdminAuthStrategy for LocalToken {
    async fn authenticate(
        &self,
        state: &AppState,
        token: &str,
    ) -> Result<AdminPrincipal, AuthFailure> {
        match state.tokens.verify(token) {
            Some(claims) => Ok(AdminPrincipal {
                username: claims.username,
                method: AuthMethod::LocalToken,
            }),
            None => Err(AuthFailure::InvalidCredentials),
        }
    }
}

/// Forwards the token to the hosted identity endpoint, then checks the
/// account's email against the `admin_users` allow-list table.
struct DelegatedIdentity;

#[async_trait]
impl AdminAuthStrategy for DelegatedIdentity {
    async fn authenticate(
        &self,
        state: &AppState,
        token: &str,
    ) -> Result<AdminPrincipal, AuthFailure> {
        let user = match state.supabase.auth_user(token).await {
            Ok(user) => user,
            // the identity endpoint rejecting the token just means this
            // strategy does not apply
            Err(err) if matches!(err.status(), Some(400 | 401 | 403)) => {
                return Err(AuthFailure::InvalidCredentials)
            }
            Err(err) => return Err(AuthFailure::Backend(err)),
        };

        let Some(email) = user.email.filter(|e| !e.is_empty()) else {
            return Err(AuthFailure::NotAdmin(format!(
                "account {} has no email on record",
                user.id
            )));
        };

        let query = Query::Params(vec![
            ("email".to_string(), format!("eq.{email}")),
            ("select".to_string(), "email".to_string()),
        ]);
        let rows = state
            .supabase
            .select_all("admin_users", Some(&query))
            .await
            .map_err(AuthFailure::Backend)?;

        if rows.is_empty() {
            Err(AuthFailure::NotAdmin(email))
        } else {
            Ok(AdminPrincipal {
                username: email,
                method: AuthMethod::Delegated,
            })
        }
    }
}

/// Gate for the admin route group. Rejects before any upstream call when the
/// bearer header is missing; otherwise tries the local token first and falls
/// back to the delegated identity check.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(bearer)) = bearer else {
        return Err(ApiError::Unauthorized("Missing Authorization header"));
    };
    let token = bearer.token();

    let strategies: [&dyn AdminAuthStrategy; 2] = [&LocalToken, &DelegatedIdentity];
    for strategy in strategies {
        match strategy.authenticate(&state, token).await {
            Ok(principal) => {
                debug!("admin request authenticated as {}", principal.username);
                request.extensions_mut().insert(principal);
                return Ok(next.run(request).await);
            }
            Err(AuthFailure::InvalidCredentials) => continue,
            Err(AuthFailure::NotAdmin(who)) => {
                warn!("authenticated account {who} is not on the admin list");
                return Err(ApiError::Forbidden("Not an admin account".to_string()));
            }
            Err(AuthFailure::Backend(err)) => return Err(ApiError::Upstream(err)),
        }
    }

    Err(ApiError::Unauthorized("Invalid or expired token"))
}

/// Constant-time byte comparison for credential checks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, SupabaseConfig};

    fn state() -> AppState {
        let config = ServerConfig {
            port: 0,
            bind_addr: "127.0.0.1".to_string(),
            supabase: SupabaseConfig::new("http://127.0.0.1:9", "test-key").unwrap(),
            admin_username: "admin".to_string(),
            admin_password: "unit-test-pass".to_string(),
            token_secret: "unit-test-secret-0123456789".to_string(),
            cors_origins: Vec::new(),
            max_upload_body_bytes: 1024 * 1024,
            static_dir: None,
        };
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"correct horse", b"correct horse"));
        assert!(!constant_time_eq(b"correct horse", b"battery staple"));
        assert!(!constant_time_eq(b"short", b"short "));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_local_token_strategy_accepts_own_tokens() {
        let state = state();
        let token = state.tokens.issue("admin");

        let principal = tokio_test::block_on(LocalToken.authenticate(&state, &token))
            .expect("freshly issued token should authenticate");
        assert_eq!(principal.username, "admin");
        assert_eq!(principal.method, AuthMethod::LocalToken);
    }

    #[test]
    fn test_local_token_strategy_rejects_garbage() {
        let state = state();
        let result = tokio_test::block_on(LocalToken.authenticate(&state, "not.a.token"));
        assert!(matches!(result, Err(AuthFailure::InvalidCredentials)));
    }
}
