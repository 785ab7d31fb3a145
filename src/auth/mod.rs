//! Authentication for the verification API
//!
//! Callers present an HS256 bearer token whose `sub` claim identifies the
//! principal. Every verification and history read is scoped to that principal.
//!
//! # Configuration
//!
//! - `AUTH_MODE`: `required` (default) or `disabled` for development
//! - `JWT_SECRET`: HMAC secret for JWT validation
//! - `JWT_ISSUER` / `JWT_AUDIENCE`: expected `iss` / `aud` claims
//! - `RATE_LIMIT_PER_MINUTE`: per-principal request budget (0 disables)

mod jwt;
mod middleware;

pub use jwt::*;
pub use middleware::*;

use crate::domain::PrincipalId;

/// Principal used for every request when authentication is disabled
pub const ANONYMOUS_PRINCIPAL: &str = "anonymous";

/// Authentication context extracted from request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Principal that owns the verifications made with this context
    pub principal_id: PrincipalId,
}

impl AuthContext {
    pub fn new(principal_id: PrincipalId) -> Self {
        Self { principal_id }
    }

    pub fn anonymous() -> Self {
        Self::new(PrincipalId::new(ANONYMOUS_PRINCIPAL))
    }
}

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication")]
    MissingAuth,

    #[error("invalid JWT: {0}")]
    InvalidJwt(String),

    #[error("token expired")]
    TokenExpired,

    #[error("rate limit exceeded")]
    RateLimited,
}
