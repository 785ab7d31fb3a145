//! Authentication middleware for Axum
//!
//! Resolves the calling principal and applies the per-principal rate limit.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{AuthContext, AuthError, JwtValidator};
use crate::api::ApiError;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Resolves bearer tokens to an [`AuthContext`]
pub struct Authenticator {
    jwt_validator: Option<Arc<JwtValidator>>,
}

impl Authenticator {
    /// Authenticator that rejects every credential
    pub fn new() -> Self {
        Self {
            jwt_validator: None,
        }
    }

    pub fn with_jwt(mut self, jwt_validator: Arc<JwtValidator>) -> Self {
        self.jwt_validator = Some(jwt_validator);
        self
    }

    /// Authenticate a request from its `Authorization` header
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<AuthContext, AuthError> {
        let header = auth_header.ok_or(AuthError::MissingAuth)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(AuthError::MissingAuth)?;

        match &self.jwt_validator {
            Some(jwt) => jwt.validate(token),
            None => Err(AuthError::InvalidJwt("JWT not configured".to_string())),
        }
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

/// Auth context extension for request
#[derive(Clone)]
pub struct AuthContextExt(pub AuthContext);

/// Authentication middleware configuration/state.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub authenticator: Arc<Authenticator>,
    /// If false, unauthenticated requests run as the anonymous principal.
    pub require_auth: bool,
    /// Optional per-principal rate limiter.
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let context = match state.authenticator.authenticate(auth_header) {
        Ok(context) => context,
        Err(e) if state.require_auth => {
            debug!(error = %e, "Rejected unauthenticated request");
            return ApiError::from(e).into_response();
        }
        Err(_) => AuthContext::anonymous(),
    };

    if let Some(ref limiter) = state.rate_limiter {
        let key = format!("principal:{}", context.principal_id);
        if let Err(e) = limiter.check(&key) {
            return ApiError::from(e).into_response();
        }
    }

    request.extensions_mut().insert(AuthContextExt(context));
    next.run(request).await
}

/// Fixed-window request limiter keyed by principal
pub struct RateLimiter {
    /// Requests per minute per key
    requests_per_minute: u32,
    counts: Mutex<HashMap<String, (u32, Instant)>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Check if request is allowed
    pub fn check(&self, key: &str) -> Result<(), AuthError> {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let entry = counts.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= RATE_LIMIT_WINDOW {
            *entry = (0, now);
        }

        if entry.0 >= self.requests_per_minute {
            return Err(AuthError::RateLimited);
        }

        entry.0 += 1;
        Ok(())
    }

    /// Get remaining requests for a key
    pub fn remaining(&self, key: &str) -> u32 {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);

        match counts.get(key) {
            Some((count, started)) if started.elapsed() < RATE_LIMIT_WINDOW => {
                self.requests_per_minute.saturating_sub(*count)
            }
            _ => self.requests_per_minute,
        }
    }
}
