//! HTTP server bootstrap for the verification service.
//!
//! This module wires together:
//! - configuration
//! - storage (PostgreSQL when `DATABASE_URL` is set, in-memory otherwise)
//! - the verification engine and history reader
//! - authentication and the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{AuthMiddlewareState, Authenticator, JwtValidator, RateLimiter};
use crate::engine::{EngineConfig, HistoryReader, VerificationEngine, MAX_HISTORY_LIMIT};
use crate::infra::{
    MemoryRegistry, MemoryVerificationStore, PgRegistryStore, PgVerificationStore, RegistryStore,
    VerificationStore,
};
use crate::metrics::MetricsRegistry;
use crate::telemetry::{init_telemetry, TelemetryConfig};

/// Whether API requests must carry a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Required,
    Disabled,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// PostgreSQL connection URL; in-memory storage when absent.
    pub database_url: Option<String>,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Apply embedded migrations before serving.
    pub migrate_on_startup: bool,
    pub auth_mode: AuthMode,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Per-principal requests per minute; `None` disables limiting.
    pub rate_limit_per_minute: Option<u32>,
    /// Comma-separated origins, or `*`.
    pub cors_allow_origins: Option<String>,
    /// Upper bound on history page size.
    pub history_max_limit: usize,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {host}:{port}: {e}"))?;

        let auth_mode = match lookup("AUTH_MODE").as_deref().map(str::trim) {
            None | Some("") | Some("required") => AuthMode::Required,
            Some("disabled") => AuthMode::Disabled,
            Some(other) => anyhow::bail!("AUTH_MODE must be `required` or `disabled`, got {other:?}"),
        };

        let migrate_on_startup = lookup("DB_MIGRATE_ON_STARTUP")
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off"
                )
            })
            .unwrap_or(true);

        Ok(Self {
            listen_addr,
            database_url: non_empty(lookup("DATABASE_URL")),
            max_connections: parse_or(&lookup, "MAX_DB_CONNECTIONS", 10)?,
            migrate_on_startup,
            auth_mode,
            jwt_secret: non_empty(lookup("JWT_SECRET")),
            jwt_issuer: lookup("JWT_ISSUER")
                .unwrap_or_else(|| crate::auth::DEFAULT_ISSUER.to_string()),
            jwt_audience: lookup("JWT_AUDIENCE")
                .unwrap_or_else(|| crate::auth::DEFAULT_AUDIENCE.to_string()),
            rate_limit_per_minute: Some(parse_or(&lookup, "RATE_LIMIT_PER_MINUTE", 0u32)?)
                .filter(|rpm| *rpm > 0),
            cors_allow_origins: non_empty(lookup("CORS_ALLOW_ORIGINS")),
            history_max_limit: parse_or(&lookup, "HISTORY_MAX_LIMIT", MAX_HISTORY_LIMIT)?,
            engine: EngineConfig::default(),
        })
    }

    /// Build the authentication layer state, refusing a required mode with no secret.
    pub fn auth_state(&self) -> anyhow::Result<AuthMiddlewareState> {
        let require_auth = self.auth_mode == AuthMode::Required;

        let mut authenticator = Authenticator::new();
        match &self.jwt_secret {
            Some(secret) => {
                authenticator = authenticator.with_jwt(Arc::new(JwtValidator::new(
                    secret.as_bytes(),
                    &self.jwt_issuer,
                    &self.jwt_audience,
                )));
            }
            None if require_auth => anyhow::bail!(
                "AUTH_MODE=required but JWT_SECRET is not set (set AUTH_MODE=disabled for local dev)"
            ),
            None => {}
        }

        Ok(AuthMiddlewareState {
            authenticator: Arc::new(authenticator),
            require_auth,
            rate_limiter: self
                .rate_limit_per_minute
                .map(|rpm| Arc::new(RateLimiter::new(rpm))),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VerificationEngine>,
    pub history: Arc<HistoryReader>,
    pub metrics: Arc<MetricsRegistry>,
    /// Present when backed by PostgreSQL; used by the readiness probe.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        store: Arc<dyn VerificationStore>,
        config: &Config,
        pool: Option<PgPool>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = VerificationEngine::new(registry, store.clone(), config.engine)
            .with_metrics(metrics.clone());
        let history = HistoryReader::new(store).with_max_limit(config.history_max_limit);

        Self {
            engine: Arc::new(engine),
            history: Arc::new(history),
            metrics,
            pool,
        }
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {e}"))?;

    info!("Starting terraverify v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let auth_state = config.auth_state()?;
    info!(
        listen_addr = %config.listen_addr,
        auth_mode = ?config.auth_mode,
        rate_limit = ?config.rate_limit_per_minute,
        "Configuration loaded"
    );

    let state = match &config.database_url {
        Some(url) => {
            info!("Connecting to PostgreSQL...");
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await?;
            info!("Connected to PostgreSQL");

            if config.migrate_on_startup {
                info!("Running database migrations...");
                crate::migrations::run_postgres(&pool).await?;
                info!("Database migrations applied");
            } else {
                info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
            }

            AppState::new(
                Arc::new(PgRegistryStore::new(pool.clone())),
                Arc::new(PgVerificationStore::new(pool.clone())),
                &config,
                Some(pool),
            )
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory storage with an empty registry");
            AppState::new(
                Arc::new(MemoryRegistry::new()),
                Arc::new(MemoryVerificationStore::new()),
                &config,
                None,
            )
        }
    };

    let cors = cors_layer(config.cors_allow_origins.as_deref())?;
    let app = build_router(state, auth_state, cors);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Assemble the full application router.
pub fn build_router(
    state: AppState,
    auth_state: AuthMiddlewareState,
    cors: Option<CorsLayer>,
) -> Router {
    let api = crate::api::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        crate::auth::auth_middleware,
    ));

    let mut router = Router::new()
        .nest("/api", api)
        .merge(crate::api::ops_router())
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors {
        router = router.layer(cors_layer);
    }

    router.with_state(state)
}

/// CORS layer for the configured origins, `None` when unset.
pub fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let origins = match origins.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 10);
        assert!(config.migrate_on_startup);
        assert_eq!(config.auth_mode, AuthMode::Required);
        assert!(config.rate_limit_per_minute.is_none());
        assert_eq!(config.history_max_limit, MAX_HISTORY_LIMIT);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9090"),
            ("DATABASE_URL", "postgres://localhost/terraverify"),
            ("DB_MIGRATE_ON_STARTUP", "off"),
            ("AUTH_MODE", "disabled"),
            ("RATE_LIMIT_PER_MINUTE", "30"),
            ("HISTORY_MAX_LIMIT", "50"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr.port(), 9090);
        assert!(config.database_url.is_some());
        assert!(!config.migrate_on_startup);
        assert_eq!(config.auth_mode, AuthMode::Disabled);
        assert_eq!(config.rate_limit_per_minute, Some(30));
        assert_eq!(config.history_max_limit, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("AUTH_MODE", "sometimes")]).is_err());
    }

    #[test]
    fn test_required_auth_needs_secret() {
        let config = config_from(&[]).unwrap();
        assert!(config.auth_state().is_err());

        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert!(config.auth_state().unwrap().require_auth);

        let config = config_from(&[("AUTH_MODE", "disabled")]).unwrap();
        assert!(!config.auth_state().unwrap().require_auth);
    }

    #[test]
    fn test_cors_layer() {
        assert!(cors_layer(None).unwrap().is_none());
        assert!(cors_layer(Some("  ")).unwrap().is_none());
        assert!(cors_layer(Some("*")).unwrap().is_some());
        assert!(cors_layer(Some("https://a.example, https://b.example"))
            .unwrap()
            .is_some());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}
