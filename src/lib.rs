//! TerraVerify Library
//!
//! Land-parcel verification service: checks a submitted town/layout/block/plot
//! and boundary polygon against an official registry and records a verdict
//! (verified, fraudulent or failed) for every attempt.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (registry records, submissions, verdicts)
//! - [`geometry`] - Polygon measurements and the 2-of-3 comparison
//! - [`engine`] - Registry lookup, verification state machine and history
//! - [`infra`] - Storage implementations (PostgreSQL, in-memory)
//! - [`auth`] - Bearer-token authentication and rate limiting
//! - [`metrics`] - Counters and latency histograms
//! - [`telemetry`] - Structured logging setup
//! - [`api`] - REST API routes

pub mod api;
pub mod auth;
pub mod domain;
pub mod engine;
pub mod geometry;
pub mod infra;
pub mod metrics;
pub mod migrations;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    Coordinate, LocationKey, OfficialRecord, Polygon, PrincipalId, Submission, ValidationError,
    VerificationId, VerificationRecord, VerificationStatus, VerificationSummary,
};

pub use engine::{EngineConfig, HistoryReader, RegistryLocator, VerificationEngine};

pub use infra::{RegistryStore, Result, VerificationStore, VerifierError};
