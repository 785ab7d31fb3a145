//! REST API for land verification
//!
//! Thin adapter over the engine: request decoding, principal scoping and
//! error mapping. Verdict logic lives in [`crate::engine`].

pub mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use rest::*;
