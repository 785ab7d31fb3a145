//! Infrastructure layer for land verification
//!
//! Contains trait definitions and implementations for:
//! - Registry lookup (PostgreSQL, in-memory)
//! - Verification record persistence (PostgreSQL, in-memory)

mod error;
mod memory;
pub mod postgres;
mod traits;

pub use error::*;
pub use memory::{MemoryRegistry, MemoryVerificationStore};
pub use postgres::{PgRegistryStore, PgVerificationStore};
pub use traits::*;
