//! PostgreSQL implementations of the registry and verification stores

mod registry;
mod verification_store;

pub use registry::*;
pub use verification_store::*;
