//! Domain models for land verification
//!
//! Registry records, user submissions and the verification records that
//! carry each attempt's verdict.

mod registry;
mod types;
mod verification;

pub use registry::*;
pub use types::*;
pub use verification::*;
