//! REST API handlers organized by domain.

pub mod health;
pub mod verification;

pub use health::*;
pub use verification::*;
