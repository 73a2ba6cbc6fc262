//! Shared utilities.

pub mod clock;
pub mod context;
pub mod telemetry;

pub use clock::*;
pub use context::*;
pub use telemetry::*;
