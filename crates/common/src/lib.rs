//! Tilawa Common Utilities
//!
//! Shared infrastructure for all Tilawa crates:
//! - Error types and result aliases
//! - Clock and rate-limiting utilities for playback timing
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
