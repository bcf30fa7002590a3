//! Tilawa Project Model
//!
//! Defines the core data contracts for Tilawa presentations:
//! - **Segments:** Recited verses with text, translation, audio reference,
//!   and a resolved duration
//! - **Timeline:** The cumulative time layout derived from segment
//!   durations and the inter-segment delay
//! - **Mapper:** The pure time-to-content lookup shared by live playback
//!   and frame export
//! - **Export:** Output format and dimension configuration
//!
//! All times are seconds as `f64`. The timeline is a derived value: it is
//! rebuilt from its inputs, never patched in place, so consumers can share
//! it immutably.

pub mod export;
pub mod mapper;
pub mod segment;
pub mod timeline;

pub use export::*;
pub use mapper::*;
pub use segment::*;
pub use timeline::*;
