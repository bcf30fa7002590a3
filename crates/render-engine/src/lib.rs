//! Tilawa Render Engine
//!
//! Non-real-time export pipeline that walks synthetic timestamps at a
//! fixed frame rate, resolves on-screen content through the shared
//! time-to-content mapper, and feeds rendered frames into an encode
//! sink. The loop never waits on audio: export speed is bounded only by
//! rendering and encoding cost.
//!
//! # Pipeline Architecture
//!
//! ```text
//! timeline ───┐
//!             ├── map_time(frame / fps)
//! frame rate ─┘         │
//!                       ├── FrameRenderer (external: text, background)
//!                       │         │
//!                       │         ▼
//!                       │    FrameBuffer (RGB24)
//!                       │         │
//!                       ▼         ▼
//!                 progress    EncodeSink (ffmpeg pipe, fakes in tests)
//!                 callback        │
//!                                 ▼
//!                             output.mp4
//! ```

pub mod composition;
pub mod export;
pub mod ffmpeg;
pub mod frame;

pub use composition::*;
pub use export::*;
pub use ffmpeg::*;
pub use frame::*;
