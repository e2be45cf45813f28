//! wyoming-silero-lib — Wyoming server engine.
//!
//! Model registry cache, synthesis engine client, Wyoming event codec,
//! connection handling and listener. Depends on wyoming-silero-core for pure
//! types and text processing.

pub mod client;
pub mod download;
pub mod engine;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;

pub use error::{Error, Result};

// Re-export wyoming-silero-core for convenience
pub use wyoming_silero_core;
