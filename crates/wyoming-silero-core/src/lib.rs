//! wyoming-silero-core — Pure types and text processing.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod catalog;
pub mod config;
pub mod ssml;
pub mod text_prep;
pub mod types;
pub mod wav;
