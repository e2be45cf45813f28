//! Shared types for the wyoming-silero server.
//!
//! Kept free of tokio and HTTP so the CLI and tests can use them without
//! pulling in the runtime crate.

// ─── Audio format ──────────────────────────────────────────────────────────

/// Bytes per sample of the PCM sent to clients (16-bit).
pub const SAMPLE_WIDTH: u16 = 2;

/// Audio is always mono.
pub const CHANNELS: u16 = 1;

/// Payload size of one `audio-chunk` event.
pub const AUDIO_CHUNK_BYTES: usize = 2048;

/// Format announced in `audio-start` and repeated on every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub rate: u32,
    pub width: u16,
    pub channels: u16,
}

impl AudioFormat {
    /// 16-bit mono at `rate`.
    pub fn pcm16_mono(rate: u32) -> Self {
        Self {
            rate,
            width: SAMPLE_WIDTH,
            channels: CHANNELS,
        }
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.rate as u64 * self.width as u64 * self.channels as u64
    }
}

// ─── Download types ────────────────────────────────────────────────────────

/// Download progress payload.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub file: String,
    pub percent: f32,
    pub bytes_done: u64,
    /// Zero when the server did not announce a length.
    pub bytes_total: u64,
    pub status: DownloadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloading,
    Complete,
}
