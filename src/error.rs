//! Error types for voxstream.

use crate::engine::error::EngineErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxstreamError {
    // Stream buffer errors
    #[error("Stream buffer is closed")]
    ClosedPipe,

    #[error("End of stream")]
    Eof,

    #[error("Stream buffer is full")]
    BufferFull,

    #[error("Another reader is already waiting on this stream buffer")]
    ConcurrentReader,

    #[error("Another writer is already waiting on this stream buffer")]
    ConcurrentWriter,

    #[error("Blocking write was cancelled")]
    WriterUnblocked,

    #[error("Frame has {actual} samples, stream buffer expects {expected}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("Stream buffer capacity must be at least one frame, got {capacity}")]
    InvalidCapacity { capacity: usize },

    // Frame pool errors
    #[error("No frame pool for sample_rate:{sample_rate} ptime:{ptime_ms}ms")]
    PoolMiss { sample_rate: u32, ptime_ms: u32 },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Recognition engine errors
    #[error("Recognition engine error: {0}")]
    Engine(#[from] EngineErrorCode),

    // Engine metadata decoding errors
    #[error("Engine metadata truncated: needed {needed} bytes at offset {offset}, {available} available")]
    MetadataTruncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Engine metadata invalid: {message}")]
    MetadataInvalid { message: String },

    // Feeder errors
    #[error("Sample rate mismatch: recognizer expects {expected}Hz, stream delivers {actual}Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Feeder thread panicked")]
    FeederPanicked,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoxstreamError {
    /// True for the graceful end-of-input signal.
    pub fn is_eof(&self) -> bool {
        matches!(self, VoxstreamError::Eof)
    }

    /// True once the buffer has been torn down.
    pub fn is_closed(&self) -> bool {
        matches!(self, VoxstreamError::ClosedPipe)
    }
}

pub type Result<T> = std::result::Result<T, VoxstreamError>;
