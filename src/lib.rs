//! voxstream - frame plumbing for real-time speech recognition
//!
//! Fixed-size PCM frames are recycled through per-format pools, handed from a
//! producer to a recognizer thread through a bounded stream buffer, and the
//! recognizer's token stream is segmented into timed words.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod transcript;

// Frame plumbing
pub use audio::{
    Frame, FramePool, FrameReader, PoolHandle, StreamBuffer, WriteRejected, frame_size,
};

// Recognition
pub use engine::{
    DecoderSettings, EngineErrorCode, MockRecognizer, Recognizer, RecognizerStream,
    open_recognizer,
};
pub use pipeline::{Feeder, FeederHandle};
pub use transcript::{Hypothesis, HypothesisCandidate, Metadata, Word, segment};

// Error handling
pub use error::{Result, VoxstreamError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_has_hash_suffix_only_with_git_hash() {
        let ver = version_string();
        match option_env!("GIT_HASH") {
            Some(hash) if !hash.is_empty() => assert!(ver.ends_with(&format!("+{hash}"))),
            _ => assert_eq!(ver, env!("CARGO_PKG_VERSION")),
        }
    }
}
