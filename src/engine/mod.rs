//! Seam to the native recognition engine.
//!
//! The engine itself (model loading, beam search, scorer) lives outside this
//! crate. What it exposes is a stream you feed frames into and finish into
//! ranked, per-token timed transcripts.

pub mod error;
pub mod metadata;
pub mod recognizer;

pub use error::EngineErrorCode;
pub use metadata::{EngineBuffer, decode, encode, take};
pub use recognizer::{
    DecoderSettings, MockRecognizer, Recognizer, RecognizerStream, finish_with_best_hypothesis,
    finish_with_hypothesis, metadata_from_text, open_recognizer,
};
