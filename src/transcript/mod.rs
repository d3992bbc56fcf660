//! Recognizer output and word-level segmentation.

pub mod segmenter;
pub mod types;

pub use segmenter::{seconds_to_duration, segment, segment_transcript};
pub use types::{CandidateTranscript, Hypothesis, HypothesisCandidate, Metadata, Token, Word};
