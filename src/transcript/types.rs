//! Engine output and the word-level hypotheses derived from it.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest timed unit of engine output, usually one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Text of the token. Whitespace-only tokens mark word boundaries.
    pub text: String,
    /// Decoder timestep the token was emitted at.
    pub timestep: u32,
    /// Start of the token in seconds from the beginning of the stream.
    pub start_time: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, timestep: u32, start_time: f32) -> Self {
        Self {
            text: text.into(),
            timestep,
            start_time,
        }
    }
}

/// One ranked alternative produced by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTranscript {
    pub tokens: Vec<Token>,
    pub confidence: f64,
}

/// Ranked transcripts for one finished stream, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub transcripts: Vec<CandidateTranscript>,
}

/// A word with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_step: u32,
    pub end_step: u32,
    pub start_time: Duration,
    pub end_time: Duration,
    pub duration: Duration,
}

/// A transcript alternative annotated with word timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisCandidate {
    /// Concatenated token text, whitespace included.
    pub text: String,
    pub confidence: f64,
    pub start_step: u32,
    pub end_step: u32,
    pub start_time: Duration,
    pub end_time: Duration,
    pub duration: Duration,
    pub words: Vec<Word>,
}

/// All alternatives for one stream, in the engine's ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub candidates: Vec<HypothesisCandidate>,
}

impl Hypothesis {
    /// The engine's top-ranked candidate.
    pub fn best(&self) -> Option<&HypothesisCandidate> {
        self.candidates.first()
    }

    /// Consumes the hypothesis, keeping only the top-ranked candidate.
    pub fn into_best(self) -> Option<HypothesisCandidate> {
        self.candidates.into_iter().next()
    }

    /// Serializes the hypothesis as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, confidence: f64) -> HypothesisCandidate {
        HypothesisCandidate {
            text: text.to_string(),
            confidence,
            start_step: 0,
            end_step: 0,
            start_time: Duration::ZERO,
            end_time: Duration::ZERO,
            duration: Duration::ZERO,
            words: Vec::new(),
        }
    }

    #[test]
    fn test_best_is_first_candidate() {
        let hypothesis = Hypothesis {
            candidates: vec![candidate("first", -1.0), candidate("second", 2.0)],
        };
        assert_eq!(hypothesis.best().unwrap().text, "first");
        assert_eq!(hypothesis.into_best().unwrap().text, "first");
    }

    #[test]
    fn test_best_of_empty_hypothesis() {
        let hypothesis = Hypothesis::default();
        assert!(hypothesis.best().is_none());
        assert!(hypothesis.into_best().is_none());
    }

    #[test]
    fn test_hypothesis_json_contains_words() {
        let mut best = candidate("hi", 0.5);
        best.words.push(Word {
            text: "hi".to_string(),
            start_step: 1,
            end_step: 3,
            start_time: Duration::from_millis(20),
            end_time: Duration::from_millis(60),
            duration: Duration::from_millis(40),
        });
        let hypothesis = Hypothesis {
            candidates: vec![best],
        };

        let json = hypothesis.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["candidates"][0]["words"][0]["text"], "hi");
        assert_eq!(value["candidates"][0]["words"][0]["end_step"], 3);

        let back: Hypothesis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hypothesis);
    }

    #[test]
    fn test_token_new() {
        let token = Token::new("a", 4, 0.08);
        assert_eq!(token.text, "a");
        assert_eq!(token.timestep, 4);
        assert_eq!(token.start_time, 0.08);
    }
}
