//! Token-to-word segmentation.
//!
//! Engines such as DeepSpeech emit one token per character with a timestep
//! and start time. Words are the runs of non-whitespace tokens; a word ends at
//! the start of the whitespace token that terminates it, or at the last token
//! when the transcript ends mid-word.

use crate::transcript::types::{
    CandidateTranscript, Hypothesis, HypothesisCandidate, Metadata, Word,
};
use std::mem;
use std::time::Duration;

/// Converts engine seconds to a `Duration`, rounding half to even at
/// nanosecond precision. Negative and non-finite inputs map to zero.
pub fn seconds_to_duration(seconds: f32) -> Duration {
    let nanos = (f64::from(seconds) * 1e9).round_ties_even();
    if nanos.is_finite() && nanos > 0.0 {
        Duration::from_nanos(nanos as u64)
    } else {
        Duration::ZERO
    }
}

/// Segments every transcript, preserving the engine's ranking.
pub fn segment(metadata: &Metadata) -> Hypothesis {
    Hypothesis {
        candidates: metadata.transcripts.iter().map(segment_transcript).collect(),
    }
}

/// Segments one transcript into words.
pub fn segment_transcript(transcript: &CandidateTranscript) -> HypothesisCandidate {
    let tokens = &transcript.tokens;
    let last = tokens.len().saturating_sub(1);

    let mut text = String::new();
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut anchor = (0u32, Duration::ZERO);

    for (i, token) in tokens.iter().enumerate() {
        text.push_str(&token.text);
        let at = (token.timestep, seconds_to_duration(token.start_time));
        let content = token.text.trim();

        if content.is_empty() {
            if in_word {
                words.push(word(mem::take(&mut current), anchor, at));
                in_word = false;
            }
            anchor = at;
            continue;
        }

        if !in_word {
            in_word = true;
            anchor = at;
        }
        current.push_str(content);

        if i == last {
            words.push(word(mem::take(&mut current), anchor, at));
        }
    }

    let (start_step, start_time) = words
        .first()
        .map_or((0, Duration::ZERO), |w: &Word| (w.start_step, w.start_time));
    let (end_step, end_time) = words
        .last()
        .map_or((0, Duration::ZERO), |w: &Word| (w.end_step, w.end_time));

    HypothesisCandidate {
        text,
        confidence: transcript.confidence,
        start_step,
        end_step,
        start_time,
        end_time,
        duration: end_time.saturating_sub(start_time),
        words,
    }
}

fn word(text: String, start: (u32, Duration), end: (u32, Duration)) -> Word {
    Word {
        text,
        start_step: start.0,
        end_step: end.0,
        start_time: start.1,
        end_time: end.1,
        duration: end.1.saturating_sub(start.1),
    }
}
