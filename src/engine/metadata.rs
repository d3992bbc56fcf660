//! Decoding of engine-owned transcript metadata.
//!
//! Layout (little-endian):
//! ```text
//! u32 num_transcripts
//! repeat num_transcripts:
//!     u32 num_tokens
//!     f64 confidence
//!     repeat num_tokens:
//!         i32 timestep
//!         f32 start_time
//!         u32 text_len
//!         [u8; text_len] text (UTF-8)
//! ```
//! Counts are read first and checked against the bytes that remain before
//! anything is allocated, so a corrupt count can't trigger a huge allocation.

use crate::error::{Result, VoxstreamError};
use crate::transcript::types::{CandidateTranscript, Metadata, Token};

/// Smallest encoding of one transcript (count + confidence).
const MIN_TRANSCRIPT_BYTES: usize = 4 + 8;
/// Smallest encoding of one token (timestep + start time + text length).
const MIN_TOKEN_BYTES: usize = 4 + 4 + 4;

/// Metadata buffer owned by the engine.
///
/// Dropping the value hands the memory back to the engine.
pub trait EngineBuffer {
    fn as_bytes(&self) -> &[u8];
}

impl EngineBuffer for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

impl EngineBuffer for Box<[u8]> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

/// Copies the metadata out of an engine buffer, then releases the buffer.
pub fn take<B: EngineBuffer>(raw: B) -> Result<Metadata> {
    let metadata = decode(raw.as_bytes());
    drop(raw);
    metadata
}

/// Decodes metadata from its byte layout.
///
/// # Errors
/// `MetadataTruncated` if a count or field runs past the end of `bytes`,
/// `MetadataInvalid` for negative timesteps or trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Metadata> {
    let mut reader = Reader { bytes, offset: 0 };

    let num_transcripts = reader.count(MIN_TRANSCRIPT_BYTES)?;
    let mut transcripts = Vec::with_capacity(num_transcripts);

    for _ in 0..num_transcripts {
        let num_tokens = reader.u32()? as usize;
        let confidence = reader.f64()?;
        reader.ensure(num_tokens.saturating_mul(MIN_TOKEN_BYTES))?;

        let mut tokens = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            let timestep = reader.i32()?;
            let timestep = u32::try_from(timestep).map_err(|_| VoxstreamError::MetadataInvalid {
                message: format!("negative timestep {timestep}"),
            })?;
            let start_time = reader.f32()?;
            let text_len = reader.u32()? as usize;
            let text = String::from_utf8_lossy(reader.take(text_len)?).into_owned();

            tokens.push(Token {
                text,
                timestep,
                start_time,
            });
        }

        transcripts.push(CandidateTranscript { tokens, confidence });
    }

    if reader.remaining() > 0 {
        return Err(VoxstreamError::MetadataInvalid {
            message: format!("{} trailing bytes", reader.remaining()),
        });
    }

    Ok(Metadata { transcripts })
}

/// Encodes metadata into the layout read by [`decode`].
///
/// Used by engines implemented in Rust and by test doubles.
pub fn encode(metadata: &Metadata) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(metadata.transcripts.len() as u32).to_le_bytes());
    for transcript in &metadata.transcripts {
        out.extend_from_slice(&(transcript.tokens.len() as u32).to_le_bytes());
        out.extend_from_slice(&transcript.confidence.to_le_bytes());
        for token in &transcript.tokens {
            let timestep = i32::try_from(token.timestep).unwrap_or(i32::MAX);
            out.extend_from_slice(&timestep.to_le_bytes());
            out.extend_from_slice(&token.start_time.to_le_bytes());
            out.extend_from_slice(&(token.text.len() as u32).to_le_bytes());
            out.extend_from_slice(token.text.as_bytes());
        }
    }
    out
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(VoxstreamError::MetadataTruncated {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Reads an element count and checks the elements could fit.
    fn count(&mut self, min_element_bytes: usize) -> Result<usize> {
        let count = self.u32()? as usize;
        self.ensure(count.saturating_mul(min_element_bytes))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sample() -> Metadata {
        Metadata {
            transcripts: vec![
                CandidateTranscript {
                    tokens: vec![
                        Token::new("h", 3, 0.06),
                        Token::new("i", 5, 0.1),
                        Token::new("é", 7, 0.14),
                    ],
                    confidence: -4.25,
                },
                CandidateTranscript {
                    tokens: Vec::new(),
                    confidence: -9.0,
                },
            ],
        }
    }

    #[test]
    fn test_decode_encoded_metadata() {
        let decoded = decode(&encode(&sample())).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_decode_empty_metadata() {
        let decoded = decode(&0u32.to_le_bytes()).unwrap();
        assert!(decoded.transcripts.is_empty());
    }

    #[test]
    fn test_decode_empty_input_is_truncated() {
        let err = decode(&[]).unwrap_err();
        assert!(matches!(
            err,
            VoxstreamError::MetadataTruncated {
                offset: 0,
                needed: 4,
                available: 0
            }
        ));
    }

    #[test]
    fn test_oversized_transcript_count_is_rejected_before_allocating() {
        let bytes = u32::MAX.to_le_bytes();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, VoxstreamError::MetadataTruncated { offset: 4, .. }));
    }

    #[test]
    fn test_oversized_token_count_is_rejected() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&1_000_000u32.to_le_bytes());
        bytes.extend_from_slice(&0.5f64.to_le_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, VoxstreamError::MetadataTruncated { .. }));
    }

    #[test]
    fn test_text_running_past_end_is_truncated() {
        let mut bytes = encode(&sample());
        // Cut into the text of the last token of the first transcript.
        bytes.truncate(4 + 12 + 3 * 12 + 2 + 1);
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            VoxstreamError::MetadataTruncated { .. }
        ));
    }

    #[test]
    fn test_negative_timestep_is_invalid() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0.0f64.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("negative timestep -1"));
    }

    #[test]
    fn test_trailing_bytes_are_invalid() {
        let mut bytes = encode(&sample());
        bytes.push(0);
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("1 trailing bytes"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0.0f64.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(0xff);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.transcripts[0].tokens[0].text, "\u{fffd}");
    }

    struct TrackedBuffer {
        bytes: Vec<u8>,
        released: Rc<Cell<u32>>,
    }

    impl EngineBuffer for TrackedBuffer {
        fn as_bytes(&self) -> &[u8] {
            &self.bytes
        }
    }

    impl Drop for TrackedBuffer {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn test_take_releases_engine_buffer_once() {
        let released = Rc::new(Cell::new(0));
        let raw = TrackedBuffer {
            bytes: encode(&sample()),
            released: released.clone(),
        };

        let metadata = take(raw).unwrap();
        assert_eq!(released.get(), 1);
        assert_eq!(metadata, sample());
    }

    #[test]
    fn test_take_releases_engine_buffer_on_error() {
        let released = Rc::new(Cell::new(0));
        let raw = TrackedBuffer {
            bytes: vec![1, 2],
            released: released.clone(),
        };

        assert!(take(raw).is_err());
        assert_eq!(released.get(), 1);
    }
}
