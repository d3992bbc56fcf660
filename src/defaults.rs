//! Default configuration constants for voxstream.
//!
//! Shared between the configuration types, the frame pool and the engine seam
//! so every layer agrees on the same values.

/// Default audio sample rate in Hz.
///
/// 16kHz is what speech recognition models are trained on.
pub const SAMPLE_RATE: u32 = 16000;

/// Sample rates with a frame pool size class.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [8000, 16000, 32000, 48000];

/// 10ms packetization time.
pub const PTIME_10: u32 = 10;

/// 20ms packetization time.
pub const PTIME_20: u32 = 20;

/// 30ms packetization time.
pub const PTIME_30: u32 = 30;

/// Packetization times with a frame pool size class.
pub const SUPPORTED_PTIMES: [u32; 3] = [PTIME_10, PTIME_20, PTIME_30];

/// Default frame duration in milliseconds.
pub const PTIME_MS: u32 = PTIME_20;

/// Default stream buffer capacity in frames.
///
/// 100 frames of 20ms is two seconds of audio, enough to absorb a slow
/// `finish` on the engine side without stalling capture.
pub const BUFFER_FRAMES: usize = 100;

/// Default number of idle buffers kept per pool size class.
///
/// Buffers released beyond this are dropped instead of pooled.
pub const POOL_MAX_IDLE: usize = 256;

/// Default beam width for the recognition decoder.
pub const BEAM_WIDTH: u32 = 500;

/// Default language model weight.
pub const LM_ALPHA: f32 = 0.931_289_04;

/// Default word insertion weight.
pub const LM_BETA: f32 = 1.183_413_8;

/// Default number of ranked transcripts requested when finishing a stream.
pub const NUM_RESULTS: u32 = 5;

/// Returns a [`std::time::Duration`] for a ptime given in milliseconds.
pub fn ptime_duration(ptime_ms: u32) -> std::time::Duration {
    std::time::Duration::from_millis(u64::from(ptime_ms))
}
