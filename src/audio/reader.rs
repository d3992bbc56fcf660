use crate::audio::pool::Frame;
use crate::error::Result;
use std::time::Duration;

/// Trait for sources of fixed-size 16-bit PCM frames.
///
/// This trait allows the feeder to drain anything frame-shaped, a
/// [`StreamBuffer`](crate::audio::buffer::StreamBuffer) being the usual one.
pub trait FrameReader: Send + Sync {
    /// Clock speed in hertz (16000 for 16kHz).
    fn sample_rate(&self) -> u32;

    /// Number of samples per frame.
    fn frame_size(&self) -> usize;

    /// Duration covered by one frame.
    fn ptime(&self) -> Duration;

    /// Audio time consumed so far.
    fn elapsed(&self) -> Duration;

    /// Allocates a frame of [`frame_size`](Self::frame_size) samples.
    fn alloc(&self) -> Frame;

    /// Hands a frame back so it can be recycled.
    fn release(&self, frame: Frame);

    /// Reads the next frame.
    ///
    /// # Returns
    /// The frame, [`Eof`](crate::VoxstreamError::Eof) once input is exhausted,
    /// or another error if the source failed.
    fn read_frame(&self) -> Result<Frame>;

    /// Stops the source and releases its frames.
    fn close(&self) -> Result<()>;
}
