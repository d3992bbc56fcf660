//! Consumer side of a stream buffer: drains frames into a recognizer stream.

use crate::audio::reader::FrameReader;
use crate::engine::recognizer::{Recognizer, RecognizerStream, finish_with_hypothesis};
use crate::error::{Result, VoxstreamError};
use crate::transcript::types::Hypothesis;
use log::{debug, trace, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

/// Feeds every frame of a [`FrameReader`] into one recognizer stream.
///
/// Frames go back to the reader's pool as soon as the engine has copied them.
/// When the reader reports `Eof` the stream is finished and its transcripts
/// segmented into a [`Hypothesis`]. Any other read error (usually
/// `ClosedPipe`) abandons the stream without finishing it.
pub struct Feeder {
    reader: Arc<dyn FrameReader>,
    stream: Box<dyn RecognizerStream>,
    num_results: u32,
    frames_fed: Arc<AtomicU64>,
}

impl Feeder {
    pub fn new(
        reader: Arc<dyn FrameReader>,
        stream: Box<dyn RecognizerStream>,
        num_results: u32,
    ) -> Self {
        Self {
            reader,
            stream,
            num_results,
            frames_fed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Opens a stream on `recognizer` after checking it expects the reader's sample rate.
    ///
    /// # Errors
    /// `SampleRateMismatch` if the rates differ, or the engine's error from
    /// `create_stream`.
    pub fn for_recognizer(
        reader: Arc<dyn FrameReader>,
        recognizer: &dyn Recognizer,
        num_results: u32,
    ) -> Result<Self> {
        if recognizer.sample_rate() != reader.sample_rate() {
            return Err(VoxstreamError::SampleRateMismatch {
                expected: recognizer.sample_rate(),
                actual: reader.sample_rate(),
            });
        }
        let stream = recognizer.create_stream()?;
        Ok(Self::new(reader, stream, num_results))
    }

    /// Number of frames fed so far.
    pub fn frames_fed(&self) -> u64 {
        self.frames_fed.load(Ordering::Relaxed)
    }

    /// Runs the feed loop on the current thread until the reader is exhausted.
    pub fn run(mut self) -> Result<Hypothesis> {
        loop {
            match self.reader.read_frame() {
                Ok(frame) => {
                    self.stream.feed_audio(&frame);
                    let fed = self.frames_fed.fetch_add(1, Ordering::Relaxed) + 1;
                    trace!("fed frame {fed} ({} samples)", frame.len());
                    self.reader.release(frame);
                }
                Err(VoxstreamError::Eof) => break,
                Err(e) => {
                    warn!("feeder stopped after {} frames: {e}", self.frames_fed());
                    return Err(e);
                }
            }
        }

        debug!(
            "finishing stream after {} frames ({:?} of audio)",
            self.frames_fed(),
            self.reader.elapsed()
        );
        finish_with_hypothesis(self.stream, self.num_results)
    }

    /// Runs the feed loop on a dedicated thread.
    pub fn spawn(self) -> Result<FeederHandle> {
        let frames_fed = self.frames_fed.clone();
        let thread = thread::Builder::new()
            .name("voxstream-feeder".to_string())
            .spawn(move || self.run())?;
        Ok(FeederHandle { thread, frames_fed })
    }
}

/// Handle to a feeder running on its own thread.
pub struct FeederHandle {
    thread: JoinHandle<Result<Hypothesis>>,
    frames_fed: Arc<AtomicU64>,
}

impl FeederHandle {
    /// Number of frames fed so far.
    pub fn frames_fed(&self) -> u64 {
        self.frames_fed.load(Ordering::Relaxed)
    }

    /// Waits for the feed loop and returns its hypothesis.
    pub fn join(self) -> Result<Hypothesis> {
        self.thread
            .join()
            .map_err(|_| VoxstreamError::FeederPanicked)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::StreamBuffer;
    use crate::audio::pool::FramePool;
    use crate::engine::error::EngineErrorCode;
    use crate::engine::recognizer::MockRecognizer;

    fn buffer(pool: &FramePool, capacity: usize) -> Arc<StreamBuffer> {
        Arc::new(StreamBuffer::new(pool, 16000, 10, capacity).unwrap())
    }

    #[test]
    fn test_run_feeds_all_frames_then_finishes() {
        let pool = FramePool::new();
        let buffer = buffer(&pool, 4);
        let recognizer = MockRecognizer::new("test-model").with_text("hello world");

        for tag in 1..=3 {
            let mut frame = buffer.alloc();
            frame.fill(tag);
            buffer.write(frame).unwrap();
        }
        buffer.write_final().unwrap();

        let feeder = Feeder::for_recognizer(buffer.clone(), &recognizer, 5).unwrap();
        let hypothesis = feeder.run().unwrap();

        let fed = recognizer.fed_samples();
        assert_eq!(fed.len(), 3 * 160);
        assert!(fed[..160].iter().all(|&s| s == 1));
        assert!(fed[320..].iter().all(|&s| s == 3));
        assert_eq!(buffer.pool().idle(), 3, "frames returned to the pool");
        assert_eq!(hypothesis.best().unwrap().words.len(), 2);
    }

    #[test]
    fn test_run_on_closed_buffer_is_closed_pipe() {
        let pool = FramePool::new();
        let buffer = buffer(&pool, 4);
        buffer.close().unwrap();

        let recognizer = MockRecognizer::new("test-model");
        let feeder = Feeder::for_recognizer(buffer, &recognizer, 1).unwrap();
        assert!(feeder.run().unwrap_err().is_closed());
    }

    #[test]
    fn test_sample_rate_mismatch_is_rejected() {
        let pool = FramePool::new();
        let recognizer = MockRecognizer::new("test-model").with_sample_rate(8000);

        let err = Feeder::for_recognizer(buffer(&pool, 1), &recognizer, 1)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            VoxstreamError::SampleRateMismatch {
                expected: 8000,
                actual: 16000
            }
        ));
    }

    #[test]
    fn test_create_stream_failure_is_propagated() {
        let pool = FramePool::new();
        let recognizer =
            MockRecognizer::new("test-model").with_create_failure(EngineErrorCode::FailCreateSess);

        let result = Feeder::for_recognizer(buffer(&pool, 1), &recognizer, 1);
        assert!(matches!(
            result.err(),
            Some(VoxstreamError::Engine(EngineErrorCode::FailCreateSess))
        ));
    }

    #[test]
    fn test_spawned_feeder_finishes_on_write_final() {
        let pool = FramePool::new();
        let buffer = buffer(&pool, 2);
        let recognizer = MockRecognizer::new("test-model").with_text("ok");

        let handle = Feeder::for_recognizer(buffer.clone(), &recognizer, 1)
            .unwrap()
            .spawn()
            .unwrap();

        for _ in 0..10 {
            buffer.write_blocking(buffer.alloc()).unwrap();
        }
        buffer.write_final().unwrap();

        let hypothesis = handle.join().unwrap();
        assert_eq!(hypothesis.best().unwrap().text, "ok");
        assert_eq!(recognizer.fed_samples().len(), 10 * 160);
    }
}
