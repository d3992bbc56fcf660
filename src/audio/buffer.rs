//! Bounded frame buffer between an audio producer and the recognizer feed.
//!
//! One producer writes, one consumer reads:
//! ```text
//!   producer ──write/write_blocking──▶ [ ring of `capacity` frames ] ──read_frame──▶ consumer
//!                                             │
//!                          close() ───────────┴──▶ frames back to the pool
//! ```
//! - `write` never waits; at capacity it hands the frame back with `BufferFull`.
//! - `write_blocking` waits for the consumer to free a slot.
//! - `read_frame` waits for the producer, and reports `Eof` once
//!   `write_final` was called and every buffered frame has been read.
//! - `close` tears the buffer down and wakes whoever is waiting.
//!
//! At most one reader and one writer may be waiting at a time. A second
//! waiter on the same side gets `ConcurrentReader` / `ConcurrentWriter`.

use crate::audio::pool::{Frame, FramePool, PoolHandle};
use crate::audio::reader::FrameReader;
use crate::defaults;
use crate::error::{Result, VoxstreamError};
use log::debug;
use thiserror::Error;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct State {
    slots: Vec<Option<Frame>>,
    read_idx: u64,
    write_idx: u64,
    size: usize,
    eof: bool,
    closed: bool,
    samples_read: u64,
    reader_waiting: bool,
    writer_waiting: bool,
    writer_unblocked: bool,
}

impl State {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            read_idx: 0,
            write_idx: 0,
            size: 0,
            eof: false,
            closed: false,
            samples_read: 0,
            reader_waiting: false,
            writer_waiting: false,
            writer_unblocked: false,
        }
    }

    fn slot(&self, idx: u64) -> usize {
        (idx % self.slots.len() as u64) as usize
    }

    /// Enqueues `frame`, or hands it back with the reason it was refused.
    fn push(&mut self, frame: Frame, frame_size: usize) -> std::result::Result<(), WriteRejected> {
        if frame.len() != frame_size {
            let actual = frame.len();
            return Err(WriteRejected::new(
                frame,
                VoxstreamError::FrameSizeMismatch {
                    expected: frame_size,
                    actual,
                },
            ));
        }
        if self.closed {
            return Err(WriteRejected::new(frame, VoxstreamError::ClosedPipe));
        }
        if self.eof {
            return Err(WriteRejected::new(frame, VoxstreamError::Eof));
        }
        if self.size == self.slots.len() {
            return Err(WriteRejected::new(frame, VoxstreamError::BufferFull));
        }

        let slot = self.slot(self.write_idx);
        self.slots[slot] = Some(frame);
        self.write_idx += 1;
        self.size += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<Frame> {
        if self.size == 0 {
            return None;
        }

        let slot = self.slot(self.read_idx);
        let frame = self.slots[slot].take()?;
        self.read_idx += 1;
        self.size -= 1;
        self.samples_read += frame.len() as u64;
        Some(frame)
    }

    fn drain(&mut self) -> Vec<Frame> {
        self.size = 0;
        self.read_idx = self.write_idx;
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

/// A frame refused by [`StreamBuffer::write`], handed back with the reason.
///
/// The caller still owns the audio and can retry, fall back to
/// [`StreamBuffer::write_blocking`] or release it.
#[derive(Error)]
#[error("{error}")]
pub struct WriteRejected {
    pub frame: Frame,
    #[source]
    pub error: VoxstreamError,
}

impl WriteRejected {
    fn new(frame: Frame, error: VoxstreamError) -> Self {
        Self { frame, error }
    }

    pub fn into_parts(self) -> (Frame, VoxstreamError) {
        (self.frame, self.error)
    }
}

impl From<WriteRejected> for VoxstreamError {
    fn from(rejected: WriteRejected) -> Self {
        rejected.error
    }
}

impl std::fmt::Debug for WriteRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteRejected")
            .field("frame_len", &self.frame.len())
            .field("error", &self.error)
            .finish()
    }
}

/// Bounded FIFO of PCM frames with blocking and non-blocking writes.
pub struct StreamBuffer {
    sample_rate: u32,
    ptime_ms: u32,
    capacity: usize,
    pool: PoolHandle,
    state: Mutex<State>,
    /// Signalled when a frame arrives, on finalize and on close.
    readable: Condvar,
    /// Signalled when a slot frees up, on finalize, on close and on unblock.
    writable: Condvar,
}

impl StreamBuffer {
    /// Creates a buffer holding up to `capacity` frames of the given format.
    ///
    /// # Errors
    /// [`VoxstreamError::PoolMiss`] if the format has no pool size class,
    /// [`VoxstreamError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(pool: &FramePool, sample_rate: u32, ptime_ms: u32, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(VoxstreamError::InvalidCapacity { capacity });
        }
        let pool = pool.get(sample_rate, ptime_ms)?;

        Ok(Self {
            sample_rate,
            ptime_ms,
            capacity,
            pool,
            state: Mutex::new(State::new(capacity)),
            readable: Condvar::new(),
            writable: Condvar::new(),
        })
    }

    /// Creates a buffer with the default 16kHz/20ms format and capacity.
    pub fn with_defaults(pool: &FramePool) -> Result<Self> {
        Self::new(
            pool,
            defaults::SAMPLE_RATE,
            defaults::PTIME_MS,
            defaults::BUFFER_FRAMES,
        )
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum number of buffered frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames waiting to be read.
    pub fn len(&self) -> usize {
        self.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// True once `write_final` was called.
    pub fn is_finalized(&self) -> bool {
        self.lock().eof
    }

    /// The pool frames are drawn from and returned to.
    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    /// Enqueues a frame without waiting.
    ///
    /// # Errors
    /// The frame comes back inside [`WriteRejected`] with `BufferFull` at
    /// capacity, `FrameSizeMismatch` if its length is not
    /// [`frame_size`](Self::frame_size), `Eof` after `write_final` or
    /// `ClosedPipe` after `close`.
    pub fn write(&self, frame: Frame) -> std::result::Result<(), WriteRejected> {
        let frame_size = self.frame_size();
        let mut state = self.lock();
        state.push(frame, frame_size)?;
        if state.reader_waiting {
            self.readable.notify_one();
        }
        Ok(())
    }

    /// Enqueues a frame, waiting for the reader to free a slot if the buffer is full.
    ///
    /// On error the frame goes back to the pool.
    ///
    /// # Errors
    /// `ClosedPipe` if the buffer is (or becomes) closed, `Eof` if it is (or
    /// becomes) finalized, `WriterUnblocked` if [`unblock_writer`](Self::unblock_writer)
    /// cancelled the wait, `ConcurrentWriter` if another writer is already waiting,
    /// `FrameSizeMismatch` for a frame of the wrong length.
    pub fn write_blocking(&self, frame: Frame) -> Result<()> {
        let frame_size = self.frame_size();
        let mut state = self.lock();
        let mut frame = frame;
        let mut cancelled = false;

        loop {
            match state.push(frame, frame_size) {
                Ok(()) => {
                    if state.reader_waiting {
                        self.readable.notify_one();
                    }
                    return Ok(());
                }
                Err(WriteRejected {
                    frame: refused,
                    error: VoxstreamError::BufferFull,
                }) => {
                    let err = if cancelled {
                        Some(VoxstreamError::WriterUnblocked)
                    } else if state.writer_waiting {
                        Some(VoxstreamError::ConcurrentWriter)
                    } else {
                        None
                    };
                    if let Some(err) = err {
                        drop(state);
                        self.pool.release(refused);
                        return Err(err);
                    }

                    frame = refused;
                    state.writer_waiting = true;
                    state = self
                        .writable
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                    state.writer_waiting = false;
                    cancelled = std::mem::take(&mut state.writer_unblocked);
                }
                Err(WriteRejected {
                    frame: refused,
                    error,
                }) => {
                    drop(state);
                    self.pool.release(refused);
                    return Err(error);
                }
            }
        }
    }

    /// Reads the next frame, waiting for the producer if the buffer is empty.
    ///
    /// # Errors
    /// `Eof` once finalized and drained, `ClosedPipe` if closed (even while
    /// waiting), `ConcurrentReader` if another reader is already waiting.
    pub fn read_frame(&self) -> Result<Frame> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(VoxstreamError::ClosedPipe);
            }

            if let Some(frame) = state.pop() {
                if state.writer_waiting {
                    self.writable.notify_one();
                }
                return Ok(frame);
            }

            if state.eof {
                return Err(VoxstreamError::Eof);
            }
            if state.reader_waiting {
                return Err(VoxstreamError::ConcurrentReader);
            }

            state.reader_waiting = true;
            state = self
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.reader_waiting = false;
        }
    }

    /// Marks the end of input. Buffered frames stay readable.
    ///
    /// # Errors
    /// `ClosedPipe` if the buffer was already closed.
    pub fn write_final(&self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(VoxstreamError::ClosedPipe);
        }
        if !state.eof {
            debug!("stream buffer finalized with {} frames pending", state.size);
        }
        state.eof = true;
        self.readable.notify_all();
        self.writable.notify_all();
        Ok(())
    }

    /// Tears the buffer down and returns every buffered frame to the pool.
    ///
    /// A waiting reader or writer wakes with `ClosedPipe`.
    ///
    /// # Errors
    /// `ClosedPipe` if the buffer was already closed.
    pub fn close(&self) -> Result<()> {
        let frames = {
            let mut state = self.lock();
            if state.closed {
                return Err(VoxstreamError::ClosedPipe);
            }
            state.closed = true;
            self.readable.notify_all();
            self.writable.notify_all();
            state.drain()
        };

        debug!("stream buffer closed, releasing {} frames", frames.len());
        for frame in frames {
            self.pool.release(frame);
        }
        Ok(())
    }

    /// Cancels a waiting [`write_blocking`](Self::write_blocking).
    ///
    /// Returns true if a writer was waiting. Calling it again before the
    /// writer has woken up is a no-op.
    pub fn unblock_writer(&self) -> bool {
        let mut state = self.lock();
        if state.writer_waiting && !state.writer_unblocked {
            state.writer_unblocked = true;
            self.writable.notify_one();
            true
        } else {
            false
        }
    }

    /// Audio time read out of the buffer so far.
    pub fn elapsed(&self) -> Duration {
        let samples = u128::from(self.lock().samples_read);
        let nanos = samples * 1_000_000_000 / u128::from(self.sample_rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.pool.frame_size()
    }

    pub fn ptime(&self) -> Duration {
        defaults::ptime_duration(self.ptime_ms)
    }

    /// Allocates a frame from this buffer's pool.
    pub fn alloc(&self) -> Frame {
        self.pool.alloc()
    }

    /// Returns a frame to this buffer's pool.
    pub fn release(&self, frame: Frame) {
        self.pool.release(frame);
    }
}

impl FrameReader for StreamBuffer {
    fn sample_rate(&self) -> u32 {
        StreamBuffer::sample_rate(self)
    }

    fn frame_size(&self) -> usize {
        StreamBuffer::frame_size(self)
    }

    fn ptime(&self) -> Duration {
        StreamBuffer::ptime(self)
    }

    fn elapsed(&self) -> Duration {
        StreamBuffer::elapsed(self)
    }

    fn alloc(&self) -> Frame {
        StreamBuffer::alloc(self)
    }

    fn release(&self, frame: Frame) {
        StreamBuffer::release(self, frame)
    }

    fn read_frame(&self) -> Result<Frame> {
        StreamBuffer::read_frame(self)
    }

    fn close(&self) -> Result<()> {
        StreamBuffer::close(self)
    }
}

impl Drop for StreamBuffer {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for frame in state.drain() {
            self.pool.release(frame);
        }
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("StreamBuffer")
            .field("sample_rate", &self.sample_rate)
            .field("ptime_ms", &self.ptime_ms)
            .field("capacity", &self.capacity)
            .field("size", &state.size)
            .field("eof", &state.eof)
            .field("closed", &state.closed)
            .finish()
    }
}
