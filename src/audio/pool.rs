//! Fixed size-class pool for PCM frame buffers.
//!
//! Every supported `(sample_rate, ptime)` pair maps onto one of a handful of
//! frame lengths. Each length gets its own free list, so a streaming session
//! recycles its frames instead of allocating a fresh `Vec` every 10-30ms.
//! Sessions with different formats that happen to share a frame length share
//! the same free list.

use crate::defaults;
use crate::error::{Result, VoxstreamError};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A block of 16-bit PCM samples covering one ptime.
pub type Frame = Vec<i16>;

/// Frame lengths (in samples) that have a free list.
pub const SIZE_CLASSES: [usize; 8] = [80, 160, 240, 320, 480, 640, 960, 1440];

/// Looks up the frame length for a sample rate and ptime.
///
/// Only the pairs listed here have a size class; anything else (44.1kHz,
/// 25ms, ...) is `None`.
pub fn frame_size(sample_rate: u32, ptime_ms: u32) -> Option<usize> {
    match (sample_rate, ptime_ms) {
        (8000, 10) => Some(80),
        (8000, 20) => Some(160),
        (8000, 30) => Some(240),
        (16000, 10) => Some(160),
        (16000, 20) => Some(320),
        (16000, 30) => Some(480),
        (32000, 10) => Some(320),
        (32000, 20) => Some(640),
        (32000, 30) => Some(960),
        (48000, 10) => Some(480),
        (48000, 20) => Some(960),
        (48000, 30) => Some(1440),
        _ => None,
    }
}

/// Registry of per-size-class free lists.
///
/// Construct one per process (or per test) and hand out [`PoolHandle`]s; the
/// handles are cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct FramePool {
    classes: Vec<PoolHandle>,
}

impl FramePool {
    /// Creates a registry keeping up to [`defaults::POOL_MAX_IDLE`] idle
    /// buffers per size class.
    pub fn new() -> Self {
        Self::with_max_idle(defaults::POOL_MAX_IDLE)
    }

    /// Creates a registry keeping up to `max_idle` idle buffers per size class.
    pub fn with_max_idle(max_idle: usize) -> Self {
        let classes = SIZE_CLASSES
            .iter()
            .map(|&size| PoolHandle::new(size, max_idle))
            .collect();
        Self { classes }
    }

    /// Returns the pool for frames of the given format.
    ///
    /// # Errors
    /// [`VoxstreamError::PoolMiss`] when the pair has no size class.
    pub fn get(&self, sample_rate: u32, ptime_ms: u32) -> Result<PoolHandle> {
        let handle = frame_size(sample_rate, ptime_ms)
            .and_then(|size| self.classes.iter().find(|c| c.frame_size() == size));

        match handle {
            Some(handle) => Ok(handle.clone()),
            None => {
                warn!("no frame pool for sample_rate:{sample_rate} ptime:{ptime_ms}ms");
                Err(VoxstreamError::PoolMiss {
                    sample_rate,
                    ptime_ms,
                })
            }
        }
    }

    /// Total idle buffers across all size classes.
    pub fn idle(&self) -> usize {
        self.classes.iter().map(PoolHandle::idle).sum()
    }
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new()
    }
}

struct ClassPool {
    frame_size: usize,
    free_tx: Sender<Frame>,
    free_rx: Receiver<Frame>,
    fresh: AtomicU64,
    dropped: AtomicU64,
}

/// Handle to the free list of one size class.
#[derive(Clone)]
pub struct PoolHandle {
    inner: Arc<ClassPool>,
}

impl PoolHandle {
    fn new(frame_size: usize, max_idle: usize) -> Self {
        let (free_tx, free_rx) = crossbeam_channel::bounded(max_idle);
        Self {
            inner: Arc::new(ClassPool {
                frame_size,
                free_tx,
                free_rx,
                fresh: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Number of samples in every frame of this class.
    pub fn frame_size(&self) -> usize {
        self.inner.frame_size
    }

    /// Takes a frame from the free list, or allocates one if the list is empty.
    ///
    /// Recycled frames keep whatever samples they held last; callers are
    /// expected to overwrite the whole frame.
    pub fn alloc(&self) -> Frame {
        match self.inner.free_rx.try_recv() {
            Ok(frame) => frame,
            Err(_) => {
                self.inner.fresh.fetch_add(1, Ordering::Relaxed);
                vec![0; self.inner.frame_size]
            }
        }
    }

    /// Returns a frame to the free list.
    ///
    /// Frames of the wrong length are dropped so a foreign buffer can never be
    /// handed out by [`alloc`](Self::alloc). Frames released while the free
    /// list is at capacity are dropped too.
    pub fn release(&self, frame: Frame) {
        if frame.len() != self.inner.frame_size {
            debug!(
                "dropping {}-sample frame released to {}-sample pool",
                frame.len(),
                self.inner.frame_size
            );
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if self.inner.free_tx.try_send(frame).is_err() {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of frames currently waiting on the free list.
    pub fn idle(&self) -> usize {
        self.inner.free_rx.len()
    }

    /// Frames allocated fresh because the free list was empty.
    pub fn fresh_allocations(&self) -> u64 {
        self.inner.fresh.load(Ordering::Relaxed)
    }

    /// Frames discarded by [`release`](Self::release).
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// True if both handles share one free list.
    pub fn same_pool(&self, other: &PoolHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("frame_size", &self.inner.frame_size)
            .field("idle", &self.idle())
            .finish()
    }
}
