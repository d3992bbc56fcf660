//! PCM frame plumbing: pooled frame storage and the producer/consumer buffer.

pub mod buffer;
pub mod pool;
pub mod reader;

pub use buffer::{StreamBuffer, WriteRejected};
pub use pool::{Frame, FramePool, PoolHandle, frame_size};
pub use reader::FrameReader;
