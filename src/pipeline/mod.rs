//! Consumer side of the frame pipeline.
//!
//! A producer writes frames into a [`StreamBuffer`](crate::audio::StreamBuffer);
//! a [`Feeder`] thread drains them into a recognizer stream and returns the
//! segmented hypothesis once the producer finalizes the buffer.

pub mod feeder;

pub use feeder::{Feeder, FeederHandle};
