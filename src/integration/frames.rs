//! Decoded frame input for the pipeline.

use std::collections::VecDeque;
use std::convert::Infallible;

/// Supplies decoded frames in strictly increasing time order.
///
/// Random access is not required. `Ok(None)` ends the stream; an `Err` means a
/// single frame could not be decoded, and the pipeline skips it while still
/// counting it towards the frame index.
pub trait FrameSource {
    type Frame;
    type Error;

    /// Nominal frame rate. Non-finite or non-positive values are replaced by the
    /// pipeline's fallback rate.
    fn fps(&self) -> f64;

    fn next_frame(&mut self) -> Result<Option<Self::Frame>, Self::Error>;
}

/// Interleaved 8-bit RGB frame (HWC layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RgbFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Whether `data` holds exactly `width * height * 3` bytes.
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }
}

/// Frame source over frames that are already decoded and held in memory.
#[derive(Debug, Clone)]
pub struct MemoryFrames<F> {
    fps: f64,
    frames: VecDeque<F>,
}

impl<F> MemoryFrames<F> {
    pub fn new(fps: f64, frames: impl IntoIterator<Item = F>) -> Self {
        Self {
            fps,
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl<F> FrameSource for MemoryFrames<F> {
    type Frame = F;
    type Error = Infallible;

    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<F>, Infallible> {
        Ok(self.frames.pop_front())
    }
}
