//! Integration module for connecting detectors, frame sources and output sinks
//! with the tracker.
//!
//! This module provides traits and utilities for feeding decoded frames through
//! any inference backend (Burn, ONNX Runtime, etc.), tracking the results and
//! writing person/train event records.

mod builder;
mod detector;
mod events;
mod frames;
mod pipeline;
mod sink;

pub use builder::DetectionBuilder;
pub use detector::{ClassMap, DetectionSource, FnDetector, IntoDetections, detector_fn};
pub use events::{
    DATETIME_FORMAT, FragmentInfo, PersonEvent, TrainEvent, TrainNumberSighting,
    associate_train_numbers,
};
pub use frames::{FrameSource, MemoryFrames, RgbFrame};
pub use pipeline::{CancelToken, EventPipeline, PipelineConfig, PipelineFailure, PipelineOutput};
pub use sink::{EventSink, JsonDirSink, MemorySink, SinkOutcome};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
