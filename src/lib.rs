//! # railtrack-events
//!
//! Lightweight multi-object tracking for station camera footage.
//!
//! A detector (any [`DetectionSource`]) produces person and train boxes for sampled
//! frames; the [`TrackManager`] associates them into persistent tracks by
//! intersection-over-union, and the [`EventPipeline`] turns track histories into
//! per-frame [`PersonEvent`]s and per-train [`TrainEvent`] summaries.
//!
//! ## Example
//!
//! ```rust,ignore
//! use railtrack_events::{
//!     BoundingBox, Detection, EventPipeline, FragmentInfo, MemoryFrames, ObjectKind,
//!     PipelineConfig, detector_fn,
//! };
//!
//! let fragment = FragmentInfo::new("cam01-0001", start);
//! let mut pipeline = EventPipeline::new(PipelineConfig::default(), fragment)?;
//!
//! let mut frames = MemoryFrames::new(25.0, decoded_frames);
//! let mut detector = detector_fn(|frame: &MyFrame| run_model(frame));
//! let output = pipeline.process(&mut frames, &mut detector);
//! println!("{} person events", output.people.len());
//! ```

pub mod integration;
pub mod tracker;

mod error;

pub use error::{Error, Result};
pub use integration::{
    CancelToken, ClassMap, DetectionBuilder, DetectionSource, EventPipeline, EventSink,
    FragmentInfo, FrameSource, IntoDetections, JsonDirSink, MemoryFrames, MemorySink,
    PersonEvent, PipelineConfig, PipelineFailure, PipelineOutput, RgbFrame, SinkOutcome,
    TrainEvent, TrainNumberSighting, associate_train_numbers, detector_fn,
};
pub use tracker::{
    BoundingBox, Detection, ObjectKind, Observation, PersonStatus, StatusConfig, StepReport,
    Track, TrackManager, TrackManagerConfig, TrackState, TrainStatus,
};
