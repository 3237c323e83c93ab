//! EventPipeline for turning sampled detections into person and train events.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::tracker::{
    ObjectKind, Observation, StatusConfig, TrackManager, TrackManagerConfig, TrainStatus,
    partition_by_kind, person_status, train_status,
};

use super::{
    DetectionSource, EventSink, FragmentInfo, FrameSource, PersonEvent, SinkOutcome, TrainEvent,
};

/// Configuration for the EventPipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker: TrackManagerConfig,
    pub status: StatusConfig,
    /// Frame rate assumed when the source reports an unusable one
    pub fallback_fps: f64,
    /// Consecutive undecodable frames tolerated before the run is aborted
    pub max_consecutive_frame_errors: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracker: TrackManagerConfig::default(),
            status: StatusConfig::default(),
            fallback_fps: 30.0,
            max_consecutive_frame_errors: 30,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()?;
        self.status.validate()?;
        if !self.fallback_fps.is_finite() || self.fallback_fps <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "fallback_fps must be finite and positive, got {}",
                self.fallback_fps
            )));
        }
        Ok(())
    }
}

/// Shared flag for stopping a run between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run produced fewer events than its input could have.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineFailure {
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("detector unavailable")]
    DetectorUnavailable,

    #[error("frame source failed at frame {frame_index}: {message}")]
    SourceFailed { frame_index: u64, message: String },

    #[error("tracking failed at {time_sec}s: {message}")]
    Tracking { time_sec: f64, message: String },
}

/// Everything one run produced.
///
/// `people` is in emission order (chronological, then ascending track id within a
/// frame); `trains` is in ascending track id order. Both are always present, even
/// when `failure` is set.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub people: Vec<PersonEvent>,
    pub trains: Vec<TrainEvent>,
    pub frames_read: u64,
    pub frames_analyzed: u64,
    pub sample_step: u64,
    pub cancelled: bool,
    pub failure: Option<PipelineFailure>,
}

impl PipelineOutput {
    fn failed(failure: PipelineFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }

    /// True when every frame was consumed without a terminal failure.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && !self.cancelled
    }
}

/// Drives frame sampling, detection, tracking and event aggregation for one
/// fragment.
///
/// The pipeline is synchronous: each sampled frame is detected, associated and
/// turned into events before the next frame is read. Each run starts from an empty
/// track manager, so track ids depend only on the order detections arrive in.
pub struct EventPipeline {
    config: PipelineConfig,
    fragment: FragmentInfo,
    tracker: TrackManager,
    cancel: CancelToken,
}

impl EventPipeline {
    /// Create a new pipeline for one fragment.
    pub fn new(config: PipelineConfig, fragment: FragmentInfo) -> Result<Self> {
        config.validate()?;
        let tracker = TrackManager::new(config.tracker.clone())?;
        Ok(Self {
            config,
            fragment,
            tracker,
            cancel: CancelToken::new(),
        })
    }

    /// Create a new pipeline with default configuration.
    pub fn with_default_config(fragment: FragmentInfo) -> Self {
        Self {
            config: PipelineConfig::default(),
            fragment,
            tracker: TrackManager::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn fragment(&self) -> &FragmentInfo {
        &self.fragment
    }

    /// Frames between analyzed frames: about one analyzed frame per second.
    pub fn sample_step(fps: f64) -> u64 {
        (fps.round() as u64).max(1)
    }

    /// Open the source and run, degrading to empty output instead of failing.
    ///
    /// A missing detector or a source that cannot be opened yields empty event
    /// lists with `failure` set. The detector is checked first.
    pub fn run<S, D>(
        &self,
        open_source: impl FnOnce() -> Result<S>,
        detector: Option<D>,
    ) -> PipelineOutput
    where
        S: FrameSource,
        S::Error: Display,
        D: DetectionSource<S::Frame>,
        D::Error: Display,
    {
        let Some(mut detector) = detector else {
            warn!(video_id = %self.fragment.video_id, "no detector, writing empty output");
            return PipelineOutput::failed(PipelineFailure::DetectorUnavailable);
        };

        let mut source = match open_source() {
            Ok(source) => source,
            Err(err) => {
                warn!(video_id = %self.fragment.video_id, error = %err, "cannot open frame source");
                return PipelineOutput::failed(PipelineFailure::SourceUnavailable(err.to_string()));
            }
        };

        self.process(&mut source, &mut detector)
    }

    /// Run fail-soft and hand both event lists to `sink`.
    ///
    /// Only a sink error is returned as `Err`; pipeline failures are reported in
    /// the output and the (possibly empty) lists are still written.
    pub fn run_to_sink<S, D, K>(
        &self,
        open_source: impl FnOnce() -> Result<S>,
        detector: Option<D>,
        sink: &mut K,
    ) -> Result<(PipelineOutput, SinkOutcome)>
    where
        S: FrameSource,
        S::Error: Display,
        D: DetectionSource<S::Frame>,
        D::Error: Display,
        K: EventSink,
    {
        let output = self.run(open_source, detector);
        let outcome = sink.write(&self.fragment, &output.people, &output.trains)?;
        Ok((output, outcome))
    }

    /// Consume `source` to the end, analyzing about one frame per second.
    pub fn process<S, D>(&self, source: &mut S, detector: &mut D) -> PipelineOutput
    where
        S: FrameSource,
        S::Error: Display,
        D: DetectionSource<S::Frame>,
        D::Error: Display,
    {
        let reported_fps = source.fps();
        let fps = if reported_fps.is_finite() && reported_fps > 0.0 {
            reported_fps
        } else {
            warn!(reported_fps, fallback = self.config.fallback_fps, "unusable frame rate");
            self.config.fallback_fps
        };
        let sample_step = Self::sample_step(fps);

        info!(
            video_id = %self.fragment.video_id,
            fps,
            sample_step,
            "processing fragment"
        );

        let mut tracker = self.tracker.clone();
        let mut output = PipelineOutput {
            sample_step,
            ..Default::default()
        };
        let mut frame_index: u64 = 0;
        let mut consecutive_errors = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                info!(frame_index, "run cancelled");
                output.cancelled = true;
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_errors = 0;
                    frame
                }
                Ok(None) => break,
                Err(err) => {
                    output.frames_read += 1;
                    consecutive_errors += 1;
                    warn!(frame_index, error = %err, "skipping undecodable frame");
                    if consecutive_errors > self.config.max_consecutive_frame_errors {
                        output.failure = Some(PipelineFailure::SourceFailed {
                            frame_index,
                            message: err.to_string(),
                        });
                        break;
                    }
                    frame_index += 1;
                    continue;
                }
            };
            output.frames_read += 1;

            if frame_index % sample_step == 0 {
                let current_sec = frame_index as f64 / fps;
                if let Err(err) =
                    self.analyze_frame(&frame, current_sec, detector, &mut tracker, &mut output)
                {
                    output.failure = Some(PipelineFailure::Tracking {
                        time_sec: current_sec,
                        message: err.to_string(),
                    });
                    break;
                }
                output.frames_analyzed += 1;
            }
            frame_index += 1;
        }

        output.trains = self.summarize_trains(&tracker);

        info!(
            video_id = %self.fragment.video_id,
            frames_read = output.frames_read,
            frames_analyzed = output.frames_analyzed,
            people = output.people.len(),
            trains = output.trains.len(),
            "fragment processed"
        );

        output
    }

    fn analyze_frame<F, D>(
        &self,
        frame: &F,
        current_sec: f64,
        detector: &mut D,
        tracker: &mut TrackManager,
        output: &mut PipelineOutput,
    ) -> Result<()>
    where
        D: DetectionSource<F>,
        D::Error: Display,
    {
        let detections = match detector.detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                warn!(time_sec = current_sec, error = %err, "detector failed on frame");
                Vec::new()
            }
        };

        let (people, trains) = partition_by_kind(detections);
        tracker.step(&people, ObjectKind::Person, current_sec)?;
        tracker.step(&trains, ObjectKind::Train, current_sec)?;

        for track in tracker
            .tracks_of_mut(ObjectKind::Person)
            .filter(|t| t.seen_at(current_sec))
        {
            let previous = track.record_observation();
            let current = Observation::new(current_sec, track.last_bbox());
            let status = person_status(previous, current, &self.config.status);
            output
                .people
                .push(PersonEvent::new(&self.fragment, track.id(), current_sec, status));
        }

        for track in tracker
            .tracks_of_mut(ObjectKind::Train)
            .filter(|t| t.seen_at(current_sec))
        {
            track.record_observation();
        }

        Ok(())
    }

    fn summarize_trains(&self, tracker: &TrackManager) -> Vec<TrainEvent> {
        tracker
            .tracks_of(ObjectKind::Train)
            .filter_map(|track| {
                let (arrival, departure) = track.observed_span()?;
                let stopped = train_status(track, &self.config.status) == TrainStatus::Stopped;
                Some(TrainEvent::new(
                    &self.fragment,
                    track.id(),
                    arrival,
                    departure,
                    stopped,
                ))
            })
            .collect()
    }
}
