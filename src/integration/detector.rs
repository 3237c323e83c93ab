//! Trait for object detection inference backends.

use serde::{Deserialize, Serialize};

use crate::tracker::{Detection, ObjectKind};

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the event pipeline.
/// The detector owns all model-specific parsing: by the time detections leave
/// `detect`, they are typed person/train boxes in frame pixel coordinates.
///
/// # Example
///
/// ```ignore
/// use railtrack_events::{DetectionSource, Detection, RgbFrame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource<RgbFrame> for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &RgbFrame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource<F> {
    /// Error type for detection failures.
    type Error;

    /// Run inference on one decoded frame and return its detections.
    ///
    /// A failure here only affects the frame it was called for.
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

impl IntoDetections for Option<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter().collect()
    }
}

/// A `DetectionSource` backed by a closure. See [`detector_fn`].
pub struct FnDetector<Func>(Func);

/// Wrap a closure returning detections (or anything `IntoDetections`) as a detector.
pub fn detector_fn<Func>(func: Func) -> FnDetector<Func> {
    FnDetector(func)
}

impl<F, T, E, Func> DetectionSource<F> for FnDetector<Func>
where
    Func: FnMut(&F) -> Result<T, E>,
    T: IntoDetections,
{
    type Error = E;

    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error> {
        (self.0)(frame).map(IntoDetections::into_detections)
    }
}

/// Maps a model's class indices to the kinds the tracker handles.
///
/// Class indices are dataset dependent. The defaults match the station dataset
/// the detector was trained on: class 2 is a person, class 3 is a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassMap {
    pub person_class: usize,
    pub train_class: usize,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            person_class: 2,
            train_class: 3,
        }
    }
}

impl ClassMap {
    /// Kind for a class index, or `None` for classes the tracker ignores.
    pub fn kind_of(&self, class_id: usize) -> Option<ObjectKind> {
        if class_id == self.person_class {
            Some(ObjectKind::Person)
        } else if class_id == self.train_class {
            Some(ObjectKind::Train)
        } else {
            None
        }
    }
}
