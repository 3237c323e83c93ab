//! Builder for creating Detection objects from various input formats.

use crate::error::Result;
use crate::tracker::{BoundingBox, Detection, ObjectKind};

use super::ClassMap;

/// Builder for creating `Detection` objects from raw model output.
///
/// A detection needs a box and a kind. The kind can be given directly or looked
/// up from a class index; classes the [`ClassMap`] does not know leave the kind
/// unset, and `build` then yields `None` so the detection is ignored.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: BoundingBox,
    kind: Option<ObjectKind>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = BoundingBox::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = BoundingBox::from_xywh(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = BoundingBox::new(x, y, w, h);
        self
    }

    pub fn kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the kind from a model class index.
    pub fn class_id(mut self, class_id: usize, classes: &ClassMap) -> Self {
        self.kind = classes.kind_of(class_id);
        self
    }

    /// Build the final `Detection`, or `None` if the class is not tracked.
    pub fn build(self) -> Option<Detection> {
        self.kind.map(|kind| Detection::new(kind, self.bbox))
    }

    /// Like [`build`](Self::build), but rejects malformed boxes.
    pub fn try_build(self) -> Result<Option<Detection>> {
        self.bbox.validate()?;
        Ok(self.build())
    }
}
