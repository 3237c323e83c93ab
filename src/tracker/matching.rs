//! Detections and greedy overlap association for multi-object tracking.

use std::fmt;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::tracker::bbox::BoundingBox;

/// Object class handled by the tracker. Each kind is associated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Person,
    Train,
}

impl ObjectKind {
    /// All kinds, in the order the pipeline steps them each frame.
    pub const ALL: [ObjectKind; 2] = [ObjectKind::Person, ObjectKind::Train];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Person => "person",
            ObjectKind::Train => "train",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection input for the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub kind: ObjectKind,
    /// Bounding box in TLWH format
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(kind: ObjectKind, bbox: BoundingBox) -> Self {
        Self { kind, bbox }
    }

    /// Person detection from TLWH coordinates.
    pub fn person(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(ObjectKind::Person, BoundingBox::new(x, y, width, height))
    }

    /// Train detection from TLWH coordinates.
    pub fn train(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(ObjectKind::Train, BoundingBox::new(x, y, width, height))
    }
}

/// Split a frame's detections by kind, preserving detector order within each kind.
pub fn partition_by_kind(detections: Vec<Detection>) -> (Vec<Detection>, Vec<Detection>) {
    detections
        .into_iter()
        .partition(|d| d.kind == ObjectKind::Person)
}

/// Pick the candidate column with the highest overlap for one detection row.
///
/// Columns already in `assigned` are skipped. A candidate qualifies when its
/// overlap is at least `threshold` and strictly greater than the best seen so far,
/// so ties go to the lowest column index. A zero overlap never matches.
pub fn best_match(
    overlaps: ArrayView1<'_, f32>,
    assigned: &[bool],
    threshold: f32,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_overlap = 0.0f32;

    for (col, &overlap) in overlaps.iter().enumerate() {
        if assigned[col] {
            continue;
        }
        if overlap >= threshold && overlap > best_overlap {
            best = Some(col);
            best_overlap = overlap;
        }
    }

    best
}
