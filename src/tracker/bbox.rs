use nalgebra::Point2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Stored in TLWH format (top-left x, top-left y, width, height), which is what the
/// tracker compares and what detectors are converted into at the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl BoundingBox {
    /// Create a box from top-left coordinates and dimensions without validation.
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box, rejecting non-finite coordinates and non-positive sizes.
    pub fn try_new(x: f32, y: f32, width: f32, height: f32) -> Result<Self> {
        let bbox = Self::new(x, y, width, height);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Create a box from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a box from center XYWH format, as emitted by YOLO heads.
    #[inline]
    pub fn from_xywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Check the box invariant: finite coordinates, `width > 0`, `height > 0`.
    pub fn validate(&self) -> Result<()> {
        let reason = if ![self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            Some("non-finite coordinate")
        } else if self.width <= 0.0 || self.height <= 0.0 {
            Some("non-positive size")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidBoundingBox {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                reason,
            }),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Intersection over union with another box, in `[0, 1]`.
    ///
    /// Boxes that do not intersect (including boxes that only touch along an edge)
    /// score exactly `0.0`. The computation is symmetric in its arguments.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter_area = (x2 - x1) * (y2 - y1);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            (inter_area / union_area).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Intersection over union of two boxes. See [`BoundingBox::overlap_ratio`].
#[inline]
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f32 {
    a.overlap_ratio(b)
}

/// Calculate the overlap matrix between two sets of boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn overlap_matrix(boxes_a: &[BoundingBox], boxes_b: &[BoundingBox]) -> Array2<f32> {
    let mut overlaps = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            overlaps[[i, j]] = a.overlap_ratio(b);
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_box_conversions() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(bbox.to_tlwh(), [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(bbox.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let center = bbox.center();
        assert_eq!(center.x, 25.0);
        assert_eq!(center.y, 40.0);
    }

    #[test]
    fn test_from_tlbr() {
        let bbox = BoundingBox::from_tlbr(10.0, 20.0, 40.0, 60.0);
        assert_eq!(bbox.to_tlwh(), [10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_from_xywh() {
        let bbox = BoundingBox::from_xywh(25.0, 40.0, 30.0, 40.0);
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn test_try_new_rejects_malformed() {
        assert!(BoundingBox::try_new(0.0, 0.0, 10.0, 10.0).is_ok());
        assert!(BoundingBox::try_new(0.0, 0.0, 0.0, 10.0).is_err());
        assert!(BoundingBox::try_new(0.0, 0.0, 10.0, -1.0).is_err());
        assert!(BoundingBox::try_new(f32::NAN, 0.0, 10.0, 10.0).is_err());
        assert!(BoundingBox::try_new(0.0, f32::INFINITY, 10.0, 10.0).is_err());
    }

    #[test]
    fn test_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 10.0, 10.0);

        // Intersection: 5x5 = 25
        // Union: 100 + 100 - 25 = 175
        assert_relative_eq!(a.overlap_ratio(&b), 25.0 / 175.0, epsilon = 1e-6);
    }

    #[test]
    fn test_overlap_no_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.overlap_ratio(&b), 0.0);

        // Shared edge only
        let c = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.overlap_ratio(&c), 0.0);
    }

    #[test]
    fn test_overlap_same_box() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        assert_eq!(overlap_ratio(&a, &a), 1.0);
    }

    #[test]
    fn test_overlap_matrix_shape() {
        let a = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(100.0, 100.0, 10.0, 10.0),
        ];
        let b = [BoundingBox::new(0.0, 0.0, 10.0, 10.0)];
        let m = overlap_matrix(&a, &b);
        assert_eq!(m.dim(), (2, 1));
        assert_eq!(m[[0, 0]], 1.0);
        assert_eq!(m[[1, 0]], 0.0);
    }

    fn arb_box() -> impl Strategy<Value = BoundingBox> {
        (
            -500.0f32..500.0,
            -500.0f32..500.0,
            0.5f32..300.0,
            0.5f32..300.0,
        )
            .prop_map(|(x, y, w, h)| BoundingBox::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in arb_box(), b in arb_box()) {
            prop_assert_eq!(a.overlap_ratio(&b), b.overlap_ratio(&a));
        }

        #[test]
        fn overlap_is_bounded(a in arb_box(), b in arb_box()) {
            let r = a.overlap_ratio(&b);
            prop_assert!((0.0..=1.0).contains(&r));
        }
    }
}
