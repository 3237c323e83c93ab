//! Burn inference backend for object detection.
//!
//! This module provides a `BurnDetector` that implements `DetectionSource<RgbFrame>`
//! for running station detection models built with the Burn framework. Raw model
//! boxes are filtered by confidence and mapped to person/train detections through
//! a [`ClassMap`]; every other class is dropped here, before the tracker sees it.
//!
//! # Example
//!
//! ```ignore
//! use railtrack_events::{BurnDetector, BurnModel, ClassMap};
//! use burn::backend::NdArray;
//!
//! // Implement BurnModel for your detection model
//! struct MyYoloModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MyYoloModel {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<RawDetection> {
//!         // Run inference
//!     }
//! }
//!
//! let model = MyYoloModel::load("best.bin");
//! let detector = BurnDetector::new(model, Default::default())
//!     .with_class_map(ClassMap { person_class: 0, train_class: 1 });
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use thiserror::Error;

use super::{ClassMap, DetectionBuilder, DetectionSource, RgbFrame};
use crate::tracker::Detection;

/// Error type for Burn detection failures.
#[derive(Error, Debug, Clone)]
pub enum BurnDetectorError {
    /// Frame buffer does not match its declared dimensions.
    #[error("Invalid frame: {width}x{height} RGB needs {expected} bytes, got {got}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
    /// Preprocessing failed.
    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),
}

/// Raw detection output from the model after NMS.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Bounding box: [x1, y1, x2, y2] or [cx, cy, w, h] depending on model
    pub bbox: [f32; 4],
    /// Confidence score
    pub score: f32,
    /// Class index, if the model is multi-class
    pub class_id: Option<usize>,
}

/// Trait for Burn-based detection models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [batch, channels, height, width]
    ///
    /// # Returns
    /// Vector of raw detections in frame pixel coordinates.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<RawDetection>;

    /// Get the expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 640, 640) // Default YOLO input size
    }

    /// Whether bbox output is in XYWH format (vs TLBR).
    fn bbox_is_xywh(&self) -> bool {
        true // Most YOLO variants use XYWH
    }
}

/// Burn-based object detector implementing `DetectionSource`.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    conf_threshold: f32,
    classes: ClassMap,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a new Burn detector with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            conf_threshold: 0.25,
            classes: ClassMap::default(),
        }
    }

    /// Set the confidence threshold for filtering detections.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Set the class index mapping for person and train.
    pub fn with_class_map(mut self, classes: ClassMap) -> Self {
        self.classes = classes;
        self
    }

    /// Convert an interleaved RGB frame to a normalized `[1, C, H, W]` tensor.
    pub fn preprocess(&self, frame: &RgbFrame) -> Result<Tensor<B, 4>, BurnDetectorError> {
        if !frame.is_complete() {
            return Err(BurnDetectorError::InvalidFrame {
                width: frame.width,
                height: frame.height,
                expected: frame.width as usize * frame.height as usize * 3,
                got: frame.data.len(),
            });
        }

        let (channels, target_h, target_w) = self.model.input_size();
        if frame.height != target_h || frame.width != target_w || channels != 3 {
            return Err(BurnDetectorError::PreprocessingError(format!(
                "Frame size {}x{} doesn't match model input {}x{}x{}. Resize before detection.",
                frame.width, frame.height, channels, target_w, target_h
            )));
        }

        // Convert u8 to f32 and normalize to [0, 1]
        let data: Vec<f32> = frame.data.iter().map(|&x| x as f32 / 255.0).collect();

        // [H, W, C] interleaved -> [1, C, H, W]
        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([1, frame.height as usize, frame.width as usize, 3])
            .permute([0, 3, 1, 2]);

        Ok(tensor)
    }

    /// Convert raw model outputs to tracked-kind detections.
    fn postprocess(&self, raw_detections: Vec<RawDetection>) -> Vec<Detection> {
        raw_detections
            .into_iter()
            .filter(|d| d.score >= self.conf_threshold)
            .filter_map(|d| {
                let builder = DetectionBuilder::new().class_id(d.class_id?, &self.classes);
                let [p0, p1, p2, p3] = d.bbox;
                if self.model.bbox_is_xywh() {
                    builder.xywh(p0, p1, p2, p3).build()
                } else {
                    builder.tlbr(p0, p1, p2, p3).build()
                }
            })
            .collect()
    }
}

impl<B: Backend, M: BurnModel<B>> DetectionSource<RgbFrame> for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn detect(&mut self, frame: &RgbFrame) -> Result<Vec<Detection>, Self::Error> {
        let tensor = self.preprocess(frame)?;
        let raw_detections = self.model.forward(tensor);
        Ok(self.postprocess(raw_detections))
    }
}
