pub mod common;
pub mod ort;
pub mod palm;

use std::path::PathBuf;

use anyhow::Result;

use crate::{
    config::ModelDir, features::LandmarkVector, model_download::ModelKind, types::Frame,
};

pub use ort::OrtHandDetector;
pub use palm::PalmDetectorConfig;

/// Finds at most one hand in a frame and returns its landmarks in
/// normalized image space.
///
/// Takes `&mut self` because inference sessions need exclusive access.
pub trait HandDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkVector>>;
}

#[derive(Clone, Debug)]
pub struct DetectorConfig {
    pub handpose_model_path: PathBuf,
    pub palm_model_path: PathBuf,
    pub min_hand_confidence: f32,
    pub palm: PalmDetectorConfig,
}

impl DetectorConfig {
    pub fn new(model_dir: &ModelDir) -> Self {
        Self {
            handpose_model_path: ModelKind::HandposeEstimator.path_in(model_dir.root()),
            palm_model_path: ModelKind::PalmDetector.path_in(model_dir.root()),
            min_hand_confidence: 0.5,
            palm: PalmDetectorConfig::default(),
        }
    }

    pub fn with_min_hand_confidence(mut self, confidence: f32) -> Self {
        self.min_hand_confidence = confidence;
        self
    }
}
