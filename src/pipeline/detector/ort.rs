use anyhow::{Context, Result, ensure};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    DetectorConfig, HandDetector,
    common::{self, HANDPOSE_INPUT_SIZE},
    palm::{PalmDetector, crop_from_palm, pick_primary_region},
};
use crate::{
    features::LandmarkVector,
    model_download::{ModelKind, ensure_model_ready},
    types::Frame,
};

/// MediaPipe palm detector followed by the handpose estimator, both run
/// through ONNX Runtime.
pub struct OrtHandDetector {
    handpose: Session,
    palm_detector: PalmDetector,
    min_hand_confidence: f32,
}

impl OrtHandDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        ensure_model_ready(ModelKind::HandposeEstimator, &config.handpose_model_path)?;
        ensure_model_ready(ModelKind::PalmDetector, &config.palm_model_path)?;

        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(&config.handpose_model_path)
            .with_context(|| {
                format!(
                    "failed to load ORT session from {}",
                    config.handpose_model_path.display()
                )
            })?;
        let palm_detector = PalmDetector::new(&config.palm_model_path, config.palm.clone())?;

        log::info!(
            "hand detector ready using {} and palm detector {}",
            config.handpose_model_path.display(),
            config.palm_model_path.display()
        );

        Ok(Self {
            handpose,
            palm_detector,
            min_hand_confidence: config.min_hand_confidence,
        })
    }
}

impl HandDetector for OrtHandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkVector>> {
        let palm_regions = self.palm_detector.detect(frame)?;
        let Some(selected) = pick_primary_region(&palm_regions) else {
            return Ok(None);
        };
        let (center, side, angle) = crop_from_palm(selected);

        let (input, transform) =
            common::prepare_rotated_crop(frame, center, side, angle, HANDPOSE_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .handpose
            .run(ort::inputs![tensor])
            .context("failed to run handpose session")?;

        ensure!(outputs.len() >= 1, "handpose model returned no outputs");

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let hand_score = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };
        let confidence = (hand_score * selected.score).clamp(0.0, 1.0);
        if confidence < self.min_hand_confidence {
            log::debug!(
                "discarding hand with confidence {confidence:.3} (palm {:.3})",
                selected.score
            );
            return Ok(None);
        }

        let normalized = transform.normalize(&landmarks);
        Ok(Some(LandmarkVector::from_landmarks(&normalized)?))
    }
}
