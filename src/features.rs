//! Flat landmark feature vectors shared by capture, training and inference.

use thiserror::Error;

use crate::types::{FEATURE_LEN, NUM_LANDMARKS};

#[derive(Error, Debug, PartialEq)]
pub enum FeatureError {
    #[error("expected 21 landmarks, got {0}")]
    LandmarkCount(usize),

    #[error("expected 63 feature values, got {0}")]
    FeatureCount(usize),
}

/// 21 hand keypoints flattened as `[x0, y0, z0, x1, y1, z1, ...]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkVector([f32; FEATURE_LEN]);

impl LandmarkVector {
    pub fn from_landmarks(landmarks: &[[f32; 3]]) -> Result<Self, FeatureError> {
        if landmarks.len() != NUM_LANDMARKS {
            return Err(FeatureError::LandmarkCount(landmarks.len()));
        }

        let mut values = [0.0; FEATURE_LEN];
        for (dst, point) in values.chunks_exact_mut(3).zip(landmarks) {
            dst.copy_from_slice(point);
        }
        Ok(Self(values))
    }

    pub fn from_values(values: &[f32]) -> Result<Self, FeatureError> {
        let values: [f32; FEATURE_LEN] = values
            .try_into()
            .map_err(|_| FeatureError::FeatureCount(values.len()))?;
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn landmark(&self, index: usize) -> Option<[f32; 3]> {
        let chunk = self.0.chunks_exact(3).nth(index)?;
        Some([chunk[0], chunk[1], chunk[2]])
    }
}

/// One dataset row: a landmark vector and the gesture it was captured for.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledSample {
    pub features: LandmarkVector,
    pub label: String,
}

impl LabeledSample {
    pub fn new(features: LandmarkVector, label: impl Into<String>) -> Self {
        Self {
            features,
            label: label.into(),
        }
    }
}
