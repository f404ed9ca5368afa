use anyhow::{Context, Result};

use crate::{
    artifacts,
    config::ModelDir,
    features::LandmarkVector,
    forest::RandomForest,
    training::LabelEncoder,
};

/// Maps a landmark vector to a gesture name.
pub trait GestureClassifier: Send + Sync {
    fn classify(&self, features: &LandmarkVector) -> Result<String>;
}

/// The trained forest paired with the encoder that names its class codes.
pub struct ForestGestureClassifier {
    forest: RandomForest,
    encoder: LabelEncoder,
}

impl ForestGestureClassifier {
    pub fn new(forest: RandomForest, encoder: LabelEncoder) -> Self {
        Self { forest, encoder }
    }

    pub fn load(model_dir: &ModelDir) -> Result<Self> {
        let (forest, encoder) = artifacts::load(model_dir)?;
        log::info!("gesture classes: {:?}", encoder.classes());
        Ok(Self::new(forest, encoder))
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }
}

impl GestureClassifier for ForestGestureClassifier {
    fn classify(&self, features: &LandmarkVector) -> Result<String> {
        let code = self
            .forest
            .predict(features.as_slice())
            .context("gesture prediction failed")?;
        let label = self.encoder.decode(code)?;
        Ok(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::{forest::ForestConfig, types::FEATURE_LEN};

    #[test]
    fn predicts_through_the_encoder() {
        let encoder = LabelEncoder::fit(["peace", "hello"]).unwrap();
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            values.extend(vec![0.1 + i as f32 * 0.01; FEATURE_LEN]);
            labels.push("hello");
            values.extend(vec![0.9 - i as f32 * 0.01; FEATURE_LEN]);
            labels.push("peace");
        }
        let x = Array2::from_shape_vec((labels.len(), FEATURE_LEN), values).unwrap();
        let y = encoder.encode_all(&labels).unwrap();
        let config = ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(x.view(), &y, encoder.len(), &config).unwrap();
        let classifier = ForestGestureClassifier::new(forest, encoder);

        let high = LandmarkVector::from_values(&[0.85; FEATURE_LEN]).unwrap();
        let low = LandmarkVector::from_values(&[0.15; FEATURE_LEN]).unwrap();
        assert_eq!(classifier.classify(&high).unwrap(), "peace");
        assert_eq!(classifier.classify(&low).unwrap(), "hello");
    }
}
