use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::{Array2, Axis};

use super::{
    dataset::read_dataset,
    encoder::LabelEncoder,
    split::train_test_split,
};
use crate::{
    artifacts,
    config::{DEFAULT_DATASET_PATH, DEFAULT_TEST_FRACTION, ModelDir},
    forest::{ForestConfig, RandomForest},
    types::FEATURE_LEN,
};

#[derive(Clone, Debug)]
pub struct TrainOptions {
    pub dataset: PathBuf,
    pub model_dir: ModelDir,
    pub forest: ForestConfig,
    pub test_fraction: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from(DEFAULT_DATASET_PATH),
            model_dir: ModelDir::default(),
            forest: ForestConfig::default(),
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub samples: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub classes: Vec<String>,
    pub accuracy: f64,
}

/// Fits the forest on the dataset, scores it on the holdout split and
/// writes classifier and encoder into the model directory.
pub fn train(options: &TrainOptions) -> Result<TrainingReport> {
    let samples = read_dataset(&options.dataset)
        .with_context(|| format!("failed to load dataset {}", options.dataset.display()))?;
    log::info!(
        "loaded {} samples from {}",
        samples.len(),
        options.dataset.display()
    );

    let encoder = LabelEncoder::fit(samples.iter().map(|s| s.label.as_str()))?;
    let y = encoder.encode_all(samples.iter().map(|s| s.label.as_str()))?;

    let flat: Vec<f32> = samples
        .iter()
        .flat_map(|s| s.features.as_slice().iter().copied())
        .collect();
    let x = Array2::from_shape_vec((samples.len(), FEATURE_LEN), flat)
        .context("failed to build feature matrix")?;

    let split = train_test_split(samples.len(), options.test_fraction, options.forest.seed)?;
    let x_train = x.select(Axis(0), &split.train);
    let x_test = x.select(Axis(0), &split.test);
    let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();
    let y_test: Vec<usize> = split.test.iter().map(|&i| y[i]).collect();

    let forest = RandomForest::fit(x_train.view(), &y_train, encoder.len(), &options.forest)
        .context("failed to fit random forest")?;
    let accuracy = forest
        .score(x_test.view(), &y_test)
        .context("failed to score holdout split")?;

    artifacts::save(&options.model_dir, &forest, &encoder)?;

    Ok(TrainingReport {
        samples: samples.len(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        classes: encoder.classes().to_vec(),
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        config::DEFAULT_GESTURES,
        features::{LabeledSample, LandmarkVector},
        training::dataset::write_dataset,
    };

    fn synthetic_dataset(per_gesture: usize) -> Vec<LabeledSample> {
        let mut rng = StdRng::seed_from_u64(11);
        let mut samples = Vec::new();
        for (g, gesture) in DEFAULT_GESTURES.iter().enumerate() {
            for _ in 0..per_gesture {
                let values: Vec<f32> = (0..FEATURE_LEN)
                    .map(|i| {
                        let center = ((g * 7 + i) % 5) as f32 * 0.2;
                        center + rng.gen_range(-0.02..0.02)
                    })
                    .collect();
                samples.push(LabeledSample::new(
                    LandmarkVector::from_values(&values).unwrap(),
                    *gesture,
                ));
            }
        }
        samples
    }

    fn options(name: &str) -> (TrainOptions, PathBuf) {
        let root = std::env::temp_dir().join(format!(
            "gesture-signs-trainer-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        let opts = TrainOptions {
            dataset: root.join("data").join("gesture_dataset.csv"),
            model_dir: ModelDir::new(root.join("models")),
            forest: ForestConfig {
                n_trees: 20,
                ..ForestConfig::default()
            },
            test_fraction: 0.2,
        };
        (opts, root)
    }

    #[test]
    fn trains_scores_and_persists_artifacts() {
        let (opts, root) = options("persist");
        write_dataset(&opts.dataset, &synthetic_dataset(20)).unwrap();

        let report = train(&opts).unwrap();
        assert_eq!(report.samples, 100);
        assert_eq!(report.test_size, 20);
        assert_eq!(report.train_size, 80);
        assert_eq!(report.accuracy, 1.0);
        assert!(opts.model_dir.classifier_path().exists());
        assert!(opts.model_dir.encoder_path().exists());

        let (forest, encoder) = artifacts::load(&opts.model_dir).unwrap();
        assert_eq!(forest.n_features(), FEATURE_LEN);
        for gesture in DEFAULT_GESTURES {
            let code = encoder.encode(gesture).unwrap();
            assert_eq!(encoder.decode(code).unwrap(), *gesture);
        }

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn accuracy_is_reproducible() {
        let (opts, root) = options("repeat");
        let mut samples = synthetic_dataset(12);
        // Blur two gestures together so the holdout score is not trivially 1.
        for sample in samples.iter_mut().filter(|s| s.label == "bye") {
            sample.label = if sample.features.as_slice()[0] > 0.4 {
                "hello".to_string()
            } else {
                "bye".to_string()
            };
        }
        write_dataset(&opts.dataset, &samples).unwrap();

        let first = train(&opts).unwrap();
        let second = train(&opts).unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_dataset_fails() {
        let (opts, _root) = options("missing");
        let err = train(&opts).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load dataset"));
    }
}
