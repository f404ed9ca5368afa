use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_GESTURES: &[&str] = &["hello", "bye", "how_are_you", "help_me", "peace"];
pub const DEFAULT_SAMPLES_PER_GESTURE: usize = 100;
pub const DEFAULT_DATASET_PATH: &str = "data/gesture_dataset.csv";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(3);
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_TREES: usize = 200;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Text returned by the service when the image holds no detectable hand.
pub const NO_GESTURE_TEXT: &str = "No gesture detected";

const CLASSIFIER_FILENAME: &str = "gesture_model.bin";
const ENCODER_FILENAME: &str = "label_encoder.json";

/// Locations of everything read or written under the model directory.
///
/// Training writes the classifier and encoder here and both inference
/// commands read them back from the same place.
#[derive(Clone, Debug)]
pub struct ModelDir {
    root: PathBuf,
}

impl ModelDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.root.join(CLASSIFIER_FILENAME)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.root.join(ENCODER_FILENAME)
    }
}

impl Default for ModelDir {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_DIR)
    }
}

pub fn default_gestures() -> Vec<String> {
    DEFAULT_GESTURES.iter().map(|g| g.to_string()).collect()
}
