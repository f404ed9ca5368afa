use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::{
    features::LandmarkVector, gesture::GestureClassifier, pipeline::HandDetector, types::Frame,
};

/// A detected hand and the gesture it was classified as.
#[derive(Clone, Debug)]
pub struct Recognition {
    pub landmarks: LandmarkVector,
    pub label: String,
}

/// Hand detector and gesture classifier bundled behind one call.
///
/// Shared read-only between requests; the detector is locked for the
/// duration of one detection.
pub struct Recognizer {
    detector: Mutex<Box<dyn HandDetector>>,
    classifier: Box<dyn GestureClassifier>,
}

impl Recognizer {
    pub fn new(detector: Box<dyn HandDetector>, classifier: Box<dyn GestureClassifier>) -> Self {
        Self {
            detector: Mutex::new(detector),
            classifier,
        }
    }

    /// Gesture label for the single hand in `frame`, `None` when no hand
    /// was found.
    pub fn recognize(&self, frame: &Frame) -> Result<Option<String>> {
        Ok(self.recognize_hand(frame)?.map(|recognition| recognition.label))
    }

    /// Like [`Recognizer::recognize`], keeping the landmarks for display.
    pub fn recognize_hand(&self, frame: &Frame) -> Result<Option<Recognition>> {
        let landmarks = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| anyhow!("hand detector lock poisoned"))?;
            detector.detect(frame)?
        };

        match landmarks {
            Some(landmarks) => {
                let label = self.classifier.classify(&landmarks)?;
                Ok(Some(Recognition { landmarks, label }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use anyhow::{Result, bail};

    use crate::{
        features::LandmarkVector, gesture::GestureClassifier, pipeline::HandDetector,
        types::{FEATURE_LEN, Frame},
    };

    /// Detector that replays a script of outcomes: `Some(v)` finds a hand
    /// whose every coordinate is `v`, `None` finds nothing. Once the script
    /// is exhausted it keeps returning `fallback`.
    pub struct ScriptedDetector {
        pub script: VecDeque<Option<f32>>,
        pub fallback: Option<f32>,
        pub calls: usize,
    }

    impl ScriptedDetector {
        pub fn new(script: impl IntoIterator<Item = Option<f32>>, fallback: Option<f32>) -> Self {
            Self {
                script: script.into_iter().collect(),
                fallback,
                calls: 0,
            }
        }
    }

    impl HandDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkVector>> {
            self.calls += 1;
            let outcome = self.script.pop_front().unwrap_or(self.fallback);
            Ok(outcome.map(|v| LandmarkVector::from_values(&[v; FEATURE_LEN]).unwrap()))
        }
    }

    pub struct FailingDetector;

    impl HandDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Option<LandmarkVector>> {
            bail!("palm detector exploded")
        }
    }

    /// Names a hand by its first coordinate: below 0.5 is "hello", else "peace".
    pub struct ThresholdClassifier;

    impl GestureClassifier for ThresholdClassifier {
        fn classify(&self, features: &LandmarkVector) -> Result<String> {
            let label = if features.as_slice()[0] < 0.5 { "hello" } else { "peace" };
            Ok(label.to_string())
        }
    }
}
