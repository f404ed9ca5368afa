use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum EncoderError {
    #[error("label {0:?} was not seen when the encoder was fit")]
    UnseenLabel(String),

    #[error("code {code} is out of range for {classes} classes")]
    UnknownCode { code: usize, classes: usize },

    #[error("cannot fit a label encoder without labels")]
    NoLabels,
}

/// Maps gesture names to dense class codes.
///
/// Classes are kept sorted, so code `i` always names the `i`-th smallest
/// label regardless of the order samples were captured in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(labels: I) -> Result<Self, EncoderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        if classes.is_empty() {
            return Err(EncoderError::NoLabels);
        }
        Ok(Self {
            classes: classes.into_iter().collect(),
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &str) -> Result<usize, EncoderError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map_err(|_| EncoderError::UnseenLabel(label.to_string()))
    }

    pub fn encode_all<I, S>(&self, labels: I) -> Result<Vec<usize>, EncoderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| self.encode(label.as_ref()))
            .collect()
    }

    pub fn decode(&self, code: usize) -> Result<&str, EncoderError> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(EncoderError::UnknownCode {
                code,
                classes: self.classes.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GESTURES;

    #[test]
    fn decode_inverts_encode_for_every_gesture() {
        let captured = ["peace", "hello", "peace", "bye", "help_me", "how_are_you"];
        let encoder = LabelEncoder::fit(captured).unwrap();
        assert_eq!(encoder.len(), DEFAULT_GESTURES.len());

        for gesture in DEFAULT_GESTURES {
            let code = encoder.encode(gesture).unwrap();
            assert_eq!(encoder.decode(code).unwrap(), *gesture);
        }
    }

    #[test]
    fn codes_follow_sorted_label_order() {
        let encoder = LabelEncoder::fit(["peace", "bye", "hello"]).unwrap();
        assert_eq!(encoder.classes(), ["bye", "hello", "peace"]);
        assert_eq!(
            encoder.encode_all(["hello", "peace", "bye"]).unwrap(),
            vec![1, 2, 0]
        );
    }

    #[test]
    fn unseen_labels_and_codes_are_errors() {
        let encoder = LabelEncoder::fit(["hello", "bye"]).unwrap();
        assert_eq!(
            encoder.encode("thanks"),
            Err(EncoderError::UnseenLabel("thanks".to_string()))
        );
        assert_eq!(
            encoder.decode(2),
            Err(EncoderError::UnknownCode {
                code: 2,
                classes: 2
            })
        );
        assert_eq!(
            LabelEncoder::fit(Vec::<String>::new()),
            Err(EncoderError::NoLabels)
        );
    }
}
