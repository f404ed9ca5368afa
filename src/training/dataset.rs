use std::{fs, path::Path};

use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

use crate::{
    features::{LabeledSample, LandmarkVector},
    types::FEATURE_LEN,
};

const COLUMNS: usize = FEATURE_LEN + 1;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row} has {actual} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        actual: usize,
        expected: usize,
    },

    #[error("row {row}, column {column}: invalid number {value:?}")]
    InvalidNumber {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row} has an empty label")]
    EmptyLabel { row: usize },

    #[error("dataset contains no rows")]
    Empty,
}

/// Writes samples as headerless CSV rows of 63 coordinates followed by the
/// label, replacing any file already at `path`.
pub fn write_dataset(path: &Path, samples: &[LabeledSample]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    let mut record = Vec::with_capacity(COLUMNS);
    for sample in samples {
        record.clear();
        record.extend(sample.features.as_slice().iter().map(f32::to_string));
        record.push(sample.label.clone());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_dataset(path: &Path) -> Result<Vec<LabeledSample>, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut samples = Vec::new();
    let mut values = Vec::with_capacity(FEATURE_LEN);
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result?;
        if record.len() != COLUMNS {
            return Err(DatasetError::ColumnCount {
                row,
                actual: record.len(),
                expected: COLUMNS,
            });
        }

        values.clear();
        for (column, field) in record.iter().take(FEATURE_LEN).enumerate() {
            let value = field
                .trim()
                .parse::<f32>()
                .map_err(|_| DatasetError::InvalidNumber {
                    row,
                    column,
                    value: field.to_string(),
                })?;
            values.push(value);
        }

        let label = record[FEATURE_LEN].trim();
        if label.is_empty() {
            return Err(DatasetError::EmptyLabel { row });
        }

        let features = LandmarkVector::from_values(&values).map_err(|_| {
            DatasetError::ColumnCount {
                row,
                actual: values.len() + 1,
                expected: COLUMNS,
            }
        })?;
        samples.push(LabeledSample::new(features, label));
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gesture-signs-dataset-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample(seed: f32, label: &str) -> LabeledSample {
        let values: Vec<f32> = (0..FEATURE_LEN).map(|i| seed + i as f32 * 0.001).collect();
        LabeledSample::new(LandmarkVector::from_values(&values).unwrap(), label)
    }

    #[test]
    fn written_rows_have_63_numbers_and_a_label() {
        let dir = scratch_dir("shape");
        let path = dir.join("nested").join("gestures.csv");
        let samples = vec![sample(0.1, "hello"), sample(0.7, "peace")];
        write_dataset(&path, &samples).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for (line, expected) in lines.iter().zip(["hello", "peace"]) {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), COLUMNS);
            assert!(fields[..FEATURE_LEN].iter().all(|f| f.parse::<f32>().is_ok()));
            assert_eq!(fields[FEATURE_LEN], expected);
        }

        assert_eq!(read_dataset(&path).unwrap(), samples);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn writing_replaces_an_existing_file() {
        let dir = scratch_dir("overwrite");
        let path = dir.join("gestures.csv");
        write_dataset(&path, &[sample(0.1, "bye"), sample(0.2, "bye")]).unwrap();
        write_dataset(&path, &[sample(0.3, "help_me")]).unwrap();

        let loaded = read_dataset(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "help_me");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = scratch_dir("missing");
        assert!(read_dataset(&dir.join("absent.csv")).is_err());
    }

    #[test]
    fn short_rows_are_rejected() {
        let dir = scratch_dir("short");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        fs::write(&path, "0.1,0.2,hello\n").unwrap();

        match read_dataset(&path) {
            Err(DatasetError::ColumnCount { row, actual, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let dir = scratch_dir("nan");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        let mut fields = vec!["0.5".to_string(); FEATURE_LEN];
        fields[4] = "oops".to_string();
        fields.push("hello".to_string());
        fs::write(&path, format!("{}\n", fields.join(","))).unwrap();

        assert!(matches!(
            read_dataset(&path),
            Err(DatasetError::InvalidNumber { row: 1, column: 4, .. })
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = scratch_dir("empty");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(read_dataset(&path), Err(DatasetError::Empty)));
        fs::remove_dir_all(dir).unwrap();
    }
}
