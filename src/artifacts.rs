use std::{
    fs,
    io::{BufReader, BufWriter, Write},
};

use anyhow::{Context, Result, ensure};

use crate::{config::ModelDir, forest::RandomForest, training::LabelEncoder};

/// Writes the fitted forest (bincode) and label encoder (JSON) into the
/// model directory, creating it if needed.
pub fn save(model_dir: &ModelDir, forest: &RandomForest, encoder: &LabelEncoder) -> Result<()> {
    fs::create_dir_all(model_dir.root()).with_context(|| {
        format!(
            "failed to create model directory {}",
            model_dir.root().display()
        )
    })?;

    let classifier_path = model_dir.classifier_path();
    let file = fs::File::create(&classifier_path)
        .with_context(|| format!("failed to create {}", classifier_path.display()))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, forest)
        .with_context(|| format!("failed to encode classifier {}", classifier_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", classifier_path.display()))?;

    let encoder_path = model_dir.encoder_path();
    let json = serde_json::to_vec_pretty(encoder).context("failed to encode label encoder")?;
    fs::write(&encoder_path, json)
        .with_context(|| format!("failed to write {}", encoder_path.display()))?;

    log::info!(
        "saved classifier to {} and label encoder to {}",
        classifier_path.display(),
        encoder_path.display()
    );
    Ok(())
}

pub fn load(model_dir: &ModelDir) -> Result<(RandomForest, LabelEncoder)> {
    let classifier_path = model_dir.classifier_path();
    let file = fs::File::open(&classifier_path)
        .with_context(|| format!("failed to open classifier {}", classifier_path.display()))?;
    let forest: RandomForest = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("failed to decode classifier {}", classifier_path.display()))?;

    let encoder_path = model_dir.encoder_path();
    let json = fs::read(&encoder_path)
        .with_context(|| format!("failed to read label encoder {}", encoder_path.display()))?;
    let encoder: LabelEncoder = serde_json::from_slice(&json)
        .with_context(|| format!("failed to decode label encoder {}", encoder_path.display()))?;

    ensure!(
        forest.n_classes() == encoder.len(),
        "classifier predicts {} classes but the label encoder knows {}",
        forest.n_classes(),
        encoder.len()
    );

    log::info!(
        "loaded classifier ({} trees) from {}",
        forest.trees().len(),
        classifier_path.display()
    );
    Ok((forest, encoder))
}
