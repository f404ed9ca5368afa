//! Random forest classifier: bootstrap-aggregated CART trees voting with
//! their leaf class distributions.

mod tree;

use ndarray::ArrayView2;
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{DEFAULT_SEED, DEFAULT_TREES};

pub use self::tree::DecisionTree;
use self::tree::TreeParams;

#[derive(Error, Debug, PartialEq)]
pub enum ForestError {
    #[error("cannot fit a forest on an empty training set")]
    EmptyTrainingSet,

    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("label {label} is out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("forest must contain at least one tree")]
    NoTrees,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub seed: u64,
    /// Candidate features per split; `None` means `sqrt(n_features)`.
    pub max_features: Option<usize>,
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_TREES,
            seed: DEFAULT_SEED,
            max_features: None,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(
        x: ArrayView2<'_, f32>,
        y: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        let n_rows = x.nrows();
        if n_rows == 0 || x.ncols() == 0 {
            return Err(ForestError::EmptyTrainingSet);
        }
        if n_rows != y.len() {
            return Err(ForestError::LengthMismatch {
                rows: n_rows,
                labels: y.len(),
            });
        }
        if let Some(&label) = y.iter().find(|&&label| label >= n_classes) {
            return Err(ForestError::LabelOutOfRange {
                label,
                classes: n_classes,
            });
        }
        if config.n_trees == 0 {
            return Err(ForestError::NoTrees);
        }

        let n_features = x.ncols();
        let max_features = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features);
        let params = TreeParams {
            n_classes,
            max_features,
            min_samples_split: config.min_samples_split,
            max_depth: config.max_depth,
        };

        // Seeds are drawn up front so the parallel fit stays reproducible.
        let mut master = StdRng::seed_from_u64(config.seed);
        let seeds: Vec<u64> = (0..config.n_trees).map(|_| master.next_u64()).collect();

        let trees = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let bootstrap: Vec<usize> =
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                DecisionTree::fit(x, y, bootstrap, params, &mut rng)
            })
            .collect();

        log::debug!(
            "fitted {} trees on {n_rows} rows ({n_features} features, {max_features} per split)",
            config.n_trees
        );

        Ok(Self {
            n_features,
            n_classes,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of the per-tree leaf distributions.
    pub fn predict_proba(&self, row: &[f32]) -> Result<Vec<f32>, ForestError> {
        if row.len() != self.n_features {
            return Err(ForestError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(ForestError::NoTrees);
        }

        let mut proba = vec![0.0f32; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.distribution(row)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f32;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }

    /// Class with the highest mean probability; ties go to the lower code.
    pub fn predict(&self, row: &[f32]) -> Result<usize, ForestError> {
        let proba = self.predict_proba(row)?;
        let mut best = 0;
        for (class, &p) in proba.iter().enumerate().skip(1) {
            if p > proba[best] {
                best = class;
            }
        }
        Ok(best)
    }

    /// Fraction of rows whose prediction matches `y`.
    pub fn score(&self, x: ArrayView2<'_, f32>, y: &[usize]) -> Result<f64, ForestError> {
        if x.nrows() != y.len() {
            return Err(ForestError::LengthMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        if y.is_empty() {
            return Err(ForestError::EmptyTrainingSet);
        }

        let mut correct = 0usize;
        for (row, &label) in x.outer_iter().zip(y) {
            let row = row.to_vec();
            if self.predict(&row)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / y.len() as f64)
    }
}
