use anyhow::{Result, ensure};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Row indices of a train/test partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a seeded generator and reserves the first
/// `ceil(n * test_fraction)` indices for evaluation.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<HoldoutSplit> {
    ensure!(
        test_fraction > 0.0 && test_fraction < 1.0,
        "test fraction must be between 0 and 1, got {test_fraction}"
    );
    ensure!(n >= 2, "need at least 2 samples to split, got {n}");

    let n_test = (n as f64 * test_fraction).ceil() as usize;
    ensure!(
        n_test < n,
        "test fraction {test_fraction} leaves no training samples out of {n}"
    );

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train = order.split_off(n_test);
    Ok(HoldoutSplit { train, test: order })
}
