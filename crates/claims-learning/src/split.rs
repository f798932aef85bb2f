//! Seeded train/test splitting.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};

/// Row indices of a shuffled train/test partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_size × n_rows)`
/// rows for testing.
///
/// Fails with `InvalidConfig` for a `test_size` outside (0, 1) and with
/// `InvalidData` when either side would be empty.
pub fn train_test_split(n_rows: usize, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(LearningError::InvalidConfig(
            "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
        ));
    }

    let n_test = (test_size * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(LearningError::InvalidData(format!(
            "{} rows cannot be split with test_size {}: both sides need at least one row",
            n_rows, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}
