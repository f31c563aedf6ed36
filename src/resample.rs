//! Train/test splits and V-fold cross-validation folds
//!
//! All resampling works on row indices. Shuffling uses a seeded `StdRng` so
//! the same seed always yields the same split.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// Row indices of an initial train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub training: Vec<usize>,
    pub testing: Vec<usize>,
}

/// One resampling fold: fit on `analysis`, evaluate on `assessment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub id: usize,
    pub analysis: Vec<usize>,
    pub assessment: Vec<usize>,
}

fn shuffled(n_rows: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut rng);
    indices
}

/// Split rows so that about `prop` of them land in the training set.
pub fn initial_split(n_rows: usize, prop: f64, seed: u64) -> Result<Split> {
    if !(prop > 0.0 && prop < 1.0) {
        return Err(PipelineError::Configuration(format!(
            "Split proportion must be between 0 and 1 (exclusive), got {}",
            prop
        )));
    }
    let n_train = (prop * n_rows as f64).round() as usize;
    if n_train == 0 || n_train == n_rows {
        return Err(PipelineError::Configuration(format!(
            "Split proportion {} of {} rows leaves one side empty",
            prop, n_rows
        )));
    }

    let indices = shuffled(n_rows, seed);
    let (training, testing) = indices.split_at(n_train);
    let mut training = training.to_vec();
    let mut testing = testing.to_vec();
    training.sort_unstable();
    testing.sort_unstable();

    Ok(Split { training, testing })
}

/// Partition rows into `v` folds of near-equal size.
pub fn vfold(n_rows: usize, v: usize, seed: u64) -> Result<Vec<Fold>> {
    if v < 2 || v > n_rows {
        return Err(PipelineError::Configuration(format!(
            "Number of folds must be between 2 and the number of rows ({}), got {}",
            n_rows, v
        )));
    }

    let mut assessments: Vec<Vec<usize>> = vec![Vec::new(); v];
    for (i, row) in shuffled(n_rows, seed).into_iter().enumerate() {
        assessments[i % v].push(row);
    }

    let folds = assessments
        .into_iter()
        .enumerate()
        .map(|(id, mut assessment)| {
            assessment.sort_unstable();
            let mut in_fold = vec![false; n_rows];
            for &row in &assessment {
                in_fold[row] = true;
            }
            let analysis = (0..n_rows).filter(|&row| !in_fold[row]).collect();
            Fold {
                id: id + 1,
                analysis,
                assessment,
            }
        })
        .collect();

    Ok(folds)
}

/// Materialize the given rows, in the given order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}
