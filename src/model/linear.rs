//! Ordinary least squares regression
//!
//! The design carries a leading intercept column. Each column is scaled to
//! unit norm and the least squares problem is solved with faer's column
//! pivoted QR, so raw polynomial terms in their natural units stay solvable.
//! Rank is judged from the diagonal of `R` against its largest entry.

use faer::prelude::SpSolverLstsq;
use faer::Mat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Relative size of a diagonal entry of `R` below which the design is rank deficient
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    /// One coefficient per design column, in column order
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit on an `n x p` design matrix (without intercept column).
    pub fn fit(x: &Mat<f64>, y: &[f64]) -> Result<Self> {
        let n = x.nrows();
        let p = x.ncols();
        if n <= p {
            return Err(PipelineError::fit(
                "linear_model",
                format!("{} rows are too few for {} predictors plus an intercept", n, p),
            ));
        }

        let mut design = Mat::<f64>::zeros(n, p + 1);
        let mut target = Mat::<f64>::zeros(n, 1);
        for i in 0..n {
            design[(i, 0)] = 1.0;
            for j in 0..p {
                design[(i, j + 1)] = x[(i, j)];
            }
            target[(i, 0)] = y[i];
        }

        let mut norms = vec![0.0; p + 1];
        for (j, norm) in norms.iter_mut().enumerate() {
            *norm = (0..n).map(|i| design[(i, j)].powi(2)).sum::<f64>().sqrt();
            if *norm == 0.0 || !norm.is_finite() {
                return Err(rank_deficient());
            }
            for i in 0..n {
                design[(i, j)] /= *norm;
            }
        }

        let qr = design.col_piv_qr();
        let r = qr.compute_thin_r();
        let largest = (0..=p).map(|k| r[(k, k)].abs()).fold(0.0, f64::max);
        if (0..=p).any(|k| r[(k, k)].abs() <= RANK_TOLERANCE * largest) {
            return Err(rank_deficient());
        }

        let solution = qr.solve_lstsq(&target);
        let beta: Vec<f64> = (0..=p).map(|j| solution[(j, 0)] / norms[j]).collect();
        if beta.iter().any(|b| !b.is_finite()) {
            return Err(rank_deficient());
        }

        debug!(predictors = p, rows = n, "fitted linear model");
        Ok(Self {
            intercept: beta[0],
            coefficients: beta[1..].to_vec(),
        })
    }

    pub fn predict(&self, x: &Mat<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|i| {
                self.coefficients
                    .iter()
                    .enumerate()
                    .fold(self.intercept, |acc, (j, c)| acc + c * x[(i, j)])
            })
            .collect()
    }
}

fn rank_deficient() -> PipelineError {
    PipelineError::fit(
        "linear_model",
        "design matrix is rank deficient (collinear or constant predictors)",
    )
}
