//! K-nearest-neighbour regression

use faer::Mat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Stores the training rows; prediction averages the outcomes of the `k`
/// closest rows by Euclidean distance. Equal distances keep training order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    pub neighbors: usize,
    rows: Vec<Vec<f64>>,
    outcomes: Vec<f64>,
}

impl KnnModel {
    pub fn fit(x: &Mat<f64>, y: &[f64], neighbors: usize) -> Result<Self> {
        if neighbors == 0 {
            return Err(PipelineError::Configuration(
                "KNN needs at least one neighbour".to_string(),
            ));
        }
        if x.nrows() == 0 {
            return Err(PipelineError::fit("knn_model", "no training rows"));
        }

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .map(|i| (0..x.ncols()).map(|j| x[(i, j)]).collect())
            .collect();
        let neighbors = neighbors.min(rows.len());

        debug!(neighbors, rows = rows.len(), "fitted knn model");
        Ok(Self {
            neighbors,
            rows,
            outcomes: y.to_vec(),
        })
    }

    pub fn predict(&self, x: &Mat<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|i| {
                let query: Vec<f64> = (0..x.ncols()).map(|j| x[(i, j)]).collect();
                let mut distances: Vec<(f64, usize)> = self
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(idx, row)| (squared_distance(row, &query), idx))
                    .collect();
                distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

                let sum: f64 = distances
                    .iter()
                    .take(self.neighbors)
                    .map(|(_, idx)| self.outcomes[*idx])
                    .sum();
                sum / self.neighbors as f64
            })
            .collect()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
