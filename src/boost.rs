//! Gradient-boosted regression stumps: the hybrid stage's second learner.
//!
//! A stump is a depth-1 regression tree. Each boosting round fits one stump
//! to the current residuals and adds its shrunk prediction to the ensemble.

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{Result, StageError};

/// One depth-1 split on a single feature.
#[derive(Debug, Clone, Copy)]
struct Stump {
    feature: usize,
    threshold: f32,
    left: f32,
    right: f32,
}

impl Stump {
    fn predict(&self, row: ArrayView1<f32>) -> f32 {
        if row[self.feature] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// An additive ensemble of stumps fit to residuals.
pub struct GradientBoostedStumps {
    base: f32,
    shrinkage: f32,
    stumps: Vec<Stump>,
}

impl GradientBoostedStumps {
    /// Fits the ensemble on `(features, targets)` rows.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the row counts disagree and
    /// `InvalidInput` for an empty training set.
    pub fn fit(
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        rounds: usize,
        shrinkage: f32,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(StageError::ShapeMismatch {
                what: "boost targets",
                got: y.len(),
                expected: x.nrows(),
            });
        }

        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(StageError::InvalidInput("empty boosting input"));
        }

        let base = y.mean().unwrap_or(0.0);
        let mut residuals = y.mapv(|v| v - base);
        let mut model = Self {
            base,
            shrinkage,
            stumps: Vec::with_capacity(rounds),
        };

        for _ in 0..rounds {
            let Some(stump) = best_stump(x, residuals.view()) else {
                break;
            };

            for (row, r) in x.outer_iter().zip(residuals.iter_mut()) {
                *r -= shrinkage * stump.predict(row);
            }

            model.stumps.push(stump);
        }

        Ok(model)
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Array1<f32> {
        Array1::from_shape_fn(x.nrows(), |i| self.predict_row(x.row(i)))
    }

    fn predict_row(&self, row: ArrayView1<f32>) -> f32 {
        self.base
            + self
                .stumps
                .iter()
                .map(|s| self.shrinkage * s.predict(row))
                .sum::<f32>()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.stumps.len()
    }
}

/// Exhaustively picks the split minimizing the squared residual error.
/// Candidate thresholds are midpoints between consecutive sorted values.
fn best_stump(x: ArrayView2<f32>, residuals: ArrayView1<f32>) -> Option<Stump> {
    let mut best: Option<(f32, Stump)> = None;

    for feature in 0..x.ncols() {
        let mut values: Vec<f32> = x.column(feature).to_vec();
        values.sort_by(f32::total_cmp);
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;

            let (mut left_sum, mut left_n) = (0.0, 0usize);
            let (mut right_sum, mut right_n) = (0.0, 0usize);
            for (row, &r) in x.outer_iter().zip(residuals.iter()) {
                if row[feature] <= threshold {
                    left_sum += r;
                    left_n += 1;
                } else {
                    right_sum += r;
                    right_n += 1;
                }
            }

            if left_n == 0 || right_n == 0 {
                continue;
            }

            let left = left_sum / left_n as f32;
            let right = right_sum / right_n as f32;

            let sse: f32 = x
                .outer_iter()
                .zip(residuals.iter())
                .map(|(row, &r)| {
                    let fit = if row[feature] <= threshold { left } else { right };
                    (r - fit).powi(2)
                })
                .sum();

            if best.as_ref().map_or(true, |(best_sse, _)| sse < *best_sse) {
                best = Some((
                    sse,
                    Stump {
                        feature,
                        threshold,
                        left,
                        right,
                    },
                ));
            }
        }
    }

    best.map(|(_, stump)| stump)
}
