use ndarray::{Array1, ArrayView1};

use super::ActFn;

const EPS: f32 = 1e-7;

/// Training objective for a network's output layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    Mse,
    /// Binary cross-entropy. Assumes a sigmoid output layer, which lets the
    /// output delta collapse to `a - y`.
    Bce,
}

impl Loss {
    /// Scalar loss value for one sample, averaged over output units.
    pub fn value(self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        match self {
            Loss::Mse => (&y_pred - &y).mapv(|d| d * d).mean().unwrap_or(0.0),
            Loss::Bce => y_pred
                .iter()
                .zip(y.iter())
                .map(|(&a, &y)| {
                    let a = a.clamp(EPS, 1.0 - EPS);
                    -(y * a.ln() + (1.0 - y) * (1.0 - a).ln())
                })
                .sum::<f32>()
                / y.len().max(1) as f32,
        }
    }

    /// Delta at the output layer, already combined with the activation
    /// derivative.
    pub fn output_delta(
        self,
        a: ArrayView1<f32>,
        z: ArrayView1<f32>,
        y: ArrayView1<f32>,
        act: ActFn,
    ) -> Array1<f32> {
        match self {
            Loss::Mse => {
                let mut d = (&a - &y).mapv(|e| 2.0 * e);
                d.zip_mut_with(&z, |d, &z| *d *= act.df(z));
                d
            }
            Loss::Bce => (&a - &y).to_owned(),
        }
    }
}
