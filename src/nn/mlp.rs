use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{outer, ActFn, Loss};
use crate::error::{Result, StageError};

/// A feed-forward network with owned parameters.
///
/// Weights are `(out, in)` matrices applied as `w.dot(a) + b`. The forward
/// pass caches activations and weighted sums so `train_on_batch` can run
/// backprop without recomputing them.
#[derive(Clone)]
pub struct Mlp {
    dims: Vec<usize>,
    acts: Vec<ActFn>,
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,

    // Forward caches, one entry per layer (activations also hold the input).
    activations: Vec<Array1<f32>>,
    weighted_sums: Vec<Array1<f32>>,
}

/// On-disk form of an `Mlp`: topology plus flattened parameters.
#[derive(Serialize, Deserialize)]
struct SavedMlp {
    dims: Vec<usize>,
    acts: Vec<ActFn>,
    params: Vec<f32>,
}

impl Mlp {
    /// Creates a network with uniform `±1/sqrt(fan_in)` initialization.
    ///
    /// # Errors
    /// Returns an error when fewer than two dims are given or when the
    /// number of activations does not match the number of weight layers.
    pub fn new<R: Rng>(dims: &[usize], acts: &[ActFn], rng: &mut R) -> Result<Self> {
        let mut net = Self::zeroed(dims, acts)?;

        for w in &mut net.weights {
            let bound = 1.0 / (w.ncols() as f32).sqrt();
            w.mapv_inplace(|_| (rng.gen::<f32>() * 2.0 - 1.0) * bound);
        }

        Ok(net)
    }

    /// Creates a network with all parameters at zero.
    pub fn zeroed(dims: &[usize], acts: &[ActFn]) -> Result<Self> {
        if dims.len() < 2 {
            return Err(StageError::InvalidInput("a network needs at least two dims"));
        }

        if acts.len() != dims.len() - 1 {
            return Err(StageError::ShapeMismatch {
                what: "activations",
                got: acts.len(),
                expected: dims.len() - 1,
            });
        }

        let weights: Vec<_> = (0..dims.len() - 1)
            .map(|l| Array2::zeros((dims[l + 1], dims[l])))
            .collect();
        let biases: Vec<_> = dims[1..].iter().map(|&d| Array1::zeros(d)).collect();
        let activations = dims.iter().map(|&d| Array1::zeros(d)).collect();
        let weighted_sums = biases.clone();

        Ok(Self {
            dims: dims.to_vec(),
            acts: acts.to_vec(),
            weights,
            biases,
            activations,
            weighted_sums,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.dims[0]
    }

    pub fn output_dim(&self) -> usize {
        self.dims[self.dims.len() - 1]
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of scalar parameters.
    pub fn num_params(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum::<usize>()
            + self.biases.iter().map(|b| b.len()).sum::<usize>()
    }

    /// Forward pass for a single sample.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the input width is wrong.
    pub fn forward(&mut self, x: ArrayView1<f32>) -> Result<Array1<f32>> {
        if x.len() != self.input_dim() {
            return Err(StageError::ShapeMismatch {
                what: "input",
                got: x.len(),
                expected: self.input_dim(),
            });
        }

        self.activations[0] = x.to_owned();
        for l in 0..self.weights.len() {
            let act = self.acts[l];
            let z = self.weights[l].dot(&self.activations[l]) + &self.biases[l];
            self.activations[l + 1] = z.mapv(|z| act.f(z));
            self.weighted_sums[l] = z;
        }

        Ok(self.activations[self.activations.len() - 1].clone())
    }

    /// Forward pass over a batch, one row per sample.
    pub fn forward_batch(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut out = Array2::zeros((x.nrows(), self.output_dim()));
        for (row, mut out_row) in x.outer_iter().zip(out.outer_iter_mut()) {
            out_row.assign(&self.forward(row)?);
        }
        Ok(out)
    }

    /// One gradient-descent step over a batch. Returns the mean loss.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when `x` and `y` disagree on sample count or
    /// widths do not match the network.
    pub fn train_on_batch(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        loss: Loss,
        learning_rate: f32,
    ) -> Result<f32> {
        if x.nrows() != y.nrows() {
            return Err(StageError::ShapeMismatch {
                what: "batch targets",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        if y.ncols() != self.output_dim() {
            return Err(StageError::ShapeMismatch {
                what: "target width",
                got: y.ncols(),
                expected: self.output_dim(),
            });
        }

        if x.nrows() == 0 {
            return Err(StageError::InvalidInput("empty batch"));
        }

        let mut grad_w: Vec<_> = self.weights.iter().map(|w| Array2::zeros(w.dim())).collect();
        let mut grad_b: Vec<_> = self.biases.iter().map(|b| Array1::zeros(b.dim())).collect();
        let mut total_loss = 0.0;
        let nlayers = self.weights.len();

        for (xr, yr) in x.outer_iter().zip(y.outer_iter()) {
            let y_pred = self.forward(xr)?;
            total_loss += loss.value(y_pred.view(), yr);

            let mut delta = loss.output_delta(
                y_pred.view(),
                self.weighted_sums[nlayers - 1].view(),
                yr,
                self.acts[nlayers - 1],
            );

            for l in (0..nlayers).rev() {
                grad_w[l] += &outer(delta.view(), self.activations[l].view());
                grad_b[l] += &delta;

                if l > 0 {
                    let act = self.acts[l - 1];
                    delta = self.weights[l].t().dot(&delta)
                        * self.weighted_sums[l - 1].mapv(|z| act.df(z));
                }
            }
        }

        let scale = -learning_rate / x.nrows() as f32;
        for l in 0..nlayers {
            self.weights[l].scaled_add(scale, &grad_w[l]);
            self.biases[l].scaled_add(scale, &grad_b[l]);
        }

        Ok(total_loss / x.nrows() as f32)
    }

    /// Flattens all parameters, layer by layer, weights before biases.
    pub fn params(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.num_params());
        for (w, b) in self.weights.iter().zip(&self.biases) {
            flat.extend(w.iter().copied());
            flat.extend(b.iter().copied());
        }
        flat
    }

    /// Overwrites all parameters from a flat slice (inverse of `params`).
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the slice length is wrong.
    pub fn set_params(&mut self, flat: &[f32]) -> Result<()> {
        if flat.len() != self.num_params() {
            return Err(StageError::ShapeMismatch {
                what: "params",
                got: flat.len(),
                expected: self.num_params(),
            });
        }

        let mut offset = 0;
        for (w, b) in self.weights.iter_mut().zip(&mut self.biases) {
            for v in w.iter_mut() {
                *v = flat[offset];
                offset += 1;
            }
            for v in b.iter_mut() {
                *v = flat[offset];
                offset += 1;
            }
        }

        Ok(())
    }

    /// Writes topology and parameters as JSON, overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let saved = SavedMlp {
            dims: self.dims.clone(),
            acts: self.acts.clone(),
            params: self.params(),
        };
        std::fs::write(path, serde_json::to_vec(&saved)?)?;
        Ok(())
    }

    /// Loads a network previously written by `save`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let saved: SavedMlp = serde_json::from_slice(&bytes)?;
        let mut net = Self::zeroed(&saved.dims, &saved.acts)?;
        net.set_params(&saved.params)?;
        Ok(net)
    }
}
