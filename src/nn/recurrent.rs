use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use super::outer;
use crate::error::{Result, StageError};

/// One Elman recurrence: `h_t = tanh(wx·x_t + wh·h_{t-1} + b)`.
#[derive(Clone)]
struct Cell {
    wx: Array2<f32>,
    wh: Array2<f32>,
    b: Array1<f32>,
}

impl Cell {
    fn new<R: Rng>(input: usize, hidden: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden as f32).sqrt();
        let mut init = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| (rng.gen::<f32>() * 2.0 - 1.0) * bound)
        };

        Self {
            wx: init((hidden, input)),
            wh: init((hidden, hidden)),
            b: Array1::zeros(hidden),
        }
    }

    fn hidden(&self) -> usize {
        self.b.len()
    }

    /// Returns the step's weighted sum and activation.
    fn step(&self, x: ArrayView1<f32>, h_prev: ArrayView1<f32>) -> (Array1<f32>, Array1<f32>) {
        let z = self.wx.dot(&x) + self.wh.dot(&h_prev) + &self.b;
        let h = z.mapv(f32::tanh);
        (z, h)
    }
}

/// Per-window forward trace kept for backprop through time.
struct Trace {
    xs: Vec<Array1<f32>>,
    z1: Vec<Array1<f32>>,
    h1: Vec<Array1<f32>>,
    z2: Vec<Array1<f32>>,
    h2: Vec<Array1<f32>>,
}

/// Gradient accumulator mirroring a `Cell`.
struct CellGrad {
    wx: Array2<f32>,
    wh: Array2<f32>,
    b: Array1<f32>,
}

impl CellGrad {
    fn zeros(cell: &Cell) -> Self {
        Self {
            wx: Array2::zeros(cell.wx.dim()),
            wh: Array2::zeros(cell.wh.dim()),
            b: Array1::zeros(cell.b.dim()),
        }
    }
}

/// Two stacked recurrent layers with a linear scalar readout.
///
/// This is the hybrid stage's sequence model: each width-10 window is fed
/// through both recurrences one value at a time and the final hidden state
/// is read out as a single prediction. Training runs full backprop through
/// time against a squared-error objective.
#[derive(Clone)]
pub struct Recurrent {
    cell1: Cell,
    cell2: Cell,
    w_out: Array1<f32>,
    b_out: f32,
}

impl Recurrent {
    pub fn new<R: Rng>(hidden: usize, rng: &mut R) -> Self {
        let cell1 = Cell::new(1, hidden, rng);
        let cell2 = Cell::new(hidden, hidden, rng);
        let bound = 1.0 / (hidden as f32).sqrt();
        let w_out = Array1::from_shape_fn(hidden, |_| (rng.gen::<f32>() * 2.0 - 1.0) * bound);

        Self {
            cell1,
            cell2,
            w_out,
            b_out: 0.0,
        }
    }

    /// Predicts one value per window row.
    pub fn predict(&self, windows: ArrayView2<f32>) -> Array1<f32> {
        Array1::from_shape_fn(windows.nrows(), |i| self.forward_trace(windows.row(i)).0)
    }

    /// Trains on `(window, target)` pairs. Returns the last epoch's mean loss.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when targets and windows disagree, and
    /// `InvalidInput` for empty windows.
    pub fn train(
        &mut self,
        windows: ArrayView2<f32>,
        targets: ArrayView1<f32>,
        epochs: usize,
        learning_rate: f32,
    ) -> Result<f32> {
        if windows.nrows() != targets.len() {
            return Err(StageError::ShapeMismatch {
                what: "window targets",
                got: targets.len(),
                expected: windows.nrows(),
            });
        }

        if windows.nrows() == 0 || windows.ncols() == 0 {
            return Err(StageError::InvalidInput("empty window batch"));
        }

        let mut mean_loss = 0.0;
        for _ in 0..epochs {
            let mut g1 = CellGrad::zeros(&self.cell1);
            let mut g2 = CellGrad::zeros(&self.cell2);
            let mut g_out = Array1::zeros(self.w_out.dim());
            let mut g_bout = 0.0;
            let mut total_loss = 0.0;

            for (window, &target) in windows.outer_iter().zip(targets.iter()) {
                let (y_pred, trace) = self.forward_trace(window);
                let err = y_pred - target;
                total_loss += err * err;

                self.backprop(&trace, 2.0 * err, &mut g1, &mut g2, &mut g_out, &mut g_bout);
            }

            let scale = -learning_rate / windows.nrows() as f32;
            self.cell1.wx.scaled_add(scale, &g1.wx);
            self.cell1.wh.scaled_add(scale, &g1.wh);
            self.cell1.b.scaled_add(scale, &g1.b);
            self.cell2.wx.scaled_add(scale, &g2.wx);
            self.cell2.wh.scaled_add(scale, &g2.wh);
            self.cell2.b.scaled_add(scale, &g2.b);
            self.w_out.scaled_add(scale, &g_out);
            self.b_out += scale * g_bout;

            mean_loss = total_loss / windows.nrows() as f32;
        }

        Ok(mean_loss)
    }

    /// Runs one window through both recurrences, keeping the trace.
    fn forward_trace(&self, window: ArrayView1<f32>) -> (f32, Trace) {
        let steps = window.len();
        let mut trace = Trace {
            xs: Vec::with_capacity(steps),
            z1: Vec::with_capacity(steps),
            h1: Vec::with_capacity(steps),
            z2: Vec::with_capacity(steps),
            h2: Vec::with_capacity(steps),
        };

        let mut h1 = Array1::zeros(self.cell1.hidden());
        let mut h2 = Array1::zeros(self.cell2.hidden());

        for &x in window.iter() {
            let x = Array1::from_elem(1, x);
            let (z1, new_h1) = self.cell1.step(x.view(), h1.view());
            let (z2, new_h2) = self.cell2.step(new_h1.view(), h2.view());
            h1 = new_h1;
            h2 = new_h2;

            trace.xs.push(x);
            trace.z1.push(z1);
            trace.h1.push(h1.clone());
            trace.z2.push(z2);
            trace.h2.push(h2.clone());
        }

        (self.w_out.dot(&h2) + self.b_out, trace)
    }

    /// Backprop through time for one window, accumulating into the grads.
    fn backprop(
        &self,
        trace: &Trace,
        dy: f32,
        g1: &mut CellGrad,
        g2: &mut CellGrad,
        g_out: &mut Array1<f32>,
        g_bout: &mut f32,
    ) {
        let steps = trace.xs.len();
        let last_h2 = &trace.h2[steps - 1];

        g_out.scaled_add(dy, last_h2);
        *g_bout += dy;

        // Readout feeds only the final step; earlier steps receive their
        // error through the recurrent connections.
        let mut dh2 = self.w_out.mapv(|w| w * dy);
        let mut dh1: Array1<f32> = Array1::zeros(self.cell1.hidden());
        let zeros1 = Array1::zeros(self.cell1.hidden());
        let zeros2 = Array1::zeros(self.cell2.hidden());

        for t in (0..steps).rev() {
            let dz2 = &dh2 * &trace.z2[t].mapv(tanh_prime);
            let h2_prev = if t == 0 { &zeros2 } else { &trace.h2[t - 1] };
            g2.wx += &outer(dz2.view(), trace.h1[t].view());
            g2.wh += &outer(dz2.view(), h2_prev.view());
            g2.b += &dz2;

            dh1 = dh1 + self.cell2.wx.t().dot(&dz2);
            dh2 = self.cell2.wh.t().dot(&dz2);

            let dz1 = &dh1 * &trace.z1[t].mapv(tanh_prime);
            let h1_prev = if t == 0 { &zeros1 } else { &trace.h1[t - 1] };
            g1.wx += &outer(dz1.view(), trace.xs[t].view());
            g1.wh += &outer(dz1.view(), h1_prev.view());
            g1.b += &dz1;

            dh1 = self.cell1.wh.t().dot(&dz1);
        }
    }
}

fn tanh_prime(z: f32) -> f32 {
    1.0 - z.tanh().powi(2)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array2;

    fn ramp_windows() -> (Array2<f32>, Array1<f32>) {
        // Eight windows from a ramp; each target is the window's last value,
        // scaled into tanh range.
        let series: Vec<f32> = (0..40).map(|v| v as f32 / 40.0).collect();
        let windows = Array2::from_shape_vec((8, 5), series).unwrap();
        let targets = windows.column(4).to_owned();
        (windows, targets)
    }

    #[test]
    fn predict_yields_one_value_per_window() {
        let mut rng = rand::thread_rng();
        let net = Recurrent::new(4, &mut rng);
        let (windows, _) = ramp_windows();
        assert_eq!(net.predict(windows.view()).len(), 8);
    }

    #[test]
    fn training_reduces_loss() {
        let mut rng = rand::thread_rng();
        let mut net = Recurrent::new(8, &mut rng);
        let (windows, targets) = ramp_windows();

        let before = net.train(windows.view(), targets.view(), 1, 0.0).unwrap();
        let after = net.train(windows.view(), targets.view(), 200, 0.05).unwrap();

        assert!(after < before, "loss went from {before} to {after}");
    }

    #[test]
    fn rejects_mismatched_targets() {
        let mut rng = rand::thread_rng();
        let mut net = Recurrent::new(4, &mut rng);
        let windows = Array2::zeros((3, 5));
        let targets = Array1::zeros(2);
        assert!(net
            .train(windows.view(), targets.view(), 1, 0.1)
            .is_err());
    }
}
