//! Synthetic series generation, splitting and windowing for the hybrid stage.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Result, StageError};

/// Builds the driver's input series: a sine sweep with gaussian noise.
pub fn synthetic_series<R: Rng>(len: usize, rng: &mut R) -> Array1<f32> {
    let xs = Array1::linspace(0.0_f32, 50.0, len);
    xs.mapv(f32::sin) + Array1::from_shape_fn(len, |_| 0.1 * rng.sample::<f32, _>(StandardNormal))
}

/// Splits a series into a leading train part and a trailing test part.
///
/// For a length-100 series and a 0.2 fraction this yields 80/20.
pub fn train_test_split(series: &Array1<f32>, test_fraction: f32) -> (Array1<f32>, Array1<f32>) {
    let len = series.len();
    let test_len = (len as f32 * test_fraction).round() as usize;
    let split = len - test_len.min(len);
    (
        series.slice(ndarray::s![..split]).to_owned(),
        series.slice(ndarray::s![split..]).to_owned(),
    )
}

/// Reshapes a 1-D series into `(len / window, window)` rows.
///
/// # Errors
/// Returns `ShapeMismatch` iff the length is not a multiple of `window`.
pub fn into_windows(series: &Array1<f32>, window: usize) -> Result<Array2<f32>> {
    if window == 0 {
        return Err(StageError::InvalidInput("window width must be non-zero"));
    }

    let len = series.len();
    if len % window != 0 {
        return Err(StageError::ShapeMismatch {
            what: "windowed series length",
            got: len,
            expected: len - len % window,
        });
    }

    Array2::from_shape_vec((len / window, window), series.to_vec()).map_err(|_| {
        StageError::ShapeMismatch {
            what: "window buffer",
            got: len,
            expected: (len / window) * window,
        }
    })
}
