//! Stage A: recurrent sequence model feeding a boosted-stump regressor.

use log::info;
use ndarray::{ArrayView1, Axis};
use rand::Rng;

use crate::boost::GradientBoostedStumps;
use crate::configs::HybridConfig;
use crate::data::{into_windows, train_test_split};
use crate::error::Result;
use crate::nn::Recurrent;

/// Splits the series 80/20, trains the recurrent network on the train
/// windows, then fits the boosted regressor on the network's held-out
/// predictions. Any shape error propagates to the driver.
pub fn run<R: Rng>(series: ArrayView1<f32>, cfg: &HybridConfig, rng: &mut R) -> Result<()> {
    info!("splitting series into train and test sets");
    let (train, test) = train_test_split(&series.to_owned(), cfg.test_fraction);

    let train_windows = into_windows(&train, cfg.window)?;
    let train_targets = train_windows.column(cfg.window - 1).to_owned();

    info!(
        "training recurrent model on {} windows of width {}",
        train_windows.nrows(),
        cfg.window
    );
    let mut net = Recurrent::new(cfg.hidden, rng);
    let loss = net.train(
        train_windows.view(),
        train_targets.view(),
        cfg.epochs,
        cfg.learning_rate,
    )?;
    info!("recurrent training finished with loss {loss}");

    let test_windows = into_windows(&test, cfg.window)?;
    let test_targets = test_windows.column(cfg.window - 1).to_owned();
    let predictions = net.predict(test_windows.view());

    info!("training boosted regressor on recurrent predictions");
    let features = predictions.insert_axis(Axis(1));
    let booster =
        GradientBoostedStumps::fit(features.view(), test_targets.view(), cfg.boost_rounds, cfg.shrinkage)?;

    let fitted = booster.predict(features.view());
    let mse = (&fitted - &test_targets).mapv(|d| d * d).mean().unwrap_or(0.0);
    info!("hybrid sequence regressor training completed, in-sample mse {mse}");

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::synthetic_series;
    use crate::error::StageError;

    fn small_cfg() -> HybridConfig {
        HybridConfig {
            hidden: 4,
            epochs: 2,
            boost_rounds: 5,
            ..HybridConfig::default()
        }
    }

    #[test]
    fn runs_on_a_length_100_series() {
        let mut rng = rand::thread_rng();
        let series = synthetic_series(100, &mut rng);
        run(series.view(), &small_cfg(), &mut rng).unwrap();
    }

    #[test]
    fn fails_when_split_is_not_window_aligned() {
        let mut rng = rand::thread_rng();
        // 95 splits into 76/19; neither is a multiple of 10.
        let series = synthetic_series(95, &mut rng);
        let err = run(series.view(), &small_cfg(), &mut rng).unwrap_err();
        assert!(matches!(err, StageError::ShapeMismatch { .. }));
    }
}
