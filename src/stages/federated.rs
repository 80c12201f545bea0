//! Stage D: federated averaging over synthetic clients.
//!
//! The client datasets are built by the caller and passed in; the stage
//! itself never owns global state. Each round trains a local copy of the
//! global network per client and replaces the global parameters with the
//! uniform average of the locals.

use log::info;
use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::configs::FederatedConfig;
use crate::error::{Result, StageError};
use crate::nn::{ActFn, Loss, Mlp};

/// One client's local dataset.
pub struct ClientData {
    /// `(samples, features)` feature matrix.
    pub x: Array2<f32>,
    /// `(samples, 1)` regression targets.
    pub y: Array2<f32>,
}

/// Metrics reported after each federated round.
#[derive(Debug, Clone, Copy)]
pub struct RoundMetrics {
    pub round: usize,
    /// Mean local training loss across clients.
    pub mean_loss: f32,
}

/// Draws `cfg.clients` independent standard-normal client datasets.
pub fn synthetic_clients<R: Rng>(cfg: &FederatedConfig, rng: &mut R) -> Vec<ClientData> {
    info!("creating federated data for {} clients", cfg.clients);
    (0..cfg.clients)
        .map(|_| ClientData {
            x: Array2::random_using((cfg.samples, cfg.features), StandardNormal, rng),
            y: Array2::random_using((cfg.samples, 1), StandardNormal, rng),
        })
        .collect()
}

/// Runs `cfg.rounds` rounds of federated averaging and returns the
/// per-round metrics.
///
/// # Errors
/// Returns `InvalidInput` for an empty client set and `ShapeMismatch` when
/// a client's features do not match the configured width.
pub fn run(clients: &[ClientData], cfg: &FederatedConfig) -> Result<Vec<RoundMetrics>> {
    if clients.is_empty() {
        return Err(StageError::InvalidInput("federated training needs at least one client"));
    }

    for client in clients {
        if client.x.ncols() != cfg.features {
            return Err(StageError::ShapeMismatch {
                what: "client features",
                got: client.x.ncols(),
                expected: cfg.features,
            });
        }
    }

    let mut rng = rand::thread_rng();
    let mut global = Mlp::new(
        &[cfg.features, cfg.hidden, 1],
        &[ActFn::Relu, ActFn::Identity],
        &mut rng,
    )?;

    let mut history = Vec::with_capacity(cfg.rounds);
    for round in 1..=cfg.rounds {
        let mut averaged = vec![0.0; global.num_params()];
        let mut round_loss = 0.0;

        for client in clients {
            let mut local = global.clone();
            round_loss += local.train_on_batch(
                client.x.view(),
                client.y.view(),
                Loss::Mse,
                cfg.learning_rate,
            )?;

            for (avg, p) in averaged.iter_mut().zip(local.params()) {
                *avg += p / clients.len() as f32;
            }
        }

        global.set_params(&averaged)?;

        let metrics = RoundMetrics {
            round,
            mean_loss: round_loss / clients.len() as f32,
        };
        info!("round {}, metrics: mean_loss={}", metrics.round, metrics.mean_loss);
        history.push(metrics);
    }

    info!("federated training completed");
    Ok(history)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_five_clients_with_expected_shapes() {
        let cfg = FederatedConfig::default();
        let clients = synthetic_clients(&cfg, &mut rand::thread_rng());

        assert_eq!(clients.len(), 5);
        for client in &clients {
            assert_eq!(client.x.dim(), (10, 10));
            assert_eq!(client.y.dim(), (10, 1));
        }
    }

    #[test]
    fn runs_exactly_two_rounds() {
        let cfg = FederatedConfig::default();
        let clients = synthetic_clients(&cfg, &mut rand::thread_rng());

        let history = run(&clients, &cfg).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].round, 1);
        assert_eq!(history[1].round, 2);
        assert!(history.iter().all(|m| m.mean_loss.is_finite()));
    }

    #[test]
    fn rejects_empty_client_set() {
        let cfg = FederatedConfig::default();
        assert!(matches!(
            run(&[], &cfg),
            Err(StageError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_mismatched_feature_width() {
        let cfg = FederatedConfig::default();
        let clients = vec![ClientData {
            x: Array2::zeros((10, 3)),
            y: Array2::zeros((10, 1)),
        }];
        assert!(matches!(
            run(&clients, &cfg),
            Err(StageError::ShapeMismatch { got: 3, expected: 10, .. })
        ));
    }
}
