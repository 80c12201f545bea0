//! Stage C: generator fine-tuning loop with weight persistence.

use log::{info, warn};
use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::configs::GenerativeConfig;
use crate::error::Result;
use crate::nn::{ActFn, Loss, Mlp};

/// Loads or builds the generator, runs the fixed fine-tuning loop on fresh
/// noise each step and persists the result. The drawn noise doubles as the
/// training target, faithfully reproducing the demo's degenerate objective.
pub fn run<R: Rng>(cfg: &GenerativeConfig, rng: &mut R) -> Result<()> {
    info!("loading pre-trained generator");
    let mut generator = load_or_build(cfg, rng)?;

    info!("fine-tuning generator");
    for step in 0..cfg.steps {
        let noise = Array2::random_using((1, cfg.noise_dim), StandardNormal, rng);
        let target = noise_target(&noise, cfg.output_dim);
        let loss = generator.train_on_batch(noise.view(), target.view(), Loss::Bce, cfg.learning_rate)?;
        info!("step {step}: generator fine-tuning loss {loss}");
    }

    generator.save(&cfg.save_path)?;
    info!("saved fine-tuned generator to {}", cfg.save_path.display());

    Ok(())
}

/// Returns the persisted generator when a compatible one exists, otherwise
/// builds a fresh one. Any load failure, including a topology mismatch,
/// falls back to a new network.
fn load_or_build<R: Rng>(cfg: &GenerativeConfig, rng: &mut R) -> Result<Mlp> {
    let dims = generator_dims(cfg);

    match Mlp::load(&cfg.pretrained_path) {
        Ok(generator) if generator.dims() == dims.as_slice() => {
            info!("loaded generator from {}", cfg.pretrained_path.display());
            Ok(generator)
        }
        Ok(generator) => {
            warn!(
                "persisted generator has dims {:?}, expected {dims:?}; building a new one",
                generator.dims()
            );
            build(cfg, rng)
        }
        Err(e) => {
            warn!("pre-trained generator not found, building a new one: {e}");
            build(cfg, rng)
        }
    }
}

fn build<R: Rng>(cfg: &GenerativeConfig, rng: &mut R) -> Result<Mlp> {
    let dims = generator_dims(cfg);
    let mut acts = vec![ActFn::Relu; dims.len() - 2];
    acts.push(ActFn::Sigmoid);
    Mlp::new(&dims, &acts, rng)
}

fn generator_dims(cfg: &GenerativeConfig) -> Vec<usize> {
    let mut dims = vec![cfg.noise_dim];
    dims.extend_from_slice(&cfg.hidden);
    dims.push(cfg.output_dim);
    dims
}

/// Turns the drawn noise into a target the sigmoid output layer can be
/// trained against: the values are tiled across the output width and
/// squashed into `[0, 1]` for the cross-entropy objective.
fn noise_target(noise: &Array2<f32>, output_dim: usize) -> Array2<f32> {
    Array2::from_shape_fn((noise.nrows(), output_dim), |(row, col)| {
        let v = noise[(row, col % noise.ncols())];
        1.0 / (1.0 + (-v).exp())
    })
}
