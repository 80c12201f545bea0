//! Per-stage configuration.
//!
//! The pipeline exposes no CLI flags, environment variables or config files;
//! every knob is a hardcoded constant. They live in plain structs so the
//! stages can be exercised with smaller values from tests.

use std::path::PathBuf;

/// Stage A: recurrent network + boosted stumps over a 1-D series.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Width of the fixed-length windows the series is reshaped into.
    pub window: usize,
    /// Fraction of the series held out for the boosted regressor.
    pub test_fraction: f32,
    /// Hidden size of both recurrent layers.
    pub hidden: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    /// Boosting rounds for the stump ensemble.
    pub boost_rounds: usize,
    /// Shrinkage applied to each stump's contribution.
    pub shrinkage: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            window: 10,
            test_fraction: 0.2,
            hidden: 50,
            epochs: 10,
            learning_rate: 0.01,
            boost_rounds: 50,
            shrinkage: 0.1,
        }
    }
}

/// Stage B: one forward pass through a "pretrained" text classifier.
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Identifier the tokenizer and classifier weights are derived from.
    pub model_id: String,
    /// The single hardcoded example the stage classifies.
    pub sample_text: String,
    pub label: usize,
    pub num_labels: usize,
    /// Fixed encoding length (pad or truncate to this).
    pub max_len: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            model_id: "orion-base-uncased".to_string(),
            sample_text: "Sample financial text data".to_string(),
            label: 1,
            num_labels: 2,
            max_len: 16,
        }
    }
}

/// Stage C: generator fine-tuning loop with weight persistence.
#[derive(Debug, Clone)]
pub struct GenerativeConfig {
    /// Weights loaded from here when present.
    pub pretrained_path: PathBuf,
    /// Fine-tuned weights are always written here.
    pub save_path: PathBuf,
    pub noise_dim: usize,
    /// Hidden layer widths; the output is `output_dim` sigmoid units.
    pub hidden: Vec<usize>,
    /// Flattened image size (28 * 28).
    pub output_dim: usize,
    pub steps: usize,
    pub learning_rate: f32,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            pretrained_path: PathBuf::from("pretrained_generator.json"),
            save_path: PathBuf::from("fine_tuned_generator.json"),
            noise_dim: 100,
            hidden: vec![128, 256, 512],
            output_dim: 28 * 28,
            steps: 10,
            learning_rate: 0.01,
        }
    }
}

/// Stage D: federated averaging over synthetic clients.
#[derive(Debug, Clone, Copy)]
pub struct FederatedConfig {
    pub clients: usize,
    /// Samples per client.
    pub samples: usize,
    /// Features per sample.
    pub features: usize,
    /// Hidden size of the shared regression network.
    pub hidden: usize,
    pub rounds: usize,
    pub learning_rate: f32,
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            clients: 5,
            samples: 10,
            features: 10,
            hidden: 10,
            rounds: 2,
            learning_rate: 0.05,
        }
    }
}
