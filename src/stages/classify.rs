//! Stage B: a single forward pass through the "pretrained" text classifier.

use log::info;

use crate::configs::TextConfig;
use crate::error::Result;
use crate::text::{Classifier, Tokenizer};

/// Tokenizes the hardcoded example, runs one forward pass with the
/// hardcoded label and logs the loss. Despite the stage's fine-tuning
/// framing, no parameter update happens here.
pub fn run(cfg: &TextConfig) -> Result<()> {
    let tokenizer = Tokenizer::from_pretrained(&cfg.model_id, cfg.max_len);
    let mut classifier = Classifier::from_pretrained(&cfg.model_id, cfg.num_labels)?;

    let encoding = tokenizer.encode(&cfg.sample_text);
    let loss = classifier.forward(&encoding, cfg.label)?;

    info!("classifier fine-tuning loss: {loss}");
    Ok(())
}
