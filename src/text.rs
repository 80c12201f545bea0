//! Tokenizer and "pretrained" classifier for the text stage.
//!
//! There is no weight registry to download from; `from_pretrained` derives
//! deterministic weights from the model identifier so the same id always
//! yields the same tokenizer/classifier pair.

use std::hash::{DefaultHasher, Hash, Hasher};

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{Result, StageError};
use crate::nn::{ActFn, Mlp};

/// Reserved padding id.
pub const PAD_ID: usize = 0;
/// Reserved start-of-sequence id.
pub const CLS_ID: usize = 1;

/// Number of hash buckets the vocabulary is folded into.
const VOCAB_SIZE: usize = 1024;
/// Width of the embedding table rows.
const EMBED_DIM: usize = 32;

/// A fixed-length tokenization: ids plus an attention mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub ids: Vec<usize>,
    /// 1.0 for real tokens, 0.0 for padding.
    pub mask: Vec<f32>,
}

/// Hashing tokenizer over lowercase whitespace-split tokens.
pub struct Tokenizer {
    max_len: usize,
}

impl Tokenizer {
    pub fn from_pretrained(id: &str, max_len: usize) -> Self {
        log::info!("loading tokenizer {id}");
        Self { max_len }
    }

    /// Encodes text into exactly `max_len` ids, padding or truncating.
    pub fn encode(&self, text: &str) -> Encoding {
        let mut ids = vec![CLS_ID];
        ids.extend(
            text.split_whitespace()
                .map(|token| hash_token(&token.to_lowercase())),
        );
        ids.truncate(self.max_len);

        let real = ids.len();
        ids.resize(self.max_len, PAD_ID);

        let mut mask = vec![1.0; real];
        mask.resize(self.max_len, 0.0);

        Encoding { ids, mask }
    }
}

/// Folds a token into the non-reserved vocab range.
fn hash_token(token: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    2 + (hasher.finish() as usize) % (VOCAB_SIZE - 2)
}

/// Seed derived from a model identifier.
fn id_seed(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Embedding table plus a small dense classification head.
pub struct Classifier {
    embed: Array2<f32>,
    head: Mlp,
    num_labels: usize,
}

impl Classifier {
    /// Builds the classifier whose weights are seeded from `id`.
    ///
    /// # Errors
    /// Returns `InvalidInput` when `num_labels` is below two.
    pub fn from_pretrained(id: &str, num_labels: usize) -> Result<Self> {
        if num_labels < 2 {
            return Err(StageError::InvalidInput("a classifier needs at least two labels"));
        }

        log::info!("loading classifier {id} with {num_labels} labels");
        let mut rng = StdRng::seed_from_u64(id_seed(id));
        let embed = Array2::from_shape_fn((VOCAB_SIZE, EMBED_DIM), |_| {
            (rng.gen::<f32>() * 2.0 - 1.0) * 0.1
        });
        let head = Mlp::new(
            &[EMBED_DIM, EMBED_DIM / 2, num_labels],
            &[ActFn::Tanh, ActFn::Identity],
            &mut rng,
        )?;

        Ok(Self {
            embed,
            head,
            num_labels,
        })
    }

    /// One forward pass: mean-pooled embeddings through the head, returning
    /// the softmax cross-entropy loss against `label`. No weights change.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an out-of-range label or an all-padding
    /// encoding.
    pub fn forward(&mut self, encoding: &Encoding, label: usize) -> Result<f32> {
        if label >= self.num_labels {
            return Err(StageError::InvalidInput("label out of range"));
        }

        let pooled = self.pool(encoding)?;
        let logits = self.head.forward(pooled.view())?;

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp = logits.mapv(|l| (l - max).exp());
        let sum: f32 = exp.sum();
        let p = exp[label] / sum;

        Ok(-p.max(1e-12).ln())
    }

    /// Masked mean over the embedding rows of the encoding's ids.
    fn pool(&self, encoding: &Encoding) -> Result<Array1<f32>> {
        if encoding.ids.len() != encoding.mask.len() {
            return Err(StageError::ShapeMismatch {
                what: "attention mask",
                got: encoding.mask.len(),
                expected: encoding.ids.len(),
            });
        }

        let mut pooled = Array1::zeros(EMBED_DIM);
        let mut count = 0.0;
        for (&id, &m) in encoding.ids.iter().zip(&encoding.mask) {
            if m > 0.0 {
                pooled += &self.embed.row(id);
                count += m;
            }
        }

        if count == 0.0 {
            return Err(StageError::InvalidInput("encoding contains no real tokens"));
        }

        Ok(pooled / count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encoding_has_fixed_shape() {
        let tokenizer = Tokenizer::from_pretrained("test-model", 16);
        let enc = tokenizer.encode("Sample financial text data");

        assert_eq!(enc.ids.len(), 16);
        assert_eq!(enc.mask.len(), 16);
        assert_eq!(enc.ids[0], CLS_ID);
        // CLS + 4 tokens, rest padding.
        assert_eq!(enc.mask.iter().filter(|&&m| m > 0.0).count(), 5);
        assert!(enc.ids[5..].iter().all(|&id| id == PAD_ID));
    }

    #[test]
    fn encoding_truncates_long_text() {
        let tokenizer = Tokenizer::from_pretrained("test-model", 4);
        let enc = tokenizer.encode("a b c d e f g");
        assert_eq!(enc.ids.len(), 4);
        assert!(enc.mask.iter().all(|&m| m == 1.0));
    }

    #[test]
    fn tokenization_is_case_insensitive_and_deterministic() {
        let tokenizer = Tokenizer::from_pretrained("test-model", 8);
        assert_eq!(tokenizer.encode("Hello World"), tokenizer.encode("hello world"));
    }

    #[test]
    fn same_id_loads_same_weights() {
        let a = Classifier::from_pretrained("orion-base-uncased", 2).unwrap();
        let b = Classifier::from_pretrained("orion-base-uncased", 2).unwrap();
        let c = Classifier::from_pretrained("other-model", 2).unwrap();

        assert_eq!(a.embed, b.embed);
        assert_ne!(a.embed, c.embed);
    }

    #[test]
    fn forward_pass_yields_finite_loss() {
        let tokenizer = Tokenizer::from_pretrained("orion-base-uncased", 16);
        let mut classifier = Classifier::from_pretrained("orion-base-uncased", 2).unwrap();
        let enc = tokenizer.encode("Sample financial text data");

        let loss = classifier.forward(&enc, 1).unwrap();
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
    }

    #[test]
    fn rejects_out_of_range_label() {
        let tokenizer = Tokenizer::from_pretrained("orion-base-uncased", 16);
        let mut classifier = Classifier::from_pretrained("orion-base-uncased", 2).unwrap();
        let enc = tokenizer.encode("text");
        assert!(classifier.forward(&enc, 2).is_err());
    }
}
