//! A four-stage machine-learning demo pipeline: a hybrid sequence
//! regressor, a text-classifier forward pass, a generator fine-tuning loop
//! and a federated-averaging simulation, driven sequentially with a
//! fail-fast policy.

pub mod boost;
pub mod configs;
pub mod data;
pub mod error;
pub mod nn;
pub mod pipeline;
pub mod stages;
pub mod text;

pub use error::{Result, StageError};
