//! The four workflows the driver runs in order.

pub mod classify;
pub mod federated;
pub mod generative;
pub mod hybrid;
