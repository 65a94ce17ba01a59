//! Evaluation of a transformer encoder block (attention plus feedforward)
//! on CKKS-encrypted, slot-packed vectors.

pub mod config;
pub mod engine;
pub mod error;
pub mod heaan;
pub mod math;
pub mod transformer;

pub use config::{BlockConfig, HeaanParams};
pub use engine::{heaan::HeaanEngine, slot::SlotEngine, HomomorphicEngine};
pub use error::{Result, TransformerError};
pub use transformer::block::{BlockWeights, EncoderBlock};

/// Ordered real values, one per slot.
pub type PlainVector = Vec<f64>;
/// Square matrix stored as rows.
pub type PlainMatrix = Vec<PlainVector>;
