use log::debug;

use crate::engine::HomomorphicEngine;
use crate::error::{ensure_len, Result};

/// words x words grid; every cell holds one dot product broadcast over all
/// slots.
pub type AttentionScoreMatrix<C> = Vec<Vec<C>>;

/// Encrypted dot product of the first `dim` slots, broadcast.
pub fn dot_product<E: HomomorphicEngine>(
    engine: &E,
    q: &E::Ciphertext,
    k: &E::Ciphertext,
    dim: usize,
) -> Result<E::Ciphertext> {
    let product = engine.mul(q, k)?;
    engine.slots_sum(&product, dim)
}

/// `score[i][j] = <queries[i], keys[j]>`. The scores are raw similarities:
/// no scaling and no softmax, so they must not be read as probabilities.
pub fn attention_scores<E: HomomorphicEngine>(
    engine: &E,
    queries: &[E::Ciphertext],
    keys: &[E::Ciphertext],
    dim: usize,
) -> Result<AttentionScoreMatrix<E::Ciphertext>> {
    ensure_len("attention keys", queries.len(), keys.len())?;
    let mut rot = 1;
    while rot < dim {
        engine.ensure_rotation(rot)?;
        rot <<= 1;
    }
    for ct in queries.iter().chain(keys.iter()) {
        engine.ensure_depth(ct, 1)?;
    }

    debug!("scoring {} x {} query/key pairs", queries.len(), keys.len());
    queries
        .iter()
        .map(|q| {
            keys.iter()
                .map(|k| dot_product(engine, q, k, dim))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}
