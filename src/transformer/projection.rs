use log::debug;

use super::diagonal::DiagonalSet;
use crate::engine::HomomorphicEngine;
use crate::error::{Result, TransformerError};
use crate::PlainMatrix;

/// Encrypted matrix-vector product by the diagonal method. The diagonals
/// are encoded once and reused for every word of a sequence, so the same
/// projector serves the query, key or value stream of a block.
pub struct DiagonalProjector<'a, E: HomomorphicEngine> {
    engine: &'a E,
    diagonals: Vec<E::Plaintext>,
}

impl<'a, E: HomomorphicEngine> DiagonalProjector<'a, E> {
    /// Fails with `MalformedMatrix` unless `weights` is D x D, and with
    /// `UnsupportedRotation` unless the engine holds keys for every index
    /// in [0, D).
    pub fn new(engine: &'a E, weights: &PlainMatrix) -> Result<Self> {
        let dim = engine.slots();
        let set = DiagonalSet::from_matrix(weights, dim)?;
        for j in 0..dim {
            engine.ensure_rotation(j)?;
        }
        let diagonals = set
            .iter()
            .map(|diag| engine.encode(diag))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { engine, diagonals })
    }

    /// sum_j rot(ct, j) * diag_j; slot i of the result is
    /// sum_k weights[i][k] * ct[k].
    pub fn project(&self, ct: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.ensure_depth(ct, 1)?;
        let mut acc: Option<E::Ciphertext> = None;
        for (j, diag) in self.diagonals.iter().enumerate() {
            let rotated = self.engine.left_rotate(ct, j)?;
            let term = self.engine.mul_plain(&rotated, diag)?;
            acc = Some(match acc {
                None => term,
                Some(acc) => self.engine.add(&acc, &term)?,
            });
        }
        acc.ok_or_else(|| TransformerError::MalformedMatrix("empty weight matrix".to_string()))
    }

    pub fn project_sequence(&self, sequence: &[E::Ciphertext]) -> Result<Vec<E::Ciphertext>> {
        for ct in sequence {
            self.engine.ensure_depth(ct, 1)?;
        }
        debug!(
            "projecting {} ciphertexts through {} diagonals",
            sequence.len(),
            self.diagonals.len()
        );
        sequence.iter().map(|ct| self.project(ct)).collect()
    }
}

/// One-shot form of [`DiagonalProjector`].
pub fn apply_diagonal_projection<E: HomomorphicEngine>(
    engine: &E,
    sequence: &[E::Ciphertext],
    weights: &PlainMatrix,
) -> Result<Vec<E::Ciphertext>> {
    DiagonalProjector::new(engine, weights)?.project_sequence(sequence)
}
