use log::debug;

use crate::engine::HomomorphicEngine;
use crate::error::Result;

/// Levels consumed per position: scale by w1, square, scale by w2.
pub const FEED_FORWARD_DEPTH: usize = 3;

/// `((x * w1)^2) * w2` elementwise. Squaring stands in for the activation
/// function since it is the cheapest nonlinearity to evaluate
/// homomorphically; the order of the three steps is part of the
/// approximation and is kept as is.
pub struct FeedForward<'a, E: HomomorphicEngine> {
    engine: &'a E,
    w1: E::Plaintext,
    w2: E::Plaintext,
}

impl<'a, E: HomomorphicEngine> FeedForward<'a, E> {
    /// `w1` and `w2` must have D entries.
    pub fn new(engine: &'a E, w1: &[f64], w2: &[f64]) -> Result<Self> {
        Ok(Self {
            engine,
            w1: engine.encode(w1)?,
            w2: engine.encode(w2)?,
        })
    }

    pub fn apply(&self, x: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.ensure_depth(x, FEED_FORWARD_DEPTH)?;
        let t = self.engine.mul_plain(x, &self.w1)?;
        let t = self.engine.mul(&t, &t)?;
        self.engine.mul_plain(&t, &self.w2)
    }

    pub fn apply_sequence(&self, sequence: &[E::Ciphertext]) -> Result<Vec<E::Ciphertext>> {
        for x in sequence {
            self.engine.ensure_depth(x, FEED_FORWARD_DEPTH)?;
        }
        debug!("feedforward over {} positions", sequence.len());
        sequence.iter().map(|x| self.apply(x)).collect()
    }
}

/// One-shot form of [`FeedForward`].
pub fn eval_feed_forward<E: HomomorphicEngine>(
    engine: &E,
    sequence: &[E::Ciphertext],
    w1: &[f64],
    w2: &[f64],
) -> Result<Vec<E::Ciphertext>> {
    FeedForward::new(engine, w1, w2)?.apply_sequence(sequence)
}
