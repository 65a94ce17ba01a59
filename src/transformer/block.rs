use log::{debug, info};

use super::attention::attention_scores;
use super::combine::combine_with_residual;
use super::diagonal::validate_square;
use super::feedforward::{FeedForward, FEED_FORWARD_DEPTH};
use super::positional::add_positional_encoding;
use super::projection::DiagonalProjector;
use super::readout::decrypt_sequence;
use crate::config::BlockConfig;
use crate::engine::HomomorphicEngine;
use crate::error::{ensure_len, Result, TransformerError};
use crate::{PlainMatrix, PlainVector};

/// Levels a fresh ciphertext needs to pass through the block: projection,
/// scoring and combination take one each, the feedforward three.
pub const REQUIRED_DEPTH: usize = 3 + FEED_FORWARD_DEPTH;

/// Plaintext weights of one encoder block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockWeights {
    pub w_q: PlainMatrix,
    pub w_k: PlainMatrix,
    pub w_v: PlainMatrix,
    pub w1: PlainVector,
    pub w2: PlainVector,
}

impl BlockWeights {
    pub fn validate(&self, dim: usize) -> Result<()> {
        validate_square(&self.w_q, dim)?;
        validate_square(&self.w_k, dim)?;
        validate_square(&self.w_v, dim)?;
        ensure_len("w1", dim, self.w1.len())?;
        ensure_len("w2", dim, self.w2.len())
    }

    /// The 4-dimensional weights of the demo block.
    pub fn reference() -> Self {
        Self {
            w_q: vec![
                vec![0.1, 0.2, 0.3, 0.4],
                vec![0.5, 0.6, 0.7, 0.8],
                vec![0.9, 1.0, 1.1, 1.2],
                vec![1.3, 1.4, 1.5, 1.6],
            ],
            w_k: vec![
                vec![0.2, 0.1, 0.4, 0.3],
                vec![0.6, 0.5, 0.8, 0.7],
                vec![1.0, 0.9, 1.2, 1.1],
                vec![1.4, 1.3, 1.6, 1.5],
            ],
            w_v: vec![
                vec![0.3, 0.4, 0.1, 0.2],
                vec![0.7, 0.8, 0.5, 0.6],
                vec![1.1, 1.2, 0.9, 1.0],
                vec![1.5, 1.6, 1.3, 1.4],
            ],
            w1: vec![0.3, 0.7, 0.2, 0.5],
            w2: vec![0.6, 0.4, 0.8, 0.1],
        }
    }
}

/// A single encoder block bound to an engine. Weights are encoded once at
/// construction; [`EncoderBlock::forward`] then runs
/// Q/K/V projection, attention scoring, the weighted sum with residual and
/// the feedforward over a whole encrypted sequence.
pub struct EncoderBlock<'a, E: HomomorphicEngine> {
    engine: &'a E,
    config: BlockConfig,
    w_q: DiagonalProjector<'a, E>,
    w_k: DiagonalProjector<'a, E>,
    w_v: DiagonalProjector<'a, E>,
    feed_forward: FeedForward<'a, E>,
}

impl<'a, E: HomomorphicEngine> EncoderBlock<'a, E> {
    pub fn new(engine: &'a E, config: BlockConfig, weights: &BlockWeights) -> Result<Self> {
        config.validate()?;
        if engine.slots() != config.dim {
            return Err(TransformerError::InvalidParameters(format!(
                "engine packs {} slots but the block dimension is {}",
                engine.slots(),
                config.dim
            )));
        }
        weights.validate(config.dim)?;

        Ok(Self {
            engine,
            config,
            w_q: DiagonalProjector::new(engine, &weights.w_q)?,
            w_k: DiagonalProjector::new(engine, &weights.w_k)?,
            w_v: DiagonalProjector::new(engine, &weights.w_v)?,
            feed_forward: FeedForward::new(engine, &weights.w1, &weights.w2)?,
        })
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Adds the positional table and encrypts one ciphertext per word.
    pub fn encrypt_embeddings(&self, embeddings: &[PlainVector]) -> Result<Vec<E::Ciphertext>> {
        ensure_len("embedding rows", self.config.words, embeddings.len())?;
        let input = add_positional_encoding(embeddings)?;
        input
            .iter()
            .map(|row| {
                ensure_len("embedding row", self.config.dim, row.len())?;
                self.engine.encrypt_vector(row)
            })
            .collect()
    }

    pub fn forward(&self, input: &[E::Ciphertext]) -> Result<Vec<E::Ciphertext>> {
        ensure_len("input sequence", self.config.words, input.len())?;
        for ct in input {
            self.engine.ensure_depth(ct, REQUIRED_DEPTH)?;
        }

        let q = self.w_q.project_sequence(input)?;
        let k = self.w_k.project_sequence(input)?;
        let v = self.w_v.project_sequence(input)?;
        debug!("projected {} positions into Q, K and V", input.len());

        let scores = attention_scores(self.engine, &q, &k, self.config.dim)?;
        let combined = combine_with_residual(self.engine, &scores, &v, input)?;
        let output = self.feed_forward.apply_sequence(&combined)?;

        info!(
            "encoder block done: {} words x {} slots",
            self.config.words, self.config.dim
        );
        Ok(output)
    }

    /// Encrypts `embeddings`, runs the block and decrypts the result.
    pub fn run(&self, embeddings: &[PlainVector]) -> Result<Vec<PlainVector>> {
        let input = self.encrypt_embeddings(embeddings)?;
        let output = self.forward(&input)?;
        decrypt_sequence(self.engine, &output, self.config.dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{heaan::HeaanEngine, slot::SlotEngine};
    use crate::heaan::utils::equal_up_to_epsilon;
    use crate::transformer::reference;

    fn embeddings() -> Vec<PlainVector> {
        vec![
            vec![0.1, 0.3, 0.2, 0.05],
            vec![0.4, 0.1, 0.2, 0.3],
            vec![0.3, 0.4, 0.1, 0.2],
        ]
    }

    fn within_relative(expected: &[f64], actual: &[f64], tol: f64) -> bool {
        let scale = expected.iter().fold(1.0f64, |m, x| m.max(x.abs()));
        equal_up_to_epsilon(expected, actual, tol * scale)
    }

    fn assert_matches_reference(output: &[PlainVector]) {
        let expected = reference::forward(&embeddings(), &BlockWeights::reference()).unwrap();
        assert_eq!(output.len(), expected.len());
        for (out, exp) in output.iter().zip(expected.iter()) {
            assert_eq!(out.len(), 4);
            assert!(within_relative(exp, out, 1e-2), "{:?} vs {:?}", out, exp);
        }
    }

    #[test]
    fn test_block_on_slot_engine() {
        let config = BlockConfig::from_embeddings(&embeddings()).unwrap();
        let engine = SlotEngine::for_block(&config, REQUIRED_DEPTH).unwrap();
        let block = EncoderBlock::new(&engine, config, &BlockWeights::reference()).unwrap();

        let input = block.encrypt_embeddings(&embeddings()).unwrap();
        let output = block.forward(&input).unwrap();
        assert!(output.iter().all(|ct| engine.level(ct) == 0));
        assert_matches_reference(&decrypt_sequence(&engine, &output, 4).unwrap());
    }

    #[test]
    fn test_block_on_heaan_engine() {
        let config = BlockConfig::from_embeddings(&embeddings()).unwrap();
        let engine = HeaanEngine::for_block(&config).unwrap();
        let block = EncoderBlock::new(&engine, config, &BlockWeights::reference()).unwrap();
        assert_matches_reference(&block.run(&embeddings()).unwrap());
    }

    #[test]
    fn test_block_with_noisy_engine() {
        let config = BlockConfig::from_embeddings(&embeddings()).unwrap();
        let engine = SlotEngine::for_block(&config, REQUIRED_DEPTH)
            .unwrap()
            .with_noise(1e-9)
            .unwrap();
        let block = EncoderBlock::new(&engine, config, &BlockWeights::reference()).unwrap();
        assert_matches_reference(&block.run(&embeddings()).unwrap());
    }

    #[test]
    fn test_block_rejects_shallow_engine() {
        let config = BlockConfig::from_embeddings(&embeddings()).unwrap();
        let engine = SlotEngine::for_block(&config, REQUIRED_DEPTH - 1).unwrap();
        let block = EncoderBlock::new(&engine, config, &BlockWeights::reference()).unwrap();
        assert_eq!(
            block.run(&embeddings()).unwrap_err(),
            TransformerError::DepthExceeded {
                available: REQUIRED_DEPTH - 1,
                needed: REQUIRED_DEPTH
            }
        );
    }

    #[test]
    fn test_block_preconditions() {
        let config = BlockConfig::new(3, 4).unwrap();
        let weights = BlockWeights::reference();

        let engine = SlotEngine::new(8, REQUIRED_DEPTH).unwrap();
        assert!(matches!(
            EncoderBlock::new(&engine, config, &weights),
            Err(TransformerError::InvalidParameters(_))
        ));

        let engine = SlotEngine::new(4, REQUIRED_DEPTH).unwrap().with_rotation_keys([1, 2]);
        assert!(matches!(
            EncoderBlock::new(&engine, config, &weights),
            Err(TransformerError::UnsupportedRotation { index: 3, .. })
        ));

        let mut bad = weights.clone();
        bad.w_v.pop();
        let engine = SlotEngine::new(4, REQUIRED_DEPTH).unwrap();
        assert!(matches!(
            EncoderBlock::new(&engine, config, &bad),
            Err(TransformerError::MalformedMatrix(_))
        ));

        let block = EncoderBlock::new(&engine, config, &weights).unwrap();
        assert!(matches!(
            block.encrypt_embeddings(&embeddings()[..2]),
            Err(TransformerError::DimensionMismatch { .. })
        ));
    }
}
