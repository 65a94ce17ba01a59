use crate::error::{Result, TransformerError};

/// Shape of one encoder block invocation: `words` packed vectors of `dim`
/// slots each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    pub words: usize,
    pub dim: usize,
}

impl BlockConfig {
    pub fn new(words: usize, dim: usize) -> Result<Self> {
        let config = Self { words, dim };
        config.validate()?;
        Ok(config)
    }

    /// Infers the shape from an embedding table, rejecting empty or ragged
    /// input.
    pub fn from_embeddings(embeddings: &[Vec<f64>]) -> Result<Self> {
        let dim = embeddings
            .first()
            .map(|row| row.len())
            .ok_or_else(|| TransformerError::InvalidParameters("no embeddings".to_string()))?;
        for row in embeddings {
            if row.len() != dim {
                return Err(TransformerError::DimensionMismatch {
                    context: "embedding row",
                    expected: dim,
                    actual: row.len(),
                });
            }
        }
        Self::new(embeddings.len(), dim)
    }

    pub fn validate(&self) -> Result<()> {
        if self.words == 0 {
            return Err(TransformerError::InvalidParameters(
                "word count must be positive".to_string(),
            ));
        }
        if !self.dim.is_power_of_two() {
            return Err(TransformerError::InvalidParameters(format!(
                "slot count {} is not a power of two",
                self.dim
            )));
        }
        Ok(())
    }
}

const MAX_LOG_N: usize = 12;

/// Parameters of the HEAAN scheme. The defaults are toy parameters sized for
/// the reference workload; they carry no security guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaanParams {
    /// log2 of the ring dimension N
    pub log_n: usize,
    /// bits of the modulus at level 0
    pub log_q0: usize,
    /// bits of the scaling factor, consumed by every rescale
    pub log_p: usize,
    /// number of multiplications a fresh ciphertext supports
    pub mult_depth: usize,
    /// number of non-zero coefficients of the secret key
    pub hamming_weight: usize,
    /// standard deviation of the error distribution
    pub sigma: f64,
}

impl Default for HeaanParams {
    fn default() -> Self {
        Self {
            log_n: 5,
            log_q0: 64,
            log_p: 40,
            mult_depth: 6,
            hamming_weight: 16,
            sigma: 3.2,
        }
    }
}

impl HeaanParams {
    /// Default parameters with a ring large enough to pack `config.dim` slots.
    pub fn for_block(config: &BlockConfig) -> Self {
        let needed = config.dim.max(1).trailing_zeros() as usize + 1;
        Self::default().with_log_n(needed.max(5))
    }

    pub fn with_log_n(mut self, log_n: usize) -> Self {
        self.log_n = log_n;
        self
    }

    pub fn with_log_q0(mut self, log_q0: usize) -> Self {
        self.log_q0 = log_q0;
        self
    }

    pub fn with_log_p(mut self, log_p: usize) -> Self {
        self.log_p = log_p;
        self
    }

    pub fn with_mult_depth(mut self, mult_depth: usize) -> Self {
        self.mult_depth = mult_depth;
        self
    }

    pub fn with_hamming_weight(mut self, hamming_weight: usize) -> Self {
        self.hamming_weight = hamming_weight;
        self
    }

    pub fn n(&self) -> usize {
        1 << self.log_n
    }

    pub fn max_slots(&self) -> usize {
        self.n() / 2
    }

    /// bits of the ciphertext modulus at `level`
    pub fn log_q(&self, level: usize) -> usize {
        self.log_q0 + level * self.log_p
    }

    /// bits of the key-switching modulus, equal to the top level modulus
    pub fn log_big_q(&self) -> usize {
        self.log_q(self.mult_depth)
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_n == 0 || self.log_n > MAX_LOG_N {
            return Err(TransformerError::InvalidParameters(format!(
                "log_n must lie in 1..={}, got {}",
                MAX_LOG_N, self.log_n
            )));
        }
        if self.log_p == 0 || self.log_q0 <= self.log_p {
            return Err(TransformerError::InvalidParameters(format!(
                "need 0 < log_p < log_q0, got log_p = {}, log_q0 = {}",
                self.log_p, self.log_q0
            )));
        }
        if self.hamming_weight == 0 || self.hamming_weight > self.n() {
            return Err(TransformerError::InvalidParameters(format!(
                "hamming weight {} outside 1..={}",
                self.hamming_weight,
                self.n()
            )));
        }
        if !(self.sigma > 0.0) {
            return Err(TransformerError::InvalidParameters(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_config_from_embeddings() {
        let embeddings = vec![vec![0.1, 0.2, 0.3, 0.4], vec![0.5, 0.6, 0.7, 0.8]];
        let config = BlockConfig::from_embeddings(&embeddings).unwrap();
        assert_eq!(config, BlockConfig { words: 2, dim: 4 });

        let ragged = vec![vec![0.1, 0.2], vec![0.5]];
        assert!(matches!(
            BlockConfig::from_embeddings(&ragged),
            Err(TransformerError::DimensionMismatch { .. })
        ));
        assert!(BlockConfig::from_embeddings(&[]).is_err());
        assert!(BlockConfig::new(3, 3).is_err());
    }

    #[test]
    fn test_params_for_block() {
        let params = HeaanParams::for_block(&BlockConfig::new(3, 4).unwrap());
        assert_eq!(params.log_n, 5);
        assert!(params.validate().is_ok());

        let params = HeaanParams::for_block(&BlockConfig::new(3, 64).unwrap());
        assert_eq!(params.max_slots(), 64);
        assert_eq!(params.log_big_q(), 64 + 6 * 40);
    }

    #[test]
    fn test_params_validation() {
        assert!(HeaanParams::default().with_log_p(64).validate().is_err());
        assert!(HeaanParams::default().with_log_n(20).validate().is_err());
        assert!(HeaanParams::default().with_hamming_weight(64).validate().is_err());
    }
}
