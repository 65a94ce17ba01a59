use thiserror::Error;

/// Every way an encrypted evaluation can fail. None of them is retried: the
/// homomorphic operations are deterministic for fixed inputs and keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformerError {
    #[error("malformed matrix: {0}")]
    MalformedMatrix(String),

    #[error("unsupported rotation: no key for index {index} ({slots} slots)")]
    UnsupportedRotation { index: usize, slots: usize },

    #[error("depth exceeded: ciphertext has {available} levels left, {needed} needed")]
    DepthExceeded { available: usize, needed: usize },

    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, TransformerError>;

pub(crate) fn ensure_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(TransformerError::DimensionMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}
