use crate::error::{Result, TransformerError};
use crate::{PlainMatrix, PlainVector};

/// The k-th generalized diagonal: `diag[i] = mat[i][(i + k) mod size]`.
/// `mat` must already be square.
pub(crate) fn diagonal(mat: &[PlainVector], k: usize) -> PlainVector {
    let size = mat.len();
    (0..size).map(|i| mat[i][(i + k) % size]).collect()
}

/// Checks that `mat` is `dim` x `dim`.
pub fn validate_square(mat: &[PlainVector], dim: usize) -> Result<()> {
    if mat.len() != dim {
        return Err(TransformerError::MalformedMatrix(format!(
            "expected {} rows, got {}",
            dim,
            mat.len()
        )));
    }
    if let Some((i, row)) = mat.iter().enumerate().find(|(_, row)| row.len() != dim) {
        return Err(TransformerError::MalformedMatrix(format!(
            "row {} has {} entries, expected {}",
            i,
            row.len(),
            dim
        )));
    }
    Ok(())
}

/// All D generalized diagonals of a square matrix. With `x` packed into D
/// slots, `sum_j rot(x, j) * diagonal_j` is the vector `mat * x`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalSet {
    diagonals: Vec<PlainVector>,
}

impl DiagonalSet {
    pub fn from_matrix(mat: &PlainMatrix, dim: usize) -> Result<Self> {
        validate_square(mat, dim)?;
        Ok(Self {
            diagonals: (0..dim).map(|k| diagonal(mat, k)).collect(),
        })
    }

    pub fn dim(&self) -> usize {
        self.diagonals.len()
    }

    pub fn get(&self, k: usize) -> &PlainVector {
        &self.diagonals[k]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlainVector> {
        self.diagonals.iter()
    }
}
