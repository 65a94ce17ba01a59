//! The encoder block on plain `f64` vectors. It replays the arithmetic of
//! the encrypted pipeline and serves as its correctness oracle.

use super::block::BlockWeights;
use super::diagonal::DiagonalSet;
use super::positional::add_positional_encoding;
use crate::error::{ensure_len, Result};
use crate::{PlainMatrix, PlainVector};

/// `w * x`, slot i being `sum_k w[i][k] * x[k]`.
pub fn project(x: &[f64], w: &[PlainVector]) -> PlainVector {
    w.iter().map(|row| dot(row, x)).collect()
}

/// The diagonal method on plain vectors: rotation is `rotate_left`.
pub fn project_by_diagonals(x: &[f64], diagonals: &DiagonalSet) -> PlainVector {
    let mut acc = vec![0.0; x.len()];
    for (j, diag) in diagonals.iter().enumerate() {
        let mut rotated = x.to_vec();
        rotated.rotate_left(j % x.len());
        for ((a, r), d) in acc.iter_mut().zip(rotated.iter()).zip(diag.iter()) {
            *a += r * d;
        }
    }
    acc
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn attention_scores(queries: &[PlainVector], keys: &[PlainVector]) -> Vec<Vec<f64>> {
    queries
        .iter()
        .map(|q| keys.iter().map(|k| dot(q, k)).collect())
        .collect()
}

/// `input[i] + sum_j scores[i][j] * values[j]`
pub fn combine(scores: &[Vec<f64>], values: &[PlainVector], input: &[PlainVector]) -> Vec<PlainVector> {
    scores
        .iter()
        .zip(input.iter())
        .map(|(row, x)| {
            let mut acc = vec![0.0; x.len()];
            for (s, v) in row.iter().zip(values.iter()) {
                for (a, vi) in acc.iter_mut().zip(v.iter()) {
                    *a += s * vi;
                }
            }
            x.iter().zip(acc.iter()).map(|(xi, a)| xi + a).collect()
        })
        .collect()
}

pub fn feed_forward(x: &[f64], w1: &[f64], w2: &[f64]) -> PlainVector {
    x.iter()
        .zip(w1.iter())
        .zip(w2.iter())
        .map(|((xi, a), b)| (xi * a).powi(2) * b)
        .collect()
}

/// Positional encoding, projections, scores, combination with residual and
/// feedforward, all in the clear.
pub fn forward(embeddings: &[PlainVector], weights: &BlockWeights) -> Result<PlainMatrix> {
    let dim = embeddings.first().map_or(0, |row| row.len());
    weights.validate(dim)?;
    let input = add_positional_encoding(embeddings)?;

    let q: Vec<_> = input.iter().map(|x| project(x, &weights.w_q)).collect();
    let k: Vec<_> = input.iter().map(|x| project(x, &weights.w_k)).collect();
    let v: Vec<_> = input.iter().map(|x| project(x, &weights.w_v)).collect();
    ensure_len("reference keys", q.len(), k.len())?;

    let scores = attention_scores(&q, &k);
    let combined = combine(&scores, &v, &input);
    Ok(combined
        .iter()
        .map(|x| feed_forward(x, &weights.w1, &weights.w2))
        .collect())
}
