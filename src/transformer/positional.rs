use crate::error::{ensure_len, Result};
use crate::{PlainMatrix, PlainVector};

/// Sinusoidal table: `sin(i / 10000^(j / dim))` in even columns and
/// `cos(...)` in odd ones. `j / dim` is a real quotient, so every column has
/// its own frequency. Truncating it to an integer would make every row
/// `sin(i)` and `cos(i)` repeated, and outputs computed with such a table
/// will not match this one.
pub fn positional_encoding(words: usize, dim: usize) -> PlainMatrix {
    (0..words)
        .map(|i| {
            (0..dim)
                .map(|j| {
                    let angle = i as f64 / 10000f64.powf(j as f64 / dim as f64);
                    if j % 2 == 0 {
                        angle.sin()
                    } else {
                        angle.cos()
                    }
                })
                .collect()
        })
        .collect()
}

/// Embeddings with the positional table added in; rows must share a length.
pub fn add_positional_encoding(embeddings: &[PlainVector]) -> Result<PlainMatrix> {
    let dim = embeddings.first().map_or(0, |row| row.len());
    for row in embeddings {
        ensure_len("embedding row", dim, row.len())?;
    }
    let pe = positional_encoding(embeddings.len(), dim);
    Ok(embeddings
        .iter()
        .zip(pe.iter())
        .map(|(e, p)| e.iter().zip(p.iter()).map(|(a, b)| a + b).collect())
        .collect())
}
