use crate::engine::HomomorphicEngine;
use crate::error::{ensure_len, Result};
use crate::PlainVector;

/// Decrypts every position and keeps the first `dim` slots of each.
pub fn decrypt_sequence<E: HomomorphicEngine>(
    engine: &E,
    sequence: &[E::Ciphertext],
    dim: usize,
) -> Result<Vec<PlainVector>> {
    sequence
        .iter()
        .map(|ct| {
            let mut values = engine.decrypt_vector(ct);
            values.truncate(dim);
            ensure_len("readout", dim, values.len())?;
            Ok(values)
        })
        .collect()
}

pub fn format_vector(values: &[f64]) -> String {
    let cells: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
    format!("[{}]", cells.join(", "))
}

/// One line per position, `word i: [..]`.
pub fn format_readout(rows: &[PlainVector]) -> String {
    rows.iter()
        .enumerate()
        .map(|(i, row)| format!("word {}: {}", i, format_vector(row)))
        .collect::<Vec<_>>()
        .join("\n")
}
