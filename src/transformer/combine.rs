use log::debug;

use super::attention::AttentionScoreMatrix;
use crate::engine::HomomorphicEngine;
use crate::error::{ensure_len, Result, TransformerError};

/// `output[i] = sum_j scores[i][j] * values[j]`.
pub fn weighted_sum<E: HomomorphicEngine>(
    engine: &E,
    scores: &AttentionScoreMatrix<E::Ciphertext>,
    values: &[E::Ciphertext],
) -> Result<Vec<E::Ciphertext>> {
    ensure_len("score rows", values.len(), scores.len())?;
    for row in scores {
        ensure_len("score columns", values.len(), row.len())?;
        for score in row {
            engine.ensure_depth(score, 1)?;
        }
    }
    for value in values {
        engine.ensure_depth(value, 1)?;
    }

    scores
        .iter()
        .map(|row| {
            let mut acc: Option<E::Ciphertext> = None;
            for (score, value) in row.iter().zip(values.iter()) {
                let weighted = engine.mul(score, value)?;
                acc = Some(match acc {
                    None => weighted,
                    Some(acc) => engine.add(&acc, &weighted)?,
                });
            }
            acc.ok_or(TransformerError::DimensionMismatch {
                context: "score columns",
                expected: values.len(),
                actual: 0,
            })
        })
        .collect()
}

/// `output[i] = input[i] + output[i]`, once per position.
pub fn add_residual<E: HomomorphicEngine>(
    engine: &E,
    output: &[E::Ciphertext],
    input: &[E::Ciphertext],
) -> Result<Vec<E::Ciphertext>> {
    ensure_len("residual input", output.len(), input.len())?;
    input
        .iter()
        .zip(output.iter())
        .map(|(x, y)| engine.add(x, y))
        .collect()
}

/// Attention-weighted sum of the values, then the residual connection.
/// The full weighted sum is formed before the input is added.
pub fn combine_with_residual<E: HomomorphicEngine>(
    engine: &E,
    scores: &AttentionScoreMatrix<E::Ciphertext>,
    values: &[E::Ciphertext],
    input: &[E::Ciphertext],
) -> Result<Vec<E::Ciphertext>> {
    ensure_len("residual input", values.len(), input.len())?;
    debug!("combining {} value vectors", values.len());
    let output = weighted_sum(engine, scores, values)?;
    add_residual(engine, &output, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::slot::{SlotCiphertext, SlotEngine};
    use crate::heaan::utils::{equal_up_to_epsilon, gen_random_vector};
    use crate::transformer::reference;

    fn setup(engine: &SlotEngine, words: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let dim = engine.slots();
        let scores: Vec<_> = (0..words).map(|_| gen_random_vector(words)).collect();
        let values: Vec<_> = (0..words).map(|_| gen_random_vector(dim)).collect();
        let input: Vec<_> = (0..words).map(|_| gen_random_vector(dim)).collect();
        (scores, values, input)
    }

    fn encrypt_scores(engine: &SlotEngine, scores: &[Vec<f64>]) -> AttentionScoreMatrix<SlotCiphertext> {
        scores
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&s| engine.encrypt_vector(&vec![s; engine.slots()]).unwrap())
                    .collect()
            })
            .collect()
    }

    fn encrypt_all(engine: &SlotEngine, vs: &[Vec<f64>]) -> Vec<SlotCiphertext> {
        vs.iter().map(|v| engine.encrypt_vector(v).unwrap()).collect()
    }

    #[test]
    fn test_combine_with_residual() {
        let engine = SlotEngine::new(4, 2).unwrap();
        let (scores, values, input) = setup(&engine, 3);
        let output = combine_with_residual(
            &engine,
            &encrypt_scores(&engine, &scores),
            &encrypt_all(&engine, &values),
            &encrypt_all(&engine, &input),
        )
        .unwrap();

        let expected = reference::combine(&scores, &values, &input);
        assert_eq!(output.len(), 3);
        for (ct, exp) in output.iter().zip(expected.iter()) {
            assert!(equal_up_to_epsilon(exp, &engine.decrypt_vector(ct), 1e-12));
        }
    }

    #[test]
    fn test_residual_after_sum_matches_inline() {
        let engine = SlotEngine::new(4, 2).unwrap();
        let (scores, values, input) = setup(&engine, 3);
        let enc_scores = encrypt_scores(&engine, &scores);
        let enc_values = encrypt_all(&engine, &values);
        let enc_input = encrypt_all(&engine, &input);

        let inline = combine_with_residual(&engine, &enc_scores, &enc_values, &enc_input).unwrap();
        let summed = weighted_sum(&engine, &enc_scores, &enc_values).unwrap();
        let separate: Vec<_> = summed
            .iter()
            .zip(input.iter())
            .map(|(ct, x)| {
                let mut v = engine.decrypt_vector(ct);
                v.iter_mut().zip(x.iter()).for_each(|(a, b)| *a += b);
                v
            })
            .collect();

        for (ct, exp) in inline.iter().zip(separate.iter()) {
            assert!(equal_up_to_epsilon(exp, &engine.decrypt_vector(ct), 1e-12));
        }
    }

    #[test]
    fn test_combine_shape_errors() {
        let engine = SlotEngine::new(4, 2).unwrap();
        let (scores, values, input) = setup(&engine, 3);
        let enc_scores = encrypt_scores(&engine, &scores);
        let enc_values = encrypt_all(&engine, &values);
        let enc_input = encrypt_all(&engine, &input);

        assert!(matches!(
            combine_with_residual(&engine, &enc_scores, &enc_values[..2], &enc_input[..2]),
            Err(TransformerError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            combine_with_residual(&engine, &enc_scores, &enc_values, &enc_input[..1]),
            Err(TransformerError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            add_residual(&engine, &enc_values, &enc_input[..2]),
            Err(TransformerError::DimensionMismatch { .. })
        ));
    }
}
