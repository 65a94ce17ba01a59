use rand_distr::{Distribution, Normal};
use std::collections::BTreeSet;

use super::HomomorphicEngine;
use crate::config::BlockConfig;
use crate::error::{ensure_len, Result, TransformerError};
use crate::PlainVector;

#[derive(Debug, Clone, PartialEq)]
pub struct SlotPlaintext {
    values: PlainVector,
}

/// A "ciphertext" that holds its slots in the clear. It exists so the
/// evaluator can be tested without a cryptographic backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCiphertext {
    values: PlainVector,
    level: usize,
}

/// Plaintext simulation of a leveled slot-packed engine: rotation is an
/// array shift, add and multiply are elementwise. Rotation keys and the
/// depth budget are enforced exactly as a real engine would, and Gaussian
/// noise can be injected after every encryption and multiplication to mimic
/// approximation error.
#[derive(Debug, Clone)]
pub struct SlotEngine {
    slots: usize,
    max_level: usize,
    rotation_keys: BTreeSet<usize>,
    noise: Option<Normal<f64>>,
}

impl SlotEngine {
    /// Rotation keys cover [1, slots). `slots` must be a power of two.
    pub fn new(slots: usize, max_level: usize) -> Result<Self> {
        if !slots.is_power_of_two() {
            return Err(TransformerError::InvalidParameters(format!(
                "slot count {} must be a power of two",
                slots
            )));
        }
        Ok(Self {
            slots,
            max_level,
            rotation_keys: (1..slots).collect(),
            noise: None,
        })
    }

    pub fn for_block(config: &BlockConfig, max_level: usize) -> Result<Self> {
        config.validate()?;
        Self::new(config.dim, max_level)
    }

    pub fn with_rotation_keys(mut self, rotations: impl IntoIterator<Item = usize>) -> Self {
        let slots = self.slots;
        self.rotation_keys = rotations
            .into_iter()
            .map(|r| r % slots)
            .filter(|&r| r != 0)
            .collect();
        self
    }

    pub fn with_noise(mut self, sigma: f64) -> Result<Self> {
        if !(sigma > 0.0) {
            return Err(TransformerError::InvalidParameters(format!(
                "noise deviation must be positive, got {}",
                sigma
            )));
        }
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| TransformerError::InvalidParameters(e.to_string()))?;
        self.noise = Some(normal);
        Ok(self)
    }

    fn perturb(&self, mut values: PlainVector) -> PlainVector {
        if let Some(normal) = &self.noise {
            let mut rng = rand::thread_rng();
            for v in values.iter_mut() {
                *v += normal.sample(&mut rng);
            }
        }
        values
    }
}

impl HomomorphicEngine for SlotEngine {
    type Plaintext = SlotPlaintext;
    type Ciphertext = SlotCiphertext;

    fn slots(&self) -> usize {
        self.slots
    }

    fn encode(&self, values: &[f64]) -> Result<SlotPlaintext> {
        ensure_len("encode", self.slots, values.len())?;
        Ok(SlotPlaintext {
            values: values.to_vec(),
        })
    }

    fn decode(&self, plaintext: &SlotPlaintext) -> PlainVector {
        plaintext.values.clone()
    }

    fn encrypt(&self, plaintext: &SlotPlaintext) -> Result<SlotCiphertext> {
        ensure_len("encrypt", self.slots, plaintext.values.len())?;
        Ok(SlotCiphertext {
            values: self.perturb(plaintext.values.clone()),
            level: self.max_level,
        })
    }

    fn decrypt(&self, ciphertext: &SlotCiphertext) -> SlotPlaintext {
        SlotPlaintext {
            values: ciphertext.values.clone(),
        }
    }

    fn add(&self, a: &SlotCiphertext, b: &SlotCiphertext) -> Result<SlotCiphertext> {
        ensure_len("ciphertext slots", a.values.len(), b.values.len())?;
        Ok(SlotCiphertext {
            values: a.values.iter().zip(b.values.iter()).map(|(x, y)| x + y).collect(),
            level: a.level.min(b.level),
        })
    }

    fn mul(&self, a: &SlotCiphertext, b: &SlotCiphertext) -> Result<SlotCiphertext> {
        ensure_len("ciphertext slots", a.values.len(), b.values.len())?;
        self.ensure_depth(a, 1)?;
        self.ensure_depth(b, 1)?;
        let values = a.values.iter().zip(b.values.iter()).map(|(x, y)| x * y).collect();
        Ok(SlotCiphertext {
            values: self.perturb(values),
            level: a.level.min(b.level) - 1,
        })
    }

    fn mul_plain(&self, a: &SlotCiphertext, b: &SlotPlaintext) -> Result<SlotCiphertext> {
        ensure_len("plaintext slots", a.values.len(), b.values.len())?;
        self.ensure_depth(a, 1)?;
        let values = a.values.iter().zip(b.values.iter()).map(|(x, y)| x * y).collect();
        Ok(SlotCiphertext {
            values: self.perturb(values),
            level: a.level - 1,
        })
    }

    fn left_rotate(&self, ciphertext: &SlotCiphertext, index: usize) -> Result<SlotCiphertext> {
        self.ensure_rotation(index)?;
        let mut values = ciphertext.values.clone();
        values.rotate_left(index % self.slots);
        Ok(SlotCiphertext {
            values,
            level: ciphertext.level,
        })
    }

    fn level(&self, ciphertext: &SlotCiphertext) -> usize {
        ciphertext.level
    }

    fn has_rotation_key(&self, index: usize) -> bool {
        let index = index % self.slots;
        index == 0 || self.rotation_keys.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_engine_arithmetic() {
        let engine = SlotEngine::new(4, 3).unwrap();
        let a = engine.encrypt_vector(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = engine.encrypt_vector(&[0.5, 0.5, 2.0, -1.0]).unwrap();

        let sum = engine.add(&a, &b).unwrap();
        assert_eq!(engine.decrypt_vector(&sum), vec![1.5, 2.5, 5.0, 3.0]);

        let product = engine.mul(&a, &b).unwrap();
        assert_eq!(engine.decrypt_vector(&product), vec![0.5, 1.0, 6.0, -4.0]);
        assert_eq!(engine.level(&product), 2);

        let rotated = engine.left_rotate(&a, 1).unwrap();
        assert_eq!(engine.decrypt_vector(&rotated), vec![2.0, 3.0, 4.0, 1.0]);

        let summed = engine.slots_sum(&a, 4).unwrap();
        assert_eq!(engine.decrypt_vector(&summed), vec![10.0; 4]);

        let partial = engine.slots_sum(&a, 2).unwrap();
        assert_eq!(engine.decrypt_vector(&partial), vec![3.0, 5.0, 7.0, 5.0]);
    }

    #[test]
    fn test_slot_engine_enforces_keys_and_depth() {
        let engine = SlotEngine::new(4, 1).unwrap().with_rotation_keys([1, 2]);
        let a = engine.encrypt_vector(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(engine.left_rotate(&a, 6).is_ok());
        assert_eq!(
            engine.left_rotate(&a, 3).unwrap_err(),
            TransformerError::UnsupportedRotation { index: 3, slots: 4 }
        );

        let squared = engine.mul(&a, &a).unwrap();
        assert_eq!(
            engine.mul(&squared, &a).unwrap_err(),
            TransformerError::DepthExceeded {
                available: 0,
                needed: 1
            }
        );
        // addition aligns to the lower level
        assert_eq!(engine.level(&engine.add(&squared, &a).unwrap()), 0);
    }

    #[test]
    fn test_slot_engine_noise() {
        let engine = SlotEngine::new(4, 2).unwrap().with_noise(1e-6).unwrap();
        let v = [1.0, 2.0, 3.0, 4.0];
        let ct = engine.encrypt_vector(&v).unwrap();
        let decrypted = engine.decrypt_vector(&ct);
        assert!(decrypted.iter().zip(v.iter()).all(|(x, y)| (x - y).abs() < 1e-4));
        assert!(SlotEngine::new(4, 2).unwrap().with_noise(-1.0).is_err());
        assert!(SlotEngine::new(4, 2).unwrap().with_noise(0.0).is_err());
        assert!(SlotEngine::new(4, 2).unwrap().with_noise(f64::NAN).is_err());
    }

    #[test]
    fn test_slot_engine_rejects_bad_slot_count() {
        for slots in [0, 3, 6] {
            assert!(matches!(
                SlotEngine::new(slots, 2),
                Err(TransformerError::InvalidParameters(_))
            ));
        }
        assert!(SlotEngine::new(1, 2).is_ok());
    }
}
