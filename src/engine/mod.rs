//! The capability surface the encoder block consumes. The evaluator is
//! generic over it, so it runs unchanged on the HEAAN scheme or on the
//! plaintext-simulating [`slot::SlotEngine`].

pub mod heaan;
pub mod slot;

use std::fmt::Debug;

use crate::error::{Result, TransformerError};
use crate::math::fft::is_power_of_two;
use crate::PlainVector;

pub trait HomomorphicEngine {
    type Plaintext: Clone + Debug;
    type Ciphertext: Clone + Debug;

    /// D, the length of every packed vector
    fn slots(&self) -> usize;

    fn encode(&self, values: &[f64]) -> Result<Self::Plaintext>;

    fn decode(&self, plaintext: &Self::Plaintext) -> PlainVector;

    fn encrypt(&self, plaintext: &Self::Plaintext) -> Result<Self::Ciphertext>;

    fn decrypt(&self, ciphertext: &Self::Ciphertext) -> Self::Plaintext;

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Consumes one level of `a` and `b`.
    fn mul(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Consumes one level of `a`.
    fn mul_plain(&self, a: &Self::Ciphertext, b: &Self::Plaintext) -> Result<Self::Ciphertext>;

    /// Cyclic left shift: slot i of the result holds slot (i + index) mod D.
    fn left_rotate(&self, ciphertext: &Self::Ciphertext, index: usize) -> Result<Self::Ciphertext>;

    /// Remaining multiplicative depth of `ciphertext`.
    fn level(&self, ciphertext: &Self::Ciphertext) -> usize;

    /// Whether a rotation key exists for `index mod D`. Index 0 is always
    /// supported.
    fn has_rotation_key(&self, index: usize) -> bool;

    /// Rotate-and-add over `width` slots: slot i of the result holds
    /// the sum of slots i..i + width. With `width == D` every slot holds the
    /// full sum.
    fn slots_sum(&self, ciphertext: &Self::Ciphertext, width: usize) -> Result<Self::Ciphertext> {
        if !is_power_of_two(width) || width > self.slots() {
            return Err(TransformerError::InvalidParameters(format!(
                "slot sum width {} must be a power of two up to {}",
                width,
                self.slots()
            )));
        }
        let mut res = ciphertext.clone();
        let mut i = 1;
        while i < width {
            let rot = self.left_rotate(&res, i)?;
            res = self.add(&res, &rot)?;
            i <<= 1;
        }
        Ok(res)
    }

    fn encrypt_vector(&self, values: &[f64]) -> Result<Self::Ciphertext> {
        let plaintext = self.encode(values)?;
        self.encrypt(&plaintext)
    }

    fn decrypt_vector(&self, ciphertext: &Self::Ciphertext) -> PlainVector {
        self.decode(&self.decrypt(ciphertext))
    }

    fn ensure_rotation(&self, index: usize) -> Result<()> {
        if self.has_rotation_key(index) {
            Ok(())
        } else {
            Err(TransformerError::UnsupportedRotation {
                index: index % self.slots(),
                slots: self.slots(),
            })
        }
    }

    fn ensure_depth(&self, ciphertext: &Self::Ciphertext, needed: usize) -> Result<()> {
        let available = self.level(ciphertext);
        if available < needed {
            return Err(TransformerError::DepthExceeded { available, needed });
        }
        Ok(())
    }
}
