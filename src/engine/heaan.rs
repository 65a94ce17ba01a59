use log::info;

use super::HomomorphicEngine;
use crate::config::{BlockConfig, HeaanParams};
use crate::error::{ensure_len, Result, TransformerError};
use crate::heaan::{Ciphertext, HeaanScheme, Plaintext};
use crate::PlainVector;

/// [`HomomorphicEngine`] over the HEAAN scheme. Every multiplication is
/// followed by a rescale, so all ciphertexts carry the same scale and a
/// level is exactly one unit of multiplicative depth.
pub struct HeaanEngine {
    scheme: HeaanScheme,
    slots: usize,
}

impl HeaanEngine {
    /// Generates all keys, with rotation keys covering [1, slots).
    pub fn new(params: HeaanParams, slots: usize) -> Result<Self> {
        Self::with_rotation_keys(params, slots, 1..slots)
    }

    /// Generates keys with an explicit rotation index set. Rotations outside
    /// it fail with `UnsupportedRotation`.
    pub fn with_rotation_keys(
        params: HeaanParams,
        slots: usize,
        rotations: impl IntoIterator<Item = usize>,
    ) -> Result<Self> {
        if !slots.is_power_of_two() || slots > params.max_slots() {
            return Err(TransformerError::InvalidParameters(format!(
                "slot count {} must be a power of two up to {}",
                slots,
                params.max_slots()
            )));
        }
        let mut scheme = HeaanScheme::new(params)?;
        scheme.add_left_rot_keys(rotations.into_iter().map(|r| r % slots).filter(|&r| r != 0))?;

        let params = scheme.context.params();
        info!(
            "heaan engine ready: N = {}, slots = {}, depth = {}, log Q = {}, {} rotation keys",
            params.n(),
            slots,
            params.mult_depth,
            params.log_big_q(),
            scheme.left_rot_key_map.len()
        );
        Ok(Self { scheme, slots })
    }

    pub fn for_block(config: &BlockConfig) -> Result<Self> {
        config.validate()?;
        Self::new(HeaanParams::for_block(config), config.dim)
    }

    pub fn scheme(&self) -> &HeaanScheme {
        &self.scheme
    }
}

impl HomomorphicEngine for HeaanEngine {
    type Plaintext = Plaintext;
    type Ciphertext = Ciphertext;

    fn slots(&self) -> usize {
        self.slots
    }

    fn encode(&self, values: &[f64]) -> Result<Plaintext> {
        ensure_len("encode", self.slots, values.len())?;
        self.scheme.encode(values)
    }

    fn decode(&self, plaintext: &Plaintext) -> PlainVector {
        self.scheme.decode(plaintext)
    }

    fn encrypt(&self, plaintext: &Plaintext) -> Result<Ciphertext> {
        ensure_len("encrypt", self.slots, plaintext.slots())?;
        Ok(self.scheme.encrypt_plaintext(plaintext))
    }

    fn decrypt(&self, ciphertext: &Ciphertext) -> Plaintext {
        self.scheme.decrypt_ciphertext(&self.scheme.sk, ciphertext)
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.scheme.add(a, b)
    }

    fn mul(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.ensure_depth(a, 1)?;
        self.ensure_depth(b, 1)?;
        let product = self.scheme.mul(a, b)?;
        self.scheme.rescale_by(&product, 1)
    }

    fn mul_plain(&self, a: &Ciphertext, b: &Plaintext) -> Result<Ciphertext> {
        self.ensure_depth(a, 1)?;
        let product = self.scheme.mul_plain(a, b)?;
        self.scheme.rescale_by(&product, 1)
    }

    fn left_rotate(&self, ciphertext: &Ciphertext, index: usize) -> Result<Ciphertext> {
        self.scheme.left_rotate(ciphertext, index)
    }

    fn level(&self, ciphertext: &Ciphertext) -> usize {
        ciphertext.level()
    }

    fn has_rotation_key(&self, index: usize) -> bool {
        let index = index % self.slots;
        index == 0 || self.scheme.has_left_rot_key(index)
    }
}
