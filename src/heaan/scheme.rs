use num_bigint::BigInt;
use std::collections::HashMap;

use super::{
    context::Context,
    key::{Key, KeyType, SecretKey},
    plaintext::{Ciphertext, Plaintext},
};
use crate::config::HeaanParams;
use crate::error::{ensure_len, Result, TransformerError};
use crate::math::{fft::is_power_of_two, poly};

pub struct HeaanScheme {
    pub context: Context,
    /// contains encryption and multiplication keys
    pub key_map: HashMap<KeyType, Key>,
    /// contains left rotation keys
    pub left_rot_key_map: HashMap<usize, Key>,
    pub sk: SecretKey,
}

impl HeaanScheme {
    pub fn new(params: HeaanParams) -> Result<Self> {
        let context = Context::new(params)?;
        let sk = SecretKey::new(&context);
        let mut res = Self {
            context,
            key_map: HashMap::new(),
            left_rot_key_map: HashMap::new(),
            sk,
        };
        res.add_encryption_key();
        res.add_multiplication_key();
        Ok(res)
    }

    fn add_encryption_key(&mut self) {
        let bits = self.context.log_big_q();
        let ax = self.context.sample_uniform(bits);
        let ex = self.context.sample_gauss();

        // bx = ex - ax * sx
        let bx = poly::sub(&ex, &poly::mul(&ax, &self.sk.sx, bits), bits);
        self.key_map.insert(KeyType::Encryption, Key::new(ax, bx));
    }

    // switching key from s' to sx, modulo Q^2:
    // bx + ax * sx = ex + Q * s'
    fn switching_key(&self, s_prime: &[BigInt]) -> Key {
        let log_big_q = self.context.log_big_q();
        let bits = 2 * log_big_q;
        let ax = self.context.sample_uniform(bits);
        let ex = self.context.sample_gauss();

        let mut bx = poly::sub(&ex, &poly::mul(&ax, &self.sk.sx, bits), bits);
        poly::add_inplace(&mut bx, &poly::left_shift(s_prime, log_big_q), bits);
        Key::new(ax, bx)
    }

    fn add_multiplication_key(&mut self) {
        let bits = 2 * self.context.log_big_q();
        let sx_square = poly::mul(&self.sk.sx, &self.sk.sx, bits);
        let key = self.switching_key(&sx_square);
        self.key_map.insert(KeyType::Multiplication, key);
    }

    pub fn add_left_rot_key(&mut self, rot: usize) -> Result<()> {
        let max_slots = self.context.n / 2;
        if rot == 0 || rot >= max_slots {
            return Err(TransformerError::InvalidParameters(format!(
                "rotation key index {} outside 1..{}",
                rot, max_slots
            )));
        }
        if self.left_rot_key_map.contains_key(&rot) {
            return Ok(());
        }

        let sx_rot = self.context.left_rot(&self.sk.sx, rot);
        let key = self.switching_key(&sx_rot);
        self.left_rot_key_map.insert(rot, key);
        Ok(())
    }

    pub fn add_left_rot_keys(&mut self, rots: impl IntoIterator<Item = usize>) -> Result<()> {
        for rot in rots {
            self.add_left_rot_key(rot)?;
        }
        Ok(())
    }

    /// add left rotation keys for rot = 1, 2, 2^2, ... below slots,
    /// enough for [`HeaanScheme::slots_sum`]
    pub fn add_pow2_left_rot_keys(&mut self, slots: usize) -> Result<()> {
        let mut i = 1;
        while i < slots {
            self.add_left_rot_key(i)?;
            i *= 2;
        }
        Ok(())
    }

    pub fn has_left_rot_key(&self, rot: usize) -> bool {
        self.left_rot_key_map.contains_key(&rot)
    }

    pub fn encode(&self, v: &[f64]) -> Result<Plaintext> {
        let max_slots = self.context.n / 2;
        if !is_power_of_two(v.len()) || v.len() > max_slots {
            return Err(TransformerError::InvalidParameters(format!(
                "cannot pack {} values into {} slots",
                v.len(),
                max_slots
            )));
        }
        if let Some(x) = v.iter().find(|x| !x.is_finite()) {
            return Err(TransformerError::InvalidParameters(format!(
                "cannot encode non-finite value {}",
                x
            )));
        }

        let log_p = self.context.params.log_p;
        Ok(Plaintext {
            mx: self.context.encode(v, log_p),
            slots: v.len(),
            log_p,
            log_q: self.context.log_big_q(),
        })
    }

    pub fn decode(&self, plaintext: &Plaintext) -> Vec<f64> {
        self.context
            .decode(&plaintext.mx, plaintext.slots, plaintext.log_p, plaintext.log_q)
    }

    /// Encrypts at the top level, so the result supports `mult_depth`
    /// rescales.
    pub fn encrypt_plaintext(&self, plaintext: &Plaintext) -> Ciphertext {
        let key = &self.key_map[&KeyType::Encryption];
        let level = self.context.max_level();
        let bits = self.context.log_q(level);

        let vx = self.context.sample_zo();

        // ct.ax = vx * key.ax + e1x
        let mut ax = poly::mul(&vx, &key.ax, bits);
        poly::add_inplace(&mut ax, &self.context.sample_gauss(), bits);

        // ct.bx = vx * key.bx + e2x + msg
        let mut bx = poly::mul(&vx, &key.bx, bits);
        poly::add_inplace(&mut bx, &self.context.sample_gauss(), bits);
        poly::add_inplace(&mut bx, &plaintext.mx, bits);

        Ciphertext {
            ax,
            bx,
            slots: plaintext.slots,
            log_p: plaintext.log_p,
            level,
        }
    }

    pub fn decrypt_ciphertext(&self, sk: &SecretKey, ciphertext: &Ciphertext) -> Plaintext {
        let bits = self.context.log_q(ciphertext.level);
        let mut mx = poly::mul(&ciphertext.ax, &sk.sx, bits);
        poly::add_inplace(&mut mx, &ciphertext.bx, bits);
        Plaintext {
            mx,
            slots: ciphertext.slots,
            log_p: ciphertext.log_p,
            log_q: bits,
        }
    }

    pub fn encrypt(&self, vals: &[f64]) -> Result<Ciphertext> {
        let plaintext = self.encode(vals)?;
        Ok(self.encrypt_plaintext(&plaintext))
    }

    pub fn decrypt(&self, sk: &SecretKey, ciphertext: &Ciphertext) -> Vec<f64> {
        let plaintext = self.decrypt_ciphertext(sk, ciphertext);
        self.decode(&plaintext)
    }

    /// Drops the modulus to that of `level` without touching the message.
    /// Levels above the current one leave `ct` unchanged.
    pub fn mod_down_to(&self, ct: &Ciphertext, level: usize) -> Ciphertext {
        if level >= ct.level {
            return ct.clone();
        }
        let bits = self.context.log_q(level);
        Ciphertext {
            ax: poly::reduce_vec(&ct.ax, bits),
            bx: poly::reduce_vec(&ct.bx, bits),
            slots: ct.slots,
            log_p: ct.log_p,
            level,
        }
    }

    fn check_compatible(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<()> {
        ensure_len("ciphertext slots", ct1.slots, ct2.slots)
    }

    fn aligned(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> (Ciphertext, Ciphertext) {
        let level = ct1.level.min(ct2.level);
        (self.mod_down_to(ct1, level), self.mod_down_to(ct2, level))
    }

    pub fn add(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        self.check_compatible(ct1, ct2)?;
        if ct1.log_p != ct2.log_p {
            return Err(TransformerError::InvalidParameters(format!(
                "cannot add ciphertexts with scales 2^{} and 2^{}",
                ct1.log_p, ct2.log_p
            )));
        }
        let (ct1, ct2) = self.aligned(ct1, ct2);
        let bits = self.context.log_q(ct1.level);

        Ok(Ciphertext {
            ax: poly::add(&ct1.ax, &ct2.ax, bits),
            bx: poly::add(&ct1.bx, &ct2.bx, bits),
            slots: ct1.slots,
            log_p: ct1.log_p,
            level: ct1.level,
        })
    }

    pub fn negate(&self, ct: &Ciphertext) -> Ciphertext {
        let bits = self.context.log_q(ct.level);
        Ciphertext {
            ax: poly::negate(&ct.ax, bits),
            bx: poly::negate(&ct.bx, bits),
            slots: ct.slots,
            log_p: ct.log_p,
            level: ct.level,
        }
    }

    pub fn sub(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        self.add(ct1, &self.negate(ct2))
    }

    // (a, b) = round((a * (key.ax, key.bx) mod qQ) / Q)
    // phase: a * (key.bx + key.ax * sx) / Q = a * ex / Q + a * s'
    fn key_switch(&self, a: &[BigInt], key: &Key, bits: usize) -> (Vec<BigInt>, Vec<BigInt>) {
        let log_big_q = self.context.log_big_q();
        let key_bits = bits + log_big_q;
        let key_ax = poly::reduce_vec(&key.ax, key_bits);
        let key_bx = poly::reduce_vec(&key.bx, key_bits);

        let ax = poly::right_shift_round(&poly::mul(a, &key_ax, key_bits), log_big_q);
        let bx = poly::right_shift_round(&poly::mul(a, &key_bx, key_bits), log_big_q);
        (poly::reduce_vec(&ax, bits), poly::reduce_vec(&bx, bits))
    }

    /// Tensor product followed by relinearization. The scale of the result
    /// is the product of the scales; call [`HeaanScheme::rescale_by`] after.
    pub fn mul(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        self.check_compatible(ct1, ct2)?;
        let (ct1, ct2) = self.aligned(ct1, ct2);
        let bits = self.context.log_q(ct1.level);

        let ax1bx2 = poly::mul(&ct1.ax, &ct2.bx, bits);
        let ax2bx1 = poly::mul(&ct2.ax, &ct1.bx, bits);
        let axax = poly::mul(&ct1.ax, &ct2.ax, bits);
        let bxbx = poly::mul(&ct1.bx, &ct2.bx, bits);

        let mul_key = &self.key_map[&KeyType::Multiplication];
        let (mut ax_mul, mut bx_mul) = self.key_switch(&axax, mul_key, bits);

        // ax_mul = ax1 * bx2 + ax2 * bx1 + axax * mul_key.ax / Q
        poly::add_inplace(&mut ax_mul, &ax1bx2, bits);
        poly::add_inplace(&mut ax_mul, &ax2bx1, bits);

        // bx_mul = bx1 * bx2 + axax * mul_key.bx / Q
        poly::add_inplace(&mut bx_mul, &bxbx, bits);

        Ok(Ciphertext {
            ax: ax_mul,
            bx: bx_mul,
            slots: ct1.slots,
            log_p: ct1.log_p + ct2.log_p,
            level: ct1.level,
        })
    }

    pub fn square(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        self.mul(ct, ct)
    }

    pub fn mul_plain(&self, ct: &Ciphertext, plaintext: &Plaintext) -> Result<Ciphertext> {
        ensure_len("plaintext slots", ct.slots, plaintext.slots)?;
        let bits = self.context.log_q(ct.level);
        Ok(Ciphertext {
            ax: poly::mul(&ct.ax, &plaintext.mx, bits),
            bx: poly::mul(&ct.bx, &plaintext.mx, bits),
            slots: ct.slots,
            log_p: ct.log_p + plaintext.log_p,
            level: ct.level,
        })
    }

    /// Divides by the scaling factor `dl` times, one level each.
    pub fn rescale_by(&self, ct: &Ciphertext, dl: usize) -> Result<Ciphertext> {
        if dl > ct.level {
            return Err(TransformerError::DepthExceeded {
                available: ct.level,
                needed: dl,
            });
        }
        let log_p = self.context.params.log_p;
        if ct.log_p < dl * log_p {
            return Err(TransformerError::InvalidParameters(format!(
                "cannot rescale a ciphertext of scale 2^{} by 2^{}",
                ct.log_p,
                dl * log_p
            )));
        }

        let mut res = ct.clone();
        for _ in 0..dl {
            let bits = self.context.log_q(res.level - 1);
            res = Ciphertext {
                ax: poly::reduce_vec(&poly::right_shift_round(&res.ax, log_p), bits),
                bx: poly::reduce_vec(&poly::right_shift_round(&res.bx, log_p), bits),
                slots: res.slots,
                log_p: res.log_p - log_p,
                level: res.level - 1,
            };
        }
        Ok(res)
    }

    // (ax, bx) bx + ax * sx ->
    // (ax_rot, bx_rot) bx_rot + ax_rot * sx_rot -> keyswitch
    // ax_rot * (key.ax, key.bx) / Q + (0, bx_rot) ->phase bx_rot + ax_rot * sx_rot
    pub fn left_rotate(&self, ct: &Ciphertext, rot_slots: usize) -> Result<Ciphertext> {
        let rot_slots = rot_slots % ct.slots;
        if rot_slots == 0 {
            return Ok(ct.clone());
        }
        let key = self
            .left_rot_key_map
            .get(&rot_slots)
            .ok_or(TransformerError::UnsupportedRotation {
                index: rot_slots,
                slots: ct.slots,
            })?;

        let bits = self.context.log_q(ct.level);
        let ax_rot = self.context.left_rot(&ct.ax, rot_slots);
        let bx_rot = self.context.left_rot(&ct.bx, rot_slots);

        let (ax, mut bx) = self.key_switch(&ax_rot, key, bits);
        poly::add_inplace(&mut bx, &bx_rot, bits);

        Ok(Ciphertext {
            ax,
            bx,
            slots: ct.slots,
            log_p: ct.log_p,
            level: ct.level,
        })
    }

    pub fn right_rotate(&self, ct: &Ciphertext, rot_slots: usize) -> Result<Ciphertext> {
        let rot_slots = ct.slots - (rot_slots % ct.slots);
        self.left_rotate(ct, rot_slots)
    }

    // (a0, a1, a2, a3) -> (a0 + a1, a1 + a2, a2 + a3, a3 + a0) -> (sum, sum, sum, sum)
    pub fn slots_sum(&self, ct: &Ciphertext, width: usize) -> Result<Ciphertext> {
        if !is_power_of_two(width) || width > ct.slots {
            return Err(TransformerError::InvalidParameters(format!(
                "slot sum width {} must be a power of two up to {}",
                width, ct.slots
            )));
        }
        let mut res = ct.clone();
        let mut i = 1;
        while i < width {
            let rot = self.left_rotate(&res, i)?;
            res = self.add(&res, &rot)?;
            i <<= 1;
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heaan::utils::{equal_up_to_epsilon, gen_random_vector};

    fn scheme() -> HeaanScheme {
        HeaanScheme::new(HeaanParams::default()).unwrap()
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let scheme = scheme();
        let v = vec![0.47, 0.12, -0.45, 0.08, 0.44, 0.19, -0.12, 0.20];
        let plaintext = scheme.encode(&v).unwrap();
        let ciphertext = scheme.encrypt_plaintext(&plaintext);
        assert_eq!(ciphertext.level(), scheme.context.max_level());
        let decrypted = scheme.decrypt_ciphertext(&scheme.sk, &ciphertext);
        let v_decoded = scheme.decode(&decrypted);
        assert!(equal_up_to_epsilon(&v, &v_decoded, 1e-7));
    }

    #[test]
    fn test_decrypt_is_deterministic() {
        let scheme = scheme();
        let ct = scheme.encrypt(&gen_random_vector(4)).unwrap();
        assert_eq!(scheme.decrypt(&scheme.sk, &ct), scheme.decrypt(&scheme.sk, &ct));
    }

    #[test]
    fn test_homomorphic_add() {
        let scheme = scheme();
        let slots = 8;
        let v1 = gen_random_vector(slots);
        let v2 = gen_random_vector(slots);
        let v_add: Vec<_> = v1.iter().zip(v2.iter()).map(|(a, b)| a + b).collect();
        let v_sub: Vec<_> = v1.iter().zip(v2.iter()).map(|(a, b)| a - b).collect();

        let ct1 = scheme.encrypt(&v1).unwrap();
        let ct2 = scheme.encrypt(&v2).unwrap();
        let ct_add = scheme.add(&ct1, &ct2).unwrap();
        let ct_sub = scheme.sub(&ct1, &ct2).unwrap();

        assert!(equal_up_to_epsilon(&v_add, &scheme.decrypt(&scheme.sk, &ct_add), 1e-7));
        assert!(equal_up_to_epsilon(&v_sub, &scheme.decrypt(&scheme.sk, &ct_sub), 1e-7));
    }

    #[test]
    fn test_homomorphic_mul() {
        let scheme = scheme();
        let slots = 8;
        let v1 = gen_random_vector(slots);
        let v2 = gen_random_vector(slots);
        let v_mul: Vec<_> = v1.iter().zip(v2.iter()).map(|(a, b)| a * b).collect();

        let ct1 = scheme.encrypt(&v1).unwrap();
        let ct2 = scheme.encrypt(&v2).unwrap();
        let ct_mul = scheme.mul(&ct1, &ct2).unwrap();
        let ct_mul = scheme.rescale_by(&ct_mul, 1).unwrap();
        assert_eq!(ct_mul.level(), ct1.level() - 1);

        let v_mul_decrypted = scheme.decrypt(&scheme.sk, &ct_mul);
        assert!(equal_up_to_epsilon(&v_mul, &v_mul_decrypted, 1e-7));
    }

    #[test]
    fn test_mul_plain() {
        let scheme = scheme();
        let slots = 4;
        let v = gen_random_vector(slots);
        let w = gen_random_vector(slots);
        let v_mul: Vec<_> = v.iter().zip(w.iter()).map(|(a, b)| a * b).collect();

        let ct = scheme.encrypt(&v).unwrap();
        let pt = scheme.encode(&w).unwrap();
        let ct_mul = scheme.rescale_by(&scheme.mul_plain(&ct, &pt).unwrap(), 1).unwrap();
        assert!(equal_up_to_epsilon(&v_mul, &scheme.decrypt(&scheme.sk, &ct_mul), 1e-7));
    }

    #[test]
    fn test_add_aligns_levels() {
        let scheme = scheme();
        let v1 = gen_random_vector(4);
        let v2 = gen_random_vector(4);
        let expected: Vec<_> = v1.iter().zip(v2.iter()).map(|(a, b)| a * a + b).collect();

        let ct1 = scheme.encrypt(&v1).unwrap();
        let ct2 = scheme.encrypt(&v2).unwrap();
        let squared = scheme.rescale_by(&scheme.square(&ct1).unwrap(), 1).unwrap();
        let sum = scheme.add(&squared, &ct2).unwrap();
        assert_eq!(sum.level(), squared.level());
        assert!(equal_up_to_epsilon(&expected, &scheme.decrypt(&scheme.sk, &sum), 1e-7));
    }

    #[test]
    fn test_homomorphic_rotate() {
        let mut scheme = scheme();
        let slots = 8;
        scheme.add_left_rot_keys(1..slots).unwrap();

        let rot_slots = 9;
        let mut v = gen_random_vector(slots);
        let ct = scheme.encrypt(&v).unwrap();
        let ct_rotate = scheme.left_rotate(&ct, rot_slots).unwrap();
        v.rotate_left(rot_slots % slots);
        assert!(equal_up_to_epsilon(&v, &scheme.decrypt(&scheme.sk, &ct_rotate), 1e-7));

        let rot_slots = 3;
        let mut v = gen_random_vector(slots);
        let ct = scheme.encrypt(&v).unwrap();
        let ct_rotate = scheme.right_rotate(&ct, rot_slots).unwrap();
        v.rotate_right(rot_slots % slots);
        assert!(equal_up_to_epsilon(&v, &scheme.decrypt(&scheme.sk, &ct_rotate), 1e-7));
    }

    #[test]
    fn test_rotate_without_key() {
        let scheme = scheme();
        let ct = scheme.encrypt(&gen_random_vector(4)).unwrap();
        assert!(scheme.left_rotate(&ct, 4).is_ok());
        assert_eq!(
            scheme.left_rotate(&ct, 2).unwrap_err(),
            TransformerError::UnsupportedRotation { index: 2, slots: 4 }
        );
    }

    #[test]
    fn test_slots_sum() {
        let mut scheme = scheme();
        let slots = 8;
        scheme.add_pow2_left_rot_keys(slots).unwrap();

        let v = gen_random_vector(slots);
        let slots_sum: f64 = v.iter().sum();
        let ct = scheme.encrypt(&v).unwrap();
        let ct_slots_sum = scheme.slots_sum(&ct, slots).unwrap();
        assert!(equal_up_to_epsilon(
            &vec![slots_sum; slots],
            &scheme.decrypt(&scheme.sk, &ct_slots_sum),
            1e-7
        ));
        assert!(scheme.slots_sum(&ct, 3).is_err());
    }

    #[test]
    fn test_depth_budget() {
        let scheme = HeaanScheme::new(HeaanParams::default().with_mult_depth(2)).unwrap();
        let v = gen_random_vector(4);
        let expected: Vec<_> = v.iter().map(|x| x.powi(4)).collect();

        let mut ct = scheme.encrypt(&v).unwrap();
        for _ in 0..2 {
            ct = scheme.rescale_by(&scheme.square(&ct).unwrap(), 1).unwrap();
        }
        assert_eq!(ct.level(), 0);
        assert!(equal_up_to_epsilon(&expected, &scheme.decrypt(&scheme.sk, &ct), 1e-6));

        let squared = scheme.square(&ct).unwrap();
        assert_eq!(
            scheme.rescale_by(&squared, 1).unwrap_err(),
            TransformerError::DepthExceeded {
                available: 0,
                needed: 1
            }
        );
    }

    #[test]
    fn test_encode_rejects_bad_length() {
        let scheme = scheme();
        assert!(scheme.encode(&[0.1, 0.2, 0.3]).is_err());
        assert!(scheme.encode(&vec![0.1; 32]).is_err());
        assert!(scheme.encode(&[0.1, f64::NAN]).is_err());
    }
}
