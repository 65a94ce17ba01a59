use num_bigint::{BigInt, RandBigInt};
use num_complex::Complex64;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::HeaanParams;
use crate::error::{Result, TransformerError};
use crate::math::{
    fft::{fft_special, fft_special_inv, ksi_powers, rot_group},
    poly,
};

/// Ring tables and samplers shared by the keys and every ciphertext.
pub struct Context {
    pub(crate) params: HeaanParams,
    /// ring dimension
    pub(crate) n: usize,
    pub(crate) rot_group: Vec<usize>,
    pub(crate) ksi_pows: Vec<Complex64>,
    gauss: Normal<f64>,
}

impl Context {
    pub fn new(params: HeaanParams) -> Result<Self> {
        params.validate()?;
        let n = params.n();
        let gauss = Normal::new(0.0, params.sigma)
            .map_err(|e| TransformerError::InvalidParameters(e.to_string()))?;
        Ok(Self {
            rot_group: rot_group(n),
            ksi_pows: ksi_powers(n),
            n,
            params,
            gauss,
        })
    }

    pub fn params(&self) -> &HeaanParams {
        &self.params
    }

    pub fn max_level(&self) -> usize {
        self.params.mult_depth
    }

    pub fn log_q(&self, level: usize) -> usize {
        self.params.log_q(level)
    }

    pub fn log_big_q(&self) -> usize {
        self.params.log_big_q()
    }

    /// Encodes `v` into a message polynomial with scale 2^log_p. For
    /// `v.len() < n / 2` the message lives in the subring X^gap, so the
    /// slots repeat with period `v.len()`.
    pub fn encode(&self, v: &[f64], log_p: usize) -> Vec<BigInt> {
        let slots = v.len();
        let gap = (self.n / 2) / slots;
        let mut uvals: Vec<_> = v.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        fft_special_inv(&mut uvals, &self.ksi_pows, &self.rot_group);

        let mut mx = vec![BigInt::zero(); self.n];
        for (i, u) in uvals.iter().enumerate() {
            mx[i * gap] = scale_up(u.re, log_p);
            mx[self.n / 2 + i * gap] = scale_up(u.im, log_p);
        }
        mx
    }

    /// Inverse of [`Context::encode`]; `mx` is read modulo 2^log_q.
    pub fn decode(&self, mx: &[BigInt], slots: usize, log_p: usize, log_q: usize) -> Vec<f64> {
        let gap = (self.n / 2) / slots;
        let mut vals: Vec<_> = (0..slots)
            .map(|i| {
                let re = poly::reduce(&mx[i * gap], log_q);
                let im = poly::reduce(&mx[self.n / 2 + i * gap], log_q);
                Complex64::new(scale_down(&re, log_p), scale_down(&im, log_p))
            })
            .collect();
        fft_special(&mut vals, &self.ksi_pows, &self.rot_group);
        vals.iter().map(|c| c.re).collect()
    }

    /// ternary secret with exactly `hamming_weight` non-zero coefficients
    pub(crate) fn sample_hwt(&self) -> Vec<BigInt> {
        let mut rng = rand::thread_rng();
        let mut res = vec![BigInt::zero(); self.n];
        for idx in rand::seq::index::sample(&mut rng, self.n, self.params.hamming_weight) {
            res[idx] = if rng.gen_bool(0.5) {
                BigInt::from(1)
            } else {
                BigInt::from(-1)
            };
        }
        res
    }

    /// 0 with probability 1/2, +1 and -1 with probability 1/4 each
    pub(crate) fn sample_zo(&self) -> Vec<BigInt> {
        let mut rng = rand::thread_rng();
        (0..self.n)
            .map(|_| match rng.gen_range(0..4) {
                0 => BigInt::from(1),
                1 => BigInt::from(-1),
                _ => BigInt::zero(),
            })
            .collect()
    }

    pub(crate) fn sample_gauss(&self) -> Vec<BigInt> {
        let mut rng = rand::thread_rng();
        (0..self.n)
            .map(|_| BigInt::from(self.gauss.sample(&mut rng).round() as i64))
            .collect()
    }

    /// uniform modulo 2^bits
    pub(crate) fn sample_uniform(&self, bits: usize) -> Vec<BigInt> {
        let mut rng = rand::thread_rng();
        (0..self.n)
            .map(|_| poly::reduce(&BigInt::from(rng.gen_biguint(bits as u64)), bits))
            .collect()
    }

    /// X -> X^{5^rot}, which rotates the slots left by `rot`
    pub(crate) fn left_rot(&self, a: &[BigInt], rot: usize) -> Vec<BigInt> {
        poly::automorphism(a, self.rot_group[rot % self.rot_group.len()])
    }
}

fn scale_up(x: f64, log_p: usize) -> BigInt {
    BigInt::from_f64((x * 2f64.powi(log_p as i32)).round()).unwrap_or_else(BigInt::zero)
}

fn scale_down(x: &BigInt, log_p: usize) -> f64 {
    x.to_f64().unwrap_or(f64::NAN) / 2f64.powi(log_p as i32)
}
