//! Arithmetic in Z[X]/(X^N + 1) modulo powers of two. Polynomials are
//! coefficient vectors of length N kept in the symmetric range
//! [-2^(bits-1), 2^(bits-1)).

use num_bigint::BigInt;
use num_traits::{One, Zero};

/// Reduces x modulo 2^bits into the symmetric range.
pub fn reduce(x: &BigInt, bits: usize) -> BigInt {
    let q = BigInt::one() << bits;
    let mut r = x % &q;
    if r < BigInt::zero() {
        r += &q;
    }
    if r >= (&q >> 1usize) {
        r -= q;
    }
    r
}

pub fn reduce_vec(a: &[BigInt], bits: usize) -> Vec<BigInt> {
    a.iter().map(|x| reduce(x, bits)).collect()
}

pub fn add(a: &[BigInt], b: &[BigInt], bits: usize) -> Vec<BigInt> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| reduce(&(x + y), bits)).collect()
}

pub fn add_inplace(a: &mut [BigInt], b: &[BigInt], bits: usize) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x = reduce(&(&*x + y), bits);
    }
}

pub fn sub(a: &[BigInt], b: &[BigInt], bits: usize) -> Vec<BigInt> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| reduce(&(x - y), bits)).collect()
}

pub fn negate(a: &[BigInt], bits: usize) -> Vec<BigInt> {
    a.iter().map(|x| reduce(&(-x), bits)).collect()
}

/// Schoolbook negacyclic product, X^N = -1.
pub fn mul(a: &[BigInt], b: &[BigInt], bits: usize) -> Vec<BigInt> {
    let n = a.len();
    assert_eq!(n, b.len());
    let mut res = vec![BigInt::zero(); n];

    for (i, ai) in a.iter().enumerate() {
        if ai.is_zero() {
            continue;
        }
        for (j, bj) in b.iter().enumerate() {
            let c = ai * bj;
            let k = i + j;
            if k < n {
                res[k] += c;
            } else {
                res[k - n] -= c;
            }
        }
    }
    reduce_vec(&res, bits)
}

pub fn left_shift(a: &[BigInt], bits: usize) -> Vec<BigInt> {
    a.iter().map(|x| x << bits).collect()
}

/// Divides every coefficient by 2^bits, rounding to nearest.
pub fn right_shift_round(a: &[BigInt], bits: usize) -> Vec<BigInt> {
    if bits == 0 {
        return a.to_vec();
    }
    let half = BigInt::one() << (bits - 1);
    a.iter().map(|x| (x + &half) >> bits).collect()
}

/// The automorphism X -> X^pow, pow odd.
pub fn automorphism(a: &[BigInt], pow: usize) -> Vec<BigInt> {
    let n = a.len();
    let m = 2 * n;
    let mut res = vec![BigInt::zero(); n];
    for (i, ai) in a.iter().enumerate() {
        let shift = (i * pow) % m;
        if shift < n {
            res[shift] = ai.clone();
        } else {
            res[shift - n] = -ai;
        }
    }
    res
}
