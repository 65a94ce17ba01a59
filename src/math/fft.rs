use num_complex::Complex64;
use std::f64::consts::PI;

pub(crate) fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// bit reversal
/// the length of x should be a power of two
pub(crate) fn bitrev<T: Copy>(x: &mut [T]) {
    let n = x.len();
    assert!(is_power_of_two(n), "The length n of x must be a power of two");

    let mut rho = vec![0usize; n];
    let mut k = 2;

    while k <= n {
        // compute rho_k(0: k-1)
        for i in 0..k / 2 {
            rho[i + k / 2] = 2 * rho[i] + 1;
            rho[i] = 2 * rho[i];
        }
        k *= 2;
    }

    for i in 0..n {
        if i < rho[i] {
            x.swap(i, rho[i]);
        }
    }
}

/// 5^j mod 2n for j in [0, n/2): slot j corresponds to the root ksi^{5^j}
pub fn rot_group(n: usize) -> Vec<usize> {
    let mut five_pow = 1;
    let mut rot_group = Vec::with_capacity(n / 2);
    for _ in 0..n / 2 {
        rot_group.push(five_pow);
        five_pow = (5 * five_pow) % (2 * n);
    }
    rot_group
}

/// ksi^i for i in [0, 2n], ksi = exp(2 pi i / 2n)
pub fn ksi_powers(n: usize) -> Vec<Complex64> {
    let m = 2 * n;
    let mut ksi_pows = Vec::with_capacity(m + 1);
    for i in 0..m {
        let angle = 2.0 * PI * i as f64 / m as f64;
        ksi_pows.push(Complex64::new(angle.cos(), angle.sin()));
    }
    ksi_pows.push(ksi_pows[0]);
    ksi_pows
}

/// Evaluates sum_i x[i] Y^i at the roots selected by the rotation group,
/// in place. Used for decoding.
pub fn fft_special(x: &mut [Complex64], pow_table: &[Complex64], rot_group: &[usize]) {
    let n = x.len();
    let m = rot_group.len() * 4;

    bitrev(x);

    let mut len = 2;
    while len <= n {
        for i in 0..n / len {
            for j in 0..len / 2 {
                let idx = (rot_group[j] % (4 * len)) * m / (4 * len);
                let u = x[i * len + j];
                let mut v = x[i * len + j + len / 2];
                v *= pow_table[idx];
                x[i * len + j + len / 2] = u - v;
                x[i * len + j] = u + v;
            }
        }
        len *= 2;
    }
}

/// Inverse of [`fft_special`]. Used for encoding.
pub fn fft_special_inv(x: &mut [Complex64], pow_table: &[Complex64], rot_group: &[usize]) {
    let n = x.len();
    let m = rot_group.len() * 4;

    let mut len = n;
    while len >= 1 {
        let lenq = len << 2;
        for i in 0..n / len {
            for j in 0..len / 2 {
                let idx = (lenq - (rot_group[j] % lenq)) * m / lenq;
                let u = x[i * len + j] + x[i * len + j + len / 2];
                let mut v = x[i * len + j] - x[i * len + j + len / 2];
                v *= pow_table[idx];
                x[i * len + j] = u;
                x[i * len + j + len / 2] = v;
            }
        }
        len /= 2;
    }
    bitrev(x);
    for xi in x.iter_mut() {
        *xi /= n as f64;
    }
}
