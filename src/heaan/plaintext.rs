use num_bigint::BigInt;

#[derive(Debug, Clone)]
pub struct Plaintext {
    pub(crate) mx: Vec<BigInt>,
    /// the length of the packed vector
    pub(crate) slots: usize,
    /// bits of the scaling factor
    pub(crate) log_p: usize,
    /// bits of the modulus the coefficients are reduced by
    pub(crate) log_q: usize,
}

impl Plaintext {
    pub fn slots(&self) -> usize {
        self.slots
    }
}

#[derive(Debug, Clone)]
pub struct Ciphertext {
    /// (ax, bx) satisfies bx + ax * sx \approx m
    pub(crate) ax: Vec<BigInt>,
    pub(crate) bx: Vec<BigInt>,
    /// the length of the packed vector
    pub(crate) slots: usize,
    /// bits of the scaling factor
    pub(crate) log_p: usize,
    /// remaining rescales; the modulus is 2^(log_q0 + level * log_p)
    pub(crate) level: usize,
}

impl Ciphertext {
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn level(&self) -> usize {
        self.level
    }
}
