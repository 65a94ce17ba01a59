use num_bigint::BigInt;

use super::context::Context;

#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub enum KeyType {
    Encryption,
    Multiplication,
}

#[derive(Debug, Clone)]
pub struct SecretKey {
    pub(crate) sx: Vec<BigInt>,
}

impl SecretKey {
    pub fn new(context: &Context) -> Self {
        Self {
            sx: context.sample_hwt(),
        }
    }
}

/// (ax, bx) with bx + ax * sx small, or equal to P * s' for switching keys
#[derive(Debug, Clone)]
pub struct Key {
    pub(crate) ax: Vec<BigInt>,
    pub(crate) bx: Vec<BigInt>,
}

impl Key {
    pub fn new(ax: Vec<BigInt>, bx: Vec<BigInt>) -> Self {
        Self { ax, bx }
    }
}
