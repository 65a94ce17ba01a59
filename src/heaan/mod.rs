//! Leveled approximate homomorphic encryption (HEAAN) over Z[X]/(X^N + 1)
//! with a power-of-two modulus chain.

pub mod context;
pub mod key;
pub mod plaintext;
pub mod scheme;
pub(crate) mod utils;

pub use context::Context;
pub use key::{Key, KeyType, SecretKey};
pub use plaintext::{Ciphertext, Plaintext};
pub use scheme::HeaanScheme;
