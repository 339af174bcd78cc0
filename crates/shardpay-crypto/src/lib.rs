pub mod error;
pub mod keys;
pub mod signing;

pub use error::CryptoError;
pub use keys::{KeyPair, PublicKey};
pub use signing::{canonical_bytes, sign, sign_message, verify, verify_message, Signature};
