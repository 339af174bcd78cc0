use k256::ecdsa::signature::{Signer, Verifier};

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};

/// Fixed-size secp256k1 ECDSA signature (`r || s`, 64 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: k256::ecdsa::Signature,
}

impl Signature {
    pub const LENGTH: usize = 64;

    /// Get the raw bytes (64 bytes).
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; Self::LENGTH];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    /// Create from raw bytes (64 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::LENGTH {
            return Err(CryptoError::InvalidInput(format!(
                "signature must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        let inner = k256::ecdsa::Signature::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidInput("malformed signature scalars".into()))?;
        Ok(Self { inner })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Sign raw bytes (SHA-256 digest, ECDSA over secp256k1).
pub fn sign(message: &[u8], keypair: &KeyPair) -> Signature {
    Signature {
        inner: keypair.signing_key().sign(message),
    }
}

/// Verify a signature over raw bytes.
pub fn verify(message: &[u8], signature: &Signature, pubkey: &PublicKey) -> Result<(), CryptoError> {
    pubkey
        .verifying_key()
        .verify(message, &signature.inner)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

/// Canonical byte form of a wire message.
///
/// Both the signing and the verifying side must go through this function;
/// any other encoding of the same message yields a different digest.
pub fn canonical_bytes<M: prost::Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Sign a wire message over its canonical bytes.
pub fn sign_message<M: prost::Message>(message: &M, keypair: &KeyPair) -> Signature {
    sign(&canonical_bytes(message), keypair)
}

/// Verify a detached signature over a wire message's canonical bytes.
pub fn verify_message<M: prost::Message>(
    message: &M,
    signature: &[u8],
    pubkey: &PublicKey,
) -> Result<(), CryptoError> {
    let sig = Signature::from_bytes(signature)?;
    verify(&canonical_bytes(message), &sig, pubkey)
}
