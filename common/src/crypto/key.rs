//! Ed25519 signing keys for account and momentum producers.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::fmt;
use thiserror::Error;

use super::{Address, Hash};

/// Size of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = PUBLIC_KEY_LENGTH;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = SIGNATURE_LENGTH;

/// Error types for key and signature handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid public key length: expected {}, got {}", PUBLIC_KEY_SIZE, _0)]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature length: expected {}, got {}", SIGNATURE_SIZE, _0)]
    InvalidSignatureLength(usize),

    #[error("Failed to parse public key")]
    InvalidPublicKey,

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A signing key together with the account address it controls.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Build a key pair from raw secret bytes.
    pub fn from_secret(secret: [u8; SECRET_KEY_LENGTH]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        let address = Address::from_public_key(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Deterministically derive a key pair from a numeric seed.
    ///
    /// The same seed always yields the same address, which keeps test
    /// fixtures stable across runs.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        rng.fill_bytes(&mut secret);
        Self::from_secret(secret)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &Hash) -> Vec<u8> {
        self.signing_key
            .sign(message.as_bytes())
            .to_bytes()
            .to_vec()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Verify a signature produced by [`KeyPair::sign`].
pub fn verify_signature(public_key: &[u8], message: &Hash, signature: &[u8]) -> Result<(), KeyError> {
    let public_key: [u8; PUBLIC_KEY_SIZE] = public_key
        .try_into()
        .map_err(|_| KeyError::InvalidPublicKeyLength(public_key.len()))?;
    let signature: [u8; SIGNATURE_SIZE] = signature
        .try_into()
        .map_err(|_| KeyError::InvalidSignatureLength(signature.len()))?;

    let verifying_key =
        VerifyingKey::from_bytes(&public_key).map_err(|_| KeyError::InvalidPublicKey)?;
    verifying_key
        .verify(message.as_bytes(), &DalekSignature::from_bytes(&signature))
        .map_err(|_| KeyError::VerificationFailed)
}
