//! DAO Engine Cryptography
//!
//! Account keys, signature generation and verification, and the mapping from
//! public keys to ledger addresses.

use dao_core::{keccak256, Address};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,
}

/// Key pair controlling one account
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate new random keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic keypair for a named account; the secret is the keccak
    /// digest of the seed. Suitable for local fixtures only.
    pub fn from_seed(seed: &str) -> Self {
        let secret = keccak256(seed.as_bytes());
        Self::from_signing_key(SigningKey::from_bytes(secret.as_bytes()))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Ledger address controlled by this key
    pub fn address(&self) -> Address {
        address_from_public_key(self.verifying_key.as_bytes())
    }

    /// Sign message
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Verify a detached signature against a raw 32-byte public key
    pub fn verify(
        public_key: &[u8],
        message: &[u8],
        signature_bytes: &[u8],
    ) -> Result<(), CryptoError> {
        let pub_key_array: [u8; 32] = public_key
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        let verifying_key =
            VerifyingKey::from_bytes(&pub_key_array).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig_array: [u8; 64] = signature_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        let signature = Signature::from_bytes(&sig_array);

        verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

/// Address of a public key: the last 20 bytes of its keccak digest
pub fn address_from_public_key(public_key: &[u8]) -> Address {
    Address::from_digest(&keccak256(public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn test_seeded_keys_are_stable() {
        let a = KeyPair::from_seed("alice");
        let b = KeyPair::from_seed("alice");
        assert_eq!(a.address(), b.address());
        assert_ne!(a.address(), KeyPair::from_seed("bob").address());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::from_seed("signer");
        let message = b"permit digest";
        let signature = keypair.sign(message);
        assert!(KeyPair::verify(&keypair.public_key_bytes(), message, &signature).is_ok());
    }

    #[test]
    fn test_invalid_signature() {
        let keypair = KeyPair::from_seed("signer");
        let signature = keypair.sign(b"test message");
        assert_eq!(
            KeyPair::verify(&keypair.public_key_bytes(), b"wrong message", &signature),
            Err(CryptoError::InvalidSignature)
        );
        assert_eq!(
            KeyPair::verify(&[1, 2, 3], b"test message", &signature),
            Err(CryptoError::InvalidPublicKey)
        );
    }

    #[test]
    fn test_address_follows_public_key() {
        let keypair = KeyPair::from_seed("owner");
        assert_eq!(
            address_from_public_key(&keypair.public_key_bytes()),
            keypair.address()
        );
    }
}
