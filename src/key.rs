//! Key types backing the [`Signer`](crate::Signer) abstraction.
//!
//! Concrete key derivation, mnemonics, and the ECDSA/secp256k1 curve are
//! treated as library concerns outside this crate's scope (spec §1); what
//! lives here is the minimum needed to sign and to tag a signature with
//! the curve it came from, with a full implementation for Ed25519 since
//! the pipeline needs at least one working signer end to end.

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};

use crate::error::{Error, Result};

/// The curve a key belongs to, used to tag signature-pair entries on the
/// wire (spec §3, "Signature pair representation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Ed25519,
    EcdsaSecp256k1,
}

/// A public key: either a decoded Ed25519 verifying key, or the raw bytes
/// of an ECDSA/secp256k1 key (opaque past id-aliasing and signature-pair
/// tagging, per scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(VerifyingKey),
    EcdsaSecp256k1(Vec<u8>),
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl PublicKey {
    pub fn kind(&self) -> KeyKind {
        match self {
            PublicKey::Ed25519(_) => KeyKind::Ed25519,
            PublicKey::EcdsaSecp256k1(_) => KeyKind::EcdsaSecp256k1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => key.to_bytes().to_vec(),
            PublicKey::EcdsaSecp256k1(bytes) => bytes.clone(),
        }
    }

    pub fn from_ed25519_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::KeyParse("ed25519 public key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&bytes)
            .map(PublicKey::Ed25519)
            .map_err(|e| Error::KeyParse(format!("invalid ed25519 public key: {e}")))
    }

    /// Verify `signature` over `message`, per spec's `verify_transaction`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            PublicKey::Ed25519(key) => {
                let signature: [u8; 64] = signature
                    .try_into()
                    .map_err(|_| Error::SignatureVerify)?;
                let signature = ed25519_dalek::Signature::from_bytes(&signature);
                key.verify_strict(message, &signature)
                    .map_err(|_| Error::SignatureVerify)
            }
            PublicKey::EcdsaSecp256k1(_) => Err(Error::KeyParse(
                "ecdsa secp256k1 verification is outside this crate's scope".into(),
            )),
        }
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// A private key capable of signing. Ed25519 is fully implemented; the
/// ECDSA/secp256k1 variant is data-only, matching this crate's scope.
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(Box<SigningKey>),
    EcdsaSecp256k1(Vec<u8>),
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivateKey::Ed25519(_) => write!(f, "PrivateKey::Ed25519(..)"),
            PrivateKey::EcdsaSecp256k1(_) => write!(f, "PrivateKey::EcdsaSecp256k1(..)"),
        }
    }
}

impl PrivateKey {
    /// Parse a raw 32-byte Ed25519 private key (spec's E1 seed scenario).
    pub fn from_ed25519_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::KeyParse("ed25519 private key must be 32 bytes".into()))?;
        Ok(PrivateKey::Ed25519(Box::new(SigningKey::from_bytes(&bytes))))
    }

    pub fn generate_ed25519() -> Self {
        let mut csprng = rand::rngs::OsRng;
        PrivateKey::Ed25519(Box::new(SigningKey::generate(&mut csprng)))
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            PrivateKey::Ed25519(_) => KeyKind::Ed25519,
            PrivateKey::EcdsaSecp256k1(_) => KeyKind::EcdsaSecp256k1,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            PrivateKey::EcdsaSecp256k1(bytes) => PublicKey::EcdsaSecp256k1(bytes.clone()),
        }
    }

    /// Sign `message`, returning the raw signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            PrivateKey::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            PrivateKey::EcdsaSecp256k1(_) => Err(Error::KeyParse(
                "ecdsa secp256k1 signing is outside this crate's scope".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_zero_seed_signs_and_verifies() {
        let key = PrivateKey::from_ed25519_bytes(&[0u8; 32]).unwrap();
        let signature = key.sign(b"hello").unwrap();
        assert!(key.public_key().verify(b"hello", &signature).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let key = PrivateKey::from_ed25519_bytes(&[1u8; 32]).unwrap();
        let signature = key.sign(b"hello").unwrap();
        assert!(key.public_key().verify(b"goodbye", &signature).is_err());
    }

    #[test]
    fn public_key_round_trips_through_bytes() {
        let key = PrivateKey::from_ed25519_bytes(&[7u8; 32]).unwrap();
        let public = key.public_key();
        let parsed = PublicKey::from_ed25519_bytes(&public.to_bytes()).unwrap();
        assert_eq!(public, parsed);
    }

    #[test]
    fn kind_reports_ed25519() {
        let key = PrivateKey::from_ed25519_bytes(&[0u8; 32]).unwrap();
        assert_eq!(key.kind(), KeyKind::Ed25519);
        assert_eq!(key.public_key().kind(), KeyKind::Ed25519);
    }
}
