//! The generic "bytes in, (public key, signature) out" signer capability
//! (spec's Signer abstraction, module B).

use std::sync::Arc;

use crate::error::Result;
use crate::key::{KeyKind, PrivateKey, PublicKey};

/// Something that can produce a signature over arbitrary bytes and name
/// the public key it signed with.
///
/// Implemented directly by [`PrivateKey`] and by any externally supplied
/// callback (e.g. a hardware wallet or remote signing service) via
/// [`Signer::from_callback`].
pub trait SignFn: Send + Sync {
    fn public_key(&self) -> PublicKey;
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

impl SignFn for PrivateKey {
    fn public_key(&self) -> PublicKey {
        PrivateKey::public_key(self)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        PrivateKey::sign(self, message)
    }
}

/// A callback-backed signer: a known public key plus an arbitrary
/// function from message bytes to signature bytes.
struct CallbackSigner {
    public_key: PublicKey,
    callback: Box<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>,
}

impl SignFn for CallbackSigner {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        (self.callback)(message)
    }
}

/// A cheaply cloneable handle to a [`SignFn`], attached to a transaction
/// with `sign()` / `sign_with()`.
#[derive(Clone)]
pub struct Signer(Arc<dyn SignFn>);

impl Signer {
    pub fn from_private_key(key: PrivateKey) -> Self {
        Self(Arc::new(key))
    }

    pub fn from_callback(
        public_key: PublicKey,
        callback: impl Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(CallbackSigner { public_key, callback: Box::new(callback) }))
    }

    pub fn public_key(&self) -> PublicKey {
        self.0.public_key()
    }

    pub fn kind(&self) -> KeyKind {
        self.public_key().kind()
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.0.sign(message)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signer({})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_signer_signs() {
        let key = PrivateKey::from_ed25519_bytes(&[0u8; 32]).unwrap();
        let public_key = key.public_key();
        let signer = Signer::from_private_key(key);
        let signature = signer.sign(b"body bytes").unwrap();
        assert!(public_key.verify(b"body bytes", &signature).is_ok());
    }

    #[test]
    fn callback_signer_uses_supplied_function() {
        let key = PrivateKey::from_ed25519_bytes(&[3u8; 32]).unwrap();
        let public_key = key.public_key();
        let signer = Signer::from_callback(public_key.clone(), move |message| key.sign(message));
        let signature = signer.sign(b"payload").unwrap();
        assert!(public_key.verify(b"payload", &signature).is_ok());
    }
}
