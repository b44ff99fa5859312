//! The hash stamped into a [`crate::transaction_response::TransactionResponse`],
//! letting a caller look up a transaction's receipt/record without
//! having retained its id (spec §3 supplemental feature list).

use sha2::{Digest, Sha384};

/// SHA-384 of the submitted transaction's signed wire bytes — the same
/// digest a mirror node or explorer computes to key its lookup, so a
/// caller can hand this value to external tooling unmodified.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub(crate) [u8; 48]);

impl TransactionHash {
    pub(crate) fn from_signed_transaction_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha384::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 48];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionHash({})", hex::encode(self.0))
    }
}

impl std::fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_48_bytes() {
        let a = TransactionHash::from_signed_transaction_bytes(b"some signed bytes");
        let b = TransactionHash::from_signed_transaction_bytes(b"some signed bytes");
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), 48);
    }

    #[test]
    fn hash_differs_across_inputs() {
        let a = TransactionHash::from_signed_transaction_bytes(b"one");
        let b = TransactionHash::from_signed_transaction_bytes(b"two");
        assert_ne!(a, b);
    }
}
