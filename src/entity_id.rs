//! Entity identifiers: the `shard.realm.num` triple shared by every kind
//! of on-ledger entity (spec §3), plus [`AccountId`]'s alias forms.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::ledger_id::{self, LedgerId};

/// The bare `shard.realm.num` triple, with an optional parsed checksum.
///
/// This is the shared representation every flavored id (`AccountId`,
/// `FileId`, ...) is built from; it is not exported on its own since each
/// flavor is otherwise interchangeable and that's exactly the mixup the
/// distinct wrapper types exist to prevent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Parse a `shard.realm.num` or `shard.realm.num-checksum` string,
    /// returning the triple and the checksum text if one was present.
    fn parse_with_checksum(s: &str) -> Result<(Self, Option<String>)> {
        let (body, checksum) = match s.split_once('-') {
            Some((body, checksum)) => (body, Some(checksum.to_string())),
            None => (s, None),
        };

        let mut parts = body.split('.');
        let (Some(shard), Some(realm), Some(num), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::BasicParse(format!("invalid entity id: {s}")));
        };

        let shard: u64 = shard
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid shard in entity id: {s}")))?;
        let realm: u64 = realm
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid realm in entity id: {s}")))?;
        let num: u64 = num
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid num in entity id: {s}")))?;

        Ok((Self::new(shard, realm, num), checksum))
    }

    fn checksum_for(self, ledger_id: &LedgerId) -> String {
        ledger_id::checksum(ledger_id, self.shard, self.realm, self.num)
    }

    /// Verify a previously-parsed checksum against `ledger_id`, per spec §6.
    fn validate_checksum(self, present: &str, ledger_id: &LedgerId) -> Result<()> {
        let expected = self.checksum_for(ledger_id);
        if present == expected {
            Ok(())
        } else {
            Err(Error::BadEntityId {
                shard: self.shard,
                realm: self.realm,
                num: self.num,
                present_checksum: present.to_string(),
                expected_checksum: expected,
            })
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Generates a flavored entity id newtype sharing [`EntityId`]'s
/// triple/checksum machinery but disjoint as a Rust type.
macro_rules! entity_id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            pub shard: u64,
            pub realm: u64,
            pub num: u64,
        }

        impl $name {
            pub fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self { shard, realm, num }
            }

            fn inner(self) -> EntityId {
                EntityId::new(self.shard, self.realm, self.num)
            }

            /// Render with a trailing checksum computed for `ledger_id`.
            pub fn to_string_with_checksum(self, ledger_id: &LedgerId) -> String {
                format!("{}-{}", self.inner(), self.inner().checksum_for(ledger_id))
            }

            /// Verify an already-parsed checksum (see [`FromStr`]) against
            /// `ledger_id`. A no-op `Ok(())` if no checksum was present.
            pub fn validate_checksum(self, checksum: Option<&str>, ledger_id: &LedgerId) -> Result<()> {
                match checksum {
                    Some(checksum) => self.inner().validate_checksum(checksum, ledger_id),
                    None => Ok(()),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.inner(), f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let (id, _checksum) = EntityId::parse_with_checksum(s)?;
                Ok(Self::new(id.shard, id.realm, id.num))
            }
        }
    };
}

entity_id_type!(FileId, "A file entity id.");
entity_id_type!(ContractId, "A smart contract entity id.");
entity_id_type!(TopicId, "A consensus topic entity id.");
entity_id_type!(TokenId, "A token entity id.");
entity_id_type!(ScheduleId, "A scheduled transaction entity id.");
entity_id_type!(NodeId, "A consensus node id (no checksum form).");

/// The alternate forms an [`AccountId`] may take, besides the plain
/// `shard.realm.num` triple (spec §3: "exactly one of the three forms is
/// present").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AccountAlias {
    /// A 20-byte EVM address, used directly as the account's identity.
    EvmAddress([u8; 20]),
    /// An as-yet-unused alias derived from the account's public key.
    PublicKeyAlias(crate::key::PublicKey),
}

/// An account id: the `shard.realm.num` triple, an EVM address, or a
/// public-key alias — never more than one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub shard: u64,
    pub realm: u64,
    /// `None` when this id is carried purely as an alias.
    pub num: Option<u64>,
    alias: Option<AccountAlias>,
}

impl AccountId {
    pub fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num: Some(num), alias: None }
    }

    /// An account id carried as a realm-scoped EVM address.
    pub fn from_evm_address(shard: u64, realm: u64, address: [u8; 20]) -> Self {
        Self { shard, realm, num: None, alias: Some(AccountAlias::EvmAddress(address)) }
    }

    /// An account id carried as a realm-scoped public-key alias.
    pub fn from_public_key_alias(shard: u64, realm: u64, public_key: crate::key::PublicKey) -> Self {
        Self { shard, realm, num: None, alias: Some(AccountAlias::PublicKeyAlias(public_key)) }
    }

    pub fn evm_address(&self) -> Option<[u8; 20]> {
        match &self.alias {
            Some(AccountAlias::EvmAddress(address)) => Some(*address),
            _ => None,
        }
    }

    pub fn is_num(&self) -> bool {
        self.num.is_some()
    }

    fn inner(&self) -> Option<EntityId> {
        self.num.map(|num| EntityId::new(self.shard, self.realm, num))
    }

    /// Render with a trailing checksum; a no-op for alias forms, which have
    /// no checksum.
    pub fn to_string_with_checksum(&self, ledger_id: &LedgerId) -> String {
        match self.inner() {
            Some(inner) => format!("{inner}-{}", inner.checksum_for(ledger_id)),
            None => self.to_string(),
        }
    }

    pub fn validate_checksum(&self, checksum: Option<&str>, ledger_id: &LedgerId) -> Result<()> {
        match (self.inner(), checksum) {
            (Some(inner), Some(checksum)) => inner.validate_checksum(checksum, ledger_id),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(AccountAlias::EvmAddress(address)) => {
                write!(f, "{}.{}.{}", self.shard, self.realm, hex::encode(address))
            }
            Some(AccountAlias::PublicKeyAlias(key)) => {
                write!(f, "{}.{}.{}", self.shard, self.realm, key)
            }
            None => write!(f, "{}.{}.{}", self.shard, self.realm, self.num.unwrap_or_default()),
        }
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (body, _checksum) = match s.split_once('-') {
            Some((body, checksum)) => (body, Some(checksum)),
            None => (s, None),
        };

        let mut parts = body.splitn(3, '.');
        let (Some(shard), Some(realm), Some(tail)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::BasicParse(format!("invalid account id: {s}")));
        };

        let shard: u64 = shard
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid shard in account id: {s}")))?;
        let realm: u64 = realm
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid realm in account id: {s}")))?;

        if let Ok(num) = tail.parse::<u64>() {
            return Ok(Self::new(shard, realm, num));
        }

        if tail.len() == 40 {
            if let Ok(bytes) = hex::decode(tail) {
                let address: [u8; 20] = bytes
                    .try_into()
                    .map_err(|_| Error::BasicParse(format!("invalid evm address in account id: {s}")))?;
                return Ok(Self::from_evm_address(shard, realm, address));
            }
        }

        Err(Error::BasicParse(format!("invalid account id: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_parse_law_no_checksum() {
        let (id, checksum) = EntityId::parse_with_checksum("0.0.1001").unwrap();
        assert_eq!(id, EntityId::new(0, 0, 1001));
        assert!(checksum.is_none());
    }

    #[test]
    fn entity_id_parse_law_roundtrips_format() {
        let id = EntityId::new(1, 2, 3);
        let (parsed, _) = EntityId::parse_with_checksum(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn file_id_checksum_validates() {
        let id = FileId::new(0, 0, 150);
        let rendered = id.to_string_with_checksum(&LedgerId::MAINNET);
        let (_, checksum) = EntityId::parse_with_checksum(&rendered).unwrap();
        assert!(id.validate_checksum(checksum.as_deref(), &LedgerId::MAINNET).is_ok());
    }

    #[test]
    fn file_id_checksum_rejects_wrong_ledger() {
        let id = FileId::new(0, 0, 150);
        let rendered = id.to_string_with_checksum(&LedgerId::MAINNET);
        let (_, checksum) = EntityId::parse_with_checksum(&rendered).unwrap();
        assert!(id.validate_checksum(checksum.as_deref(), &LedgerId::TESTNET).is_err());
    }

    #[test]
    fn account_id_display_plain() {
        assert_eq!(AccountId::new(0, 0, 1001).to_string(), "0.0.1001");
    }

    #[test]
    fn account_id_parses_evm_address() {
        let address = [0xABu8; 20];
        let rendered = AccountId::from_evm_address(0, 0, address).to_string();
        let parsed: AccountId = rendered.parse().unwrap();
        assert_eq!(parsed.evm_address(), Some(address));
        assert!(!parsed.is_num());
    }

    #[test]
    fn account_id_parses_numeric() {
        let parsed: AccountId = "0.0.5005".parse().unwrap();
        assert_eq!(parsed, AccountId::new(0, 0, 5005));
    }

    #[test]
    fn account_id_rejects_malformed() {
        assert!("not-an-id".parse::<AccountId>().is_err());
    }
}
