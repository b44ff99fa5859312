//! TransactionId: (payer, valid-start, optional nonce, scheduled flag)
//! (spec §3).

use std::str::FromStr;

use rand::Rng;

use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::timestamp::Timestamp;

/// A transaction id. String form: `payer@valid-start-seconds.nanos[/nonce][?scheduled]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start: Timestamp,
    /// Present only for child scheduled-transaction ids (spec §9c); its
    /// presence suppresses the valid-start chunk bump.
    pub nonce: Option<u32>,
    pub scheduled: bool,
}

impl TransactionId {
    pub fn new(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self { account_id, valid_start, nonce: None, scheduled: false }
    }

    /// Generate a fresh id for `payer`: valid-start is now, jittered in the
    /// nanos field so bursts from the same payer don't collide (spec §3
    /// invariant).
    pub fn generate(payer: AccountId) -> Self {
        let now = Timestamp::now();
        let jitter = rand::thread_rng().gen_range(0..1_000_000_000u64);
        Self::new(payer, now.plus_nanos(jitter))
    }

    pub fn with_scheduled(self, scheduled: bool) -> Self {
        Self { scheduled, ..self }
    }

    pub fn with_nonce(self, nonce: u32) -> Self {
        Self { nonce: Some(nonce), ..self }
    }

    /// A fresh id for the same payer with a strictly later valid-start,
    /// used when the engine regenerates an expired transaction id
    /// (spec §4.3 decision table, `TRANSACTION_EXPIRED` with no explicit id).
    pub fn regenerate(self) -> Self {
        let mut candidate = Self::generate(self.account_id);
        if candidate.valid_start <= self.valid_start {
            candidate.valid_start = self.valid_start.plus_nanos(1);
        }
        candidate
    }

    /// The transaction id for chunk `offset` (0 for the first chunk) of a
    /// multi-chunk send, derived by bumping valid-start nanos by `offset`.
    /// A no-op when `nonce` is set (spec §9c).
    pub fn for_chunk(self, offset: u64) -> Self {
        if self.nonce.is_some() || offset == 0 {
            return self;
        }
        Self { valid_start: self.valid_start.plus_nanos(offset), ..self }
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.account_id, self.valid_start)?;
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (body, scheduled) = match s.strip_suffix("?scheduled") {
            Some(body) => (body, true),
            None => (s, false),
        };

        let (body, nonce) = match body.split_once('/') {
            Some((body, nonce)) => {
                let nonce: u32 = nonce
                    .parse()
                    .map_err(|_| Error::BasicParse(format!("invalid transaction id nonce: {s}")))?;
                (body, Some(nonce))
            }
            None => (body, None),
        };

        let (account, valid_start) = body
            .split_once('@')
            .ok_or_else(|| Error::BasicParse(format!("invalid transaction id: {s}")))?;

        let account_id: AccountId = account.parse()?;

        let (seconds, nanos) = valid_start
            .split_once('.')
            .ok_or_else(|| Error::BasicParse(format!("invalid transaction id valid-start: {s}")))?;
        let seconds: u64 = seconds
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid transaction id valid-start seconds: {s}")))?;
        let nanos: u32 = nanos
            .parse()
            .map_err(|_| Error::BasicParse(format!("invalid transaction id valid-start nanos: {s}")))?;

        Ok(Self { account_id, valid_start: Timestamp { seconds, nanos }, nonce, scheduled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payer() -> AccountId {
        AccountId::new(0, 0, 1000)
    }

    #[test]
    fn display_matches_spec_grammar() {
        let id = TransactionId::new(payer(), Timestamp { seconds: 1_700_000_000, nanos: 0 });
        assert_eq!(id.to_string(), "0.0.1000@1700000000.000000000");
    }

    #[test]
    fn display_includes_nonce_and_scheduled() {
        let id = TransactionId::new(payer(), Timestamp { seconds: 1, nanos: 2 })
            .with_nonce(5)
            .with_scheduled(true);
        assert_eq!(id.to_string(), "0.0.1000@1.000000002/5?scheduled");
    }

    #[test]
    fn round_trips_through_string() {
        let id = TransactionId::new(payer(), Timestamp { seconds: 42, nanos: 7 }).with_nonce(3);
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn for_chunk_bumps_nanos() {
        let t0 = TransactionId::new(payer(), Timestamp { seconds: 100, nanos: 0 });
        let chunk1 = t0.clone().for_chunk(1);
        let chunk2 = t0.clone().for_chunk(2);
        assert_eq!(chunk1.valid_start, Timestamp { seconds: 100, nanos: 1 });
        assert_eq!(chunk2.valid_start, Timestamp { seconds: 100, nanos: 2 });
        assert_eq!(t0.clone().for_chunk(0), t0);
    }

    #[test]
    fn for_chunk_noop_when_nonce_set() {
        let t0 = TransactionId::new(payer(), Timestamp { seconds: 100, nanos: 0 }).with_nonce(9);
        assert_eq!(t0.clone().for_chunk(1), t0);
    }

    #[test]
    fn regenerate_strictly_increases_valid_start() {
        let original = TransactionId::new(payer(), Timestamp::now());
        let regenerated = original.clone().regenerate();
        assert!(regenerated.valid_start > original.valid_start);
        assert_eq!(regenerated.account_id, original.account_id);
    }

    #[test]
    fn generate_jitters_within_same_second() {
        let a = TransactionId::generate(payer());
        let b = TransactionId::generate(payer());
        assert_eq!(a.account_id, payer());
        assert_ne!(a.valid_start, b.valid_start);
    }
}
