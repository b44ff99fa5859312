//! Structured error taxonomy for the Core.
//!
//! Every variant carries the context a caller needs to decide what to do
//! next (retry, surface to a user, log and move on). Local recovery
//! (unhealthy-node rotation, transient precheck backoff, expired
//! transaction-id regeneration) never reaches a caller as an `Error`; only
//! the final, unrecoverable outcome does.

use crate::{Hbar, TransactionId};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The numeric response/precheck status reported by a consensus node.
///
/// A thin newtype over the wire's `i32` so call sites don't need to pull
/// in the full generated status enum to match on a handful of codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub i32);

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status({})", self.0)
    }
}

/// The crate's error taxonomy (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine's retry budget was exhausted without a conclusive outcome.
    #[error("timed out: {0}")]
    TimedOut(Box<Error>),

    /// A non-retryable transport-level failure.
    #[error("grpc status: {0}")]
    GrpcStatus(#[from] tonic::Status),

    /// A transaction was rejected before consensus, scoped to a transaction id.
    #[error("transaction {transaction_id} failed precheck with status {status}")]
    TransactionPreCheckStatus {
        status: Status,
        transaction_id: Box<TransactionId>,
        cost: Option<Hbar>,
    },

    /// A transaction was rejected before consensus with no transaction id available.
    #[error("transaction failed precheck with status {status} (no transaction id)")]
    TransactionNoIdPreCheckStatus { status: Status },

    /// A query (non-payment phase) was rejected before consensus.
    #[error("query for {transaction_id} failed precheck with status {status}")]
    QueryPreCheckStatus {
        status: Status,
        transaction_id: Box<TransactionId>,
    },

    /// The payment transaction of a paid query was rejected before consensus.
    #[error("query payment for {transaction_id} failed precheck with status {status}")]
    QueryPaymentPreCheckStatus {
        status: Status,
        transaction_id: Box<TransactionId>,
    },

    /// A paid query's cost phase failed with no payment transaction id available.
    #[error("query payment failed precheck with status {status} (no transaction id)")]
    QueryNoPaymentPreCheckStatus { status: Status },

    /// A consensus-time failure surfaced by a follow-up receipt query.
    #[error("receipt failed with status {status}{}", transaction_id.as_ref().map(|id| format!(" ({id})")).unwrap_or_default())]
    ReceiptStatus {
        status: Status,
        transaction_id: Option<Box<TransactionId>>,
    },

    /// The cost phase of a paid query returned a value above the configured cap.
    #[error("query cost {query_cost} exceeds the maximum allowed payment of {max_query_payment}")]
    MaxQueryPaymentExceeded {
        query_cost: Hbar,
        max_query_payment: Hbar,
    },

    /// `freeze()` was called with no client-supplied operator and no
    /// explicit transaction id / payer signer on the request.
    #[error("transaction has no payer account or transaction id set, and no client operator")]
    NoPayerAccountOrTransactionId,

    /// An explicit node account id does not map to a known network endpoint.
    #[error("node account {0} is not recognized by this client's network")]
    NodeAccountUnknown(AccountIdDisplay),

    /// A response/precheck status fell outside the known enumeration.
    #[error("response status unrecognized: {0}")]
    ResponseStatusUnrecognized(i32),

    /// Decoding a wire-format message failed.
    #[error("failed to parse from protobuf: {0}")]
    FromProtobuf(String),

    /// An entity id's textual checksum did not match the expected one for
    /// the client's current ledger.
    #[error(
        "entity id {shard}.{realm}.{num} checksum mismatch: expected {expected_checksum}, got {present_checksum}"
    )]
    BadEntityId {
        shard: u64,
        realm: u64,
        num: u64,
        present_checksum: String,
        expected_checksum: String,
    },

    /// `freeze()` was called without a client and without explicit node ids.
    #[error("transaction frozen without a client must have explicit node account ids set")]
    FreezeUnsetNodeAccountIds,

    /// A caller attempted an operation this request's current state forbids
    /// (e.g. manual signing a multi-chunk transaction, re-freezing a
    /// sourced request with conflicting node ids, mutually exclusive
    /// fields set together).
    #[error("usage error: {0}")]
    UsageError(String),

    /// Signature verification failed during `verify_transaction`.
    #[error("signature verification failed")]
    SignatureVerify,

    /// A mnemonic phrase could not be parsed, or produced invalid entropy.
    #[error("mnemonic error: {0}")]
    MnemonicParse(String),

    /// A key could not be parsed or derived.
    #[error("key error: {0}")]
    KeyParse(String),

    /// Any other parse failure that doesn't merit its own variant.
    #[error("parse error: {0}")]
    BasicParse(String),
}

/// Helper newtype so [`Error::NodeAccountUnknown`] can `Display` without
/// pulling `AccountId`'s `Display` impl into a cyclic import at the type
/// level (kept as a plain wrapper over the formatted string).
#[derive(Debug, Clone)]
pub struct AccountIdDisplay(pub String);

impl std::fmt::Display for AccountIdDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
