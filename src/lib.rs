//! Client-side runtime for a Hedera-style distributed ledger SDK.
//!
//! This crate implements the four tightly coupled subsystems that make up
//! the hard engineering of a ledger client: the generic retry/dispatch
//! engine ([`execute`]), the transaction lifecycle ([`transaction`]),
//! the network routing table ([`network`]), and the query payment
//! protocol ([`query`]). Concrete transaction/query builder types beyond
//! a small representative set are out of scope; see each module's docs.

mod backoff;
mod client;
mod entity_id;
mod error;
mod execute;
mod hbar;
mod key;
mod ledger_id;
mod network;
mod proto;
mod query;
mod signer;
mod timestamp;
mod transaction;
mod transaction_hash;
mod transaction_id;
mod transaction_receipt;
mod transaction_response;

pub use backoff::ExponentialBackoff;
pub use client::{Client, Operator};
pub use entity_id::{
    AccountId, ContractId, EntityId, FileId, NodeId, ScheduleId, TokenId, TopicId,
};
pub use error::{Error, Result};
pub use hbar::{Hbar, HbarUnit, Tinybar};
pub use key::{KeyKind, PrivateKey, PublicKey};
pub use ledger_id::LedgerId;
pub use network::{Network, NodeAddress};
pub use query::{
    account_balance::{AccountBalance, AccountBalanceQuery},
    transaction_receipt::TransactionReceiptQuery,
    transaction_record::TransactionRecordQuery,
    Query,
};
pub use signer::Signer;
pub use timestamp::{Duration, Timestamp};
pub use transaction::{
    any::AnyTransaction, topic_submit::TopicMessageSubmitTransaction, transfer::TransferTransaction, Transaction,
};
pub use transaction_hash::TransactionHash;
pub use transaction_id::TransactionId;
pub use transaction_receipt::{Receipt, ReceiptStatus};
pub use transaction_response::TransactionResponse;

pub(crate) use proto::services;

/// Boxed future for a gRPC unary call, mirroring the shape `tonic`'s
/// generated clients return.
pub(crate) type BoxGrpcFuture<'a, T> =
    futures::future::BoxFuture<'a, std::result::Result<tonic::Response<T>, tonic::Status>>;
