//! Message shapes for the crypto-transfer, consensus-submit-message,
//! account-balance, transaction-receipt, and transaction-record RPCs,
//! plus the shared transaction/query envelopes they're carried in.

#![allow(clippy::derive_partial_eq_without_eq)]

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
}

pub mod account_id {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Account {
        #[prost(int64, tag = "3")]
        AccountNum(i64),
        #[prost(bytes, tag = "4")]
        Alias(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(oneof = "account_id::Account", tags = "3, 4")]
    pub account: Option<account_id::Account>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(int64, tag = "3")]
    pub topic_num: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionId {
    #[prost(message, optional, tag = "1")]
    pub transaction_valid_start: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    #[prost(bool, tag = "3")]
    pub scheduled: bool,
    #[prost(int32, tag = "4")]
    pub nonce: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountAmount {
    #[prost(message, optional, tag = "1")]
    pub account_id: Option<AccountId>,
    #[prost(sint64, tag = "2")]
    pub amount: i64,
    #[prost(bool, tag = "3")]
    pub is_approval: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransferList {
    #[prost(message, repeated, tag = "1")]
    pub account_amounts: Vec<AccountAmount>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoTransferTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transfers: Option<TransferList>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusMessageChunkInfo {
    #[prost(message, optional, tag = "1")]
    pub initial_transaction_id: Option<TransactionId>,
    #[prost(int32, tag = "2")]
    pub total: i32,
    #[prost(int32, tag = "3")]
    pub number: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusSubmitMessageTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub topic_id: Option<TopicId>,
    #[prost(bytes, tag = "2")]
    pub message: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub chunk_info: Option<ConsensusMessageChunkInfo>,
}

pub mod transaction_body {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "10")]
        CryptoTransfer(super::CryptoTransferTransactionBody),
        #[prost(message, tag = "11")]
        ConsensusSubmitMessage(super::ConsensusSubmitMessageTransactionBody),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transaction_id: Option<TransactionId>,
    #[prost(message, optional, tag = "2")]
    pub node_account_id: Option<AccountId>,
    #[prost(uint64, tag = "3")]
    pub transaction_fee: u64,
    #[prost(message, optional, tag = "4")]
    pub transaction_valid_duration: Option<Duration>,
    #[prost(bool, tag = "5")]
    pub generate_record: bool,
    #[prost(string, tag = "6")]
    pub memo: String,
    #[prost(oneof = "transaction_body::Data", tags = "10, 11")]
    pub data: Option<transaction_body::Data>,
}

pub mod signature_pair {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Signature {
        #[prost(bytes, tag = "2")]
        Ed25519(Vec<u8>),
        #[prost(bytes, tag = "3")]
        EcdsaSecp256k1(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignaturePair {
    #[prost(bytes, tag = "1")]
    pub pub_key_prefix: Vec<u8>,
    #[prost(oneof = "signature_pair::Signature", tags = "2, 3")]
    pub signature: Option<signature_pair::Signature>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureMap {
    #[prost(message, repeated, tag = "1")]
    pub sig_pair: Vec<SignaturePair>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedTransaction {
    #[prost(bytes, tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub sig_map: Option<SignatureMap>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    #[prost(bytes, tag = "5")]
    pub signed_transaction_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionList {
    #[prost(message, repeated, tag = "1")]
    pub transaction_list: Vec<Transaction>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionResponse {
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    #[prost(uint64, tag = "2")]
    pub cost: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryHeader {
    #[prost(message, optional, tag = "1")]
    pub payment: Option<Transaction>,
    #[prost(int32, tag = "2")]
    pub response_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseHeader {
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    #[prost(int32, tag = "2")]
    pub response_type: i32,
    #[prost(uint64, tag = "3")]
    pub cost: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoGetAccountBalanceQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoGetAccountBalanceResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    #[prost(uint64, tag = "3")]
    pub balance: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionReceipt {
    #[prost(int32, tag = "1")]
    pub status: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionGetReceiptQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub transaction_id: Option<TransactionId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionGetReceiptResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub receipt: Option<TransactionReceipt>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionRecord {
    #[prost(message, optional, tag = "1")]
    pub receipt: Option<TransactionReceipt>,
    #[prost(bytes, tag = "2")]
    pub transaction_hash: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub consensus_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "4")]
    pub transaction_id: Option<TransactionId>,
    #[prost(string, tag = "5")]
    pub memo: String,
    #[prost(uint64, tag = "6")]
    pub transaction_fee: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionGetRecordQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub transaction_id: Option<TransactionId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionGetRecordResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub transaction_record: Option<TransactionRecord>,
}

pub mod query {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Query {
        #[prost(message, tag = "1")]
        CryptogetAccountBalance(super::CryptoGetAccountBalanceQuery),
        #[prost(message, tag = "2")]
        TransactionGetReceipt(super::TransactionGetReceiptQuery),
        #[prost(message, tag = "3")]
        TransactionGetRecord(super::TransactionGetRecordQuery),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(oneof = "query::Query", tags = "1, 2, 3")]
    pub query: Option<query::Query>,
}

pub mod response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        CryptogetAccountBalance(super::CryptoGetAccountBalanceResponse),
        #[prost(message, tag = "2")]
        TransactionGetReceipt(super::TransactionGetReceiptResponse),
        #[prost(message, tag = "3")]
        TransactionGetRecord(super::TransactionGetRecordResponse),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(oneof = "response::Response", tags = "1, 2, 3")]
    pub response: Option<response::Response>,
}

/// Response/precheck codes this crate branches on by name; every other
/// numeric value passes through as [`crate::error::Status`].
pub mod response_code {
    pub const OK: i32 = 22;
    pub const BUSY: i32 = 10;
    pub const PLATFORM_NOT_ACTIVE: i32 = 30;
    pub const TRANSACTION_EXPIRED: i32 = 9;
}
