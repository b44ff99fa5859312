//! The transaction pipeline (spec §4.4, module G): builder state, freeze,
//! sign, serialize, deserialize, and chunked execute.

pub(crate) mod any;
pub(crate) mod chunked;
pub mod topic_submit;
pub mod transfer;

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use prost::Message as _;
use tonic::transport::Channel;

use crate::client::{Client, Operator};
use crate::entity_id::AccountId;
use crate::error::{Error, Result, Status};
use crate::execute::Executable;
use crate::hbar::Hbar;
use crate::proto::grpc::unary_call;
use crate::services;
use crate::signer::Signer;
use crate::timestamp::Duration;
use crate::transaction_id::TransactionId;
use crate::transaction_response::TransactionResponse;

pub(crate) use chunked::ChunkConfig;

/// One piece of a (possibly chunked) payload handed to
/// [`TransactionData::to_body_data`].
pub(crate) struct ChunkPiece<'a> {
    pub message: &'a [u8],
    pub chunk_info: Option<services::ConsensusMessageChunkInfo>,
}

/// Per-concrete-type behavior a [`Transaction`] delegates to.
pub(crate) trait TransactionData: Clone + Send + Sync + 'static {
    fn to_body_data(&self, chunk: Option<ChunkPiece<'_>>) -> services::transaction_body::Data;
    fn default_max_transaction_fee(&self) -> Hbar;
    fn method_path(&self) -> &'static str;
    /// The full payload this type splits across sub-transactions, if any
    /// (only `TopicMessageSubmitTransaction` returns `Some`).
    fn chunkable_payload(&self) -> Option<&[u8]> {
        None
    }
}

#[derive(Clone)]
enum Frozen {
    No,
    /// Built and owned locally: bodies are derived on demand from `data`.
    Yes { node_ids: Vec<AccountId>, operator: Option<Operator> },
}

#[derive(Clone)]
struct SourcedRecord {
    node_id: AccountId,
    body_bytes: Vec<u8>,
    existing_sig_pairs: Vec<services::SignaturePair>,
}

/// A transaction, generic over its concrete payload `D`.
#[derive(Clone)]
pub struct Transaction<D: TransactionData> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    transaction_id: Option<TransactionId>,
    max_transaction_fee: Option<Hbar>,
    transaction_valid_duration: Duration,
    memo: String,
    chunk_config: Option<ChunkConfig>,
    signers: Vec<Signer>,
    frozen: Frozen,
    /// Present only for a transaction reconstructed via `from_bytes`.
    sourced: Option<Vec<SourcedRecord>>,
}

impl<D: TransactionData> Transaction<D> {
    pub(crate) fn new(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            transaction_id: None,
            max_transaction_fee: None,
            transaction_valid_duration: Duration::from_secs(120),
            memo: String::new(),
            chunk_config: None,
            signers: Vec::new(),
            frozen: Frozen::No,
            sourced: None,
        }
    }

    pub fn with_node_account_ids(mut self, ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(ids);
        self
    }

    pub fn with_transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    pub fn with_max_transaction_fee(mut self, fee: Hbar) -> Self {
        self.max_transaction_fee = Some(fee);
        self
    }

    pub fn with_transaction_valid_duration(mut self, duration: Duration) -> Self {
        self.transaction_valid_duration = duration;
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_chunk_config(mut self, chunk_size: usize, max_chunks: usize) -> Self {
        self.chunk_config = Some(ChunkConfig { chunk_size, max_chunks });
        self
    }

    pub(crate) fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    #[cfg(test)]
    pub(crate) fn data(&self) -> &D {
        &self.data
    }

    pub fn is_frozen(&self) -> bool {
        self.sourced.is_some() || !matches!(self.frozen, Frozen::No)
    }

    fn chunk_count(&self) -> Result<usize> {
        match (self.chunk_config.as_ref(), self.data.chunkable_payload()) {
            (Some(config), Some(payload)) => {
                let used = payload.len().div_ceil(config.chunk_size).max(1);
                if used > config.max_chunks {
                    return Err(Error::UsageError(format!(
                        "transaction requires {used} chunks but max-chunks is {}",
                        config.max_chunks
                    )));
                }
                Ok(used)
            }
            _ => Ok(1),
        }
    }

    /// Freeze against a client: snapshots a sampled node set (the
    /// engine's one-third rule) and the current operator.
    pub fn freeze_with(mut self, client: &Client) -> Result<Self> {
        if self.is_frozen() {
            return Ok(self);
        }

        let node_ids = match &self.node_account_ids {
            Some(ids) => ids.clone(),
            None => {
                let network = client.network().lock().expect("network mutex poisoned");
                let healthy = network.healthy_node_indexes();
                let sampled = network.sample_healthy(&healthy);
                sampled.into_iter().map(|i| network.account_id_at(i)).collect()
            }
        };

        if node_ids.is_empty() {
            return Err(Error::FreezeUnsetNodeAccountIds);
        }

        let operator = client.operator();
        if self.transaction_id.is_none() {
            match &operator {
                Some(op) => self.transaction_id = Some(TransactionId::generate(op.account_id.clone())),
                None => return Err(Error::NoPayerAccountOrTransactionId),
            }
        }
        if self.max_transaction_fee.is_none() {
            if let Some(fee) = client.default_max_transaction_fee() {
                self.max_transaction_fee = Some(fee);
            }
        }

        self.node_account_ids = Some(node_ids.clone());
        self.frozen = Frozen::Yes { node_ids, operator };
        Ok(self)
    }

    /// Freeze without a client; only valid when explicit node ids are
    /// already set (spec §4.4 freeze contract).
    pub fn freeze(mut self) -> Result<Self> {
        if self.is_frozen() {
            return Ok(self);
        }
        let node_ids = self.node_account_ids.clone().ok_or(Error::FreezeUnsetNodeAccountIds)?;
        if node_ids.is_empty() {
            return Err(Error::FreezeUnsetNodeAccountIds);
        }
        if self.transaction_id.is_none() {
            return Err(Error::NoPayerAccountOrTransactionId);
        }
        self.frozen = Frozen::Yes { node_ids, operator: None };
        Ok(self)
    }

    pub(crate) fn freeze_with_node_ids(self, node_ids: Vec<AccountId>) -> Result<Self> {
        self.with_node_account_ids(node_ids).freeze()
    }

    /// Append a signer. Buffered and applied on next serialize; signing
    /// before freezing is allowed, only ineffective until frozen. Rejected
    /// once the request needs more than one chunk, since a single
    /// signature only ever covers the body of one sub-transaction (spec
    /// §4.4: manual signer addition on a multi-chunk request is a usage
    /// error, not a silent mis-sign).
    pub fn sign(&mut self, signer: Signer) -> Result<&mut Self> {
        if self.chunk_count()? > 1 {
            return Err(Error::UsageError(
                "cannot manually add a signer to a transaction that requires more than one chunk".into(),
            ));
        }
        self.signers.push(signer);
        Ok(self)
    }

    pub fn sign_with(
        &mut self,
        public_key: crate::key::PublicKey,
        callback: impl Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Result<&mut Self> {
        if self.chunk_count()? > 1 {
            return Err(Error::UsageError(
                "cannot manually add a signer to a transaction that requires more than one chunk".into(),
            ));
        }
        self.signers.push(Signer::from_callback(public_key, callback));
        Ok(self)
    }

    fn body_for(&self, transaction_id: TransactionId, node_id: AccountId, chunk_piece: Option<ChunkPiece<'_>>) -> services::TransactionBody {
        services::TransactionBody {
            transaction_id: Some(to_proto_transaction_id(transaction_id)),
            node_account_id: Some(to_proto_account_id(node_id)),
            transaction_fee: self.max_transaction_fee.unwrap_or_else(|| self.data.default_max_transaction_fee()).to_tinybars() as u64,
            transaction_valid_duration: Some(services::Duration { seconds: self.transaction_valid_duration.seconds as i64 }),
            generate_record: false,
            memo: self.memo.clone(),
            data: Some(self.data.to_body_data(chunk_piece)),
        }
    }

    fn sig_map_for(&self, body_bytes: &[u8], existing: &[services::SignaturePair]) -> services::SignatureMap {
        let mut pairs: Vec<services::SignaturePair> = existing.to_vec();
        for signer in &self.signers {
            let public_key = signer.public_key();
            let prefix = public_key.to_bytes();
            let already_present = pairs.iter().any(|pair| public_key.to_bytes().starts_with(&pair.pub_key_prefix) || pair.pub_key_prefix.starts_with(&prefix));
            if already_present {
                continue;
            }
            let Ok(signature) = signer.sign(body_bytes) else { continue };
            let tagged = match public_key.kind() {
                crate::key::KeyKind::Ed25519 => services::signature_pair::Signature::Ed25519(signature),
                crate::key::KeyKind::EcdsaSecp256k1 => services::signature_pair::Signature::EcdsaSecp256k1(signature),
            };
            pairs.push(services::SignaturePair { pub_key_prefix: prefix, signature: Some(tagged) });
        }
        services::SignatureMap { sig_pair: pairs }
    }

    /// All `(node, chunk)` signed transactions this request serializes to.
    fn signed_transactions(&self) -> Result<Vec<services::Transaction>> {
        if let Some(records) = &self.sourced {
            return Ok(records
                .iter()
                .map(|record| {
                    let sig_map = self.sig_map_for(&record.body_bytes, &record.existing_sig_pairs);
                    let signed = services::SignedTransaction { body_bytes: record.body_bytes.clone(), sig_map: Some(sig_map) };
                    services::Transaction { signed_transaction_bytes: signed.encode_to_vec() }
                })
                .collect());
        }

        let Frozen::Yes { node_ids, .. } = &self.frozen else {
            return Err(Error::UsageError("transaction must be frozen before serializing".into()));
        };
        let transaction_id = self.transaction_id.clone().ok_or(Error::NoPayerAccountOrTransactionId)?;
        let chunks = self.chunk_count()?;

        let mut out = Vec::with_capacity(node_ids.len() * chunks);
        let payload = self.data.chunkable_payload().unwrap_or(&[]);
        let chunk_size = self.chunk_config.as_ref().map(|c| c.chunk_size).unwrap_or(payload.len().max(1));

        for node_id in node_ids {
            for chunk_index in 0..chunks {
                let chunk_tx_id = transaction_id.clone().for_chunk(chunk_index as u64);
                let chunk_piece = if chunks > 1 {
                    let start = chunk_index * chunk_size;
                    let end = (start + chunk_size).min(payload.len());
                    Some(ChunkPiece {
                        message: &payload[start..end],
                        chunk_info: Some(services::ConsensusMessageChunkInfo {
                            initial_transaction_id: Some(to_proto_transaction_id(transaction_id.clone())),
                            total: chunks as i32,
                            number: (chunk_index + 1) as i32,
                        }),
                    })
                } else {
                    None
                };

                let body = self.body_for(chunk_tx_id, node_id.clone(), chunk_piece);
                let body_bytes = body.encode_to_vec();
                let sig_map = self.sig_map_for(&body_bytes, &[]);
                let signed = services::SignedTransaction { body_bytes, sig_map: Some(sig_map) };
                out.push(services::Transaction { signed_transaction_bytes: signed.encode_to_vec() });
            }
        }
        Ok(out)
    }

    /// Serialize to the outer transaction-list wire format (spec §6).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let list = services::TransactionList { transaction_list: self.signed_transactions()? };
        Ok(list.encode_to_vec())
    }

    pub(crate) fn to_signed_transaction_for_node(&self, node_id: AccountId) -> Result<services::Transaction> {
        self.signed_transactions()?
            .into_iter()
            .zip(self.node_account_ids.clone().unwrap_or_default())
            .find(|(_, id)| *id == node_id)
            .map(|(tx, _)| tx)
            .ok_or_else(|| Error::UsageError(format!("no signed transaction for node {node_id}")))
    }

    pub async fn execute(&self, client: &Client, timeout: Option<StdDuration>) -> Result<TransactionResponse> {
        let attempt = TransactionAttempt { transaction: self, chunk_index: 0, total_chunks: self.chunk_count()? };
        crate::execute::execute(client, &attempt, timeout).await
    }

    /// Submit every chunk in order, returning their responses. Manual
    /// signer addition on a multi-chunk request is rejected directly by
    /// [`Transaction::sign`]/[`Transaction::sign_with`] (spec §4.4).
    pub async fn execute_all(&self, client: &Client, timeout: Option<StdDuration>) -> Result<Vec<TransactionResponse>> {
        let total = self.chunk_count()?;
        let mut responses = Vec::with_capacity(total);
        for chunk_index in 0..total {
            let attempt = TransactionAttempt { transaction: self, chunk_index, total_chunks: total };
            let response = crate::execute::execute(client, &attempt, timeout).await?;
            responses.push(response);
        }
        Ok(responses)
    }
}

pub(crate) fn to_proto_account_id(id: AccountId) -> services::AccountId {
    services::AccountId {
        shard_num: id.shard as i64,
        realm_num: id.realm as i64,
        account: Some(services::account_id::Account::AccountNum(id.num.unwrap_or_default() as i64)),
    }
}

pub(crate) fn to_proto_transaction_id(id: TransactionId) -> services::TransactionId {
    services::TransactionId {
        transaction_valid_start: Some(services::Timestamp {
            seconds: id.valid_start.seconds as i64,
            nanos: id.valid_start.nanos as i32,
        }),
        account_id: Some(to_proto_account_id(id.account_id)),
        scheduled: id.scheduled,
        nonce: id.nonce.map(|n| n as i32).unwrap_or_default(),
    }
}

pub(crate) fn from_proto_account_id(id: &services::AccountId) -> Result<AccountId> {
    match id.account {
        Some(services::account_id::Account::AccountNum(num)) => {
            Ok(AccountId::new(id.shard_num as u64, id.realm_num as u64, num as u64))
        }
        None => Err(Error::FromProtobuf("missing account id variant".into())),
    }
}

pub(crate) fn from_proto_transaction_id(id: &services::TransactionId) -> Result<TransactionId> {
    let account_id = id
        .account_id
        .as_ref()
        .ok_or_else(|| Error::FromProtobuf("missing transaction id payer".into()))
        .and_then(from_proto_account_id)?;
    let valid_start = id
        .transaction_valid_start
        .as_ref()
        .ok_or_else(|| Error::FromProtobuf("missing transaction id valid-start".into()))?;
    let mut out = TransactionId::new(
        account_id,
        crate::timestamp::Timestamp { seconds: valid_start.seconds as u64, nanos: valid_start.nanos as u32 },
    );
    out = out.with_scheduled(id.scheduled);
    if id.nonce != 0 {
        out = out.with_nonce(id.nonce as u32);
    }
    Ok(out)
}

/// One engine attempt: a single `(node, chunk)` pair.
struct TransactionAttempt<'a, D: TransactionData> {
    transaction: &'a Transaction<D>,
    chunk_index: usize,
    total_chunks: usize,
}

#[async_trait]
impl<'a, D: TransactionData> Executable for TransactionAttempt<'a, D> {
    type GrpcRequest = services::Transaction;
    type GrpcResponse = services::TransactionResponse;
    /// The signed transaction's wire bytes, carried from `make_request`
    /// to `make_response` so the hash can be derived from what was
    /// actually submitted rather than from the ack alone.
    type Context = Vec<u8>;
    type Response = TransactionResponse;

    fn node_account_ids(&self) -> Option<Vec<AccountId>> {
        self.transaction.node_account_ids.clone()
    }

    fn explicit_transaction_id(&self) -> Option<TransactionId> {
        self.transaction.transaction_id.clone().map(|id| id.for_chunk(self.chunk_index as u64))
    }

    fn requires_transaction_id(&self) -> bool {
        true
    }

    async fn make_request(
        &self,
        _client: &Client,
        transaction_id: Option<TransactionId>,
        node_id: AccountId,
    ) -> Result<(Self::GrpcRequest, Self::Context)> {
        let transaction_id = transaction_id.ok_or(Error::NoPayerAccountOrTransactionId)?;
        let payload = self.transaction.data.chunkable_payload().unwrap_or(&[]);
        let chunk_piece = if self.total_chunks > 1 {
            let chunk_size = self.transaction.chunk_config.as_ref().map(|c| c.chunk_size).unwrap_or(payload.len().max(1));
            let start = self.chunk_index * chunk_size;
            let end = (start + chunk_size).min(payload.len());
            let initial = self.transaction.transaction_id.clone().ok_or(Error::NoPayerAccountOrTransactionId)?;
            Some(ChunkPiece {
                message: &payload[start..end],
                chunk_info: Some(services::ConsensusMessageChunkInfo {
                    initial_transaction_id: Some(to_proto_transaction_id(initial)),
                    total: self.total_chunks as i32,
                    number: (self.chunk_index + 1) as i32,
                }),
            })
        } else {
            None
        };

        let body = self.transaction.body_for(transaction_id, node_id, chunk_piece);
        let body_bytes = body.encode_to_vec();
        let sig_map = self.transaction.sig_map_for(&body_bytes, &[]);
        let signed = services::SignedTransaction { body_bytes, sig_map: Some(sig_map) };
        let signed_bytes = signed.encode_to_vec();
        let wire = services::Transaction { signed_transaction_bytes: signed_bytes.clone() };
        Ok((wire, signed_bytes))
    }

    async fn execute(
        &self,
        channel: Channel,
        wire: Self::GrpcRequest,
    ) -> std::result::Result<tonic::Response<Self::GrpcResponse>, tonic::Status> {
        unary_call(channel, self.transaction.data.method_path(), wire).await
    }

    fn make_response(
        &self,
        _wire_response: Self::GrpcResponse,
        signed_bytes: Self::Context,
        node_id: AccountId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Self::Response> {
        let transaction_id = transaction_id.ok_or(Error::NoPayerAccountOrTransactionId)?;
        Ok(TransactionResponse {
            node_id,
            transaction_id,
            transaction_hash: crate::transaction_hash::TransactionHash::from_signed_transaction_bytes(&signed_bytes),
        })
    }

    fn make_error_precheck(&self, status: Status, transaction_id: Option<TransactionId>) -> Error {
        match transaction_id {
            Some(id) => Error::TransactionPreCheckStatus { status, transaction_id: Box::new(id), cost: None },
            None => Error::TransactionNoIdPreCheckStatus { status },
        }
    }

    fn response_precheck_status(&self, wire_response: &Self::GrpcResponse) -> i32 {
        wire_response.node_transaction_precheck_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_id::AccountId;
    use crate::timestamp::Timestamp;
    use crate::transaction::transfer::TransferTransaction;

    fn zero_key() -> crate::key::PrivateKey {
        crate::key::PrivateKey::from_ed25519_bytes(&[0u8; 32]).unwrap()
    }

    #[test]
    fn e1_transfer_to_bytes_two_entries_with_equal_bodies() {
        let mut tx = TransferTransaction::new()
            .with_hbar_transfer(AccountId::new(0, 0, 1001), Hbar::from_tinybars(10))
            .with_hbar_transfer(AccountId::new(0, 0, 1000), Hbar::from_tinybars(-10))
            .with_transaction_id(TransactionId::new(AccountId::new(0, 0, 1000), Timestamp { seconds: 1_700_000_000, nanos: 0 }))
            .with_node_account_ids(vec![AccountId::new(0, 0, 3), AccountId::new(0, 0, 4)])
            .freeze()
            .unwrap();
        tx.sign(Signer::from_private_key(zero_key())).unwrap();

        let list_bytes = tx.to_bytes().unwrap();
        let list = services::TransactionList::decode(list_bytes.as_slice()).unwrap();
        assert_eq!(list.transaction_list.len(), 2);

        let bodies: Vec<services::TransactionBody> = list
            .transaction_list
            .iter()
            .map(|t| {
                let signed = services::SignedTransaction::decode(t.signed_transaction_bytes.as_slice()).unwrap();
                services::TransactionBody::decode(signed.body_bytes.as_slice()).unwrap()
            })
            .collect();

        let mut a = bodies[0].clone();
        let mut b = bodies[1].clone();
        a.node_account_id = None;
        b.node_account_id = None;
        assert_eq!(a, b);
    }

    #[test]
    fn signer_idempotence_sigmap_has_one_entry() {
        let mut tx = TransferTransaction::new()
            .with_hbar_transfer(AccountId::new(0, 0, 1001), Hbar::from_tinybars(5))
            .with_hbar_transfer(AccountId::new(0, 0, 1000), Hbar::from_tinybars(-5))
            .with_transaction_id(TransactionId::new(AccountId::new(0, 0, 1000), Timestamp::now()))
            .with_node_account_ids(vec![AccountId::new(0, 0, 3)])
            .freeze()
            .unwrap();
        let key = zero_key();
        tx.sign(Signer::from_private_key(key.clone())).unwrap();
        tx.sign(Signer::from_private_key(key)).unwrap();

        let list_bytes = tx.to_bytes().unwrap();
        let list = services::TransactionList::decode(list_bytes.as_slice()).unwrap();
        let signed = services::SignedTransaction::decode(list.transaction_list[0].signed_transaction_bytes.as_slice()).unwrap();
        assert_eq!(signed.sig_map.unwrap().sig_pair.len(), 1);
    }

    #[test]
    fn freeze_without_client_requires_explicit_node_ids() {
        let tx = TransferTransaction::new()
            .with_transaction_id(TransactionId::new(AccountId::new(0, 0, 1000), Timestamp::now()))
            .freeze();
        assert!(tx.is_err());
    }
}
