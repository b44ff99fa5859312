//! The request catalog (module J): `from_bytes` reconstructs a frozen,
//! signed request without knowing its concrete payload type ahead of time.

use prost::Message as _;

use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::services;
use crate::transaction::transfer::TransferTransactionData;
use crate::transaction::{
    from_proto_account_id, from_proto_transaction_id, ChunkPiece, Frozen, SourcedRecord, Transaction, TransactionData,
};

/// A transaction payload recovered from wire bytes whose original
/// concrete type is erased. Re-serializes the stored body bytes
/// verbatim; never reconstructs a body from scratch, so it only needs
/// enough of the oneof decoded to answer `method_path`.
#[derive(Clone)]
pub(crate) enum AnyTransactionData {
    Transfer(TransferTransactionData),
    ConsensusSubmitMessage,
    /// A body whose `data` oneof this crate doesn't model a concrete
    /// type for; still round-trips, since sourced serialization never
    /// calls `to_body_data`.
    Unknown,
}

impl TransactionData for AnyTransactionData {
    fn to_body_data(&self, chunk: Option<ChunkPiece<'_>>) -> services::transaction_body::Data {
        match self {
            Self::Transfer(data) => data.to_body_data(chunk),
            Self::ConsensusSubmitMessage | Self::Unknown => {
                services::transaction_body::Data::CryptoTransfer(services::CryptoTransferTransactionBody::default())
            }
        }
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(1)
    }

    fn method_path(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "/proto.CryptoService/cryptoTransfer",
            Self::ConsensusSubmitMessage => "/proto.ConsensusService/submitMessage",
            Self::Unknown => "",
        }
    }
}

fn data_from_body(body: &services::TransactionBody) -> AnyTransactionData {
    match &body.data {
        Some(services::transaction_body::Data::CryptoTransfer(transfer)) => {
            let transfers = transfer
                .transfers
                .as_ref()
                .map(|list| {
                    list.account_amounts
                        .iter()
                        .filter_map(|aa| {
                            let account_id = aa.account_id.as_ref()?;
                            let account_id = from_proto_account_id(account_id).ok()?;
                            Some((account_id, Hbar::from_tinybars(aa.amount)))
                        })
                        .collect()
                })
                .unwrap_or_default();
            AnyTransactionData::Transfer(TransferTransactionData::from_transfers(transfers))
        }
        Some(services::transaction_body::Data::ConsensusSubmitMessage(_)) => AnyTransactionData::ConsensusSubmitMessage,
        None => AnyTransactionData::Unknown,
    }
}

/// A transaction reconstructed from a prior [`Transaction::to_bytes`]
/// call: one [`SourcedRecord`] per `(node, chunk)` entry in the list,
/// each carrying its original body bytes and signatures verbatim (spec
/// §3 `TransactionSources`, testable properties 1/3/4, scenario E6).
pub type AnyTransaction = Transaction<AnyTransactionData>;

impl AnyTransaction {
    /// Reconstruct from the outer transaction-list wire format produced
    /// by `to_bytes`. Every sub-transaction's body sharing a given
    /// `transaction_id` (i.e. every node's copy of the same chunk) must be
    /// byte-equal once `node_account_id` is stripped out, per the
    /// `TransactionSources` invariant; checked below rather than trusted,
    /// since these bytes may come from an untrusted source, not only from
    /// this crate's own `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let list = services::TransactionList::decode(bytes)
            .map_err(|e| Error::FromProtobuf(format!("invalid transaction list: {e}")))?;
        if list.transaction_list.is_empty() {
            return Err(Error::FromProtobuf("empty transaction list".into()));
        }

        let mut node_account_ids = Vec::with_capacity(list.transaction_list.len());
        let mut records = Vec::with_capacity(list.transaction_list.len());
        let mut transaction_id = None;
        let mut data = AnyTransactionData::Unknown;
        let mut seen_bodies: Vec<(Option<services::TransactionId>, services::TransactionBody)> =
            Vec::with_capacity(list.transaction_list.len());

        for wire in &list.transaction_list {
            let signed = services::SignedTransaction::decode(wire.signed_transaction_bytes.as_slice())
                .map_err(|e| Error::FromProtobuf(format!("invalid signed transaction: {e}")))?;
            let body = services::TransactionBody::decode(signed.body_bytes.as_slice())
                .map_err(|e| Error::FromProtobuf(format!("invalid transaction body: {e}")))?;

            let node_id = body
                .node_account_id
                .as_ref()
                .ok_or_else(|| Error::FromProtobuf("missing node account id".into()))
                .and_then(from_proto_account_id)?;

            let mut normalized = body.clone();
            normalized.node_account_id = None;
            match seen_bodies.iter().find(|(id, _)| *id == body.transaction_id) {
                Some((_, existing)) if existing != &normalized => {
                    return Err(Error::FromProtobuf(
                        "transaction list entries sharing a transaction id have mismatched bodies".into(),
                    ));
                }
                Some(_) => {}
                None => seen_bodies.push((body.transaction_id.clone(), normalized)),
            }

            if transaction_id.is_none() {
                let id = body
                    .transaction_id
                    .as_ref()
                    .ok_or_else(|| Error::FromProtobuf("missing transaction id".into()))
                    .and_then(from_proto_transaction_id)?;
                transaction_id = Some(id);
                data = data_from_body(&body);
            }

            node_account_ids.push(node_id.clone());
            records.push(SourcedRecord {
                node_id,
                body_bytes: signed.body_bytes,
                existing_sig_pairs: signed.sig_map.map(|m| m.sig_pair).unwrap_or_default(),
            });
        }

        let mut transaction = Transaction::new(data);
        transaction.node_account_ids = Some(node_account_ids.clone());
        transaction.transaction_id = transaction_id;
        transaction.frozen = Frozen::Yes { node_ids: node_account_ids, operator: None };
        transaction.sourced = Some(records);
        Ok(transaction)
    }
}
