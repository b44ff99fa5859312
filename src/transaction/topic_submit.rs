//! `ConsensusSubmitMessage`: the one transaction type this crate chunks
//! automatically when its message exceeds a single body's capacity
//! (spec §4.4).

use crate::entity_id::TopicId;
use crate::hbar::Hbar;
use crate::services;
use crate::transaction::chunked::ChunkConfig;
use crate::transaction::{ChunkPiece, Transaction, TransactionData};

#[derive(Clone, Default)]
pub(crate) struct TopicMessageSubmitData {
    topic_id: Option<TopicId>,
    message: Vec<u8>,
}

impl TransactionData for TopicMessageSubmitData {
    fn to_body_data(&self, chunk: Option<ChunkPiece<'_>>) -> services::transaction_body::Data {
        let (message, chunk_info) = match chunk {
            Some(piece) => (piece.message.to_vec(), piece.chunk_info),
            None => (self.message.clone(), None),
        };
        services::transaction_body::Data::ConsensusSubmitMessage(services::ConsensusSubmitMessageTransactionBody {
            topic_id: self.topic_id.map(|id| services::TopicId {
                shard_num: id.shard as i64,
                realm_num: id.realm as i64,
                topic_num: id.num as i64,
            }),
            message,
            chunk_info,
        })
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(1)
    }

    fn method_path(&self) -> &'static str {
        "/proto.ConsensusService/submitMessage"
    }

    fn chunkable_payload(&self) -> Option<&[u8]> {
        Some(&self.message)
    }
}

/// A message submitted to a topic's consensus stream. Automatically
/// split across [`ChunkConfig::default`] chunks when the message exceeds
/// one chunk's size; every chunk carries the same, original transaction
/// id per spec's chunked-id invariant.
pub type TopicMessageSubmitTransaction = Transaction<TopicMessageSubmitData>;

impl TopicMessageSubmitTransaction {
    pub fn new() -> Self {
        Transaction::new(TopicMessageSubmitData::default()).with_chunk_config_defaulted()
    }

    pub fn with_topic_id(mut self, topic_id: TopicId) -> Self {
        self.data_mut().topic_id = Some(topic_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.data_mut().message = message.into();
        self
    }
}

impl Default for TopicMessageSubmitTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction<TopicMessageSubmitData> {
    fn with_chunk_config_defaulted(self) -> Self {
        let ChunkConfig { chunk_size, max_chunks } = ChunkConfig::default();
        self.with_chunk_config(chunk_size, max_chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_id::AccountId;
    use crate::timestamp::Timestamp;
    use crate::transaction_id::TransactionId;

    #[test]
    fn e2_long_message_splits_into_multiple_chunks_same_initial_id() {
        let message = vec![7u8; 2500];
        let tx = TopicMessageSubmitTransaction::new()
            .with_topic_id(TopicId::new(0, 0, 77))
            .with_message(message)
            .with_transaction_id(TransactionId::new(AccountId::new(0, 0, 1000), Timestamp { seconds: 1_700_000_000, nanos: 0 }))
            .with_node_account_ids(vec![AccountId::new(0, 0, 3)])
            .freeze()
            .unwrap();

        let chunks = tx.to_bytes().unwrap();
        let list = {
            use prost::Message as _;
            services::TransactionList::decode(chunks.as_slice()).unwrap()
        };
        assert_eq!(list.transaction_list.len(), 3);
    }
}
