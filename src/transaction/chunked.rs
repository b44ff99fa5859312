//! Chunking knobs for payloads too large for a single transaction body
//! (spec §4.4): currently only `TopicMessageSubmitTransaction` overrides
//! `TransactionData::chunkable_payload`.

/// Default chunk size in bytes, matching the network's per-transaction
/// message size limit for a single `ConsensusSubmitMessage` body.
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default cap on the number of chunks a single submit may split into.
pub(crate) const DEFAULT_MAX_CHUNKS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ChunkConfig {
    pub chunk_size: usize,
    pub max_chunks: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, max_chunks: DEFAULT_MAX_CHUNKS }
    }
}
