//! `TransactionGetRecord`: a paid query exercising the full cost/payment
//! protocol, including the "cost requires receipt first" hook (spec
//! §4.5) since the record's fee is only meaningful once consensus has
//! been reached.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tonic::transport::Channel;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::proto::grpc::unary_call;
use crate::query::{Query, QueryExecute};
use crate::services;
use crate::timestamp::Timestamp;
use crate::transaction_id::TransactionId;
use crate::transaction_receipt::{Receipt, ReceiptStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub receipt: Receipt,
    pub transaction_hash: Vec<u8>,
    pub consensus_timestamp: Option<Timestamp>,
    pub transaction_id: TransactionId,
    pub memo: String,
    pub transaction_fee: Hbar,
}

#[derive(Clone, Default)]
struct TransactionRecordData {
    transaction_id: Option<TransactionId>,
}

#[async_trait]
impl QueryExecute for TransactionRecordData {
    type Output = TransactionRecord;

    fn requires_payment(&self) -> bool {
        true
    }

    async fn wait_for_receipt_if_needed(&self, client: &Client, timeout: Option<StdDuration>) {
        if let Some(transaction_id) = self.transaction_id.clone() {
            let _ = crate::query::transaction_receipt::TransactionReceiptQuery::new()
                .with_transaction_id(transaction_id)
                .execute(client, timeout)
                .await;
        }
    }

    fn to_query(&self, header: services::QueryHeader) -> services::Query {
        let transaction_id = self.transaction_id.clone().map(crate::transaction::to_proto_transaction_id);
        services::Query {
            query: Some(services::query::Query::TransactionGetRecord(services::TransactionGetRecordQuery {
                header: Some(header),
                transaction_id,
            })),
        }
    }

    async fn execute_grpc(
        &self,
        channel: Channel,
        query: services::Query,
    ) -> std::result::Result<tonic::Response<services::Response>, tonic::Status> {
        unary_call(channel, "/proto.CryptoService/getTxRecordByTxID", query).await
    }

    fn response_header<'a>(&self, response: &'a services::Response) -> Option<&'a services::ResponseHeader> {
        match &response.response {
            Some(services::response::Response::TransactionGetRecord(r)) => r.header.as_ref(),
            _ => None,
        }
    }

    fn map_response(&self, response: services::Response) -> Result<Self::Output> {
        match response.response {
            Some(services::response::Response::TransactionGetRecord(r)) => {
                let record = r.transaction_record.ok_or_else(|| Error::FromProtobuf("missing transaction record".into()))?;
                let receipt = record.receipt.ok_or_else(|| Error::FromProtobuf("missing receipt".into()))?;
                let transaction_id = record
                    .transaction_id
                    .as_ref()
                    .ok_or_else(|| Error::FromProtobuf("missing transaction id".into()))
                    .and_then(crate::transaction::from_proto_transaction_id)?;
                Ok(TransactionRecord {
                    receipt: Receipt { status: receipt.status.into() },
                    transaction_hash: record.transaction_hash,
                    consensus_timestamp: record
                        .consensus_timestamp
                        .map(|t| Timestamp { seconds: t.seconds as u64, nanos: t.nanos as u32 }),
                    transaction_id,
                    memo: record.memo,
                    transaction_fee: Hbar::from_tinybars(record.transaction_fee as i64),
                })
            }
            _ => Err(Error::FromProtobuf("expected TransactionGetRecord response".into())),
        }
    }
}

/// Query for a finished transaction's full record (receipt, fee, memo,
/// consensus timestamp).
pub struct TransactionRecordQuery {
    inner: Query<TransactionRecordData>,
}

impl TransactionRecordQuery {
    pub fn new() -> Self {
        Self { inner: Query::new(TransactionRecordData::default()) }
    }

    pub fn with_transaction_id(mut self, id: TransactionId) -> Self {
        self.inner.data.transaction_id = Some(id);
        self
    }

    pub fn with_max_query_payment(mut self, amount: Hbar) -> Self {
        self.inner = self.inner.with_max_query_payment(amount);
        self
    }

    pub async fn execute(&self, client: &Client, timeout: Option<StdDuration>) -> Result<TransactionRecord> {
        self.inner.execute(client, timeout).await
    }
}

impl Default for TransactionRecordQuery {
    fn default() -> Self {
        Self::new()
    }
}
