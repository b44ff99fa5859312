//! `TransactionGetReceipt`: a free query over a previously submitted
//! transaction's consensus outcome.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tonic::transport::Channel;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::proto::grpc::unary_call;
use crate::query::{Query, QueryExecute};
use crate::services;
use crate::transaction_id::TransactionId;
use crate::transaction_receipt::Receipt;

#[derive(Clone, Default)]
struct TransactionReceiptData {
    transaction_id: Option<TransactionId>,
}

#[async_trait]
impl QueryExecute for TransactionReceiptData {
    type Output = Receipt;

    fn requires_payment(&self) -> bool {
        false
    }

    fn to_query(&self, header: services::QueryHeader) -> services::Query {
        let transaction_id = self.transaction_id.clone().map(crate::transaction::to_proto_transaction_id);
        services::Query {
            query: Some(services::query::Query::TransactionGetReceipt(services::TransactionGetReceiptQuery {
                header: Some(header),
                transaction_id,
            })),
        }
    }

    /// A precheck-`OK` answer still means "keep polling" if the receipt it
    /// carries hasn't reached consensus yet (status `UNKNOWN`).
    fn should_retry_response(&self, response: &services::Response) -> bool {
        matches!(
            &response.response,
            Some(services::response::Response::TransactionGetReceipt(r))
                if r.receipt.as_ref().map(|receipt| receipt.status).unwrap_or(0) == 0
        )
    }

    async fn execute_grpc(
        &self,
        channel: Channel,
        query: services::Query,
    ) -> std::result::Result<tonic::Response<services::Response>, tonic::Status> {
        unary_call(channel, "/proto.CryptoService/getTransactionReceipts", query).await
    }

    fn response_header<'a>(&self, response: &'a services::Response) -> Option<&'a services::ResponseHeader> {
        match &response.response {
            Some(services::response::Response::TransactionGetReceipt(r)) => r.header.as_ref(),
            _ => None,
        }
    }

    fn map_response(&self, response: services::Response) -> Result<Self::Output> {
        match response.response {
            Some(services::response::Response::TransactionGetReceipt(r)) => {
                let receipt = r.receipt.ok_or_else(|| Error::FromProtobuf("missing receipt".into()))?;
                Ok(Receipt { status: receipt.status.into() })
            }
            _ => Err(Error::FromProtobuf("expected TransactionGetReceipt response".into())),
        }
    }
}

/// Query for a transaction's receipt.
pub struct TransactionReceiptQuery {
    inner: Query<TransactionReceiptData>,
}

impl TransactionReceiptQuery {
    pub fn new() -> Self {
        Self { inner: Query::new(TransactionReceiptData::default()) }
    }

    pub fn with_transaction_id(mut self, id: TransactionId) -> Self {
        self.inner.data.transaction_id = Some(id);
        self
    }

    pub async fn execute(&self, client: &Client, timeout: Option<StdDuration>) -> Result<Receipt> {
        self.inner.execute(client, timeout).await
    }
}

impl Default for TransactionReceiptQuery {
    fn default() -> Self {
        Self::new()
    }
}
