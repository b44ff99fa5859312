//! The value returned by a successful [`crate::transaction::Transaction::execute`]
//! (spec §3 supplemental feature list): enough to poll for the receipt
//! without re-deriving the transaction id.

use std::time::Duration as StdDuration;

use crate::client::Client;
use crate::entity_id::AccountId;
use crate::error::Result;
use crate::query::transaction_receipt::TransactionReceiptQuery;
use crate::transaction_hash::TransactionHash;
use crate::transaction_id::TransactionId;
use crate::transaction_receipt::Receipt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    pub node_id: AccountId,
    pub transaction_id: TransactionId,
    pub transaction_hash: TransactionHash,
}

impl TransactionResponse {
    /// Poll `TransactionGetReceipt` for this request's outcome.
    pub async fn get_receipt(&self, client: &Client, timeout: Option<StdDuration>) -> Result<Receipt> {
        TransactionReceiptQuery::new().with_transaction_id(self.transaction_id.clone()).execute(client, timeout).await
    }
}
