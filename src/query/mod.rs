//! The query payment protocol (spec §4.5, module F): cost phase, payment
//! phase, and the `Query<D>` builder shared by every concrete query type.

pub(crate) mod account_balance;
pub(crate) mod transaction_receipt;
pub(crate) mod transaction_record;

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tonic::transport::Channel;

use crate::client::Client;
use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::execute::Executable;
use crate::hbar::Hbar;
use crate::services;
use crate::timestamp::Duration;
use crate::transaction::transfer::TransferTransactionData;
use crate::transaction::Transaction;
use crate::transaction_id::TransactionId;

/// Default validity window for a query's payment transaction (spec §4.5).
const PAYMENT_TRANSACTION_VALID_DURATION: Duration = Duration { seconds: 120, nanos: 0 };

const RESPONSE_TYPE_ANSWER_ONLY: i32 = 0;
const RESPONSE_TYPE_COST_ANSWER: i32 = 1;

/// Per-concrete-type behavior a [`Query`] delegates to (the query
/// equivalent of [`crate::transaction::TransactionExecute`]).
#[async_trait]
pub(crate) trait QueryExecute: Send + Sync {
    type Output: Send;

    /// Free queries (account balance, transaction receipt) skip the
    /// cost/payment phases entirely.
    fn requires_payment(&self) -> bool;

    /// Some paid queries (`TransactionRecordQuery`) need consensus to
    /// have already been reached before their cost is meaningful; such
    /// types run a silent wait-for-receipt pass ahead of the cost phase.
    /// Default is a no-op; errors are swallowed since this is only a
    /// best-effort nudge, not the request itself.
    async fn wait_for_receipt_if_needed(&self, _client: &Client, _timeout: Option<StdDuration>) {}

    fn to_query(&self, header: services::QueryHeader) -> services::Query;

    /// Whether a precheck-`OK` response should still be retried rather than
    /// treated as final (spec §4.5's receipt-pending case: a `TRANSACTION_GET_RECEIPT`
    /// answer can come back `OK` at the header level while the receipt it
    /// carries is still `UNKNOWN`, since consensus hasn't been reached yet).
    /// Default is never, since most queries have no such two-layer status.
    fn should_retry_response(&self, _response: &services::Response) -> bool {
        false
    }

    async fn execute_grpc(
        &self,
        channel: Channel,
        query: services::Query,
    ) -> std::result::Result<tonic::Response<services::Response>, tonic::Status>;

    fn response_header<'a>(&self, response: &'a services::Response) -> Option<&'a services::ResponseHeader>;

    fn map_response(&self, response: services::Response) -> Result<Self::Output>;

    fn default_max_query_payment(&self) -> Hbar {
        Hbar::new(1)
    }
}

/// A query, generic over its concrete payload `D`. Carries the fields
/// every query shares: an optional node restriction, an optional
/// already-known payment amount, and a per-query payment cap.
pub struct Query<D: QueryExecute> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    payment_amount: Option<Hbar>,
    max_query_payment: Option<Hbar>,
}

impl<D: QueryExecute> Query<D> {
    pub(crate) fn new(data: D) -> Self {
        Self { data, node_account_ids: None, payment_amount: None, max_query_payment: None }
    }

    pub fn with_node_account_ids(mut self, ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(ids);
        self
    }

    /// Skip the cost phase by fixing the payment amount directly.
    pub fn with_payment_amount(mut self, amount: Hbar) -> Self {
        self.payment_amount = Some(amount);
        self
    }

    pub fn with_max_query_payment(mut self, amount: Hbar) -> Self {
        self.max_query_payment = Some(amount);
        self
    }

    fn max_payment(&self, client: &Client) -> Hbar {
        self.max_query_payment
            .or_else(|| client.default_max_query_payment())
            .unwrap_or_else(|| self.data.default_max_query_payment())
    }

    /// Run the two-phase protocol (or a single free-query pass) and
    /// return the decoded response.
    pub async fn execute(&self, client: &Client, timeout: Option<StdDuration>) -> Result<D::Output> {
        if !self.data.requires_payment() {
            let attempt = QueryAttempt { query: self, response_type: RESPONSE_TYPE_ANSWER_ONLY, payment: None };
            return crate::execute::execute(client, &attempt, timeout).await;
        }

        let cost = match self.payment_amount {
            Some(amount) => amount,
            None => {
                self.data.wait_for_receipt_if_needed(client, timeout).await;
                let cost_attempt =
                    QueryAttempt { query: self, response_type: RESPONSE_TYPE_COST_ANSWER, payment: None };
                crate::execute::execute(client, &CostOnly { inner: cost_attempt }, timeout).await?
            }
        };

        let max_payment = self.max_payment(client);
        if cost > max_payment {
            return Err(Error::MaxQueryPaymentExceeded { query_cost: cost, max_query_payment: max_payment });
        }

        let attempt = QueryAttempt { query: self, response_type: RESPONSE_TYPE_ANSWER_ONLY, payment: Some(cost) };
        crate::execute::execute(client, &attempt, timeout).await
    }
}

/// A thin executable view used only to run the cost phase and surface
/// the cost as its own `Response`, separate from `D::Output`.
struct CostOnly<'a, D: QueryExecute> {
    inner: QueryAttempt<'a, D>,
}

#[async_trait]
impl<'a, D: QueryExecute> Executable for CostOnly<'a, D> {
    type GrpcRequest = services::Query;
    type GrpcResponse = services::Response;
    type Context = ();
    type Response = Hbar;

    fn node_account_ids(&self) -> Option<Vec<AccountId>> {
        self.inner.node_account_ids()
    }

    fn explicit_transaction_id(&self) -> Option<TransactionId> {
        self.inner.explicit_transaction_id()
    }

    fn requires_transaction_id(&self) -> bool {
        self.inner.requires_transaction_id()
    }

    fn should_retry_precheck(&self, status: i32) -> bool {
        self.inner.should_retry_precheck(status)
    }

    async fn make_request(
        &self,
        client: &Client,
        transaction_id: Option<TransactionId>,
        node_id: AccountId,
    ) -> Result<(Self::GrpcRequest, Self::Context)> {
        self.inner.make_request(client, transaction_id, node_id).await
    }

    async fn execute(
        &self,
        channel: Channel,
        wire: Self::GrpcRequest,
    ) -> std::result::Result<tonic::Response<Self::GrpcResponse>, tonic::Status> {
        self.inner.execute(channel, wire).await
    }

    fn make_response(
        &self,
        wire_response: Self::GrpcResponse,
        _context: Self::Context,
        _node_id: AccountId,
        _transaction_id: Option<TransactionId>,
    ) -> Result<Self::Response> {
        let header = self
            .inner
            .query
            .data
            .response_header(&wire_response)
            .ok_or_else(|| Error::FromProtobuf("response missing header".into()))?;
        Ok(Hbar::from_tinybars(header.cost as i64))
    }

    fn make_error_precheck(&self, status: crate::error::Status, transaction_id: Option<TransactionId>) -> Error {
        self.inner.make_error_precheck(status, transaction_id)
    }

    fn response_precheck_status(&self, wire_response: &Self::GrpcResponse) -> i32 {
        self.inner.response_precheck_status(wire_response)
    }
}

/// A single attempt of a [`Query`]: one cost-phase or answer-phase call.
struct QueryAttempt<'a, D: QueryExecute> {
    query: &'a Query<D>,
    response_type: i32,
    payment: Option<Hbar>,
}

#[async_trait]
impl<'a, D: QueryExecute> Executable for QueryAttempt<'a, D> {
    type GrpcRequest = services::Query;
    type GrpcResponse = services::Response;
    type Context = ();
    type Response = D::Output;

    fn node_account_ids(&self) -> Option<Vec<AccountId>> {
        self.query.node_account_ids.clone()
    }

    fn explicit_transaction_id(&self) -> Option<TransactionId> {
        None
    }

    fn requires_transaction_id(&self) -> bool {
        false
    }

    fn should_retry(&self, response: &Self::GrpcResponse) -> bool {
        self.query.data.should_retry_response(response)
    }

    async fn make_request(
        &self,
        client: &Client,
        _transaction_id: Option<TransactionId>,
        node_id: AccountId,
    ) -> Result<(Self::GrpcRequest, Self::Context)> {
        let payment = match self.payment {
            Some(amount) => Some(build_payment_transaction(client, node_id, amount)?),
            None if self.query.data.requires_payment() => Some(build_payment_transaction(client, node_id, Hbar::ZERO)?),
            None => None,
        };

        let header = services::QueryHeader { payment, response_type: self.response_type };
        Ok((self.query.data.to_query(header), ()))
    }

    async fn execute(
        &self,
        channel: Channel,
        wire: Self::GrpcRequest,
    ) -> std::result::Result<tonic::Response<Self::GrpcResponse>, tonic::Status> {
        self.query.data.execute_grpc(channel, wire).await
    }

    fn make_response(
        &self,
        wire_response: Self::GrpcResponse,
        _context: Self::Context,
        _node_id: AccountId,
        _transaction_id: Option<TransactionId>,
    ) -> Result<Self::Response> {
        self.query.data.map_response(wire_response)
    }

    fn make_error_precheck(&self, status: crate::error::Status, _transaction_id: Option<TransactionId>) -> Error {
        if self.query.data.requires_payment() {
            Error::QueryPaymentPreCheckStatus {
                status,
                transaction_id: Box::new(TransactionId::new(
                    AccountId::new(0, 0, 0),
                    crate::timestamp::Timestamp::now(),
                )),
            }
        } else {
            Error::QueryNoPaymentPreCheckStatus { status }
        }
    }

    fn response_precheck_status(&self, wire_response: &Self::GrpcResponse) -> i32 {
        self.query
            .data
            .response_header(wire_response)
            .map(|header| header.node_transaction_precheck_code)
            .unwrap_or(-1)
    }
}

/// Build and sign the inner transfer transaction carried as a query's
/// payment: a positive amount to `node_id`, a negative amount from the
/// operator, both `is_approval = false` (spec §4.5).
fn build_payment_transaction(client: &Client, node_id: AccountId, amount: Hbar) -> Result<services::Transaction> {
    let operator = client.operator().ok_or(Error::NoPayerAccountOrTransactionId)?;
    let transaction_id = TransactionId::generate(operator.account_id.clone());

    let transfers = vec![
        (node_id.clone(), amount),
        (operator.account_id, amount.checked_neg().unwrap_or(Hbar::ZERO)),
    ];
    let data = TransferTransactionData::from_transfers(transfers);

    let mut built = Transaction::new(data)
        .with_transaction_id(transaction_id)
        .with_transaction_valid_duration(PAYMENT_TRANSACTION_VALID_DURATION)
        .freeze_with_node_ids(vec![node_id.clone()])?;
    built.sign(operator.signer)?;

    built.to_signed_transaction_for_node(node_id)
}
