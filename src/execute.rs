//! The generic retry/dispatch loop (spec §4.3, module E) — the nucleus
//! shared by queries, single- and multi-chunk transactions, and pings.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::Status as GrpcStatus;

use crate::client::Client;
use crate::entity_id::AccountId;
use crate::error::{Error, Result, Status};
use crate::proto::services::response_code;
use crate::transaction_id::TransactionId;

/// Default total wall-clock budget for one `execute` call.
pub(crate) const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10 * 60);

/// The capability the engine drives one attempt at a time. Implemented by
/// every concrete transaction and query type (directly, or through the
/// generic `Transaction<D>` / `Query<D>` wrappers).
#[async_trait]
pub(crate) trait Executable: Send + Sync {
    type GrpcRequest: prost::Message + Clone + Send + Sync + 'static;
    type GrpcResponse: prost::Message + Default + Clone + Send + Sync + 'static;
    /// Per-attempt bookkeeping threaded from `make_request` to `make_response`.
    type Context: Send;
    type Response: Send;

    /// Explicit node subset, or `None` to sample from the healthy pool.
    fn node_account_ids(&self) -> Option<Vec<AccountId>>;

    fn explicit_transaction_id(&self) -> Option<TransactionId>;

    fn requires_transaction_id(&self) -> bool;

    fn should_retry_precheck(&self, _status: i32) -> bool {
        false
    }

    fn should_retry(&self, _response: &Self::GrpcResponse) -> bool {
        false
    }

    /// Build the per-attempt wire request for `node_id`.
    async fn make_request(
        &self,
        client: &Client,
        transaction_id: Option<TransactionId>,
        node_id: AccountId,
    ) -> Result<(Self::GrpcRequest, Self::Context)>;

    /// Invoke the correct gRPC method.
    async fn execute(
        &self,
        channel: Channel,
        wire: Self::GrpcRequest,
    ) -> std::result::Result<tonic::Response<Self::GrpcResponse>, GrpcStatus>;

    fn make_response(
        &self,
        wire_response: Self::GrpcResponse,
        context: Self::Context,
        node_id: AccountId,
        transaction_id: Option<TransactionId>,
    ) -> Result<Self::Response>;

    fn make_error_precheck(&self, status: Status, transaction_id: Option<TransactionId>) -> Error;

    fn response_precheck_status(&self, wire_response: &Self::GrpcResponse) -> i32;
}

enum Decision<R> {
    Success(R),
    /// Keep trying the next sampled node, no backoff.
    ContinueNoBackoff(Error),
    /// Exhaust the inner loop and back off before resampling.
    BreakForBackoff(Error),
    Fatal(Error),
    /// `TRANSACTION_EXPIRED` with no explicit id: regenerate and keep going.
    RegenerateTransactionId(Error),
}

fn classify<E: Executable>(
    executable: &E,
    wire_response: &E::GrpcResponse,
    transaction_id: Option<TransactionId>,
    explicit_transaction_id: bool,
) -> Decision<()> {
    let status = executable.response_precheck_status(wire_response);

    if status < 0 {
        return Decision::Fatal(Error::ResponseStatusUnrecognized(status));
    }

    if status == response_code::OK {
        if executable.should_retry(wire_response) {
            return Decision::BreakForBackoff(executable.make_error_precheck(Status(status), transaction_id));
        }
        return Decision::Success(());
    }

    if status == response_code::BUSY || status == response_code::PLATFORM_NOT_ACTIVE {
        return Decision::ContinueNoBackoff(executable.make_error_precheck(Status(status), transaction_id));
    }

    if status == response_code::TRANSACTION_EXPIRED {
        if explicit_transaction_id {
            return Decision::Fatal(executable.make_error_precheck(Status(status), transaction_id));
        }
        return Decision::RegenerateTransactionId(executable.make_error_precheck(Status(status), transaction_id));
    }

    if executable.should_retry_precheck(status) {
        return Decision::BreakForBackoff(executable.make_error_precheck(Status(status), transaction_id));
    }

    Decision::Fatal(executable.make_error_precheck(Status(status), transaction_id))
}

/// Run `executable` to completion against `client`, retrying across the
/// node fleet per the decision table until success, a fatal error, or the
/// timeout budget is exhausted.
pub(crate) async fn execute<E: Executable>(
    client: &Client,
    executable: &E,
    timeout: Option<StdDuration>,
) -> Result<E::Response> {
    let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
    let mut backoff = crate::backoff::ExponentialBackoff::default_for_timeout(timeout);

    let explicit_transaction_id = executable.explicit_transaction_id();
    let mut transaction_id = match explicit_transaction_id.clone() {
        Some(id) => Some(id),
        None if executable.requires_transaction_id() => Some(client.generate_transaction_id()?),
        None => None,
    };

    let mut last_error: Option<Error> = None;

    loop {
        let explicit_node_ids = executable.node_account_ids();
        let sampled: Vec<usize> = {
            let network = client.network().lock().expect("network mutex poisoned");
            match &explicit_node_ids {
                Some(ids) => {
                    let indexes = network.node_indexes_for_ids(ids)?;
                    network.shuffled(&indexes)
                }
                None => {
                    let healthy = network.healthy_node_indexes();
                    network.sample_healthy(&healthy)
                }
            }
        };

        'inner: for index in sampled {
            let (node_id, recently_pinged) = {
                let network = client.network().lock().expect("network mutex poisoned");
                (network.account_id_at(index), network.node_recently_pinged(index, std::time::Instant::now()))
            };

            if explicit_node_ids.is_none() && !recently_pinged {
                let short_timeout = StdDuration::from_secs(10);
                if client.ping(node_id.clone(), Some(short_timeout)).await.is_err() {
                    continue 'inner;
                }
            }

            let channel = {
                let network = client.network().lock().expect("network mutex poisoned");
                network.channel_at(index)
            };
            let Some(channel) = channel else { continue 'inner };

            let (wire, context) = executable.make_request(client, transaction_id.clone(), node_id.clone()).await?;

            let wire_response = match executable.execute(channel, wire).await {
                Ok(response) => response,
                Err(status) => {
                    if matches!(
                        status.code(),
                        tonic::Code::Unavailable | tonic::Code::ResourceExhausted
                    ) {
                        let mut network = client.network().lock().expect("network mutex poisoned");
                        network.mark_node_unhealthy(index, std::time::Instant::now());
                        last_error = Some(Error::GrpcStatus(status));
                        continue 'inner;
                    }
                    return Err(Error::GrpcStatus(status));
                }
            };

            {
                let mut network = client.network().lock().expect("network mutex poisoned");
                network.mark_node_used(index, std::time::Instant::now());
            }

            let response_ref = wire_response.get_ref().clone();
            match classify(executable, &response_ref, transaction_id.clone(), explicit_transaction_id.is_some()) {
                Decision::Success(()) => {
                    {
                        let mut network = client.network().lock().expect("network mutex poisoned");
                        network.mark_node_healthy(index);
                    }
                    let inner = wire_response.into_inner();
                    return executable.make_response(inner, context, node_id, transaction_id);
                }
                Decision::ContinueNoBackoff(error) => {
                    last_error = Some(error);
                    continue 'inner;
                }
                Decision::BreakForBackoff(error) => {
                    last_error = Some(error);
                    break 'inner;
                }
                Decision::RegenerateTransactionId(error) => {
                    last_error = Some(error);
                    if let Some(id) = transaction_id.clone() {
                        transaction_id = Some(id.regenerate());
                    }
                    continue 'inner;
                }
                Decision::Fatal(error) => return Err(error),
            }
        }

        match backoff.next_backoff() {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                let cause = last_error.unwrap_or(Error::ResponseStatusUnrecognized(-1));
                return Err(Error::TimedOut(Box::new(cause)));
            }
        }
    }
}
