//! The client facade (spec §4.1, module H): owns the network, the
//! operator, and cross-request defaults.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration as StdDuration;

use tonic::transport::Channel;
use tracing::{debug, warn};

use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::key::PrivateKey;
use crate::network::Network;
use crate::query::account_balance::AccountBalanceQuery;
use crate::signer::Signer;
use crate::transaction_id::TransactionId;

/// A (payer account, signer) pair. Without one, a request must carry both
/// an explicit transaction id and an explicit payer signer (spec §3).
#[derive(Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub signer: Signer,
}

/// Owns the network routing table, the default payer, and the defaults
/// every request snapshots at freeze/execute time.
pub struct Client {
    network: Mutex<Network>,
    mirror_network: Mutex<Option<Channel>>,
    operator: RwLock<Option<Operator>>,
    auto_validate_checksums: AtomicBool,
    default_max_transaction_fee: Mutex<Option<Hbar>>,
    default_max_query_payment: Mutex<Option<Hbar>>,
}

impl Client {
    fn from_network(network: Network) -> Self {
        Self {
            network: Mutex::new(network),
            mirror_network: Mutex::new(None),
            operator: RwLock::new(None),
            auto_validate_checksums: AtomicBool::new(false),
            default_max_transaction_fee: Mutex::new(None),
            default_max_query_payment: Mutex::new(None),
        }
    }

    /// One of the three fixed presets: `"mainnet"`, `"testnet"`, `"previewnet"`.
    pub fn for_name(name: &str) -> Result<Self> {
        Ok(Self::from_network(Network::for_name(name)?))
    }

    pub fn for_mainnet() -> Self {
        Self::from_network(Network::for_mainnet())
    }

    pub fn for_testnet() -> Self {
        Self::from_network(Network::for_testnet())
    }

    pub fn for_previewnet() -> Self {
        Self::from_network(Network::for_previewnet())
    }

    pub(crate) fn network(&self) -> &Mutex<Network> {
        &self.network
    }

    pub fn ledger_id(&self) -> crate::ledger_id::LedgerId {
        self.network.lock().expect("network mutex poisoned").ledger_id().clone()
    }

    /// Replace the operator. Idempotent; requests already frozen keep the
    /// operator they snapshotted.
    pub fn set_operator(&self, account_id: AccountId, private_key: PrivateKey) {
        let mut operator = self.operator.write().expect("operator lock poisoned");
        *operator = Some(Operator { account_id, signer: Signer::from_private_key(private_key) });
    }

    pub fn operator(&self) -> Option<Operator> {
        self.operator.read().expect("operator lock poisoned").clone()
    }

    pub fn set_auto_validate_checksums(&self, enabled: bool) {
        self.auto_validate_checksums.store(enabled, Ordering::Relaxed);
    }

    pub fn auto_validate_checksums(&self) -> bool {
        self.auto_validate_checksums.load(Ordering::Relaxed)
    }

    pub fn set_default_max_transaction_fee(&self, fee: Hbar) {
        *self.default_max_transaction_fee.lock().expect("fee lock poisoned") = Some(fee);
    }

    pub fn default_max_transaction_fee(&self) -> Option<Hbar> {
        *self.default_max_transaction_fee.lock().expect("fee lock poisoned")
    }

    pub fn set_default_max_query_payment(&self, payment: Hbar) {
        *self.default_max_query_payment.lock().expect("payment lock poisoned") = Some(payment);
    }

    pub fn default_max_query_payment(&self) -> Option<Hbar> {
        *self.default_max_query_payment.lock().expect("payment lock poisoned")
    }

    /// A transaction id whose payer is the operator and whose valid-start
    /// is now; fails when there is no operator (spec §4.1).
    pub fn generate_transaction_id(&self) -> Result<TransactionId> {
        let operator = self.operator().ok_or(Error::NoPayerAccountOrTransactionId)?;
        Ok(TransactionId::generate(operator.account_id))
    }

    /// Execute a lightweight account-balance query restricted to a single
    /// node; success updates that node's health and last-pinged instant.
    pub async fn ping(&self, node_id: AccountId, timeout: Option<StdDuration>) -> Result<()> {
        let query = AccountBalanceQuery::new()
            .with_account_id(node_id.clone())
            .with_node_account_ids(vec![node_id.clone()]);
        match query.execute(self, timeout).await {
            Ok(_) => {
                debug!(%node_id, "ping succeeded");
                Ok(())
            }
            Err(error) => {
                warn!(%node_id, %error, "ping failed");
                Err(error)
            }
        }
    }

    /// Fan out `ping` over every node concurrently, each staggered by a
    /// small random jitter so a `ping_all` call doesn't open every node's
    /// connection in the same instant.
    pub async fn ping_all(&self, timeout: Option<StdDuration>) {
        let node_ids = self.network.lock().expect("network mutex poisoned").node_account_ids();
        let pings = node_ids.into_iter().map(|node_id| async move {
            tokio::time::sleep(crate::network::ping_jitter()).await;
            self.ping(node_id, timeout).await
        });
        futures::future::join_all(pings).await;
    }

    /// Lazily open (and cache) a channel to this network preset's
    /// mirror-node gRPC endpoint. No subscription API is built on top of
    /// it (spec §1 non-goal); this exists purely so the handle is
    /// available the moment one is needed.
    pub(crate) fn mirror_channel(&self) -> Option<Channel> {
        let mut mirror = self.mirror_network.lock().expect("mirror network mutex poisoned");
        if let Some(channel) = mirror.as_ref() {
            return Some(channel.clone());
        }

        let endpoint = self.network.lock().expect("network mutex poisoned").mirror_endpoint().to_string();
        let channel = tonic::transport::Endpoint::from_shared(format!("https://{endpoint}"))
            .ok()
            .map(|e| e.connect_lazy());
        *mirror = channel.clone();
        channel
    }
}
