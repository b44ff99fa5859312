//! The network routing table and channel pool (spec §4.2, module C).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use tonic::transport::Channel;

use crate::backoff::health_penalty;
use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::ledger_id::LedgerId;

const RECENTLY_PINGED_WINDOW: Duration = Duration::from_secs(15 * 60);
const MAIN_GRPC_PORT: u16 = 50211;

/// One or more hostnames backing a single node account.
#[derive(Debug, Clone)]
pub struct NodeAddress {
    pub account_id: AccountId,
    pub endpoints: Vec<String>,
}

impl NodeAddress {
    pub fn new(account_id: AccountId, endpoints: Vec<String>) -> Self {
        Self { account_id, endpoints }
    }
}

/// A collection of persistent channels behind one node, dispatching each
/// call to a uniformly random member to spread load and avoid a
/// fleet-wide thundering herd on cold start.
struct ChannelBalancer {
    channels: Vec<Channel>,
}

impl ChannelBalancer {
    fn connect_lazy(endpoints: &[String]) -> Self {
        let channels = endpoints
            .iter()
            .filter_map(|endpoint| {
                let uri = if endpoint.contains("://") {
                    endpoint.clone()
                } else {
                    format!("http://{endpoint}")
                };
                tonic::transport::Endpoint::from_shared(uri).ok().map(|e| e.connect_lazy())
            })
            .collect();
        Self { channels }
    }

    fn pick(&self) -> Option<Channel> {
        self.channels.choose(&mut rand::thread_rng()).cloned()
    }
}

struct NodeSlot {
    account_id: AccountId,
    endpoints: Vec<String>,
    balancer: ChannelBalancer,
    healthy_until: Instant,
    last_pinged: Instant,
    consecutive_failures: u32,
}

/// Maps node account ids to endpoints, tracks per-node health and
/// last-ping instants, and hosts the channel pool (spec §3, "Network
/// routing table").
pub struct Network {
    slots: Vec<NodeSlot>,
    index_of: HashMap<AccountId, usize>,
    ledger_id: LedgerId,
    mirror_endpoint: String,
}

impl Network {
    fn from_addresses(addresses: Vec<NodeAddress>, ledger_id: LedgerId, mirror_endpoint: &str) -> Self {
        let now = Instant::now();
        let mut slots = Vec::with_capacity(addresses.len());
        let mut index_of = HashMap::with_capacity(addresses.len());
        for address in addresses {
            index_of.insert(address.account_id.clone(), slots.len());
            slots.push(NodeSlot {
                balancer: ChannelBalancer::connect_lazy(&address.endpoints),
                account_id: address.account_id,
                endpoints: address.endpoints,
                healthy_until: now,
                last_pinged: now - RECENTLY_PINGED_WINDOW,
                consecutive_failures: 0,
            });
        }
        Self { slots, index_of, ledger_id, mirror_endpoint: mirror_endpoint.to_string() }
    }

    pub fn for_mainnet() -> Self {
        Self::from_addresses(mainnet_addresses(), LedgerId::MAINNET, "mainnet-public.mirrornode.hedera.com:443")
    }

    pub fn for_testnet() -> Self {
        Self::from_addresses(testnet_addresses(), LedgerId::TESTNET, "testnet.mirrornode.hedera.com:443")
    }

    pub fn for_previewnet() -> Self {
        Self::from_addresses(previewnet_addresses(), LedgerId::PREVIEWNET, "previewnet.mirrornode.hedera.com:443")
    }

    /// Hostname:port of this preset's mirror-node gRPC endpoint (spec
    /// §4.1's "mirror-network channel handle"). No subscription API is
    /// built on top of it; opening the channel is as far as this crate goes.
    pub fn mirror_endpoint(&self) -> &str {
        &self.mirror_endpoint
    }

    /// Resolve one of the three fixed presets by name (spec §4.1,
    /// `construct-for-name`).
    pub fn for_name(name: &str) -> Result<Self> {
        match name {
            "mainnet" => Ok(Self::for_mainnet()),
            "testnet" => Ok(Self::for_testnet()),
            "previewnet" => Ok(Self::for_previewnet()),
            other => Err(Error::BasicParse(format!("unknown network name: {other}"))),
        }
    }

    pub fn ledger_id(&self) -> &LedgerId {
        &self.ledger_id
    }

    pub fn node_account_ids(&self) -> Vec<AccountId> {
        self.slots.iter().map(|slot| slot.account_id.clone()).collect()
    }

    fn is_healthy(&self, index: usize, now: Instant) -> bool {
        now >= self.slots[index].healthy_until
    }

    /// Indexes of every currently healthy node, in natural order.
    pub fn healthy_node_indexes(&self) -> Vec<usize> {
        let now = Instant::now();
        (0..self.slots.len()).filter(|&i| self.is_healthy(i, now)).collect()
    }

    /// Resolve explicit node account ids to indexes; fails on the first
    /// unrecognized id (spec's `node-indexes-for-ids`).
    pub fn node_indexes_for_ids(&self, ids: &[AccountId]) -> Result<Vec<usize>> {
        ids.iter()
            .map(|id| {
                self.index_of.get(id).copied().ok_or_else(|| {
                    Error::NodeAccountUnknown(crate::error::AccountIdDisplay(id.to_string()))
                })
            })
            .collect()
    }

    pub fn account_id_at(&self, index: usize) -> AccountId {
        self.slots[index].account_id.clone()
    }

    pub fn endpoints_at(&self, index: usize) -> &[String] {
        &self.slots[index].endpoints
    }

    /// A channel for the node at `index`, chosen uniformly at random among
    /// its endpoints.
    pub fn channel_at(&self, index: usize) -> Option<Channel> {
        self.slots[index].balancer.pick()
    }

    pub fn mark_node_used(&mut self, index: usize, now: Instant) {
        self.slots[index].last_pinged = now;
    }

    pub fn node_recently_pinged(&self, index: usize, now: Instant) -> bool {
        now.duration_since(self.slots[index].last_pinged) < RECENTLY_PINGED_WINDOW
    }

    /// Mark a node unhealthy after a transport-unavailable or BUSY-class
    /// failure, with an exponentially rising penalty (spec §4.2).
    pub fn mark_node_unhealthy(&mut self, index: usize, now: Instant) {
        let slot = &mut self.slots[index];
        slot.consecutive_failures += 1;
        slot.healthy_until = now + health_penalty(slot.consecutive_failures - 1);
    }

    /// Reset a node's failure streak after a successful call.
    pub fn mark_node_healthy(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.consecutive_failures = 0;
        slot.healthy_until = Instant::now();
    }

    /// Sample `ceil(count/3)` of the healthy pool without replacement, per
    /// the engine's one-third rule (spec §4.3 step 4).
    pub fn sample_healthy(&self, indexes: &[usize]) -> Vec<usize> {
        let sample_size = indexes.len().div_ceil(3).max(1).min(indexes.len());
        let mut pool = indexes.to_vec();
        pool.shuffle(&mut rand::thread_rng());
        pool.truncate(sample_size);
        pool
    }

    /// Sample every index, uniformly shuffled (used when the caller gave
    /// explicit node ids, which skips the health filter but still benefits
    /// from randomized attempt order).
    pub fn shuffled(&self, indexes: &[usize]) -> Vec<usize> {
        let mut pool = indexes.to_vec();
        pool.shuffle(&mut rand::thread_rng());
        pool
    }
}

fn node(shard: u64, realm: u64, num: u64, endpoints: &[&str]) -> NodeAddress {
    NodeAddress::new(
        AccountId::new(shard, realm, num),
        endpoints.iter().map(|host| format!("{host}:{MAIN_GRPC_PORT}")).collect(),
    )
}

fn mainnet_addresses() -> Vec<NodeAddress> {
    vec![
        node(0, 0, 3, &["35.237.200.180"]),
        node(0, 0, 4, &["35.186.191.247"]),
        node(0, 0, 5, &["35.192.2.25"]),
        node(0, 0, 6, &["35.199.161.108"]),
        node(0, 0, 7, &["35.203.82.240"]),
    ]
}

fn testnet_addresses() -> Vec<NodeAddress> {
    vec![
        node(0, 0, 3, &["0.testnet.hedera.com"]),
        node(0, 0, 4, &["1.testnet.hedera.com"]),
        node(0, 0, 5, &["2.testnet.hedera.com"]),
        node(0, 0, 6, &["3.testnet.hedera.com"]),
    ]
}

fn previewnet_addresses() -> Vec<NodeAddress> {
    vec![
        node(0, 0, 3, &["0.previewnet.hedera.com"]),
        node(0, 0, 4, &["1.previewnet.hedera.com"]),
        node(0, 0, 5, &["2.previewnet.hedera.com"]),
    ]
}

/// A random jitter used by [`crate::Client::ping_all`] to stagger a
/// concurrent fan-out across every node instead of dialing all of them in
/// the same instant.
pub(crate) fn ping_jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..50))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_preset_resolves_by_name() {
        let network = Network::for_name("testnet").unwrap();
        assert_eq!(network.ledger_id(), &LedgerId::TESTNET);
        assert!(!network.node_account_ids().is_empty());
    }

    #[test]
    fn unknown_name_errors() {
        assert!(Network::for_name("devnet").is_err());
    }

    #[test]
    fn all_nodes_start_healthy() {
        let network = Network::for_testnet();
        assert_eq!(network.healthy_node_indexes().len(), network.node_account_ids().len());
    }

    #[test]
    fn mark_unhealthy_removes_from_healthy_pool() {
        let mut network = Network::for_testnet();
        network.mark_node_unhealthy(0, Instant::now());
        assert!(!network.healthy_node_indexes().contains(&0));
    }

    #[test]
    fn mark_healthy_resets_penalty() {
        let mut network = Network::for_testnet();
        network.mark_node_unhealthy(0, Instant::now());
        network.mark_node_healthy(0);
        assert!(network.healthy_node_indexes().contains(&0));
    }

    #[test]
    fn node_indexes_for_ids_fails_on_unknown() {
        let network = Network::for_testnet();
        let unknown = AccountId::new(9, 9, 9);
        assert!(network.node_indexes_for_ids(&[unknown]).is_err());
    }

    #[test]
    fn sample_healthy_takes_ceil_third() {
        let network = Network::for_mainnet();
        let indexes = network.healthy_node_indexes();
        let sample = network.sample_healthy(&indexes);
        assert_eq!(sample.len(), indexes.len().div_ceil(3));
    }
}
