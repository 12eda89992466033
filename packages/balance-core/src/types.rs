use serde::{Deserialize, Serialize};

/// A member identity, unique within one process's session lifetime.
///
/// Conventionally `"<host>:<uuid>"`, following the original
/// `BalancedConsumer`'s `"{host}:{uuid4}"` convention. Opaque beyond
/// that: no validation is performed here.
pub type MemberId = String;

/// A single partition of a topic, identified by its leader broker and
/// partition number.
///
/// Two partitions are equal iff `topic`, `leader_id`, and `partition_id`
/// all match. Ordering is defined by the canonical textual form, not by
/// field order: the canonical form, not the struct layout, is the
/// cross-language wire contract every group member must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub topic: String,
    pub leader_id: i32,
    pub partition_id: i32,
}

impl PartitionDescriptor {
    #[must_use]
    pub fn new(topic: impl Into<String>, leader_id: i32, partition_id: i32) -> Self {
        Self { topic: topic.into(), leader_id, partition_id }
    }

    /// The canonical `topic-leader-partition` form that defines the
    /// global sort order. Every group member, regardless of
    /// implementation language, must derive the same string.
    #[must_use]
    pub fn canonical_form(&self) -> String {
        format!("{}-{}-{}", self.topic, self.leader_id, self.partition_id)
    }
}

impl PartialOrd for PartitionDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PartitionDescriptor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical_form().cmp(&other.canonical_form())
    }
}

/// A group member together with the topic it has registered interest in.
///
/// Peers sort by `member_id` (lexicographic), which is the order the
/// assignment decider requires of its `peers` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDescriptor {
    pub member_id: MemberId,
    pub topic: String,
}

impl PartialOrd for PeerDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PeerDescriptor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.member_id.cmp(&other.member_id)
    }
}

/// Recognized configuration options.
///
/// Loading this from a file or environment is the host's job; this
/// struct only names and defaults the options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Coordination-service endpoint string. Initial connection target.
    pub zk_host: String,
    /// Forwarded to the inner consumer.
    pub auto_commit_enable: bool,
    /// Forwarded to the inner consumer, in milliseconds.
    pub auto_commit_interval_ms: u64,
    /// Forwarded to the inner consumer, in milliseconds.
    pub socket_timeout_ms: u64,
    /// Attempts per rebalance pass.
    pub rebalance_retries: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            zk_host: "127.0.0.1:2181".to_string(),
            auto_commit_enable: false,
            auto_commit_interval_ms: 60_000,
            socket_timeout_ms: 30_000,
            rebalance_retries: 5,
        }
    }
}
