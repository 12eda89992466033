use async_trait::async_trait;

use balance_core::PartitionDescriptor;

/// A message pulled off the inner consumer.
///
/// Opaque to this crate: delivery and decoding are the inner consumer's
/// job, this type only exists so `consume()` has something to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub partition_id: i32,
    pub payload: Vec<u8>,
}

/// Cluster/broker metadata collaborator (explicitly out of scope per
/// the core's own purpose: topic/partition discovery lives outside).
///
/// Implementations back this with whatever broker-metadata client the
/// host already has; the core only needs a live view of one topic's
/// partitions.
#[async_trait]
pub trait TopicMetadata: Send + Sync {
    /// The topic name this handle describes.
    fn name(&self) -> &str;

    /// Current partitions of this topic, unsorted; `list_partitions`
    /// (C3) is responsible for sorting by canonical form.
    async fn partitions(&self) -> anyhow::Result<Vec<PartitionDescriptor>>;
}

/// The downstream per-partition fetch consumer, owned and replaced by
/// the supervisor (C7) whenever the assignment changes.
#[async_trait]
pub trait InnerConsumer: Send + Sync {
    /// Block for the next message, or return `None` on graceful end of
    /// stream. Blocking semantics are inherited by `consume()`.
    async fn consume(&self) -> anyhow::Result<Option<Message>>;

    /// Release all downstream resources. Must complete before a
    /// replacement inner consumer is constructed.
    async fn stop(&self) -> anyhow::Result<()>;
}

/// Parameters the supervisor passes when constructing a replacement
/// inner consumer for a new owned-partition set.
#[derive(Debug, Clone)]
pub struct InnerConsumerParams {
    pub topic: String,
    pub group: String,
    pub partitions: Vec<PartitionDescriptor>,
    pub auto_commit_enable: bool,
    pub auto_commit_interval_ms: u64,
    pub socket_timeout_ms: u64,
}

/// Constructs a new inner consumer for a given owned-partition set.
///
/// Kept separate from `InnerConsumer` itself so the supervisor can hold
/// a `dyn InnerConsumerFactory` without needing to know how a concrete
/// inner consumer is built (broker connections, buffering, etc).
#[async_trait]
pub trait InnerConsumerFactory: Send + Sync {
    async fn build(&self, params: InnerConsumerParams) -> anyhow::Result<Box<dyn InnerConsumer>>;
}
