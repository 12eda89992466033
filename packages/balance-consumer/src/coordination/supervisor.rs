//! Inner-Consumer Supervisor (C7).

use std::sync::Arc;

use balance_core::{BalanceConfig, PartitionDescriptor};
use parking_lot::Mutex;
use tracing::info;

use crate::traits::{InnerConsumer, InnerConsumerFactory, InnerConsumerParams, Message};

pub struct InnerConsumerSupervisor {
    factory: Arc<dyn InnerConsumerFactory>,
    topic: String,
    group: String,
    config: BalanceConfig,
    current: Mutex<Option<(Vec<PartitionDescriptor>, Arc<dyn InnerConsumer>)>>,
}

impl InnerConsumerSupervisor {
    #[must_use]
    pub fn new(
        factory: Arc<dyn InnerConsumerFactory>,
        topic: impl Into<String>,
        group: impl Into<String>,
        config: BalanceConfig,
    ) -> Self {
        Self {
            factory,
            topic: topic.into(),
            group: group.into(),
            config,
            current: Mutex::new(None),
        }
    }

    /// Swap the current inner consumer for one serving `owned`. A
    /// no-op if `owned` equals the partitions already in use. Stopping
    /// always completes before construction begins.
    pub async fn replace(&self, owned: Vec<PartitionDescriptor>) -> anyhow::Result<()> {
        if self.current.lock().as_ref().is_some_and(|(existing, _)| existing == &owned) {
            return Ok(());
        }

        let previous = self.current.lock().take();
        if let Some((_, consumer)) = previous {
            consumer.stop().await?;
        }

        if owned.is_empty() {
            info!(topic = %self.topic, "no partitions owned, inner consumer stays stopped");
            return Ok(());
        }

        let params = InnerConsumerParams {
            topic: self.topic.clone(),
            group: self.group.clone(),
            partitions: owned.clone(),
            auto_commit_enable: self.config.auto_commit_enable,
            auto_commit_interval_ms: self.config.auto_commit_interval_ms,
            socket_timeout_ms: self.config.socket_timeout_ms,
        };
        let consumer: Arc<dyn InnerConsumer> = Arc::from(self.factory.build(params).await?);
        info!(topic = %self.topic, partition_count = owned.len(), "inner consumer replaced");
        *self.current.lock() = Some((owned, consumer));
        Ok(())
    }

    /// Stop the current inner consumer, if any, releasing all of its
    /// downstream resources.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let previous = self.current.lock().take();
        if let Some((_, consumer)) = previous {
            consumer.stop().await?;
        }
        Ok(())
    }

    /// Block for the next message via the current inner consumer, if
    /// any. `None` while no rebalance has yet completed.
    pub async fn consume(&self) -> anyhow::Result<Option<Message>> {
        let consumer = self.current.lock().as_ref().map(|(_, c)| Arc::clone(c));
        match consumer {
            Some(consumer) => consumer.consume().await,
            None => Ok(None),
        }
    }
}
