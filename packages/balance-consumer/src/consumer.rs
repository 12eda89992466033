//! The public `BalancedConsumer` facade: what the host actually
//! constructs and drives. Wires C1 (coordination client) through C7
//! (inner-consumer supervisor) behind `consume()` and a lazy, infinite,
//! restartable-across-rebalances iterator.

use std::sync::Arc;

use balance_core::BalanceConfig;
use tracing::warn;

use crate::coordination::{
    ControllerHandle, ControllerState, CoordinationClient, InnerConsumerSupervisor, RebalanceController,
};
use crate::traits::{InnerConsumerFactory, Message, TopicMetadata};

pub struct BalancedConsumer {
    supervisor: Arc<InnerConsumerSupervisor>,
    controller: ControllerHandle,
}

impl BalancedConsumer {
    /// Construct and start the engine: spawns the rebalance controller
    /// on its own task, which immediately runs the `Starting` entry
    /// action (register, install watches, first pass).
    pub fn start(
        client: Arc<dyn CoordinationClient>,
        metadata: Arc<dyn TopicMetadata>,
        inner_factory: Arc<dyn InnerConsumerFactory>,
        group: impl Into<String>,
        self_id: impl Into<String>,
        config: BalanceConfig,
    ) -> Self {
        let topic = metadata.name().to_string();
        let group: String = group.into();
        let supervisor = Arc::new(InnerConsumerSupervisor::new(
            inner_factory,
            topic.clone(),
            group.clone(),
            config.clone(),
        ));
        let (controller, handle) = RebalanceController::new(
            client,
            metadata,
            Arc::clone(&supervisor),
            group,
            self_id,
            topic,
            config.rebalance_retries,
        );
        tokio::spawn(controller.run());

        Self { supervisor, controller: handle }
    }

    /// Delegate to the current inner consumer. Blocking semantics are
    /// inherited. Returns `None` while the first rebalance has not yet
    /// completed, or on graceful inner-consumer end of stream.
    pub async fn consume(&self) -> anyhow::Result<Option<Message>> {
        if self.controller.state() != ControllerState::Idle {
            warn!(state = ?self.controller.state(), "no current consumer, rebalance in progress");
        }
        self.supervisor.consume().await
    }

    /// A lazy, restartable-across-rebalances, infinite sequence of
    /// messages. Each call to `next()` re-delegates to whatever the
    /// current inner consumer is at that moment.
    #[must_use]
    pub fn iter(self: &Arc<Self>) -> BalancedConsumerIter {
        BalancedConsumerIter { consumer: Arc::clone(self) }
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }
}

/// Infinite iterator over `consume()`. "Lazy" here means each item is
/// fetched only when polled; "restartable" means it transparently
/// tracks inner-consumer replacement across rebalances because it
/// always calls back through the facade rather than holding a
/// reference to one inner consumer.
pub struct BalancedConsumerIter {
    consumer: Arc<BalancedConsumer>,
}

impl BalancedConsumerIter {
    pub async fn next(&mut self) -> anyhow::Result<Message> {
        loop {
            if let Some(message) = self.consumer.consume().await? {
                return Ok(message);
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }
}
