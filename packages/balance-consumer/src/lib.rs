//! Coordinated partition-assignment engine: the coordination-facing
//! half (C1-C3, C5-C7) plus the public `BalancedConsumer` facade. The
//! pure assignment decider (C4) lives in [`balance_core`].
//!
//! A host wires this crate to a real coordination service (shipped
//! here as [`coordination::EtcdCoordinationClient`]) and its own
//! broker-metadata and inner-consumer machinery (via [`traits`]),
//! then drives [`BalancedConsumer::consume`] or
//! [`BalancedConsumer::iter`] in a loop. Everything else -- who owns
//! which partition, when to rebalance, how to survive a lost session
//! -- happens underneath.

pub mod consumer;
pub mod coordination;
pub mod traits;

pub use balance_core::{decide_assignment, BalanceConfig, DecideError, PartitionDescriptor};
pub use consumer::{BalancedConsumer, BalancedConsumerIter};
pub use coordination::{
    ControllerHandle, ControllerState, ControllerError, CoordinationClient, CoordinationError,
    EtcdCoordinationClient, SessionEvent,
};
pub use traits::{InnerConsumer, InnerConsumerFactory, InnerConsumerParams, Message, TopicMetadata};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }

    /// Verify the public re-exports are accessible from the crate root.
    #[test]
    fn reexports_accessible() {
        let _config = crate::BalanceConfig::default();
        let _state = crate::ControllerState::Starting;
    }
}
