//! The coordinated partition-assignment engine's coordination-facing
//! half: the client adapter (C1), membership registrar (C2), peer and
//! partition view (C3), ownership writer (C5), rebalance controller
//! (C6), and inner-consumer supervisor (C7). The pure assignment
//! decider (C4) lives in `balance-core`.

pub mod client;
pub mod controller;
pub mod error;
pub mod ownership;
pub mod paths;
pub mod registrar;
pub mod supervisor;
pub mod view;

pub use client::{CoordinationClient, EtcdCoordinationClient, NodeData, SessionEvent, WatchHandle};
pub use controller::{ControllerHandle, ControllerState, RebalanceController};
pub use error::{ControllerError, CoordinationError};
pub use ownership::OwnershipWriter;
pub use registrar::MembershipRegistrar;
pub use supervisor::InnerConsumerSupervisor;
pub use view::PeerPartitionView;
