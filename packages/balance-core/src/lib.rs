//! Balanced-consumer core -- the partition/peer data model and the
//! deterministic assignment decider.
//!
//! - **Types** ([`types`]): `PartitionDescriptor`, `PeerDescriptor`,
//!   `MemberId`, `BalanceConfig`.
//! - **Decide** ([`decide`]): the pure range-assignment-with-remainder
//!   function every group member runs locally to compute its own share.
//!
//! No I/O and no async runtime dependency: everything here is a pure
//! function over owned data, testable without a coordination service.

pub mod decide;
pub mod types;

pub use decide::{decide as decide_assignment, DecideError};
pub use types::{BalanceConfig, MemberId, PartitionDescriptor, PeerDescriptor};
