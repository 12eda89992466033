//! Ownership Writer (C5).
//!
//! Claims and releases partition ownership nodes. Ordering matters at
//! the call site (spec §4.5/§4.6): `release` must be called before
//! `acquire` on every rebalance pass, so a peer that lost a partition
//! in the previous round gets a chance to release before this member
//! tries to claim it.

use std::sync::Arc;

use balance_core::PartitionDescriptor;
use tracing::debug;

use super::client::CoordinationClient;
use super::error::{ControllerError, CoordinationError};
use super::paths::{owner_node_path, owners_path};

pub struct OwnershipWriter {
    client: Arc<dyn CoordinationClient>,
    group: String,
    topic: String,
    self_id: String,
}

impl OwnershipWriter {
    #[must_use]
    pub fn new(
        client: Arc<dyn CoordinationClient>,
        group: impl Into<String>,
        topic: impl Into<String>,
        self_id: impl Into<String>,
    ) -> Self {
        Self { client, group: group.into(), topic: topic.into(), self_id: self_id.into() }
    }

    pub async fn ensure_owners_path(&self) -> Result<(), CoordinationError> {
        self.client.ensure_path(&owners_path(&self.group, &self.topic)).await
    }

    /// Release ownership of `partitions`. Absence of the node is benign.
    pub async fn release(&self, partitions: &[PartitionDescriptor]) -> Result<(), CoordinationError> {
        for p in partitions {
            let path = owner_node_path(&self.group, &self.topic, p.leader_id, p.partition_id);
            match self.client.delete(&path).await {
                Ok(()) | Err(CoordinationError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
            debug!(path, "released partition ownership");
        }
        Ok(())
    }

    /// Claim ownership of `partitions`. A node already present at the
    /// target path surfaces as `ControllerError::Contention`: the
    /// caller's retry loop matches on it directly rather than re-deriving
    /// contention from the lower-level `AlreadyExists`.
    pub async fn acquire(&self, partitions: &[PartitionDescriptor]) -> Result<(), ControllerError> {
        for p in partitions {
            let path = owner_node_path(&self.group, &self.topic, p.leader_id, p.partition_id);
            self.client.create(&path, &self.self_id, true).await.map_err(|e| match e {
                CoordinationError::AlreadyExists { path } => ControllerError::Contention { path },
                other => ControllerError::Coordination(other),
            })?;
            debug!(path, "claimed partition ownership");
        }
        Ok(())
    }
}
