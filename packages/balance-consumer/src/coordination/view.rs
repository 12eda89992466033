//! Peer & Partition View (C3).

use std::sync::Arc;

use balance_core::PartitionDescriptor;
use tracing::debug;

use super::client::CoordinationClient;
use super::error::CoordinationError;
use super::paths::{member_ids_path, member_node_path};
use crate::traits::TopicMetadata;

pub struct PeerPartitionView {
    client: Arc<dyn CoordinationClient>,
    group: String,
}

impl PeerPartitionView {
    #[must_use]
    pub fn new(client: Arc<dyn CoordinationClient>, group: impl Into<String>) -> Self {
        Self { client, group: group.into() }
    }

    /// Members of the group registered for `topic`, sorted ascending by
    /// identity string. `NotFound` on the registry's parent path is
    /// read as "nobody has registered yet" rather than an error.
    ///
    /// A child that disappears between `get_children` and `get` (a peer
    /// whose ephemeral node just expired) is silently skipped: this is
    /// a race, not a failure.
    pub async fn list_peers(&self, topic: &str) -> Result<Vec<String>, CoordinationError> {
        let parent = member_ids_path(&self.group);
        let children = match self.client.get_children(&parent).await {
            Ok(children) => children,
            Err(CoordinationError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut peers = Vec::with_capacity(children.len());
        for member_id in children {
            let path = member_node_path(&self.group, &member_id);
            match self.client.get(&path).await {
                Ok(node) if node.payload == topic => peers.push(member_id),
                Ok(_) => {}
                Err(CoordinationError::NotFound { .. }) => {
                    debug!(%member_id, "peer vanished between list and get, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        peers.sort();
        Ok(peers)
    }

    /// Partitions of `topic`, drawn from the external metadata
    /// collaborator and sorted by canonical form.
    pub async fn list_partitions(
        &self,
        metadata: &dyn TopicMetadata,
    ) -> anyhow::Result<Vec<PartitionDescriptor>> {
        let mut partitions = metadata.partitions().await?;
        partitions.sort();
        Ok(partitions)
    }
}
