//! Membership Registrar (C2).

use std::sync::Arc;

use tracing::{info, warn};

use super::client::CoordinationClient;
use super::error::CoordinationError;
use super::paths::{member_ids_path, member_node_path};
use super::view::PeerPartitionView;

pub struct MembershipRegistrar {
    client: Arc<dyn CoordinationClient>,
    group: String,
    self_id: String,
    topic: String,
}

impl MembershipRegistrar {
    #[must_use]
    pub fn new(
        client: Arc<dyn CoordinationClient>,
        group: impl Into<String>,
        self_id: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self { client, group: group.into(), self_id: self_id.into(), topic: topic.into() }
    }

    /// Register this member's presence, unless the group is already
    /// over-subscribed relative to the partition count (spec §4.2).
    pub async fn register(&self, partition_count: usize) -> Result<(), CoordinationError> {
        let view = PeerPartitionView::new(Arc::clone(&self.client), self.group.clone());
        let peers = view.list_peers(&self.topic).await?;

        if peers.len() >= partition_count {
            warn!(
                group = %self.group,
                self_id = %self.self_id,
                peer_count = peers.len(),
                partition_count,
                "group over-subscribed, staying passive"
            );
            return Ok(());
        }

        self.client.ensure_path(&member_ids_path(&self.group)).await?;
        match self.client.create(&member_node_path(&self.group, &self.self_id), &self.topic, true).await {
            Ok(()) => {
                info!(group = %self.group, self_id = %self.self_id, "registered with group");
                Ok(())
            }
            Err(CoordinationError::AlreadyExists { .. }) => {
                // Re-registration after a session blip the server hasn't
                // yet expired: treat as already-registered.
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
