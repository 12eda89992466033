//! Rebalance Controller (C6).
//!
//! A state machine driven entirely by messages on one channel: watch
//! callbacks from the coordination client dispatch thread only enqueue
//! `RebalanceRequested` and return immediately (spec §5/§9's explicit
//! redesign instruction -- the original dispatches rebalances directly
//! from the watch callback, guarded by a boolean flag). Everything that
//! mutates `owned`, calls C3/C4/C5/C7, or changes state runs serialized
//! on this controller's own task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use balance_core::{decide_assignment, PartitionDescriptor};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::client::{CoordinationClient, SessionEvent, WatchHandle};
use super::error::{ControllerError, CoordinationError};
use super::ownership::OwnershipWriter;
use super::paths::{brokers_ids_path, brokers_topics_path, member_ids_path};
use super::registrar::MembershipRegistrar;
use super::supervisor::InnerConsumerSupervisor;
use super::view::PeerPartitionView;
use crate::traits::TopicMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Starting,
    Idle,
    Rebalancing,
    Degraded,
    Stopped,
}

enum ControlMessage {
    RebalanceRequested,
    Stop,
}

/// The caller-facing half of the controller: watch handlers and the
/// facade hold this to enqueue work and observe state.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControlMessage>,
    state_rx: watch::Receiver<ControllerState>,
}

impl ControllerHandle {
    pub fn request_rebalance(&self) {
        let _ = self.tx.send(ControlMessage::RebalanceRequested);
    }

    pub fn stop(&self) {
        let _ = self.tx.send(ControlMessage::Stop);
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ControllerState> {
        self.state_rx.clone()
    }
}

pub struct RebalanceController {
    client: Arc<dyn CoordinationClient>,
    metadata: Arc<dyn TopicMetadata>,
    registrar: MembershipRegistrar,
    view: PeerPartitionView,
    writer: OwnershipWriter,
    supervisor: Arc<InnerConsumerSupervisor>,
    group: String,
    self_id: String,
    topic: String,
    retries: u32,
    owned: Vec<PartitionDescriptor>,
    state_tx: watch::Sender<ControllerState>,
    self_tx: mpsc::UnboundedSender<ControlMessage>,
    rx: mpsc::UnboundedReceiver<ControlMessage>,
    watches: Vec<WatchHandle>,
}

impl RebalanceController {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        client: Arc<dyn CoordinationClient>,
        metadata: Arc<dyn TopicMetadata>,
        supervisor: Arc<InnerConsumerSupervisor>,
        group: impl Into<String>,
        self_id: impl Into<String>,
        topic: impl Into<String>,
        retries: u32,
    ) -> (Self, ControllerHandle) {
        let group = group.into();
        let self_id = self_id.into();
        let topic = topic.into();

        let registrar =
            MembershipRegistrar::new(Arc::clone(&client), group.clone(), self_id.clone(), topic.clone());
        let view = PeerPartitionView::new(Arc::clone(&client), group.clone());
        let writer = OwnershipWriter::new(Arc::clone(&client), group.clone(), topic.clone(), self_id.clone());
        let (state_tx, state_rx) = watch::channel(ControllerState::Starting);
        let (tx, rx) = mpsc::unbounded_channel();

        let controller = Self {
            client,
            metadata,
            registrar,
            view,
            writer,
            supervisor,
            group,
            self_id,
            topic,
            retries,
            owned: Vec::new(),
            state_tx,
            self_tx: tx.clone(),
            rx,
            watches: Vec::new(),
        };
        let handle = ControllerHandle { tx, state_rx };
        (controller, handle)
    }

    fn set_state(&self, state: ControllerState) {
        info!(group = %self.group, self_id = %self.self_id, ?state, "controller state transition");
        let _ = self.state_tx.send(state);
    }

    /// Drive the controller until a `Stop` message is processed.
    /// Consumes `self`: the controller owns all mutable assignment
    /// state for its whole lifetime on one task.
    pub async fn run(mut self) {
        let mut session_events = self.client.session_events();

        if let Err(e) = self.enter_starting().await {
            error!(error = %e, "fatal error entering Starting state");
            self.set_state(ControllerState::Stopped);
            return;
        }

        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    match msg {
                        Some(ControlMessage::RebalanceRequested) => {
                            if drain_pending(&mut self.rx) {
                                self.handle_stop().await;
                                return;
                            }
                            self.run_pass_from_idle().await;
                        }
                        Some(ControlMessage::Stop) | None => {
                            self.handle_stop().await;
                            return;
                        }
                    }
                }
                Ok(()) = session_events.changed() => {
                    let event = *session_events.borrow();
                    match event {
                        SessionEvent::Lost => {
                            warn!("coordination session lost, reconnecting");
                            self.watches.clear();
                            // Every ephemeral node tied to the old lease is
                            // gone server-side; forget local ownership so
                            // the next pass re-acquires instead of treating
                            // `owned` as still accurate.
                            self.owned.clear();
                            if let Err(e) = self.client.reconnect().await {
                                error!(error = %e, "fatal error reconnecting after session loss");
                                self.set_state(ControllerState::Stopped);
                                return;
                            }
                            if let Err(e) = self.enter_starting().await {
                                error!(error = %e, "fatal error re-entering Starting state after session loss");
                                self.set_state(ControllerState::Stopped);
                                return;
                            }
                        }
                        SessionEvent::Connected | SessionEvent::Suspended => {}
                    }
                }
            }
        }
    }

    async fn handle_stop(&self) {
        self.set_state(ControllerState::Stopped);
        if let Err(e) = self.supervisor.stop().await {
            warn!(error = %e, "error stopping inner consumer during shutdown");
        }
    }

    async fn run_pass_from_idle(&mut self) {
        self.set_state(ControllerState::Rebalancing);
        match self.rebalance_pass().await {
            Ok(()) => self.set_state(ControllerState::Idle),
            Err(e) => {
                warn!(error = %e, "rebalance pass failed, degrading");
                self.set_state(ControllerState::Degraded);
            }
        }
    }

    /// `Starting` entry action: ensure paths, register, install the
    /// three watches behind a deferred-fire guard, then run one pass.
    async fn enter_starting(&mut self) -> Result<(), ControllerError> {
        self.set_state(ControllerState::Starting);

        if self.client.get_children(brokers_ids_path()).await.is_err() {
            return Err(ControllerError::BrokerPathMissing);
        }

        self.writer.ensure_owners_path().await?;

        let partitions =
            self.view.list_partitions(self.metadata.as_ref()).await.map_err(CoordinationError::Other)?;
        self.registrar.register(partitions.len()).await?;

        let installing = Arc::new(AtomicBool::new(true));
        self.watches.clear();
        let member_ids = member_ids_path(&self.group);
        for path in [brokers_ids_path(), brokers_topics_path(), member_ids.as_str()] {
            let handler_tx = self.self_tx.clone();
            let guard = Arc::clone(&installing);
            let handle = self
                .client
                .watch_children(
                    path,
                    Box::new(move |_children| {
                        if !guard.load(Ordering::SeqCst) {
                            let _ = handler_tx.send(ControlMessage::RebalanceRequested);
                        }
                    }),
                )
                .await?;
            self.watches.push(handle);
        }
        installing.store(false, Ordering::SeqCst);

        self.run_pass_from_idle().await;
        Ok(())
    }

    /// One rebalance pass: up to `retries` attempts, sleeping
    /// `attempt^2` seconds before retries (0, 1, 4, 9, 16 for
    /// attempts 0..4) -- the sleep schedule is authoritative, the log
    /// uses the same value (spec §9 redesign flag).
    async fn rebalance_pass(&mut self) -> Result<(), ControllerError> {
        let partitions =
            self.view.list_partitions(self.metadata.as_ref()).await.map_err(CoordinationError::Other)?;

        for attempt in 0..self.retries {
            if attempt > 0 {
                let secs = u64::from(attempt) * u64::from(attempt);
                info!(attempt, secs, "backing off before retry");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }

            let peers = self.view.list_peers(&self.topic).await?;
            if !peers.iter().any(|p| p == &self.self_id) {
                debug!("self not yet registered, registering before deciding");
                self.registrar.register(partitions.len()).await?;
                continue;
            }

            let targets = decide_assignment(&peers, &self.self_id, &partitions)
                .expect("self_id was just confirmed present in peers");

            let to_release: Vec<PartitionDescriptor> =
                self.owned.iter().filter(|p| !targets.contains(p)).cloned().collect();
            self.writer.release(&to_release).await?;

            let to_acquire: Vec<PartitionDescriptor> =
                targets.iter().filter(|p| !self.owned.contains(p)).cloned().collect();

            match self.writer.acquire(&to_acquire).await {
                Ok(()) => {
                    // owned <- owned ∪ targets, implemented directly: targets
                    // is already the full post-release/post-acquire set.
                    self.owned = targets;
                    self.supervisor
                        .replace(self.owned.clone())
                        .await
                        .map_err(CoordinationError::Other)?;
                    return Ok(());
                }
                Err(ControllerError::Contention { path }) => {
                    warn!(path, attempt, "contention acquiring partition, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ControllerError::RetriesExhausted)
    }
}

/// Coalesce queued `RebalanceRequested` messages into the pass about to
/// run. Returns `true` if a `Stop` was seen while draining, so the
/// caller can honor it instead of starting a pass that would just be
/// torn down immediately after.
fn drain_pending(rx: &mut mpsc::UnboundedReceiver<ControlMessage>) -> bool {
    let mut stop_seen = false;
    while let Ok(msg) = rx.try_recv() {
        if matches!(msg, ControlMessage::Stop) {
            stop_seen = true;
        }
    }
    stop_seen
}
