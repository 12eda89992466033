//! Error taxonomy (spec §7).
//!
//! `CoordinationError` is what the client adapter and the components
//! built on it (C2, C3, C5) return; `ControllerError` is the
//! state-machine-level outcome the rebalance controller surfaces. The
//! split mirrors the teacher's `OperationError`/`ClassifyError` pair:
//! a typed enum wherever a caller needs to pattern-match a specific
//! failure kind, `anyhow` everywhere else.

use thiserror::Error;

/// Errors surfaced by the coordination client adapter (C1) and its
/// direct callers.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// `create` found a node already present at the target path.
    #[error("node already exists at {path}")]
    AlreadyExists { path: String },

    /// `delete`/`get`/`get_children` found nothing at the target path.
    #[error("node not found at {path}")]
    NotFound { path: String },

    /// I/O timeout or a suspended session; the controller retries on
    /// the next watch fire rather than treating this as fatal.
    #[error("transient coordination failure: {0}")]
    TransientCoordination(String),

    /// The coordination session expired; all ephemeral state created
    /// through it is gone server-side.
    #[error("coordination session lost")]
    SessionLost,

    /// Anything else from the underlying client that doesn't fit the
    /// taxonomy above.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoordinationError {
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, CoordinationError::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoordinationError::NotFound { .. })
    }
}

/// Outcomes of a rebalance pass or a controller-level operation.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// C5's `create` raced with a peer that has not yet released the
    /// partition; retried within the pass's attempt budget.
    #[error("contention on {path}")]
    Contention { path: String },

    /// `/brokers/ids` was absent at startup. Fatal to this member.
    #[error("broker path missing at startup")]
    BrokerPathMissing,

    /// Retry budget exhausted for a rebalance pass.
    #[error("rebalance pass exhausted its retry budget")]
    RetriesExhausted,

    /// A stop request was in flight; any partial work is abandoned.
    #[error("stop requested")]
    StopRequested,

    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}
