//! Error types for duet-sync

use duet_core::{DatabaseId, DuetError, ReplicationDirection};
use thiserror::Error;

/// First failure of a replication pass
///
/// Progress committed before the failure (applied changes and the transfer
/// cursor) is kept, so retrying resumes after the last completed change.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Outbound replication to {peer} failed: {source}")]
    Outbound { peer: DatabaseId, source: DuetError },

    #[error("Inbound replication from {peer} failed: {source}")]
    Inbound { peer: DatabaseId, source: DuetError },

    #[error("Failed to resolve peer identity for {direction} replication: {source}")]
    PeerIdentity {
        direction: ReplicationDirection,
        source: DuetError,
    },
}

impl SyncError {
    pub(crate) fn pass(direction: ReplicationDirection, peer: DatabaseId, source: DuetError) -> Self {
        match direction {
            ReplicationDirection::Outbound => Self::Outbound { peer, source },
            ReplicationDirection::Inbound => Self::Inbound { peer, source },
        }
    }

    /// Direction of the failed pass
    pub fn direction(&self) -> ReplicationDirection {
        match self {
            Self::Outbound { .. } => ReplicationDirection::Outbound,
            Self::Inbound { .. } => ReplicationDirection::Inbound,
            Self::PeerIdentity { direction, .. } => *direction,
        }
    }

    /// Remote database of the failed pass, when it was resolved
    pub fn peer(&self) -> Option<&DatabaseId> {
        match self {
            Self::Outbound { peer, .. } | Self::Inbound { peer, .. } => Some(peer),
            Self::PeerIdentity { .. } => None,
        }
    }

    /// The underlying failure
    pub fn cause(&self) -> &DuetError {
        match self {
            Self::Outbound { source, .. }
            | Self::Inbound { source, .. }
            | Self::PeerIdentity { source, .. } => source,
        }
    }

    pub fn into_cause(self) -> DuetError {
        match self {
            Self::Outbound { source, .. }
            | Self::Inbound { source, .. }
            | Self::PeerIdentity { source, .. } => source,
        }
    }
}

/// Result type for replication
pub type SyncResult<T> = Result<T, SyncError>;
