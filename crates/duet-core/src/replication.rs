//! Replication vocabulary shared by peers, transfer logs, and the replicator

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::change::Action;
use crate::identity::DocumentId;

/// Direction of a one-way replication pass, seen from the local peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicationDirection {
    /// Local changes pushed to the remote peer
    Outbound,
    /// Remote changes pulled into the local peer
    Inbound,
}

impl ReplicationDirection {
    /// Single-byte tag used in persisted keys
    pub fn as_byte(&self) -> u8 {
        match self {
            ReplicationDirection::Outbound => b'O',
            ReplicationDirection::Inbound => b'I',
        }
    }
}

impl Display for ReplicationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationDirection::Outbound => write!(f, "outbound"),
            ReplicationDirection::Inbound => write!(f, "inbound"),
        }
    }
}

/// A change newly applied on the destination during replication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplicationEvent {
    pub document_id: DocumentId,
    pub action: Action,
}

impl ReplicationEvent {
    pub fn new(document_id: DocumentId, action: Action) -> Self {
        Self {
            document_id,
            action,
        }
    }
}
