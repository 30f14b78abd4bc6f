#![forbid(unsafe_code)]

//! Model-level errors (construction, snapshots, invariant violations).

use std::fmt;

use crate::id::{NodeId, WindowId};
use crate::invariant::DockInvariantCode;

/// Errors raised while building or validating a dock tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockModelError {
    ZeroId,
    IdOverflow {
        current: u64,
    },
    UnsupportedSchemaVersion {
        found: u16,
        expected: u16,
    },
    DuplicateNodeId {
        node_id: NodeId,
    },
    DuplicateWindowId {
        window_id: WindowId,
    },
    /// The first error-level finding of an invariant pass.
    InvariantViolation {
        code: DockInvariantCode,
        node_id: Option<NodeId>,
        message: String,
    },
}

impl fmt::Display for DockModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroId => write!(f, "identifier 0 is reserved"),
            Self::IdOverflow { current } => write!(f, "identifier overflow after {current}"),
            Self::UnsupportedSchemaVersion { found, expected } => write!(
                f,
                "unsupported dock tree schema version {found} (expected {expected})"
            ),
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate node id {node_id}"),
            Self::DuplicateWindowId { window_id } => {
                write!(f, "duplicate window id {window_id}")
            }
            Self::InvariantViolation {
                code,
                node_id,
                message,
            } => match node_id {
                Some(node_id) => write!(f, "{code:?} at {node_id}: {message}"),
                None => write!(f, "{code:?}: {message}"),
            },
        }
    }
}

impl std::error::Error for DockModelError {}
