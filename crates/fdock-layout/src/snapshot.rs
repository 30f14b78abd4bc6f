#![forbid(unsafe_code)]

//! Serializable dock tree snapshots.
//!
//! A snapshot is the canonical wire form of a [`DockTree`]: nodes and windows
//! sorted by id, `NaN` sizes encoded as `null`. Importing always re-validates
//! the whole tree before it is accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DockModelError;
use crate::id::{NodeId, WindowId};
use crate::model::{DockNode, DockWindow};
use crate::tree::DockTree;

/// Current dock tree schema version.
pub const DOCK_TREE_SCHEMA_VERSION: u16 = 1;

fn default_schema_version() -> u16 {
    DOCK_TREE_SCHEMA_VERSION
}

/// Serialized dock tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockTreeSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub main_root: NodeId,
    pub next_node_id: NodeId,
    pub next_window_id: WindowId,
    pub nodes: Vec<DockNode>,
    #[serde(default)]
    pub windows: Vec<DockWindow>,
}

impl DockTreeSnapshot {
    /// Sort nodes and windows by id for deterministic output.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by_key(|node| node.node_id);
        self.windows.sort_by_key(|window| window.window_id);
    }
}

impl DockTree {
    /// Export to canonical snapshot form.
    #[must_use]
    pub fn to_snapshot(&self) -> DockTreeSnapshot {
        let mut snapshot = DockTreeSnapshot {
            schema_version: DOCK_TREE_SCHEMA_VERSION,
            main_root: self.main_root,
            next_node_id: self.next_node_id,
            next_window_id: self.next_window_id,
            nodes: self.nodes.values().cloned().collect(),
            windows: self.windows.values().cloned().collect(),
        };
        snapshot.canonicalize();
        snapshot
    }

    /// Construct and validate from a snapshot.
    pub fn from_snapshot(mut snapshot: DockTreeSnapshot) -> Result<Self, DockModelError> {
        if snapshot.schema_version != DOCK_TREE_SCHEMA_VERSION {
            return Err(DockModelError::UnsupportedSchemaVersion {
                found: snapshot.schema_version,
                expected: DOCK_TREE_SCHEMA_VERSION,
            });
        }
        snapshot.canonicalize();
        for raw in [
            snapshot.main_root.get(),
            snapshot.next_node_id.get(),
            snapshot.next_window_id.get(),
        ] {
            NodeId::new(raw)?;
        }

        let mut nodes = BTreeMap::new();
        for node in snapshot.nodes {
            let node_id = node.node_id;
            NodeId::new(node_id.get())?;
            if nodes.insert(node_id, node).is_some() {
                return Err(DockModelError::DuplicateNodeId { node_id });
            }
        }
        let mut windows = BTreeMap::new();
        for window in snapshot.windows {
            let window_id = window.window_id;
            WindowId::new(window_id.get())?;
            if windows.insert(window_id, window).is_some() {
                return Err(DockModelError::DuplicateWindowId { window_id });
            }
        }

        let tree = Self {
            main_root: snapshot.main_root,
            next_node_id: snapshot.next_node_id,
            next_window_id: snapshot.next_window_id,
            nodes,
            windows,
        };
        tree.validate()?;
        Ok(tree)
    }
}
