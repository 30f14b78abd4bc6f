#![forbid(unsafe_code)]

//! Capability model: permission flags and override precedence.
//!
//! An effective permission is resolved, highest precedence first, from:
//!
//! 1. the dockable's own `capability_overrides`,
//! 2. the immediate owning dock's `capability_policy`,
//! 3. the owning root's `root_policy`,
//! 4. the dockable's plain flag.
//!
//! `None` at a level defers to the next one; it never means "denied".
//! Nothing here is cached: any policy object may be replaced between two
//! validations, so every query walks the levels again.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::model::{DockKind, NodeKind};
use crate::tree::DockTree;

/// Gesture and lifecycle permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Drag,
    Drop,
    Close,
    Pin,
    Float,
}

impl Capability {
    pub const ALL: [Self; 5] = [Self::Drag, Self::Drop, Self::Close, Self::Pin, Self::Float];
}

/// Base flags carried by every dockable (lowest precedence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub can_drag: bool,
    pub can_drop: bool,
    pub can_close: bool,
    pub can_pin: bool,
    pub can_float: bool,
}

impl CapabilityFlags {
    #[must_use]
    pub const fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::Drag => self.can_drag,
            Capability::Drop => self.can_drop,
            Capability::Close => self.can_close,
            Capability::Pin => self.can_pin,
            Capability::Float => self.can_float,
        }
    }

    pub fn set(&mut self, capability: Capability, value: bool) {
        match capability {
            Capability::Drag => self.can_drag = value,
            Capability::Drop => self.can_drop = value,
            Capability::Close => self.can_close = value,
            Capability::Pin => self.can_pin = value,
            Capability::Float => self.can_float = value,
        }
    }
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            can_drag: true,
            can_drop: true,
            can_close: true,
            can_pin: true,
            can_float: true,
        }
    }
}

/// Tri-state policy layer. Used for dockable overrides, dock policies and the
/// root policy alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityPolicy {
    #[serde(default)]
    pub can_drag: Option<bool>,
    #[serde(default)]
    pub can_drop: Option<bool>,
    #[serde(default)]
    pub can_close: Option<bool>,
    #[serde(default)]
    pub can_pin: Option<bool>,
    #[serde(default)]
    pub can_float: Option<bool>,
    /// Only consulted on dock and root levels.
    #[serde(default)]
    pub enable_global_docking: Option<bool>,
}

impl CapabilityPolicy {
    #[must_use]
    pub const fn get(&self, capability: Capability) -> Option<bool> {
        match capability {
            Capability::Drag => self.can_drag,
            Capability::Drop => self.can_drop,
            Capability::Close => self.can_close,
            Capability::Pin => self.can_pin,
            Capability::Float => self.can_float,
        }
    }

    pub fn set(&mut self, capability: Capability, value: Option<bool>) {
        match capability {
            Capability::Drag => self.can_drag = value,
            Capability::Drop => self.can_drop = value,
            Capability::Close => self.can_close = value,
            Capability::Pin => self.can_pin = value,
            Capability::Float => self.can_float = value,
        }
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, capability: Capability, value: bool) -> Self {
        self.set(capability, Some(value));
        self
    }

    #[must_use]
    pub fn with_global_docking(mut self, value: bool) -> Self {
        self.enable_global_docking = Some(value);
        self
    }

    /// True when no level is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Capability::ALL.iter().all(|cap| self.get(*cap).is_none())
            && self.enable_global_docking.is_none()
    }
}

/// Pure precedence resolution over the four levels.
#[must_use]
pub fn resolve_capability(
    capability: Capability,
    overrides: Option<&CapabilityPolicy>,
    dock_policy: Option<&CapabilityPolicy>,
    root_policy: Option<&CapabilityPolicy>,
    base: &CapabilityFlags,
) -> bool {
    overrides
        .and_then(|policy| policy.get(capability))
        .or_else(|| dock_policy.and_then(|policy| policy.get(capability)))
        .or_else(|| root_policy.and_then(|policy| policy.get(capability)))
        .unwrap_or_else(|| base.get(capability))
}

/// Pure precedence resolution for `EnableGlobalDocking` (dock levels only).
#[must_use]
pub fn resolve_global_docking(
    dock_policy: Option<&CapabilityPolicy>,
    root_policy: Option<&CapabilityPolicy>,
    base: bool,
) -> bool {
    dock_policy
        .and_then(|policy| policy.enable_global_docking)
        .or_else(|| root_policy.and_then(|policy| policy.enable_global_docking))
        .unwrap_or(base)
}

impl DockTree {
    /// Effective permission for `node_id`. Unknown nodes resolve to `false`.
    #[must_use]
    pub fn effective_capability(&self, node_id: NodeId, capability: Capability) -> bool {
        let Some(node) = self.node(node_id) else {
            return false;
        };
        let dock_policy = node
            .owner
            .and_then(|owner| self.dock_data(owner))
            .and_then(|dock| dock.capability_policy.as_ref());
        let root_policy = self
            .root_of(node_id)
            .and_then(|root| self.root_data(root))
            .and_then(|root| root.root_policy.as_ref());
        resolve_capability(
            capability,
            node.capability_overrides.as_ref(),
            dock_policy,
            root_policy,
            &node.flags,
        )
    }

    /// Effective `EnableGlobalDocking` for a dock: its own policy, then the
    /// root policy, then its plain flag. Non-docks resolve to `false`.
    #[must_use]
    pub fn effective_global_docking(&self, dock_id: NodeId) -> bool {
        let Some(node) = self.node(dock_id) else {
            return false;
        };
        let NodeKind::Dock(dock) = &node.kind else {
            return false;
        };
        let root_policy = match &dock.dock_kind {
            DockKind::Root(root) => root.root_policy.as_ref(),
            _ => self
                .root_of(dock_id)
                .and_then(|root| self.root_data(root))
                .and_then(|root| root.root_policy.as_ref()),
        };
        resolve_global_docking(
            dock.capability_policy.as_ref(),
            root_policy,
            dock.enable_global_docking,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Alignment;

    fn deny(capability: Capability) -> CapabilityPolicy {
        CapabilityPolicy::default().with(capability, false)
    }

    #[test]
    fn absent_levels_defer_to_base_flag() {
        let mut base = CapabilityFlags::default();
        assert!(resolve_capability(Capability::Close, None, None, None, &base));
        base.set(Capability::Close, false);
        assert!(!resolve_capability(Capability::Close, None, None, None, &base));
    }

    #[test]
    fn override_beats_dock_and_root() {
        let base = CapabilityFlags::default();
        let overrides = CapabilityPolicy::default().with(Capability::Close, true);
        let dock = deny(Capability::Close);
        let root = deny(Capability::Close);
        assert!(resolve_capability(
            Capability::Close,
            Some(&overrides),
            Some(&dock),
            Some(&root),
            &base
        ));
        assert!(!resolve_capability(
            Capability::Close,
            None,
            Some(&dock),
            Some(&root),
            &base
        ));
    }

    #[test]
    fn dock_policy_beats_root_policy() {
        let base = CapabilityFlags::default();
        let dock = CapabilityPolicy::default().with(Capability::Drag, true);
        let root = deny(Capability::Drag);
        assert!(resolve_capability(
            Capability::Drag,
            None,
            Some(&dock),
            Some(&root),
            &base
        ));
        assert!(!resolve_capability(
            Capability::Drag,
            None,
            None,
            Some(&root),
            &base
        ));
    }

    #[test]
    fn policy_for_other_capability_defers() {
        let base = CapabilityFlags::default();
        let dock = deny(Capability::Pin);
        assert!(resolve_capability(
            Capability::Float,
            None,
            Some(&dock),
            None,
            &base
        ));
    }

    #[test]
    fn global_docking_resolution() {
        let root = CapabilityPolicy::default().with_global_docking(false);
        assert!(!resolve_global_docking(None, Some(&root), true));
        let dock = CapabilityPolicy::default().with_global_docking(true);
        assert!(resolve_global_docking(Some(&dock), Some(&root), false));
        assert!(resolve_global_docking(None, None, true));
    }

    #[test]
    fn tree_resolution_follows_live_policies() {
        let mut tree = DockTree::new("root");
        let root = tree.main_root();
        let tools = tree
            .create_tool_dock("tools", Alignment::Left)
            .expect("alloc");
        let tool = tree.create_tool("tool", "Tool").expect("alloc");
        tree.add_dockable(root, tools).expect("attach dock");
        tree.add_dockable(tools, tool).expect("attach tool");

        assert!(tree.effective_capability(tool, Capability::Close));

        tree.set_root_policy(root, Some(deny(Capability::Close)))
            .expect("root policy");
        assert!(!tree.effective_capability(tool, Capability::Close));

        tree.set_dock_policy(tools, Some(deny(Capability::Close)))
            .expect("dock policy");
        tree.set_capability_overrides(
            tool,
            Some(CapabilityPolicy::default().with(Capability::Close, true)),
        )
        .expect("override");
        assert!(tree.effective_capability(tool, Capability::Close));

        tree.set_capability_overrides(tool, None).expect("clear");
        assert!(!tree.effective_capability(tool, Capability::Close));
    }

    #[test]
    fn policy_emptiness() {
        assert!(CapabilityPolicy::default().is_empty());
        assert!(!deny(Capability::Drop).is_empty());
        assert!(!CapabilityPolicy::default().with_global_docking(true).is_empty());
    }
}
