#![forbid(unsafe_code)]

//! Dock group rules.
//!
//! Groups partition dockables into families that may only dock with each
//! other. The pure functions here are usable without a tree; the
//! [`DockTree`] wrappers read groups (and the global-docking switch) from the
//! live nodes.
//!
//! | scope  | source group | target group | verdict                   |
//! |--------|--------------|--------------|---------------------------|
//! | local  | `a`          | `b`          | `a == b` (`None == None`) |
//! | global | `None`       | anything     | allowed                   |
//! | global | `Some(g)`    | `Some(g)`    | allowed                   |
//! | global | `Some(g)`    | other        | rejected                  |

use crate::id::NodeId;
use crate::model::DropScope;
use crate::tree::DockTree;

/// Strict equality, ungrouped docks only with ungrouped.
#[must_use]
pub fn validate_local_docking(source: Option<&str>, target: Option<&str>) -> bool {
    source == target
}

/// Ungrouped sources go anywhere; grouped sources need an equal group.
#[must_use]
pub fn validate_global_docking(source: Option<&str>, target: Option<&str>) -> bool {
    match source {
        None => true,
        Some(group) => target == Some(group),
    }
}

/// Dispatch on scope.
#[must_use]
pub fn validate_docking(scope: DropScope, source: Option<&str>, target: Option<&str>) -> bool {
    match scope {
        DropScope::Local => validate_local_docking(source, target),
        DropScope::Global => validate_global_docking(source, target),
    }
}

impl DockTree {
    /// Group rule between two live nodes.
    ///
    /// Global drops additionally require effective `EnableGlobalDocking` on
    /// the dock nearest to `target`. Unknown nodes never pass.
    #[must_use]
    pub fn validate_group(&self, source: NodeId, target: NodeId, scope: DropScope) -> bool {
        let (Some(source_node), Some(target_node)) = (self.node(source), self.node(target)) else {
            return false;
        };
        let source_group = source_node.dock_group.as_deref();
        let target_group = target_node.dock_group.as_deref();
        match scope {
            DropScope::Local => validate_local_docking(source_group, target_group),
            DropScope::Global => {
                let enabled = self
                    .nearest_dock(target)
                    .is_some_and(|dock| self.effective_global_docking(dock));
                enabled && validate_global_docking(source_group, target_group)
            }
        }
    }
}
