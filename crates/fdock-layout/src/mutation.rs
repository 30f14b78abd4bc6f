#![forbid(unsafe_code)]

//! Atomic mutation engine for dock trees.
//!
//! [`DockTree::apply`] runs one [`DockMutation`] against a cloned working
//! tree. After the mutation body succeeds, active/focused references are
//! repaired, floating windows emptied by the mutation are reclaimed, and the
//! whole tree is validated. Only then does the clone replace `self`. Any
//! failure leaves `self` untouched and reports a structured
//! [`MutationFailure`].
//!
//! Splitter cleanup strips leading, trailing and adjacent splitters from a
//! container after a removal. Insertion into a proportional container adds a
//! splitter between the new content and any content neighbor, so splitters
//! always sit strictly between two content dockables.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilityFlags, CapabilityPolicy};
use crate::error::DockModelError;
use crate::group::validate_local_docking;
use crate::id::{NodeId, WindowId};
use crate::model::{
    Alignment, DockData, DockNode, DockOperation, DockWindow, DockWindowOwnerMode,
    InsertPosition, NodeKind, SizeConstraints, WindowBounds, nan_as_null,
};
use crate::tree::{DockLocation, DockTree};

/// One structural or property change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DockMutation {
    /// Attach a detached dockable to the end of `dock`.
    AddDockable { dock: NodeId, dockable: NodeId },
    /// Detach a dockable. With `collapse`, emptied containers are removed.
    RemoveDockable { dockable: NodeId, collapse: bool },
    MoveDockable {
        dockable: NodeId,
        target_dock: NodeId,
        position: InsertPosition,
    },
    SwapDockable { first: NodeId, second: NodeId },
    /// Place `dockable` beside the dock `target`. With `wrap`, bare tools and
    /// documents are first wrapped in a tool or document dock.
    SplitToDock {
        target: NodeId,
        dockable: NodeId,
        operation: DockOperation,
        wrap: bool,
    },
    FloatDockable {
        dockable: NodeId,
        bounds: WindowBounds,
    },
    PinDockable { dockable: NodeId },
    UnpinDockable { dockable: NodeId },
    PreviewPinnedDockable { dockable: NodeId },
    HidePreviewingDockables { root: NodeId },
    TogglePreviewPinnedDockable { dockable: NodeId },
    HideDockable { dockable: NodeId },
    /// Close gated by `CanClose`; hides when `hide`, else removes.
    CloseDockable { dockable: NodeId, hide: bool },
    RestoreDockable { dockable: NodeId },
    DockAsDocument { dockable: NodeId },
    /// Host a detached root in a new floating window.
    OpenWindow {
        layout: NodeId,
        owner_root: NodeId,
        bounds: WindowBounds,
        owner_mode: DockWindowOwnerMode,
    },
    /// Drop a window record; its root stays in the arena, detached.
    CloseWindow { window: WindowId },
    SetWindowBounds {
        window: WindowId,
        bounds: WindowBounds,
    },
    SetActiveDockable {
        dock: NodeId,
        dockable: Option<NodeId>,
    },
    SetFocusedDockable {
        dock: NodeId,
        dockable: Option<NodeId>,
    },
    SetProportion {
        dockable: NodeId,
        #[serde(with = "nan_as_null")]
        proportion: f64,
    },
    SetConstraints {
        dockable: NodeId,
        constraints: SizeConstraints,
    },
    SetDockGroup {
        dockable: NodeId,
        group: Option<String>,
    },
    SetCapabilityFlags {
        dockable: NodeId,
        flags: CapabilityFlags,
    },
    SetCapabilityOverrides {
        dockable: NodeId,
        overrides: Option<CapabilityPolicy>,
    },
    SetDockPolicy {
        dock: NodeId,
        policy: Option<CapabilityPolicy>,
    },
    SetRootPolicy {
        root: NodeId,
        policy: Option<CapabilityPolicy>,
    },
    SetKeepPinnedVisible { dockable: NodeId, keep: bool },
    SetCollapsable { dock: NodeId, collapsable: bool },
}

/// Discriminant of [`DockMutation`] for journals and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockMutationKind {
    AddDockable,
    RemoveDockable,
    MoveDockable,
    SwapDockable,
    SplitToDock,
    FloatDockable,
    PinDockable,
    UnpinDockable,
    PreviewPinnedDockable,
    HidePreviewingDockables,
    TogglePreviewPinnedDockable,
    HideDockable,
    CloseDockable,
    RestoreDockable,
    DockAsDocument,
    OpenWindow,
    CloseWindow,
    SetWindowBounds,
    SetActiveDockable,
    SetFocusedDockable,
    SetProportion,
    SetConstraints,
    SetDockGroup,
    SetCapabilityFlags,
    SetCapabilityOverrides,
    SetDockPolicy,
    SetRootPolicy,
    SetKeepPinnedVisible,
    SetCollapsable,
}

impl DockMutation {
    #[must_use]
    pub const fn kind(&self) -> DockMutationKind {
        match self {
            Self::AddDockable { .. } => DockMutationKind::AddDockable,
            Self::RemoveDockable { .. } => DockMutationKind::RemoveDockable,
            Self::MoveDockable { .. } => DockMutationKind::MoveDockable,
            Self::SwapDockable { .. } => DockMutationKind::SwapDockable,
            Self::SplitToDock { .. } => DockMutationKind::SplitToDock,
            Self::FloatDockable { .. } => DockMutationKind::FloatDockable,
            Self::PinDockable { .. } => DockMutationKind::PinDockable,
            Self::UnpinDockable { .. } => DockMutationKind::UnpinDockable,
            Self::PreviewPinnedDockable { .. } => DockMutationKind::PreviewPinnedDockable,
            Self::HidePreviewingDockables { .. } => DockMutationKind::HidePreviewingDockables,
            Self::TogglePreviewPinnedDockable { .. } => {
                DockMutationKind::TogglePreviewPinnedDockable
            }
            Self::HideDockable { .. } => DockMutationKind::HideDockable,
            Self::CloseDockable { .. } => DockMutationKind::CloseDockable,
            Self::RestoreDockable { .. } => DockMutationKind::RestoreDockable,
            Self::DockAsDocument { .. } => DockMutationKind::DockAsDocument,
            Self::OpenWindow { .. } => DockMutationKind::OpenWindow,
            Self::CloseWindow { .. } => DockMutationKind::CloseWindow,
            Self::SetWindowBounds { .. } => DockMutationKind::SetWindowBounds,
            Self::SetActiveDockable { .. } => DockMutationKind::SetActiveDockable,
            Self::SetFocusedDockable { .. } => DockMutationKind::SetFocusedDockable,
            Self::SetProportion { .. } => DockMutationKind::SetProportion,
            Self::SetConstraints { .. } => DockMutationKind::SetConstraints,
            Self::SetDockGroup { .. } => DockMutationKind::SetDockGroup,
            Self::SetCapabilityFlags { .. } => DockMutationKind::SetCapabilityFlags,
            Self::SetCapabilityOverrides { .. } => DockMutationKind::SetCapabilityOverrides,
            Self::SetDockPolicy { .. } => DockMutationKind::SetDockPolicy,
            Self::SetRootPolicy { .. } => DockMutationKind::SetRootPolicy,
            Self::SetKeepPinnedVisible { .. } => DockMutationKind::SetKeepPinnedVisible,
            Self::SetCollapsable { .. } => DockMutationKind::SetCollapsable,
        }
    }

    /// Nodes named by the mutation itself.
    #[must_use]
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        match self {
            Self::AddDockable { dock, dockable } => vec![*dock, *dockable],
            Self::MoveDockable {
                dockable,
                target_dock,
                position,
            } => {
                let mut nodes = vec![*dockable, *target_dock];
                if let InsertPosition::Before(anchor) | InsertPosition::After(anchor) = position {
                    nodes.push(*anchor);
                }
                nodes
            }
            Self::SwapDockable { first, second } => vec![*first, *second],
            Self::SplitToDock {
                target, dockable, ..
            } => vec![*target, *dockable],
            Self::OpenWindow {
                layout, owner_root, ..
            } => vec![*layout, *owner_root],
            Self::CloseWindow { .. } | Self::SetWindowBounds { .. } => Vec::new(),
            Self::SetActiveDockable { dock, dockable }
            | Self::SetFocusedDockable { dock, dockable } => {
                let mut nodes = vec![*dock];
                nodes.extend(dockable);
                nodes
            }
            Self::HidePreviewingDockables { root } | Self::SetRootPolicy { root, .. } => {
                vec![*root]
            }
            Self::SetDockPolicy { dock, .. } | Self::SetCollapsable { dock, .. } => vec![*dock],
            Self::RemoveDockable { dockable, .. }
            | Self::FloatDockable { dockable, .. }
            | Self::PinDockable { dockable }
            | Self::UnpinDockable { dockable }
            | Self::PreviewPinnedDockable { dockable }
            | Self::TogglePreviewPinnedDockable { dockable }
            | Self::HideDockable { dockable }
            | Self::CloseDockable { dockable, .. }
            | Self::RestoreDockable { dockable }
            | Self::DockAsDocument { dockable }
            | Self::SetProportion { dockable, .. }
            | Self::SetConstraints { dockable, .. }
            | Self::SetDockGroup { dockable, .. }
            | Self::SetCapabilityFlags { dockable, .. }
            | Self::SetCapabilityOverrides { dockable, .. }
            | Self::SetKeepPinnedVisible { dockable, .. } => vec![*dockable],
        }
    }
}

/// Successful mutation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: DockMutationKind,
    pub touched_nodes: Vec<NodeId>,
    /// Nodes allocated by the engine (wrappers, splitters, roots).
    pub created_nodes: Vec<NodeId>,
    pub opened_windows: Vec<WindowId>,
    pub closed_windows: Vec<WindowId>,
    pub before_hash: u64,
    pub after_hash: u64,
}

/// Failure payload. The tree is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationError {
    pub kind: DockMutationKind,
    pub touched_nodes: Vec<NodeId>,
    pub before_hash: u64,
    pub after_hash: u64,
    pub reason: MutationFailure,
}

/// Structured reasons for a rejected mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationFailure {
    MissingNode {
        node_id: NodeId,
    },
    MissingWindow {
        window_id: WindowId,
    },
    NotADock {
        node_id: NodeId,
    },
    RootOperation {
        node_id: NodeId,
    },
    SplitterOperand {
        node_id: NodeId,
    },
    Detached {
        node_id: NodeId,
    },
    NotMember {
        container: NodeId,
        node_id: NodeId,
    },
    AlreadyAttached {
        node_id: NodeId,
    },
    SameNode {
        first: NodeId,
        second: NodeId,
    },
    AncestorConflict {
        ancestor: NodeId,
        descendant: NodeId,
    },
    InvalidOperation {
        node_id: NodeId,
        reason: &'static str,
    },
    CapabilityDenied {
        node_id: NodeId,
        capability: Capability,
    },
    GroupMismatch {
        source: NodeId,
        target: NodeId,
    },
    NotPinned {
        node_id: NodeId,
    },
    AlreadyPinned {
        node_id: NodeId,
    },
    NotToolDock {
        node_id: NodeId,
    },
    NotHidden {
        node_id: NodeId,
    },
    AlreadyHidden {
        node_id: NodeId,
    },
    NoDocumentDock {
        root: NodeId,
    },
    NoRestoreTarget {
        node_id: NodeId,
    },
    IncompatibleTarget {
        dock: NodeId,
        node_id: NodeId,
    },
    TargetRemovedByDetach {
        target: NodeId,
        detached: NodeId,
    },
    IdOverflow {
        current: u64,
    },
    Validation(DockModelError),
}

impl MutationFailure {
    /// Capability and group rules, as opposed to structural no-ops.
    #[must_use]
    pub const fn is_rule_rejection(&self) -> bool {
        matches!(
            self,
            Self::CapabilityDenied { .. } | Self::GroupMismatch { .. }
        )
    }
}

impl From<DockModelError> for MutationFailure {
    fn from(err: DockModelError) -> Self {
        match err {
            DockModelError::IdOverflow { current } => Self::IdOverflow { current },
            other => Self::Validation(other),
        }
    }
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNode { node_id } => write!(f, "node {node_id} not found"),
            Self::MissingWindow { window_id } => write!(f, "{window_id} not found"),
            Self::NotADock { node_id } => write!(f, "node {node_id} is not a dock"),
            Self::RootOperation { node_id } => {
                write!(f, "root {node_id} cannot be used as a dockable")
            }
            Self::SplitterOperand { node_id } => {
                write!(f, "splitter {node_id} is managed by the engine")
            }
            Self::Detached { node_id } => write!(f, "node {node_id} is detached"),
            Self::NotMember { container, node_id } => {
                write!(f, "node {node_id} is not a member of {container}")
            }
            Self::AlreadyAttached { node_id } => write!(f, "node {node_id} is already attached"),
            Self::SameNode { first, second } => write!(
                f,
                "operation requires distinct nodes, got {first} and {second}"
            ),
            Self::AncestorConflict {
                ancestor,
                descendant,
            } => write!(
                f,
                "operation would create cycle: node {ancestor} contains {descendant}"
            ),
            Self::InvalidOperation { node_id, reason } => write!(f, "node {node_id}: {reason}"),
            Self::CapabilityDenied {
                node_id,
                capability,
            } => write!(f, "{capability:?} denied for node {node_id}"),
            Self::GroupMismatch { source, target } => {
                write!(f, "dock group of {source} does not match {target}")
            }
            Self::NotPinned { node_id } => write!(f, "node {node_id} is not pinned"),
            Self::AlreadyPinned { node_id } => write!(f, "node {node_id} is already pinned"),
            Self::NotToolDock { node_id } => write!(f, "node {node_id} is not a tool dock"),
            Self::NotHidden { node_id } => write!(f, "node {node_id} is not hidden"),
            Self::AlreadyHidden { node_id } => write!(f, "node {node_id} is already hidden"),
            Self::NoDocumentDock { root } => write!(f, "root {root} has no document dock"),
            Self::NoRestoreTarget { node_id } => {
                write!(f, "no dock can take restored node {node_id}")
            }
            Self::IncompatibleTarget { dock, node_id } => {
                write!(f, "dock {dock} does not accept node {node_id}")
            }
            Self::TargetRemovedByDetach { target, detached } => write!(
                f,
                "target {target} would be removed while detaching {detached}"
            ),
            Self::IdOverflow { current } => write!(f, "id overflow after {current}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MutationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Validation(err) = self {
            return Some(err);
        }
        None
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dock mutation {:?} failed: {} [nodes={:?}, before_hash={:#x}, after_hash={:#x}]",
            self.kind,
            self.reason,
            self.touched_nodes
                .iter()
                .map(|node_id| node_id.get())
                .collect::<Vec<_>>(),
            self.before_hash,
            self.after_hash
        )
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

#[derive(Debug, Default)]
struct Scratch {
    touched: BTreeSet<NodeId>,
    created: Vec<NodeId>,
    opened: Vec<WindowId>,
    closed: Vec<WindowId>,
}

impl Scratch {
    fn touch(&mut self, node_id: NodeId) {
        self.touched.insert(node_id);
    }
}

type Step<T = ()> = Result<T, MutationFailure>;

impl DockTree {
    /// Apply one mutation atomically.
    ///
    /// The mutation runs on a cloned working tree. On success the clone
    /// replaces `self`; on failure `self` is unchanged.
    pub fn apply(&mut self, mutation: DockMutation) -> Result<MutationOutcome, MutationError> {
        let kind = mutation.kind();
        let before_hash = self.state_hash();
        let mut working = self.clone();
        let mut scratch = Scratch::default();
        scratch.touched.extend(mutation.referenced_nodes());

        let populated: Vec<WindowId> = working
            .windows
            .values()
            .filter(|window| working.root_has_content(window.layout))
            .map(|window| window.window_id)
            .collect();

        let result = working
            .apply_inner(mutation, &mut scratch)
            .and_then(|()| {
                working.repair_selection();
                working.reclaim_empty_windows(&populated, &mut scratch)
            })
            .and_then(|()| working.validate().map_err(MutationFailure::Validation));

        if let Err(reason) = result {
            return Err(MutationError {
                kind,
                touched_nodes: scratch.touched.into_iter().collect(),
                before_hash,
                after_hash: before_hash,
                reason,
            });
        }

        let after_hash = working.state_hash();
        let created_nodes = scratch
            .created
            .into_iter()
            .filter(|id| working.contains(*id))
            .collect();
        *self = working;

        Ok(MutationOutcome {
            kind,
            touched_nodes: scratch.touched.into_iter().collect(),
            created_nodes,
            opened_windows: scratch.opened,
            closed_windows: scratch.closed,
            before_hash,
            after_hash,
        })
    }

    /// Attach a detached dockable to `dock`.
    pub fn add_dockable(
        &mut self,
        dock: NodeId,
        dockable: NodeId,
    ) -> Result<MutationOutcome, MutationError> {
        self.apply(DockMutation::AddDockable { dock, dockable })
    }

    pub fn set_dock_group(
        &mut self,
        dockable: NodeId,
        group: Option<String>,
    ) -> Result<MutationOutcome, MutationError> {
        self.apply(DockMutation::SetDockGroup { dockable, group })
    }

    pub fn set_capability_overrides(
        &mut self,
        dockable: NodeId,
        overrides: Option<CapabilityPolicy>,
    ) -> Result<MutationOutcome, MutationError> {
        self.apply(DockMutation::SetCapabilityOverrides {
            dockable,
            overrides,
        })
    }

    pub fn set_dock_policy(
        &mut self,
        dock: NodeId,
        policy: Option<CapabilityPolicy>,
    ) -> Result<MutationOutcome, MutationError> {
        self.apply(DockMutation::SetDockPolicy { dock, policy })
    }

    pub fn set_root_policy(
        &mut self,
        root: NodeId,
        policy: Option<CapabilityPolicy>,
    ) -> Result<MutationOutcome, MutationError> {
        self.apply(DockMutation::SetRootPolicy { root, policy })
    }

    fn apply_inner(&mut self, mutation: DockMutation, scratch: &mut Scratch) -> Step {
        match mutation {
            DockMutation::AddDockable { dock, dockable } => {
                self.apply_add(dock, dockable, scratch)
            }
            DockMutation::RemoveDockable { dockable, collapse } => {
                self.apply_remove(dockable, collapse, scratch)
            }
            DockMutation::MoveDockable {
                dockable,
                target_dock,
                position,
            } => self.apply_move(dockable, target_dock, position, scratch),
            DockMutation::SwapDockable { first, second } => {
                self.apply_swap(first, second, scratch)
            }
            DockMutation::SplitToDock {
                target,
                dockable,
                operation,
                wrap,
            } => self.apply_split(target, dockable, operation, wrap, scratch),
            DockMutation::FloatDockable { dockable, bounds } => {
                self.apply_float(dockable, bounds, scratch)
            }
            DockMutation::PinDockable { dockable } => self.apply_pin(dockable, scratch),
            DockMutation::UnpinDockable { dockable } => self.apply_unpin(dockable, scratch),
            DockMutation::PreviewPinnedDockable { dockable } => {
                self.apply_preview(dockable, scratch)
            }
            DockMutation::HidePreviewingDockables { root } => {
                self.apply_hide_previews(root, scratch)
            }
            DockMutation::TogglePreviewPinnedDockable { dockable } => {
                match self.location(dockable) {
                    Some(DockLocation::Pinned {
                        root,
                        previewed: true,
                        ..
                    }) => {
                        self.close_preview_slot(root, scratch);
                        Ok(())
                    }
                    _ => self.apply_preview(dockable, scratch),
                }
            }
            DockMutation::HideDockable { dockable } => self.apply_hide(dockable, scratch),
            DockMutation::CloseDockable { dockable, hide } => {
                self.require_dockable(dockable)?;
                self.require_capability(dockable, Capability::Close)?;
                if hide {
                    self.apply_hide(dockable, scratch)
                } else {
                    self.apply_remove(dockable, true, scratch)
                }
            }
            DockMutation::RestoreDockable { dockable } => self.apply_restore(dockable, scratch),
            DockMutation::DockAsDocument { dockable } => {
                self.apply_dock_as_document(dockable, scratch)
            }
            DockMutation::OpenWindow {
                layout,
                owner_root,
                bounds,
                owner_mode,
            } => self.apply_open_window(layout, owner_root, bounds, owner_mode, scratch),
            DockMutation::CloseWindow { window } => self.close_window(window, false, scratch),
            DockMutation::SetWindowBounds { window, bounds } => {
                let record = self
                    .windows
                    .get_mut(&window)
                    .ok_or(MutationFailure::MissingWindow { window_id: window })?;
                record.bounds = bounds;
                Ok(())
            }
            DockMutation::SetActiveDockable { dock, dockable } => {
                self.apply_set_active(dock, dockable)
            }
            DockMutation::SetFocusedDockable { dock, dockable } => {
                self.apply_set_focused(dock, dockable, scratch)
            }
            DockMutation::SetProportion {
                dockable,
                proportion,
            } => {
                if !(proportion.is_nan() || (proportion.is_finite() && proportion >= 0.0)) {
                    return Err(MutationFailure::InvalidOperation {
                        node_id: dockable,
                        reason: "proportion must be NaN or a finite non-negative value",
                    });
                }
                self.require_node_mut(dockable)?.proportion = proportion;
                Ok(())
            }
            DockMutation::SetConstraints {
                dockable,
                constraints,
            } => {
                self.require_node_mut(dockable)?.constraints = constraints;
                Ok(())
            }
            DockMutation::SetDockGroup { dockable, group } => {
                self.require_node_mut(dockable)?.dock_group = group;
                Ok(())
            }
            DockMutation::SetCapabilityFlags { dockable, flags } => {
                self.require_node_mut(dockable)?.flags = flags;
                Ok(())
            }
            DockMutation::SetCapabilityOverrides {
                dockable,
                overrides,
            } => {
                self.require_node_mut(dockable)?.capability_overrides = overrides;
                Ok(())
            }
            DockMutation::SetDockPolicy { dock, policy } => {
                self.require_dock(dock)?;
                if let Some(data) = self.dock_data_mut(dock) {
                    data.capability_policy = policy;
                }
                Ok(())
            }
            DockMutation::SetRootPolicy { root, policy } => {
                let data = self
                    .root_data_mut(root)
                    .ok_or(MutationFailure::NotADock { node_id: root })?;
                data.root_policy = policy;
                Ok(())
            }
            DockMutation::SetKeepPinnedVisible { dockable, keep } => {
                self.require_node_mut(dockable)?.keep_pinned_visible = keep;
                Ok(())
            }
            DockMutation::SetCollapsable { dock, collapsable } => {
                if self.require_dock(dock)?.dock_kind.is_root() {
                    return Err(MutationFailure::RootOperation { node_id: dock });
                }
                if let Some(data) = self.dock_data_mut(dock) {
                    data.collapsable = collapsable;
                }
                Ok(())
            }
        }
    }

    // ---------------------------------------------------------------------
    // Operand checks
    // ---------------------------------------------------------------------

    fn require_node_mut(&mut self, node_id: NodeId) -> Step<&mut DockNode> {
        self.node_mut(node_id)
            .ok_or(MutationFailure::MissingNode { node_id })
    }

    fn require_dock(&self, node_id: NodeId) -> Step<&DockData> {
        let node = self
            .node(node_id)
            .ok_or(MutationFailure::MissingNode { node_id })?;
        node.dock().ok_or(MutationFailure::NotADock { node_id })
    }

    /// A node that may be moved around: not a root, not a splitter.
    fn require_dockable(&self, node_id: NodeId) -> Step<&DockNode> {
        let node = self
            .node(node_id)
            .ok_or(MutationFailure::MissingNode { node_id })?;
        if node.kind.is_root() {
            return Err(MutationFailure::RootOperation { node_id });
        }
        if node.kind.is_splitter() {
            return Err(MutationFailure::SplitterOperand { node_id });
        }
        Ok(node)
    }

    fn require_capability(&self, node_id: NodeId, capability: Capability) -> Step {
        if self.effective_capability(node_id, capability) {
            Ok(())
        } else {
            Err(MutationFailure::CapabilityDenied {
                node_id,
                capability,
            })
        }
    }

    fn require_accepts(&self, dock: NodeId, node_id: NodeId) -> Step {
        let data = self.require_dock(dock)?;
        let node = self
            .node(node_id)
            .ok_or(MutationFailure::MissingNode { node_id })?;
        if data.dock_kind.accepts(&node.kind) {
            Ok(())
        } else {
            Err(MutationFailure::IncompatibleTarget { dock, node_id })
        }
    }

    fn is_splitter(&self, node_id: NodeId) -> bool {
        self.node(node_id).is_some_and(|node| node.kind.is_splitter())
    }

    fn is_content(&self, node_id: NodeId) -> bool {
        self.node(node_id).is_some_and(|node| node.kind.is_content())
    }

    // ---------------------------------------------------------------------
    // Primitives
    // ---------------------------------------------------------------------

    /// Detach `node_id` from whatever list holds it. Returns the visible dock
    /// it left, if any. No cleanup or collapse happens here.
    fn take(&mut self, node_id: NodeId, scratch: &mut Scratch) -> Step<Option<NodeId>> {
        let location = self
            .location(node_id)
            .ok_or(MutationFailure::Detached { node_id })?;
        let source = match location {
            DockLocation::Root => return Err(MutationFailure::RootOperation { node_id }),
            DockLocation::PreviewSlot { .. } => {
                return Err(MutationFailure::InvalidOperation {
                    node_id,
                    reason: "preview slots are managed by the engine",
                });
            }
            DockLocation::Visible { dock, index } => {
                if let Some(data) = self.dock_data_mut(dock) {
                    data.visible.remove(index);
                }
                scratch.touch(dock);
                Some(dock)
            }
            DockLocation::Pinned {
                root, previewed, ..
            } => {
                if previewed {
                    self.close_preview_slot(root, scratch);
                }
                if let Some(data) = self.root_data_mut(root) {
                    data.unpin_entry(node_id);
                }
                scratch.touch(root);
                None
            }
            DockLocation::Hidden { root } => {
                if let Some(data) = self.root_data_mut(root) {
                    data.hidden.retain(|id| *id != node_id);
                }
                scratch.touch(root);
                None
            }
        };
        if let Some(node) = self.node_mut(node_id) {
            node.owner = None;
            node.original_owner = None;
        }
        Ok(source)
    }

    /// Insert into `dock`'s visible list and take ownership. Proportional
    /// docks get a splitter between the new content and content neighbors.
    fn insert_visible(
        &mut self,
        dock: NodeId,
        node_id: NodeId,
        position: InsertPosition,
        scratch: &mut Scratch,
    ) -> Step {
        self.require_accepts(dock, node_id)?;
        if dock == node_id || self.is_descendant(node_id, dock) {
            return Err(MutationFailure::AncestorConflict {
                ancestor: node_id,
                descendant: dock,
            });
        }
        let data = self.require_dock(dock)?;
        let index = match position {
            InsertPosition::Append => data.visible.len(),
            InsertPosition::Before(anchor) => data.position_of(anchor).ok_or(
                MutationFailure::NotMember {
                    container: dock,
                    node_id: anchor,
                },
            )?,
            InsertPosition::After(anchor) => {
                data.position_of(anchor)
                    .ok_or(MutationFailure::NotMember {
                        container: dock,
                        node_id: anchor,
                    })?
                    + 1
            }
        };
        let proportional = data.dock_kind.supports_proportional_split();
        let content = self.is_content(node_id);

        if let Some(data) = self.dock_data_mut(dock) {
            data.visible.insert(index, node_id);
        }
        if let Some(node) = self.node_mut(node_id) {
            node.owner = Some(dock);
        }
        scratch.touch(dock);
        scratch.touch(node_id);

        if proportional && content {
            let mut at = index;
            if at > 0 && self.content_at(dock, at - 1) {
                self.insert_splitter(dock, at, scratch)?;
                at += 1;
            }
            if self.content_at(dock, at + 1) {
                self.insert_splitter(dock, at + 1, scratch)?;
            }
        }
        Ok(())
    }

    fn content_at(&self, dock: NodeId, index: usize) -> bool {
        self.dock_data(dock)
            .and_then(|data| data.visible.get(index))
            .is_some_and(|id| self.is_content(*id))
    }

    fn insert_splitter(&mut self, dock: NodeId, index: usize, scratch: &mut Scratch) -> Step {
        let label = format!("splitter-{}", self.next_node_id().get());
        let splitter = self.allocate_node(label, "", NodeKind::Splitter)?;
        if let Some(node) = self.node_mut(splitter) {
            node.owner = Some(dock);
        }
        if let Some(data) = self.dock_data_mut(dock) {
            data.visible.insert(index, splitter);
        }
        scratch.created.push(splitter);
        Ok(())
    }

    /// Strip leading, trailing and adjacent splitters; purge what was
    /// stripped.
    fn cleanup_splitters(&mut self, dock: NodeId, scratch: &mut Scratch) {
        let Some(data) = self.dock_data(dock) else {
            return;
        };
        let splitters: BTreeSet<NodeId> = data
            .visible
            .iter()
            .copied()
            .filter(|id| self.is_splitter(*id))
            .collect();
        if splitters.is_empty() {
            return;
        }
        let mut kept: Vec<NodeId> = Vec::with_capacity(data.visible.len());
        let mut stripped = Vec::new();
        for id in data.visible.iter().copied() {
            let leading_or_adjacent = kept.last().is_none_or(|last| splitters.contains(last));
            if splitters.contains(&id) && leading_or_adjacent {
                stripped.push(id);
                continue;
            }
            kept.push(id);
        }
        while kept.last().is_some_and(|last| splitters.contains(last)) {
            if let Some(id) = kept.pop() {
                stripped.push(id);
            }
        }
        if stripped.is_empty() {
            return;
        }
        if let Some(data) = self.dock_data_mut(dock) {
            data.visible = kept;
        }
        for id in stripped {
            self.nodes.remove(&id);
            scratch.touch(id);
        }
        scratch.touch(dock);
    }

    /// Whether anything but splitters still belongs to `dock`: visible
    /// content, or pinned dockables that call it home.
    fn has_dependents(&self, dock: NodeId) -> bool {
        self.nodes
            .values()
            .any(|node| node.owner == Some(dock) && node.kind.is_content())
    }

    /// Remove emptied collapsable docks, walking up until one is kept.
    fn collapse_chain(&mut self, start: NodeId, scratch: &mut Scratch) {
        let mut cursor = start;
        loop {
            let Some(data) = self.dock_data(cursor) else {
                return;
            };
            if !data.collapsable || data.dock_kind.is_root() || self.has_dependents(cursor) {
                return;
            }
            let Some(DockLocation::Visible {
                dock: parent,
                index,
            }) = self.location(cursor)
            else {
                return;
            };
            if let Some(parent_data) = self.dock_data_mut(parent) {
                parent_data.visible.remove(index);
            }
            self.purge(cursor, scratch);
            self.cleanup_splitters(parent, scratch);
            scratch.touch(parent);
            cursor = parent;
        }
    }

    /// Delete a content-free node from the arena and repoint references.
    fn purge(&mut self, node_id: NodeId, scratch: &mut Scratch) {
        let leftovers = self
            .dock_data(node_id)
            .map(|data| data.visible.clone())
            .unwrap_or_default();
        for child in leftovers {
            if self.is_splitter(child) {
                self.nodes.remove(&child);
            }
        }
        self.nodes.remove(&node_id);
        scratch.touch(node_id);

        let mut orphaned = Vec::new();
        for node in self.nodes.values_mut() {
            if node.owner == Some(node_id) {
                node.owner = None;
                orphaned.push(node.node_id);
            }
            if node.original_owner == Some(node_id) {
                node.original_owner = None;
            }
            if let Some(data) = node.dock_mut() {
                if data.active == Some(node_id) {
                    data.active = None;
                }
                if data.focused == Some(node_id) {
                    data.focused = None;
                }
            }
        }
        // Pinned dockables whose home vanished fall back to their root.
        for id in orphaned {
            if let Some(DockLocation::Pinned { root, .. } | DockLocation::Hidden { root }) =
                self.location(id)
                && let Some(node) = self.node_mut(id)
            {
                node.owner = Some(root);
            }
        }
        for window in self.windows.values_mut() {
            if window.origin == Some(node_id) {
                window.origin = None;
            }
        }
    }

    fn set_active(&mut self, dock: NodeId, node_id: NodeId) {
        if let Some(data) = self.dock_data_mut(dock) {
            data.active = Some(node_id);
        }
    }

    /// Wrap bare tools and documents in a matching dock. Docks pass through.
    fn wrap_dockable(
        &mut self,
        node_id: NodeId,
        alignment: Alignment,
        scratch: &mut Scratch,
    ) -> Step<NodeId> {
        let node = self.require_dockable(node_id)?;
        let label = format!("{}-dock", node.id);
        let is_tool = matches!(node.kind, NodeKind::Tool);
        let is_document = matches!(node.kind, NodeKind::Document);
        let wrapper = if is_tool {
            self.create_tool_dock(label, alignment)?
        } else if is_document {
            self.create_document_dock(label)?
        } else {
            return Ok(node_id);
        };
        scratch.created.push(wrapper);
        self.insert_visible(wrapper, node_id, InsertPosition::Append, scratch)?;
        self.set_active(wrapper, node_id);
        Ok(wrapper)
    }

    /// Place `new` beside `target` (which must be visible in some dock).
    fn split_beside(
        &mut self,
        target: NodeId,
        new: NodeId,
        operation: DockOperation,
        scratch: &mut Scratch,
    ) -> Step {
        let orientation = operation
            .orientation()
            .ok_or(MutationFailure::InvalidOperation {
                node_id: target,
                reason: "split needs a left, right, top or bottom operation",
            })?;
        let Some(DockLocation::Visible {
            dock: parent,
            index,
        }) = self.location(target)
        else {
            return Err(MutationFailure::Detached { node_id: target });
        };
        let parent_data = self.require_dock(parent)?;
        let same_axis = parent_data.dock_kind.supports_proportional_split()
            && parent_data.orientation == orientation;
        let parent_active = parent_data.active;
        let position = if operation.inserts_before() {
            InsertPosition::Before(target)
        } else {
            InsertPosition::After(target)
        };
        let proportion = self
            .node(target)
            .map_or(f64::NAN, |node| node.proportion);

        if same_axis {
            let half = proportion / 2.0;
            if let Some(node) = self.node_mut(target) {
                node.proportion = half;
            }
            if let Some(node) = self.node_mut(new) {
                node.proportion = proportion - half;
            }
            return self.insert_visible(parent, new, position, scratch);
        }

        let label = format!(
            "{}-split",
            self.node(target).map_or("dock", |node| node.id.as_str())
        );
        let wrapper = self.create_proportional_dock(label, orientation)?;
        scratch.created.push(wrapper);
        if let Some(data) = self.dock_data_mut(parent) {
            data.visible[index] = wrapper;
            if parent_active == Some(target) {
                data.active = Some(wrapper);
            }
        }
        if let Some(node) = self.node_mut(wrapper) {
            node.owner = Some(parent);
            node.proportion = proportion;
        }
        for id in [target, new] {
            if let Some(node) = self.node_mut(id) {
                node.owner = None;
                node.proportion = f64::NAN;
            }
        }
        self.insert_visible(wrapper, target, InsertPosition::Append, scratch)?;
        self.insert_visible(wrapper, new, position, scratch)?;
        self.set_active(wrapper, new);
        Ok(())
    }

    /// Return the previewed dockable (if any) to its home.
    fn close_preview_slot(&mut self, root: NodeId, scratch: &mut Scratch) {
        let Some(slot) = self.root_data(root).and_then(|data| data.pinned_dock) else {
            return;
        };
        let occupants = match self.dock_data_mut(slot) {
            Some(data) => {
                data.active = None;
                data.focused = None;
                std::mem::take(&mut data.visible)
            }
            None => return,
        };
        for occupant in occupants {
            let home = self
                .node(occupant)
                .and_then(|node| node.original_owner)
                .filter(|home| self.node(*home).is_some_and(|n| n.is_tool_dock()));
            if let Some(node) = self.node_mut(occupant) {
                node.owner = Some(home.unwrap_or(root));
                node.original_owner = None;
            }
            scratch.touch(occupant);
        }
        scratch.touch(slot);
    }

    fn ensure_preview_slot(
        &mut self,
        root: NodeId,
        alignment: Alignment,
        scratch: &mut Scratch,
    ) -> Step<NodeId> {
        if let Some(slot) = self.root_data(root).and_then(|data| data.pinned_dock)
            && self.contains(slot)
        {
            if let Some(data) = self.dock_data_mut(slot) {
                data.alignment = alignment;
            }
            return Ok(slot);
        }
        let label = format!(
            "{}-preview",
            self.node(root).map_or("root", |node| node.id.as_str())
        );
        let slot = self.create_tool_dock(label, alignment)?;
        scratch.created.push(slot);
        if let Some(node) = self.node_mut(slot) {
            node.owner = Some(root);
        }
        if let Some(data) = self.dock_data_mut(slot) {
            data.collapsable = false;
        }
        if let Some(data) = self.root_data_mut(root) {
            data.pinned_dock = Some(slot);
        }
        Ok(slot)
    }

    /// Close a window record. With `purge_root` the hosted root goes too.
    fn close_window(&mut self, window_id: WindowId, purge_root: bool, scratch: &mut Scratch) -> Step {
        let window = self
            .windows
            .remove(&window_id)
            .ok_or(MutationFailure::MissingWindow { window_id })?;
        if let Some(owner) = self.root_data_mut(window.owner_root) {
            owner.windows.retain(|id| *id != window_id);
        }
        let (owned, slot) = match self.root_data_mut(window.layout) {
            Some(data) => {
                data.window = None;
                (std::mem::take(&mut data.windows), data.pinned_dock)
            }
            None => (Vec::new(), None),
        };
        // Windows owned by the closed root move up to its owner.
        for child in owned {
            if let Some(record) = self.windows.get_mut(&child) {
                record.owner_root = window.owner_root;
            }
            if let Some(owner) = self.root_data_mut(window.owner_root) {
                owner.windows.push(child);
            }
        }
        if purge_root {
            if let Some(slot) = slot {
                self.purge(slot, scratch);
            }
            self.purge(window.layout, scratch);
        }
        scratch.touch(window.owner_root);
        scratch.closed.push(window_id);
        Ok(())
    }

    /// Active must be visible content; focus must stay inside its dock.
    fn repair_selection(&mut self) {
        let docks: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| node.is_dock())
            .map(|node| node.node_id)
            .collect();
        for dock in docks {
            let Some(data) = self.dock_data(dock) else {
                continue;
            };
            let active_ok = data
                .active
                .is_none_or(|id| data.visible.contains(&id) && self.is_content(id));
            let replacement = if active_ok {
                data.active
            } else {
                data.visible.iter().copied().find(|id| self.is_content(*id))
            };
            let focused = data
                .focused
                .filter(|id| self.is_descendant(dock, *id));
            if let Some(data) = self.dock_data_mut(dock) {
                data.active = replacement;
                data.focused = focused;
            }
        }
    }

    fn reclaim_empty_windows(&mut self, populated: &[WindowId], scratch: &mut Scratch) -> Step {
        for window_id in populated {
            let Some(layout) = self.windows.get(window_id).map(|window| window.layout) else {
                continue;
            };
            if !self.root_has_content(layout) {
                self.close_window(*window_id, true, scratch)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    fn apply_add(&mut self, dock: NodeId, dockable: NodeId, scratch: &mut Scratch) -> Step {
        self.require_dockable(dockable)?;
        self.require_dock(dock)?;
        if dock == dockable {
            return Err(MutationFailure::SameNode {
                first: dock,
                second: dockable,
            });
        }
        if self.location(dockable).is_some() {
            return Err(MutationFailure::AlreadyAttached { node_id: dockable });
        }
        if self.is_descendant(dockable, dock) {
            return Err(MutationFailure::AncestorConflict {
                ancestor: dockable,
                descendant: dock,
            });
        }
        if matches!(self.location(dock), Some(DockLocation::PreviewSlot { .. })) {
            return Err(MutationFailure::InvalidOperation {
                node_id: dock,
                reason: "preview slots are managed by the engine",
            });
        }
        self.insert_visible(dock, dockable, InsertPosition::Append, scratch)?;
        if self.dock_data(dock).is_some_and(|data| data.active.is_none()) {
            self.set_active(dock, dockable);
        }
        Ok(())
    }

    fn apply_remove(&mut self, dockable: NodeId, collapse: bool, scratch: &mut Scratch) -> Step {
        self.require_dockable(dockable)?;
        let source = self.take(dockable, scratch)?;
        if let Some(source) = source {
            self.cleanup_splitters(source, scratch);
            if collapse {
                self.collapse_chain(source, scratch);
            }
        }
        Ok(())
    }

    /// Shared tail of move-like mutations.
    fn move_into(
        &mut self,
        dockable: NodeId,
        target: NodeId,
        position: InsertPosition,
        scratch: &mut Scratch,
    ) -> Step {
        let source = self.take(dockable, scratch)?;
        if let Some(source) = source {
            self.cleanup_splitters(source, scratch);
        }
        self.insert_visible(target, dockable, position, scratch)?;
        self.set_active(target, dockable);
        if let Some(source) = source
            && source != target
        {
            self.collapse_chain(source, scratch);
        }
        Ok(())
    }

    fn apply_move(
        &mut self,
        dockable: NodeId,
        target: NodeId,
        position: InsertPosition,
        scratch: &mut Scratch,
    ) -> Step {
        self.require_dockable(dockable)?;
        self.require_dock(target)?;
        if dockable == target {
            return Err(MutationFailure::SameNode {
                first: dockable,
                second: target,
            });
        }
        if self.is_descendant(dockable, target) {
            return Err(MutationFailure::AncestorConflict {
                ancestor: dockable,
                descendant: target,
            });
        }
        if self.location(dockable).is_none() {
            return Err(MutationFailure::Detached { node_id: dockable });
        }
        match self.location(target) {
            Some(DockLocation::PreviewSlot { .. }) => {
                return Err(MutationFailure::InvalidOperation {
                    node_id: target,
                    reason: "preview slots are managed by the engine",
                });
            }
            _ if !self.is_attached(target) => {
                return Err(MutationFailure::Detached { node_id: target });
            }
            _ => {}
        }
        if let InsertPosition::Before(anchor) | InsertPosition::After(anchor) = position {
            if anchor == dockable {
                return Err(MutationFailure::InvalidOperation {
                    node_id: anchor,
                    reason: "a dockable cannot be positioned relative to itself",
                });
            }
            if self.is_splitter(anchor) {
                return Err(MutationFailure::SplitterOperand { node_id: anchor });
            }
        }
        self.require_accepts(target, dockable)?;
        self.move_into(dockable, target, position, scratch)
    }

    fn apply_swap(&mut self, first: NodeId, second: NodeId, scratch: &mut Scratch) -> Step {
        self.require_dockable(first)?;
        self.require_dockable(second)?;
        if first == second {
            return Err(MutationFailure::SameNode { first, second });
        }
        for (ancestor, descendant) in [(first, second), (second, first)] {
            if self.is_descendant(ancestor, descendant) {
                return Err(MutationFailure::AncestorConflict {
                    ancestor,
                    descendant,
                });
            }
        }
        let visible = |location: Option<DockLocation>, node_id: NodeId| match location {
            Some(DockLocation::Visible { dock, index }) => Ok((dock, index)),
            _ => Err(MutationFailure::InvalidOperation {
                node_id,
                reason: "swap needs two visible dockables",
            }),
        };
        let (first_dock, first_index) = visible(self.location(first), first)?;
        let (second_dock, second_index) = visible(self.location(second), second)?;

        if first_dock == second_dock {
            if let Some(data) = self.dock_data_mut(first_dock) {
                data.visible.swap(first_index, second_index);
            }
            scratch.touch(first_dock);
            return Ok(());
        }

        self.require_accepts(first_dock, second)?;
        self.require_accepts(second_dock, first)?;
        for (dock, index, incoming, outgoing) in [
            (first_dock, first_index, second, first),
            (second_dock, second_index, first, second),
        ] {
            if let Some(data) = self.dock_data_mut(dock) {
                data.visible[index] = incoming;
                if data.active == Some(outgoing) {
                    data.active = Some(incoming);
                }
            }
            if let Some(node) = self.node_mut(incoming) {
                node.owner = Some(dock);
            }
            scratch.touch(dock);
        }
        Ok(())
    }

    fn apply_split(
        &mut self,
        target: NodeId,
        dockable: NodeId,
        operation: DockOperation,
        wrap: bool,
        scratch: &mut Scratch,
    ) -> Step {
        if self.require_dock(target)?.dock_kind.is_root() {
            return Err(MutationFailure::RootOperation { node_id: target });
        }
        self.require_dockable(dockable)?;
        if dockable == target {
            return Err(MutationFailure::SameNode {
                first: target,
                second: dockable,
            });
        }
        if !operation.is_split() {
            return Err(MutationFailure::InvalidOperation {
                node_id: target,
                reason: "split needs a left, right, top or bottom operation",
            });
        }
        if self.is_descendant(dockable, target) {
            return Err(MutationFailure::AncestorConflict {
                ancestor: dockable,
                descendant: target,
            });
        }
        if !matches!(self.location(target), Some(DockLocation::Visible { .. })) {
            return Err(MutationFailure::Detached { node_id: target });
        }

        let source = if self.location(dockable).is_some() {
            self.take(dockable, scratch)?
        } else {
            None
        };
        if let Some(source) = source {
            self.cleanup_splitters(source, scratch);
        }
        // Splitting a dock beside its own last dockable would leave the
        // target empty and collapse it right after.
        let target_emptied = source == Some(target)
            && !self.has_dependents(target)
            && self.dock_data(target).is_some_and(|data| data.collapsable);
        if target_emptied || !matches!(self.location(target), Some(DockLocation::Visible { .. })) {
            return Err(MutationFailure::TargetRemovedByDetach {
                target,
                detached: dockable,
            });
        }

        let new = if wrap {
            self.wrap_dockable(dockable, alignment_for(operation), scratch)?
        } else {
            dockable
        };
        self.split_beside(target, new, operation, scratch)?;
        if let Some(source) = source {
            self.collapse_chain(source, scratch);
        }
        Ok(())
    }

    fn apply_float(&mut self, dockable: NodeId, bounds: WindowBounds, scratch: &mut Scratch) -> Step {
        let node = self.require_dockable(dockable)?;
        let (owner, original_owner) = (node.owner, node.original_owner);
        let (label, title) = (node.id.clone(), node.title.clone());
        self.require_capability(dockable, Capability::Float)?;
        let location = self
            .location(dockable)
            .ok_or(MutationFailure::Detached { node_id: dockable })?;
        let owner_root = self
            .root_of(dockable)
            .ok_or(MutationFailure::Detached { node_id: dockable })?;
        let origin = match location {
            DockLocation::Visible { dock, .. } => Some(dock),
            DockLocation::Pinned {
                previewed: true, ..
            }
            | DockLocation::Hidden { .. } => original_owner,
            DockLocation::Pinned { .. } => owner,
            DockLocation::PreviewSlot { .. } | DockLocation::Root => None,
        };
        let alignment = origin
            .and_then(|id| self.dock_data(id))
            .map(|data| data.alignment)
            .unwrap_or_default();

        let source = self.take(dockable, scratch)?;
        if let Some(source) = source {
            self.cleanup_splitters(source, scratch);
        }
        let content = self.wrap_dockable(dockable, alignment, scratch)?;
        let root = self.create_root_dock(format!("{label}-root"))?;
        scratch.created.push(root);
        self.insert_visible(root, content, InsertPosition::Append, scratch)?;
        self.set_active(root, content);

        let window_id = self.allocate_window_id()?;
        self.windows.insert(
            window_id,
            DockWindow {
                window_id,
                id: format!("{label}-window"),
                title,
                layout: root,
                owner_root,
                bounds,
                owner_mode: DockWindowOwnerMode::Default,
                origin,
            },
        );
        if let Some(data) = self.root_data_mut(root) {
            data.window = Some(window_id);
        }
        if let Some(data) = self.root_data_mut(owner_root) {
            data.windows.push(window_id);
        }
        scratch.opened.push(window_id);
        scratch.touch(owner_root);

        if let Some(source) = source {
            self.collapse_chain(source, scratch);
        }
        Ok(())
    }

    fn apply_pin(&mut self, dockable: NodeId, scratch: &mut Scratch) -> Step {
        let node = self.require_dockable(dockable)?;
        if !matches!(node.kind, NodeKind::Tool) {
            return Err(MutationFailure::InvalidOperation {
                node_id: dockable,
                reason: "only tools can be pinned",
            });
        }
        let (dock, index) = match self.location(dockable) {
            Some(DockLocation::Visible { dock, index }) => (dock, index),
            Some(DockLocation::Pinned { .. }) => {
                return Err(MutationFailure::AlreadyPinned { node_id: dockable });
            }
            Some(DockLocation::Hidden { .. }) => {
                return Err(MutationFailure::InvalidOperation {
                    node_id: dockable,
                    reason: "hidden dockables must be restored before pinning",
                });
            }
            _ => return Err(MutationFailure::Detached { node_id: dockable }),
        };
        let home = self
            .node(dock)
            .ok_or(MutationFailure::MissingNode { node_id: dock })?;
        if !home.is_tool_dock() {
            return Err(MutationFailure::NotToolDock { node_id: dock });
        }
        let alignment = home.dock().map(|data| data.alignment).unwrap_or_default();
        self.require_capability(dockable, Capability::Pin)?;
        let root = self
            .root_of(dock)
            .ok_or(MutationFailure::Detached { node_id: dock })?;

        if let Some(data) = self.dock_data_mut(dock) {
            data.visible.remove(index);
        }
        if let Some(data) = self.root_data_mut(root) {
            data.pinned_list_mut(alignment).push(dockable);
        }
        scratch.touch(dock);
        scratch.touch(root);
        Ok(())
    }

    fn apply_unpin(&mut self, dockable: NodeId, scratch: &mut Scratch) -> Step {
        self.require_dockable(dockable)?;
        let Some(DockLocation::Pinned {
            root,
            alignment,
            previewed,
        }) = self.location(dockable)
        else {
            return Err(MutationFailure::NotPinned { node_id: dockable });
        };
        self.require_capability(dockable, Capability::Pin)?;
        if previewed {
            self.close_preview_slot(root, scratch);
        }
        let home = self.node(dockable).and_then(|node| node.owner);
        self.take(dockable, scratch)?;
        let target = self.unpin_target(root, home, alignment, scratch)?;
        self.insert_visible(target, dockable, InsertPosition::Append, scratch)?;
        self.set_active(target, dockable);
        Ok(())
    }

    /// Home if still usable, else another tool dock on the same side, else a
    /// new tool dock split beside the root's layout.
    ///
    /// The dockable is appended to the target, not returned to its former
    /// index.
    fn unpin_target(
        &mut self,
        root: NodeId,
        home: Option<NodeId>,
        alignment: Alignment,
        scratch: &mut Scratch,
    ) -> Step<NodeId> {
        let usable = |tree: &Self, dock: NodeId| {
            tree.node(dock).is_some_and(|node| node.is_tool_dock())
                && matches!(tree.location(dock), Some(DockLocation::Visible { .. }))
                && tree.root_of(dock) == Some(root)
                && tree
                    .dock_data(dock)
                    .is_some_and(|data| data.alignment.normalized() == alignment.normalized())
        };
        if let Some(home) = home.filter(|home| usable(self, *home)) {
            return Ok(home);
        }
        if let Some(other) = self
            .descendant_docks(root)
            .into_iter()
            .find(|dock| usable(self, *dock))
        {
            return Ok(other);
        }

        let label = format!(
            "{}-tools",
            self.node(root).map_or("root", |node| node.id.as_str())
        );
        let dock = self.create_tool_dock(label, alignment.normalized())?;
        scratch.created.push(dock);
        let anchor = self.root_data(root).and(self.dock_data(root)).and_then(|data| {
            data.active
                .filter(|id| self.dock_data(*id).is_some())
                .or_else(|| {
                    data.visible
                        .iter()
                        .copied()
                        .find(|id| self.dock_data(*id).is_some())
                })
        });
        match anchor {
            Some(anchor) => self.split_beside(anchor, dock, alignment.split_operation(), scratch)?,
            None => self.insert_visible(root, dock, InsertPosition::Append, scratch)?,
        }
        Ok(dock)
    }

    fn apply_preview(&mut self, dockable: NodeId, scratch: &mut Scratch) -> Step {
        self.require_dockable(dockable)?;
        let Some(DockLocation::Pinned {
            root,
            alignment,
            previewed,
        }) = self.location(dockable)
        else {
            return Err(MutationFailure::NotPinned { node_id: dockable });
        };
        if previewed {
            return Ok(());
        }
        let slot = self.ensure_preview_slot(root, alignment, scratch)?;
        self.close_preview_slot(root, scratch);
        if let Some(node) = self.node_mut(dockable) {
            node.original_owner = node.owner;
            node.owner = Some(slot);
        }
        if let Some(data) = self.dock_data_mut(slot) {
            data.visible = vec![dockable];
            data.active = Some(dockable);
        }
        scratch.touch(slot);
        Ok(())
    }

    fn apply_hide_previews(&mut self, root: NodeId, scratch: &mut Scratch) -> Step {
        let data = self
            .root_data(root)
            .ok_or(MutationFailure::NotADock { node_id: root })?;
        let occupant = data
            .pinned_dock
            .and_then(|slot| self.dock_data(slot))
            .and_then(|slot| slot.visible.first().copied());
        let keep = occupant
            .and_then(|id| self.node(id))
            .is_some_and(|node| node.keep_pinned_visible);
        if occupant.is_some() && !keep {
            self.close_preview_slot(root, scratch);
        }
        Ok(())
    }

    fn apply_hide(&mut self, dockable: NodeId, scratch: &mut Scratch) -> Step {
        let node = self.require_dockable(dockable)?;
        let (owner, original_owner) = (node.owner, node.original_owner);
        let former = match self.location(dockable) {
            Some(DockLocation::Visible { dock, .. }) => Some(dock),
            Some(DockLocation::Pinned {
                previewed: true, ..
            }) => original_owner,
            Some(DockLocation::Pinned { .. }) => owner,
            Some(DockLocation::Hidden { .. }) => {
                return Err(MutationFailure::AlreadyHidden { node_id: dockable });
            }
            Some(DockLocation::PreviewSlot { .. }) => {
                return Err(MutationFailure::InvalidOperation {
                    node_id: dockable,
                    reason: "preview slots are managed by the engine",
                });
            }
            Some(DockLocation::Root) => {
                return Err(MutationFailure::RootOperation { node_id: dockable });
            }
            None => return Err(MutationFailure::Detached { node_id: dockable }),
        };
        let root = self
            .root_of(dockable)
            .ok_or(MutationFailure::Detached { node_id: dockable })?;
        let source = self.take(dockable, scratch)?;
        if let Some(source) = source {
            self.cleanup_splitters(source, scratch);
        }
        if let Some(data) = self.root_data_mut(root) {
            data.hidden.push(dockable);
        }
        if let Some(node) = self.node_mut(dockable) {
            node.owner = Some(root);
            node.original_owner = former.filter(|id| *id != root);
        }
        scratch.touch(root);
        Ok(())
    }

    fn apply_restore(&mut self, dockable: NodeId, scratch: &mut Scratch) -> Step {
        let node = self.require_dockable(dockable)?;
        let original_owner = node.original_owner;
        let Some(DockLocation::Hidden { root }) = self.location(dockable) else {
            return Err(MutationFailure::NotHidden { node_id: dockable });
        };
        let usable = |tree: &Self, dock: NodeId| {
            tree.require_accepts(dock, dockable).is_ok()
                && tree
                    .dock_data(dock)
                    .is_some_and(|data| !data.dock_kind.is_root())
                && matches!(tree.location(dock), Some(DockLocation::Visible { .. }))
                && tree.root_of(dock) == Some(root)
                && !tree.is_descendant(dockable, dock)
        };
        // Tabbed docks first so documents land among documents rather than
        // directly in a proportional layout.
        let candidates = self.descendant_docks(root);
        let tabbed = |tree: &Self, dock: NodeId| {
            tree.dock_data(dock)
                .is_some_and(|data| data.dock_kind.is_tabbed())
        };
        let target = original_owner
            .filter(|dock| usable(self, *dock))
            .or_else(|| {
                candidates
                    .iter()
                    .copied()
                    .find(|dock| tabbed(self, *dock) && usable(self, *dock))
            })
            .or_else(|| candidates.iter().copied().find(|dock| usable(self, *dock)))
            .ok_or(MutationFailure::NoRestoreTarget { node_id: dockable })?;
        self.take(dockable, scratch)?;
        self.insert_visible(target, dockable, InsertPosition::Append, scratch)?;
        self.set_active(target, dockable);
        Ok(())
    }

    fn apply_dock_as_document(&mut self, dockable: NodeId, scratch: &mut Scratch) -> Step {
        let node = self.require_dockable(dockable)?;
        if !matches!(node.kind, NodeKind::Tool) {
            return Err(MutationFailure::InvalidOperation {
                node_id: dockable,
                reason: "only tools can be docked as documents",
            });
        }
        let owner = node.owner;
        let source_group = node.dock_group.clone();
        let root = self
            .root_of(dockable)
            .ok_or(MutationFailure::Detached { node_id: dockable })?;
        let target = self
            .descendant_docks(root)
            .into_iter()
            .find(|dock| self.node(*dock).is_some_and(|n| n.is_document_dock()))
            .ok_or(MutationFailure::NoDocumentDock { root })?;
        if owner == Some(target)
            && matches!(self.location(dockable), Some(DockLocation::Visible { .. }))
        {
            return Err(MutationFailure::InvalidOperation {
                node_id: dockable,
                reason: "already docked in the document dock",
            });
        }
        self.require_capability(dockable, Capability::Drag)?;
        self.require_capability(target, Capability::Drop)?;
        let target_group = self.node(target).and_then(|n| n.dock_group.clone());
        if !validate_local_docking(source_group.as_deref(), target_group.as_deref()) {
            return Err(MutationFailure::GroupMismatch {
                source: dockable,
                target,
            });
        }
        self.move_into(dockable, target, InsertPosition::Append, scratch)
    }

    fn apply_open_window(
        &mut self,
        layout: NodeId,
        owner_root: NodeId,
        bounds: WindowBounds,
        owner_mode: DockWindowOwnerMode,
        scratch: &mut Scratch,
    ) -> Step {
        let data = self
            .root_data(layout)
            .ok_or(MutationFailure::InvalidOperation {
                node_id: layout,
                reason: "window layout must be a root dock",
            })?;
        if layout == self.main_root || data.window.is_some() {
            return Err(MutationFailure::AlreadyAttached { node_id: layout });
        }
        if self.root_data(owner_root).is_none() {
            return Err(MutationFailure::NotADock {
                node_id: owner_root,
            });
        }
        if !self.is_root_attached(owner_root) {
            return Err(MutationFailure::Detached {
                node_id: owner_root,
            });
        }
        let (label, title) = self
            .node(layout)
            .map(|node| (node.id.clone(), node.title.clone()))
            .unwrap_or_default();
        let window_id = self.allocate_window_id()?;
        self.windows.insert(
            window_id,
            DockWindow {
                window_id,
                id: format!("{label}-window"),
                title,
                layout,
                owner_root,
                bounds,
                owner_mode,
                origin: None,
            },
        );
        if let Some(data) = self.root_data_mut(layout) {
            data.window = Some(window_id);
        }
        if let Some(data) = self.root_data_mut(owner_root) {
            data.windows.push(window_id);
        }
        scratch.opened.push(window_id);
        scratch.touch(owner_root);
        Ok(())
    }

    fn apply_set_active(&mut self, dock: NodeId, dockable: Option<NodeId>) -> Step {
        let data = self.require_dock(dock)?;
        if let Some(id) = dockable {
            if self.is_splitter(id) {
                return Err(MutationFailure::SplitterOperand { node_id: id });
            }
            if data.position_of(id).is_none() {
                return Err(MutationFailure::NotMember {
                    container: dock,
                    node_id: id,
                });
            }
        }
        if let Some(data) = self.dock_data_mut(dock) {
            data.active = dockable;
        }
        Ok(())
    }

    /// Focus `dockable` in `dock` and in every dock between them.
    fn apply_set_focused(
        &mut self,
        dock: NodeId,
        dockable: Option<NodeId>,
        scratch: &mut Scratch,
    ) -> Step {
        self.require_dock(dock)?;
        let Some(id) = dockable else {
            if let Some(data) = self.dock_data_mut(dock) {
                data.focused = None;
            }
            return Ok(());
        };
        if self.is_splitter(id) {
            return Err(MutationFailure::SplitterOperand { node_id: id });
        }
        if !self.is_descendant(dock, id) {
            return Err(MutationFailure::NotMember {
                container: dock,
                node_id: id,
            });
        }
        let mut cursor = self.container_of(id);
        while let Some(current) = cursor {
            if let Some(data) = self.dock_data_mut(current) {
                data.focused = Some(id);
            }
            scratch.touch(current);
            if current == dock {
                break;
            }
            cursor = self.container_of(current);
        }
        Ok(())
    }
}

const fn alignment_for(operation: DockOperation) -> Alignment {
    match operation {
        DockOperation::Left => Alignment::Left,
        DockOperation::Right => Alignment::Right,
        DockOperation::Top => Alignment::Top,
        DockOperation::Bottom => Alignment::Bottom,
        DockOperation::Fill | DockOperation::Window | DockOperation::None => Alignment::Unset,
    }
}
