#![forbid(unsafe_code)]

//! Structural invariant diagnostics.
//!
//! [`build_invariant_report`] walks the arena once, derives every membership
//! from the containers' lists, and reports each violation as a stable
//! [`DockInvariantCode`]. [`DockTree::validate`] turns the first error-level
//! finding into a [`DockModelError`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::DockModelError;
use crate::id::{NodeId, WindowId};
use crate::model::{DockKind, NodeKind};
use crate::tree::DockTree;

/// Severity for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockInvariantSeverity {
    Error,
    Warning,
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockInvariantCode {
    UnsupportedSchemaVersion,
    MissingMainRoot,
    MainRootNotRoot,
    MainRootHasWindow,
    DanglingReference,
    MissingWindow,
    RootHasOwner,
    OrphanOwner,
    OwnerMismatch,
    MultipleMemberships,
    DuplicateListEntry,
    InvalidChildKind,
    SplitterOutsideProportional,
    SplitterPlacement,
    ActiveNotVisible,
    FocusedNotDescendant,
    PinnedOwnerInvalid,
    PreviewSlotOverflow,
    PreviewNotPinned,
    CycleDetected,
    WindowRootMismatch,
    WindowListing,
    InvalidProportion,
    DuplicateStringId,
    NextIdNotGreaterThanExisting,
}

/// One actionable invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockInvariantIssue {
    pub code: DockInvariantCode,
    pub severity: DockInvariantSeverity,
    pub node_id: Option<NodeId>,
    pub related_node: Option<NodeId>,
    pub message: String,
}

/// Structured invariant report over a dock tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockInvariantReport {
    pub state_hash: u64,
    pub issues: Vec<DockInvariantIssue>,
}

impl DockInvariantReport {
    /// Return true if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == DockInvariantSeverity::Error)
    }

    /// First error-level finding as a model error.
    #[must_use]
    pub fn first_error(&self) -> Option<DockModelError> {
        self.issues
            .iter()
            .find(|issue| issue.severity == DockInvariantSeverity::Error)
            .map(|issue| DockModelError::InvariantViolation {
                code: issue.code,
                node_id: issue.node_id,
                message: issue.message.clone(),
            })
    }

    /// Distinct codes present, in code order.
    #[must_use]
    pub fn codes(&self) -> Vec<DockInvariantCode> {
        self.issues
            .iter()
            .map(|issue| issue.code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// How a node is referenced by a container list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Visible(NodeId),
    Pinned(NodeId),
    Hidden(NodeId),
    PreviewSlot(NodeId),
}

impl Membership {
    const fn container(self) -> NodeId {
        match self {
            Self::Visible(id) | Self::Pinned(id) | Self::Hidden(id) | Self::PreviewSlot(id) => id,
        }
    }
}

struct Collector {
    issues: Vec<DockInvariantIssue>,
}

impl Collector {
    fn error(
        &mut self,
        code: DockInvariantCode,
        node_id: Option<NodeId>,
        related_node: Option<NodeId>,
        message: String,
    ) {
        self.issues.push(DockInvariantIssue {
            code,
            severity: DockInvariantSeverity::Error,
            node_id,
            related_node,
            message,
        });
    }

    fn warning(&mut self, code: DockInvariantCode, node_id: Option<NodeId>, message: String) {
        self.issues.push(DockInvariantIssue {
            code,
            severity: DockInvariantSeverity::Warning,
            node_id,
            related_node: None,
            message,
        });
    }
}

/// Inspect every structural invariant of `tree`.
#[must_use]
pub fn build_invariant_report(tree: &DockTree) -> DockInvariantReport {
    let mut out = Collector { issues: Vec::new() };
    let nodes = &tree.nodes;

    match nodes.get(&tree.main_root) {
        None => out.error(
            DockInvariantCode::MissingMainRoot,
            Some(tree.main_root),
            None,
            "main root is not in the arena".to_string(),
        ),
        Some(node) => match node.dock().and_then(|dock| dock.root()) {
            None => out.error(
                DockInvariantCode::MainRootNotRoot,
                Some(tree.main_root),
                None,
                format!("main root is a {} node", node.kind.label()),
            ),
            Some(root) if root.window.is_some() => out.error(
                DockInvariantCode::MainRootHasWindow,
                Some(tree.main_root),
                None,
                "main root must not be hosted by a floating window".to_string(),
            ),
            Some(_) => {}
        },
    }

    // Memberships derived from container lists.
    let mut memberships: BTreeMap<NodeId, Vec<Membership>> = BTreeMap::new();
    let mut window_listings: BTreeMap<WindowId, Vec<NodeId>> = BTreeMap::new();

    for node in nodes.values() {
        let Some(dock) = node.dock() else {
            continue;
        };
        let mut seen = BTreeSet::new();
        for child in &dock.visible {
            if !seen.insert(*child) {
                out.error(
                    DockInvariantCode::DuplicateListEntry,
                    Some(node.node_id),
                    Some(*child),
                    format!("{child} appears twice in visible list"),
                );
                continue;
            }
            memberships
                .entry(*child)
                .or_default()
                .push(Membership::Visible(node.node_id));
        }
        let Some(root) = dock.root() else {
            continue;
        };
        let mut seen = BTreeSet::new();
        for child in root.pinned() {
            if !seen.insert(child) {
                out.error(
                    DockInvariantCode::DuplicateListEntry,
                    Some(node.node_id),
                    Some(child),
                    format!("{child} appears twice in pinned lists"),
                );
                continue;
            }
            memberships
                .entry(child)
                .or_default()
                .push(Membership::Pinned(node.node_id));
        }
        let mut seen = BTreeSet::new();
        for child in &root.hidden {
            if !seen.insert(*child) {
                out.error(
                    DockInvariantCode::DuplicateListEntry,
                    Some(node.node_id),
                    Some(*child),
                    format!("{child} appears twice in hidden list"),
                );
                continue;
            }
            memberships
                .entry(*child)
                .or_default()
                .push(Membership::Hidden(node.node_id));
        }
        if let Some(slot) = root.pinned_dock {
            memberships
                .entry(slot)
                .or_default()
                .push(Membership::PreviewSlot(node.node_id));
        }
        for window_id in &root.windows {
            window_listings
                .entry(*window_id)
                .or_default()
                .push(node.node_id);
        }
    }

    // Dangling list references.
    for (child, entries) in &memberships {
        if !nodes.contains_key(child) {
            for entry in entries {
                out.error(
                    DockInvariantCode::DanglingReference,
                    Some(entry.container()),
                    Some(*child),
                    format!("container references missing node {child}"),
                );
            }
        }
    }

    // Containment parent used for cycle and focus checks.
    let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();

    for node in nodes.values() {
        let id = node.node_id;
        for (label, reference) in [("owner", node.owner), ("original_owner", node.original_owner)] {
            if let Some(reference) = reference
                && !nodes.contains_key(&reference)
            {
                out.error(
                    DockInvariantCode::DanglingReference,
                    Some(id),
                    Some(reference),
                    format!("{label} points to missing node {reference}"),
                );
            }
        }

        if !(node.proportion.is_nan() || (node.proportion.is_finite() && node.proportion >= 0.0)) {
            out.error(
                DockInvariantCode::InvalidProportion,
                Some(id),
                None,
                format!("proportion {} is neither NaN nor a finite non-negative value", node.proportion),
            );
        }

        let entries = memberships.get(&id).map(Vec::as_slice).unwrap_or_default();

        if node.kind.is_root() {
            if node.owner.is_some() {
                out.error(
                    DockInvariantCode::RootHasOwner,
                    Some(id),
                    node.owner,
                    "root docks have no owner".to_string(),
                );
            }
            if let Some(entry) = entries.first() {
                out.error(
                    DockInvariantCode::InvalidChildKind,
                    Some(entry.container()),
                    Some(id),
                    "root docks cannot be contained".to_string(),
                );
            }
            continue;
        }

        match entries {
            [] => {
                if let Some(owner) = node.owner {
                    out.error(
                        DockInvariantCode::OrphanOwner,
                        Some(id),
                        Some(owner),
                        "detached node still records an owner".to_string(),
                    );
                }
            }
            [Membership::Visible(dock_id)] => {
                parents.insert(id, *dock_id);
                if node.owner != Some(*dock_id) {
                    out.error(
                        DockInvariantCode::OwnerMismatch,
                        Some(id),
                        Some(*dock_id),
                        format!("visible in {dock_id} but owner is {:?}", node.owner),
                    );
                }
                if let Some(dock) = nodes.get(dock_id).and_then(|n| n.dock())
                    && !dock.dock_kind.accepts(&node.kind)
                {
                    let code = if node.kind.is_splitter() {
                        DockInvariantCode::SplitterOutsideProportional
                    } else {
                        DockInvariantCode::InvalidChildKind
                    };
                    out.error(
                        code,
                        Some(id),
                        Some(*dock_id),
                        format!(
                            "{} dock cannot hold a {} node",
                            dock.dock_kind.label(),
                            node.kind.label()
                        ),
                    );
                }
            }
            [Membership::Pinned(root_id)] => {
                parents.insert(id, *root_id);
                check_pinned_entry(&mut out, tree, id, *root_id);
                let owner_ok = match node.owner {
                    Some(owner) if owner == *root_id => true,
                    Some(owner) => nodes.get(&owner).is_some_and(|n| n.is_tool_dock()),
                    None => false,
                };
                if !owner_ok {
                    out.error(
                        DockInvariantCode::PinnedOwnerInvalid,
                        Some(id),
                        node.owner,
                        "pinned dockable must be owned by a tool dock or its root".to_string(),
                    );
                }
            }
            [Membership::Pinned(root_id), Membership::Visible(slot)]
            | [Membership::Visible(slot), Membership::Pinned(root_id)] => {
                check_pinned_entry(&mut out, tree, id, *root_id);
                let slot_of_root = tree
                    .root_data(*root_id)
                    .and_then(|root| root.pinned_dock);
                if slot_of_root != Some(*slot) {
                    out.error(
                        DockInvariantCode::MultipleMemberships,
                        Some(id),
                        Some(*slot),
                        "pinned dockable is also visible outside its root's preview slot"
                            .to_string(),
                    );
                } else if node.owner != Some(*slot) {
                    out.error(
                        DockInvariantCode::OwnerMismatch,
                        Some(id),
                        Some(*slot),
                        "previewed dockable must be owned by the preview slot".to_string(),
                    );
                }
                parents.insert(id, *slot);
            }
            [Membership::Hidden(root_id)] => {
                parents.insert(id, *root_id);
                if node.owner != Some(*root_id) {
                    out.error(
                        DockInvariantCode::OwnerMismatch,
                        Some(id),
                        Some(*root_id),
                        "hidden dockable must be owned by its root".to_string(),
                    );
                }
                if node.kind.is_splitter() {
                    out.error(
                        DockInvariantCode::InvalidChildKind,
                        Some(id),
                        Some(*root_id),
                        "splitters cannot be hidden".to_string(),
                    );
                }
            }
            [Membership::PreviewSlot(root_id)] => {
                parents.insert(id, *root_id);
                if node.owner != Some(*root_id) {
                    out.error(
                        DockInvariantCode::OwnerMismatch,
                        Some(id),
                        Some(*root_id),
                        "preview slot must be owned by its root".to_string(),
                    );
                }
                if !node.is_tool_dock() {
                    out.error(
                        DockInvariantCode::InvalidChildKind,
                        Some(id),
                        Some(*root_id),
                        "preview slot must be a tool dock".to_string(),
                    );
                }
            }
            many => {
                out.error(
                    DockInvariantCode::MultipleMemberships,
                    Some(id),
                    many.first().map(|entry| entry.container()),
                    format!("node is referenced by {} container lists", many.len()),
                );
            }
        }
    }

    // Per-dock checks: splitters, active, focus, preview slot occupancy.
    for node in nodes.values() {
        let Some(dock) = node.dock() else {
            continue;
        };
        let id = node.node_id;
        if dock.dock_kind.supports_proportional_split() {
            check_splitters(&mut out, tree, id, &dock.visible);
        }
        if let Some(active) = dock.active
            && !dock.visible.contains(&active)
        {
            out.error(
                DockInvariantCode::ActiveNotVisible,
                Some(id),
                Some(active),
                format!("active {active} is not a visible child"),
            );
        }
        if let Some(focused) = dock.focused
            && !is_descendant_via(&parents, id, focused, nodes.len())
        {
            out.error(
                DockInvariantCode::FocusedNotDescendant,
                Some(id),
                Some(focused),
                format!("focused {focused} is not a descendant"),
            );
        }
        if let Some(root) = dock.root() {
            if let Some(slot) = root.pinned_dock {
                let occupants = nodes
                    .get(&slot)
                    .and_then(|n| n.dock())
                    .map(|slot_dock| slot_dock.visible.clone())
                    .unwrap_or_default();
                if occupants.len() > 1 {
                    out.error(
                        DockInvariantCode::PreviewSlotOverflow,
                        Some(slot),
                        None,
                        format!("preview slot holds {} dockables", occupants.len()),
                    );
                }
                for occupant in occupants {
                    if !root.pinned().any(|pinned| pinned == occupant) {
                        out.error(
                            DockInvariantCode::PreviewNotPinned,
                            Some(occupant),
                            Some(slot),
                            "previewed dockable is not in a pinned list of its root".to_string(),
                        );
                    }
                }
            }
            for window_id in &root.windows {
                if !tree.windows.contains_key(window_id) {
                    out.error(
                        DockInvariantCode::MissingWindow,
                        Some(id),
                        None,
                        format!("windows list references missing {window_id}"),
                    );
                }
            }
            if let Some(window_id) = root.window {
                let hosted = tree
                    .windows
                    .get(&window_id)
                    .is_some_and(|window| window.layout == id);
                if !hosted {
                    out.error(
                        DockInvariantCode::WindowRootMismatch,
                        Some(id),
                        None,
                        format!("root claims {window_id} but that window does not host it"),
                    );
                }
            }
        }
    }

    // Ownership cycles.
    for start in parents.keys() {
        let mut cursor = *start;
        let mut steps = 0usize;
        while let Some(parent) = parents.get(&cursor) {
            cursor = *parent;
            steps += 1;
            if cursor == *start || steps > nodes.len() {
                out.error(
                    DockInvariantCode::CycleDetected,
                    Some(*start),
                    None,
                    "containment chain loops back".to_string(),
                );
                break;
            }
        }
    }

    // Window records.
    for window in tree.windows.values() {
        let wid = window.window_id;
        let root_ok = nodes
            .get(&window.layout)
            .and_then(|node| node.dock())
            .and_then(|dock| dock.root())
            .is_some_and(|root| root.window == Some(wid));
        if !root_ok {
            out.error(
                DockInvariantCode::WindowRootMismatch,
                Some(window.layout),
                None,
                format!("{wid} layout is not a root hosted by it"),
            );
        }
        let listed = window_listings.get(&wid).map(Vec::as_slice).unwrap_or_default();
        if listed != [window.owner_root] {
            out.error(
                DockInvariantCode::WindowListing,
                Some(window.owner_root),
                None,
                format!("{wid} must be listed exactly once, by its owner root"),
            );
        }
        if let Some(origin) = window.origin
            && !nodes.contains_key(&origin)
        {
            out.warning(
                DockInvariantCode::DanglingReference,
                Some(origin),
                format!("{wid} origin no longer exists"),
            );
        }
    }

    // Id bookkeeping.
    if let Some(max) = nodes.keys().next_back()
        && *max >= tree.next_node_id
    {
        out.error(
            DockInvariantCode::NextIdNotGreaterThanExisting,
            Some(*max),
            None,
            format!("next node id {} is not above {max}", tree.next_node_id),
        );
    }
    if let Some(max) = tree.windows.keys().next_back()
        && *max >= tree.next_window_id
    {
        out.error(
            DockInvariantCode::NextIdNotGreaterThanExisting,
            None,
            None,
            format!("next window id {} is not above {max}", tree.next_window_id),
        );
    }

    let mut string_ids: BTreeMap<&str, NodeId> = BTreeMap::new();
    for node in nodes.values() {
        if node.kind.is_splitter() {
            continue;
        }
        if let Some(first) = string_ids.insert(node.id.as_str(), node.node_id) {
            out.warning(
                DockInvariantCode::DuplicateStringId,
                Some(node.node_id),
                format!("string id {:?} is also used by {first}", node.id),
            );
        }
    }

    DockInvariantReport {
        state_hash: tree.state_hash(),
        issues: out.issues,
    }
}

fn check_pinned_entry(out: &mut Collector, tree: &DockTree, node_id: NodeId, root_id: NodeId) {
    let is_tool = tree
        .node(node_id)
        .is_some_and(|node| matches!(node.kind, NodeKind::Tool));
    if !is_tool {
        out.error(
            DockInvariantCode::InvalidChildKind,
            Some(node_id),
            Some(root_id),
            "only tools can be pinned".to_string(),
        );
    }
}

fn check_splitters(out: &mut Collector, tree: &DockTree, dock_id: NodeId, visible: &[NodeId]) {
    let is_splitter = |id: &NodeId| tree.node(*id).is_some_and(|node| node.kind.is_splitter());
    let last = visible.len().saturating_sub(1);
    for (index, child) in visible.iter().enumerate() {
        if !is_splitter(child) {
            continue;
        }
        let misplaced = index == 0
            || index == last
            || visible.get(index + 1).is_some_and(|next| is_splitter(next));
        if misplaced {
            out.error(
                DockInvariantCode::SplitterPlacement,
                Some(*child),
                Some(dock_id),
                format!("splitter at index {index} is not between two content dockables"),
            );
        }
    }
}

fn is_descendant_via(
    parents: &BTreeMap<NodeId, NodeId>,
    ancestor: NodeId,
    node: NodeId,
    limit: usize,
) -> bool {
    let mut cursor = node;
    for _ in 0..=limit {
        match parents.get(&cursor) {
            Some(parent) if *parent == ancestor => return true,
            Some(parent) => cursor = *parent,
            None => return false,
        }
    }
    false
}

impl DockTree {
    /// Validate every structural invariant.
    pub fn validate(&self) -> Result<(), DockModelError> {
        match self.invariant_report().first_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Structured invariant diagnostics for the current tree.
    #[must_use]
    pub fn invariant_report(&self) -> DockInvariantReport {
        build_invariant_report(self)
    }
}
