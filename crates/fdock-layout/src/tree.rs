#![forbid(unsafe_code)]

//! The dock arena: node storage, allocation, and structural queries.

use std::collections::BTreeMap;

use crate::error::DockModelError;
use crate::id::{NodeId, WindowId};
use crate::model::{
    Alignment, DockData, DockKind, DockNode, DockWindow, DockWindowOwnerMode, NodeKind,
    Orientation, RootData, WindowOwner,
};

/// Where a node currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockLocation {
    /// Member of a dock's visible list.
    Visible { dock: NodeId, index: usize },
    /// Entry in a root's pinned list; `previewed` while it occupies the
    /// root's preview slot.
    Pinned {
        root: NodeId,
        alignment: Alignment,
        previewed: bool,
    },
    /// Entry in a root's hidden list.
    Hidden { root: NodeId },
    /// The root's transient preview tool dock.
    PreviewSlot { root: NodeId },
    /// A root dock.
    Root,
}

/// Arena of dock nodes and floating windows.
///
/// The tree itself never exposes mutable node access; every structural change
/// goes through [`DockTree::apply`] so invariants hold
/// between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DockTree {
    pub(crate) main_root: NodeId,
    pub(crate) next_node_id: NodeId,
    pub(crate) next_window_id: WindowId,
    pub(crate) nodes: BTreeMap<NodeId, DockNode>,
    pub(crate) windows: BTreeMap<WindowId, DockWindow>,
}

impl DockTree {
    /// New tree holding only the main root.
    #[must_use]
    pub fn new(root_id: impl Into<String>) -> Self {
        let main_root = NodeId::MIN;
        let id = root_id.into();
        let root = DockNode::new(
            main_root,
            id.clone(),
            id,
            NodeKind::Dock(DockData::new(DockKind::Root(RootData::default()))),
        );
        let mut nodes = BTreeMap::new();
        nodes.insert(main_root, root);
        Self {
            main_root,
            next_node_id: NodeId::new(main_root.get() + 1).unwrap_or(main_root),
            next_window_id: WindowId::MIN,
            nodes,
            windows: BTreeMap::new(),
        }
    }

    /// Root of the main window.
    #[must_use]
    pub const fn main_root(&self) -> NodeId {
        self.main_root
    }

    #[must_use]
    pub const fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    #[must_use]
    pub const fn next_window_id(&self) -> WindowId {
        self.next_window_id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&DockNode> {
        self.nodes.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate nodes in canonical ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &DockNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn window(&self, id: WindowId) -> Option<&DockWindow> {
        self.windows.get(&id)
    }

    /// Iterate floating windows in canonical ID order.
    pub fn windows(&self) -> impl Iterator<Item = &DockWindow> {
        self.windows.values()
    }

    /// Look up a node by its stable string id. Splitters are skipped.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| !node.kind.is_splitter() && node.id == id)
            .map(|node| node.node_id)
    }

    #[must_use]
    pub fn dock_data(&self, id: NodeId) -> Option<&DockData> {
        self.nodes.get(&id).and_then(DockNode::dock)
    }

    #[must_use]
    pub fn root_data(&self, id: NodeId) -> Option<&RootData> {
        self.dock_data(id).and_then(DockData::root)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut DockNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn dock_data_mut(&mut self, id: NodeId) -> Option<&mut DockData> {
        self.nodes.get_mut(&id).and_then(DockNode::dock_mut)
    }

    pub(crate) fn root_data_mut(&mut self, id: NodeId) -> Option<&mut RootData> {
        self.dock_data_mut(id).and_then(DockData::root_mut)
    }

    /// All root docks, attached or not.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(|node| node.kind.is_root())
            .map(|node| node.node_id)
    }

    // ---------------------------------------------------------------------
    // Allocation
    // ---------------------------------------------------------------------

    pub(crate) fn allocate_node(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId, DockModelError> {
        let node_id = self.next_node_id;
        self.next_node_id = node_id.checked_next()?;
        self.nodes
            .insert(node_id, DockNode::new(node_id, id, title, kind));
        Ok(node_id)
    }

    pub(crate) fn allocate_window_id(&mut self) -> Result<WindowId, DockModelError> {
        let window_id = self.next_window_id;
        self.next_window_id = window_id.checked_next()?;
        Ok(window_id)
    }

    fn allocate_dock(
        &mut self,
        id: impl Into<String>,
        dock_kind: DockKind,
        configure: impl FnOnce(&mut DockData),
    ) -> Result<NodeId, DockModelError> {
        let id = id.into();
        let mut data = DockData::new(dock_kind);
        configure(&mut data);
        self.allocate_node(id.clone(), id, NodeKind::Dock(data))
    }

    /// Detached tool dockable.
    pub fn create_tool(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<NodeId, DockModelError> {
        self.allocate_node(id, title, NodeKind::Tool)
    }

    /// Detached document dockable.
    pub fn create_document(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<NodeId, DockModelError> {
        self.allocate_node(id, title, NodeKind::Document)
    }

    /// Detached tool dock attached to `alignment`'s edge.
    pub fn create_tool_dock(
        &mut self,
        id: impl Into<String>,
        alignment: Alignment,
    ) -> Result<NodeId, DockModelError> {
        self.allocate_dock(id, DockKind::Tool, |dock| dock.alignment = alignment)
    }

    pub fn create_document_dock(&mut self, id: impl Into<String>) -> Result<NodeId, DockModelError> {
        self.allocate_dock(id, DockKind::Document, |_| {})
    }

    pub fn create_proportional_dock(
        &mut self,
        id: impl Into<String>,
        orientation: Orientation,
    ) -> Result<NodeId, DockModelError> {
        self.allocate_dock(id, DockKind::Proportional, |dock| {
            dock.orientation = orientation;
        })
    }

    pub fn create_stack_dock(&mut self, id: impl Into<String>) -> Result<NodeId, DockModelError> {
        self.allocate_dock(id, DockKind::Stack, |_| {})
    }

    /// Detached root, typically hosted later through `OpenWindow`.
    pub fn create_root_dock(&mut self, id: impl Into<String>) -> Result<NodeId, DockModelError> {
        self.allocate_dock(id, DockKind::Root(RootData::default()), |_| {})
    }

    // ---------------------------------------------------------------------
    // Structural queries
    // ---------------------------------------------------------------------

    /// Current position of `id`, or `None` when it is detached.
    #[must_use]
    pub fn location(&self, id: NodeId) -> Option<DockLocation> {
        let node = self.nodes.get(&id)?;
        if node.kind.is_root() {
            return Some(DockLocation::Root);
        }
        for root_id in self.roots() {
            let Some(root) = self.root_data(root_id) else {
                continue;
            };
            if let Some(alignment) = root.pinned_alignment_of(id) {
                let previewed = root
                    .pinned_dock
                    .and_then(|slot| self.dock_data(slot))
                    .is_some_and(|slot| slot.visible.contains(&id));
                return Some(DockLocation::Pinned {
                    root: root_id,
                    alignment,
                    previewed,
                });
            }
            if root.hidden.contains(&id) {
                return Some(DockLocation::Hidden { root: root_id });
            }
            if root.pinned_dock == Some(id) {
                return Some(DockLocation::PreviewSlot { root: root_id });
            }
        }
        let owner = node.owner?;
        let index = self.dock_data(owner)?.position_of(id)?;
        Some(DockLocation::Visible { dock: owner, index })
    }

    /// Containing node: the visible dock, or the root for auxiliary lists.
    #[must_use]
    pub fn container_of(&self, id: NodeId) -> Option<NodeId> {
        match self.location(id)? {
            DockLocation::Visible { dock, .. } => Some(dock),
            DockLocation::Pinned { root, .. }
            | DockLocation::Hidden { root }
            | DockLocation::PreviewSlot { root } => Some(root),
            DockLocation::Root => None,
        }
    }

    /// Root dock whose tree contains `id` (a root is its own root).
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = id;
        for _ in 0..=self.nodes.len() {
            match self.location(cursor)? {
                DockLocation::Root => return Some(cursor),
                DockLocation::Visible { dock, .. } => cursor = dock,
                DockLocation::Pinned { root, .. }
                | DockLocation::Hidden { root }
                | DockLocation::PreviewSlot { root } => return Some(root),
            }
        }
        None
    }

    /// A root is attached when it is the main root or hosted by a window.
    #[must_use]
    pub fn is_root_attached(&self, root: NodeId) -> bool {
        if root == self.main_root {
            return true;
        }
        self.root_data(root)
            .and_then(|data| data.window)
            .and_then(|window_id| self.windows.get(&window_id))
            .is_some_and(|window| window.layout == root)
    }

    /// Reachable from the main root or a floating window.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.root_of(id)
            .is_some_and(|root| self.is_root_attached(root))
    }

    /// True when `node` sits (transitively) inside `ancestor`.
    #[must_use]
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = node;
        for _ in 0..=self.nodes.len() {
            match self.container_of(cursor) {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
        false
    }

    /// `id` itself when it is a dock, else the closest containing dock.
    #[must_use]
    pub fn nearest_dock(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = id;
        for _ in 0..=self.nodes.len() {
            if self.dock_data(cursor).is_some() {
                return Some(cursor);
            }
            cursor = self.container_of(cursor)?;
        }
        None
    }

    /// Host window of `id`'s tree.
    #[must_use]
    pub fn window_owner_of(&self, id: NodeId) -> Option<WindowOwner> {
        let root = self.root_of(id)?;
        if root == self.main_root {
            return Some(WindowOwner::Main);
        }
        self.root_data(root)
            .and_then(|data| data.window)
            .map(WindowOwner::Window)
    }

    /// Host window that should own floating window `window_id`.
    ///
    /// `None` means the window is unowned (a top-level host). `Default`
    /// behaves like `ParentWindow` when `use_owner_default` is set, else like
    /// `None`. `DockableWindow` follows the window the content came from and
    /// falls back to the parent once that origin is gone.
    #[must_use]
    pub fn resolve_window_owner(
        &self,
        window_id: WindowId,
        use_owner_default: bool,
    ) -> Option<WindowOwner> {
        let window = self.windows.get(&window_id)?;
        let parent = || self.window_owner_of(window.owner_root);
        match window.owner_mode {
            DockWindowOwnerMode::None => None,
            DockWindowOwnerMode::ParentWindow => parent(),
            DockWindowOwnerMode::RootWindow => Some(WindowOwner::Main),
            DockWindowOwnerMode::DockableWindow => window
                .origin
                .and_then(|origin| self.window_owner_of(origin))
                .or_else(parent),
            DockWindowOwnerMode::Default if use_owner_default => parent(),
            DockWindowOwnerMode::Default => None,
        }
    }

    /// Visible non-splitter children of `dock`.
    #[must_use]
    pub fn content_children(&self, dock: NodeId) -> Vec<NodeId> {
        self.dock_data(dock)
            .map(|data| {
                data.visible
                    .iter()
                    .copied()
                    .filter(|id| self.nodes.get(id).is_some_and(|n| n.kind.is_content()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Docks below `root` through visible lists, pre-order. `root` itself is
    /// excluded, as are preview slots.
    #[must_use]
    pub fn descendant_docks(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .dock_data(root)
            .map(|dock| dock.visible.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            let Some(dock) = self.dock_data(id) else {
                continue;
            };
            if out.len() > self.nodes.len() {
                break;
            }
            out.push(id);
            stack.extend(dock.visible.iter().rev().copied());
        }
        out
    }

    /// Whether a root still holds anything worth keeping a window for.
    #[must_use]
    pub fn root_has_content(&self, root: NodeId) -> bool {
        let Some(data) = self.root_data(root) else {
            return false;
        };
        !self.content_children(root).is_empty()
            || data.pinned().next().is_some()
            || !data.hidden.is_empty()
    }

    // ---------------------------------------------------------------------
    // Hashing
    // ---------------------------------------------------------------------

    /// Deterministic structural hash of the current tree state.
    ///
    /// `NaN` values hash canonically so equal trees always hash equal.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix(hash: &mut u64, byte: u8) {
            *hash ^= u64::from(byte);
            *hash = hash.wrapping_mul(PRIME);
        }

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                mix(hash, *byte);
            }
        }

        fn mix_u64(hash: &mut u64, value: u64) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_f64(hash: &mut u64, value: f64) {
            let bits = if value.is_nan() {
                f64::NAN.to_bits()
            } else {
                value.to_bits()
            };
            mix_u64(hash, bits);
        }

        fn mix_bool(hash: &mut u64, value: bool) {
            mix(hash, u8::from(value));
        }

        fn mix_opt_bool(hash: &mut u64, value: Option<bool>) {
            mix(
                hash,
                match value {
                    None => 0,
                    Some(false) => 1,
                    Some(true) => 2,
                },
            );
        }

        fn mix_opt_id(hash: &mut u64, value: Option<NodeId>) {
            match value {
                Some(value) => {
                    mix(hash, 1);
                    mix_u64(hash, value.get());
                }
                None => mix(hash, 0),
            }
        }

        fn mix_str(hash: &mut u64, value: &str) {
            mix_u64(hash, value.len() as u64);
            mix_bytes(hash, value.as_bytes());
        }

        fn mix_ids(hash: &mut u64, ids: &[NodeId]) {
            mix_u64(hash, ids.len() as u64);
            for id in ids {
                mix_u64(hash, id.get());
            }
        }

        fn mix_policy(hash: &mut u64, policy: Option<&crate::capability::CapabilityPolicy>) {
            match policy {
                Some(policy) => {
                    mix(hash, 1);
                    for capability in crate::capability::Capability::ALL {
                        mix_opt_bool(hash, policy.get(capability));
                    }
                    mix_opt_bool(hash, policy.enable_global_docking);
                }
                None => mix(hash, 0),
            }
        }

        let mut hash = OFFSET_BASIS;
        mix_u64(&mut hash, self.main_root.get());
        mix_u64(&mut hash, self.next_node_id.get());
        mix_u64(&mut hash, self.next_window_id.get());
        mix_u64(&mut hash, self.nodes.len() as u64);

        for node in self.nodes.values() {
            mix_u64(&mut hash, node.node_id.get());
            mix_str(&mut hash, &node.id);
            mix_str(&mut hash, &node.title);
            mix_opt_id(&mut hash, node.owner);
            mix_opt_id(&mut hash, node.original_owner);
            mix_f64(&mut hash, node.proportion);
            mix_f64(&mut hash, node.constraints.min_width);
            mix_f64(&mut hash, node.constraints.max_width);
            mix_f64(&mut hash, node.constraints.min_height);
            mix_f64(&mut hash, node.constraints.max_height);
            match &node.dock_group {
                Some(group) => {
                    mix(&mut hash, 1);
                    mix_str(&mut hash, group);
                }
                None => mix(&mut hash, 0),
            }
            for capability in crate::capability::Capability::ALL {
                mix_bool(&mut hash, node.flags.get(capability));
            }
            mix_policy(&mut hash, node.capability_overrides.as_ref());
            mix_bool(&mut hash, node.keep_pinned_visible);

            match &node.kind {
                NodeKind::Tool => mix(&mut hash, 1),
                NodeKind::Document => mix(&mut hash, 2),
                NodeKind::Splitter => mix(&mut hash, 3),
                NodeKind::Dock(dock) => {
                    mix(&mut hash, 4);
                    mix_ids(&mut hash, &dock.visible);
                    mix_opt_id(&mut hash, dock.active);
                    mix_opt_id(&mut hash, dock.focused);
                    mix_policy(&mut hash, dock.capability_policy.as_ref());
                    mix(&mut hash, dock.alignment as u8);
                    mix(&mut hash, dock.orientation as u8);
                    mix_bool(&mut hash, dock.enable_global_docking);
                    mix_bool(&mut hash, dock.collapsable);
                    match &dock.dock_kind {
                        DockKind::Root(root) => {
                            mix(&mut hash, 1);
                            mix_ids(&mut hash, &root.hidden);
                            mix_ids(&mut hash, &root.left_pinned);
                            mix_ids(&mut hash, &root.right_pinned);
                            mix_ids(&mut hash, &root.top_pinned);
                            mix_ids(&mut hash, &root.bottom_pinned);
                            mix_opt_id(&mut hash, root.pinned_dock);
                            mix_u64(&mut hash, root.windows.len() as u64);
                            for window in &root.windows {
                                mix_u64(&mut hash, window.get());
                            }
                            mix_policy(&mut hash, root.root_policy.as_ref());
                            mix_u64(&mut hash, root.window.map_or(0, WindowId::get));
                        }
                        DockKind::Proportional => mix(&mut hash, 2),
                        DockKind::Tool => mix(&mut hash, 3),
                        DockKind::Document => mix(&mut hash, 4),
                        DockKind::Stack => mix(&mut hash, 5),
                    }
                }
            }
        }

        mix_u64(&mut hash, self.windows.len() as u64);
        for window in self.windows.values() {
            mix_u64(&mut hash, window.window_id.get());
            mix_str(&mut hash, &window.id);
            mix_str(&mut hash, &window.title);
            mix_u64(&mut hash, window.layout.get());
            mix_u64(&mut hash, window.owner_root.get());
            mix_f64(&mut hash, window.bounds.x);
            mix_f64(&mut hash, window.bounds.y);
            mix_f64(&mut hash, window.bounds.width);
            mix_f64(&mut hash, window.bounds.height);
            mix(&mut hash, window.owner_mode as u8);
            mix_opt_id(&mut hash, window.origin);
        }

        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_has_only_main_root() {
        let tree = DockTree::new("main");
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.location(tree.main_root()), Some(DockLocation::Root));
        assert_eq!(tree.root_of(tree.main_root()), Some(tree.main_root()));
        assert!(tree.is_attached(tree.main_root()));
        assert_eq!(tree.find("main"), Some(tree.main_root()));
    }

    #[test]
    fn created_nodes_are_detached() {
        let mut tree = DockTree::new("main");
        let tool = tree.create_tool("t", "Tool").expect("alloc");
        assert_eq!(tree.location(tool), None);
        assert_eq!(tree.root_of(tool), None);
        assert!(!tree.is_attached(tool));
        let floating_root = tree.create_root_dock("r2").expect("alloc");
        assert!(!tree.is_root_attached(floating_root));
    }

    #[test]
    fn queries_follow_visible_chain() {
        let mut tree = DockTree::new("main");
        let root = tree.main_root();
        let layout = tree
            .create_proportional_dock("layout", Orientation::Horizontal)
            .expect("alloc");
        let tools = tree
            .create_tool_dock("tools", Alignment::Left)
            .expect("alloc");
        let tool = tree.create_tool("t", "Tool").expect("alloc");
        tree.add_dockable(root, layout).expect("layout");
        tree.add_dockable(layout, tools).expect("tools");
        tree.add_dockable(tools, tool).expect("tool");

        assert_eq!(
            tree.location(tool),
            Some(DockLocation::Visible {
                dock: tools,
                index: 0
            })
        );
        assert_eq!(tree.root_of(tool), Some(root));
        assert!(tree.is_descendant(layout, tool));
        assert!(!tree.is_descendant(tool, layout));
        assert_eq!(tree.nearest_dock(tool), Some(tools));
        assert_eq!(tree.nearest_dock(tools), Some(tools));
        assert_eq!(tree.descendant_docks(root), vec![layout, tools]);
        assert_eq!(tree.window_owner_of(tool), Some(WindowOwner::Main));
    }

    #[test]
    fn window_owner_follows_owner_mode() {
        use crate::model::WindowBounds;
        use crate::mutation::DockMutation;

        let mut tree = DockTree::new("main");
        let root = tree.main_root();
        let docs = tree.create_document_dock("docs").expect("alloc");
        tree.add_dockable(root, docs).expect("docs");
        let first = tree.create_document("a", "A").expect("alloc");
        let second = tree.create_document("b", "B").expect("alloc");
        tree.add_dockable(docs, first).expect("a");
        tree.add_dockable(docs, second).expect("b");
        let outer = tree
            .apply(DockMutation::FloatDockable {
                dockable: first,
                bounds: WindowBounds::new(0.0, 0.0, 300.0, 400.0),
            })
            .expect("float")
            .opened_windows[0];
        assert_eq!(tree.resolve_window_owner(outer, true), Some(WindowOwner::Main));
        assert_eq!(tree.resolve_window_owner(outer, false), None);

        // A layout hosted inside the floating window's tree owns a nested window.
        let outer_root = tree.window(outer).expect("window").layout;
        let nested_root = tree.create_root_dock("nested").expect("alloc");
        let nested_docs = tree.create_document_dock("nested-docs").expect("alloc");
        tree.add_dockable(nested_root, nested_docs).expect("docs");
        tree.add_dockable(nested_docs, second).expect_err("still attached");
        let extra = tree.create_document("c", "C").expect("alloc");
        tree.add_dockable(nested_docs, extra).expect("c");
        let nested = tree
            .apply(DockMutation::OpenWindow {
                layout: nested_root,
                owner_root: outer_root,
                bounds: WindowBounds::new(0.0, 0.0, 200.0, 200.0),
                owner_mode: DockWindowOwnerMode::ParentWindow,
            })
            .expect("open")
            .opened_windows[0];
        assert_eq!(
            tree.resolve_window_owner(nested, false),
            Some(WindowOwner::Window(outer))
        );
        assert_eq!(tree.window_owner_of(extra), Some(WindowOwner::Window(nested)));
    }

    #[test]
    fn hash_is_stable_across_clones_and_sensitive_to_change() {
        let mut tree = DockTree::new("main");
        let copy = tree.clone();
        assert_eq!(tree.state_hash(), copy.state_hash());
        tree.create_document("d", "Doc").expect("alloc");
        assert_ne!(tree.state_hash(), copy.state_hash());
    }
}
