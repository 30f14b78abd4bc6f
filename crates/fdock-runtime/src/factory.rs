#![forbid(unsafe_code)]

//! Dock factory: the runtime owner of a dock tree.
//!
//! # Role in fdock
//! [`DockFactory`] wraps a [`DockTree`] with everything a live application
//! needs around it: host windows realized for every floating window, an
//! [`ActiveWindowTracker`], a queue of [`DockEvent`]s, and the close and
//! window policies from [`FactoryConfig`].
//!
//! # How it fits in the system
//! All structural changes go through [`DockFactory::apply`] or
//! [`DockFactory::execute`]. After the tree accepts a mutation the factory
//! presents hosts for opened windows, exits hosts for closed ones, and queues
//! the matching events. The [`DockManager`](crate::manager::DockManager)
//! executes validated drops through `execute`, so composite drops are atomic.

use std::collections::BTreeMap;
use std::fmt;

use fdock_core::geometry::{Point, Rect, Size};
use fdock_layout::{
    Alignment, DockModelError, DockMutation, DockTree, DockTreeSnapshot, DockWindowOwnerMode,
    MutationError, MutationOutcome, NodeId, NodeKind, Orientation, WindowBounds, WindowId,
    WindowOwner,
};

use crate::config::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::events::{DockEvent, WindowRef, events_for_outcome};
use crate::host::{HostWindow, HostWindowFactory};
use crate::tracker::ActiveWindowTracker;

/// Close and window policy consulted by the factory.
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryConfig {
    pub hide_tools_on_close: bool,
    pub hide_documents_on_close: bool,
    /// Floating windows in `Default` owner mode are owned by their parent.
    pub use_owner_for_floating_windows: bool,
    pub default_window_size: Size,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            hide_tools_on_close: true,
            hide_documents_on_close: true,
            use_owner_for_floating_windows: true,
            default_window_size: Size::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
        }
    }
}

/// Owns a dock tree and the host windows realizing it.
pub struct DockFactory {
    tree: DockTree,
    config: FactoryConfig,
    host_factory: Box<dyn HostWindowFactory>,
    hosts: BTreeMap<WindowId, Box<dyn HostWindow>>,
    tracker: ActiveWindowTracker,
    events: Vec<DockEvent>,
    transaction_counter: u64,
}

impl fmt::Debug for DockFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockFactory")
            .field("tree", &self.tree)
            .field("config", &self.config)
            .field("hosts", &self.hosts.keys().collect::<Vec<_>>())
            .field("tracker", &self.tracker)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl DockFactory {
    /// Take ownership of `tree` and realize hosts for its floating windows.
    pub fn new(tree: DockTree, host_factory: impl HostWindowFactory + 'static) -> Self {
        Self::with_config(tree, host_factory, FactoryConfig::default())
    }

    pub fn with_config(
        tree: DockTree,
        host_factory: impl HostWindowFactory + 'static,
        config: FactoryConfig,
    ) -> Self {
        let mut factory = Self {
            tree,
            config,
            host_factory: Box::new(host_factory),
            hosts: BTreeMap::new(),
            tracker: ActiveWindowTracker::new(),
            events: Vec::new(),
            transaction_counter: 0,
        };
        factory.realize_windows();
        factory
    }

    #[must_use]
    pub fn tree(&self) -> &DockTree {
        &self.tree
    }

    #[must_use]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    #[must_use]
    pub fn tracker(&self) -> &ActiveWindowTracker {
        &self.tracker
    }

    /// Host realizing `window`, if any.
    #[must_use]
    pub fn host(&self, window: WindowId) -> Option<&dyn HostWindow> {
        self.hosts.get(&window).map(|host| host.as_ref())
    }

    pub fn host_mut(&mut self, window: WindowId) -> Option<&mut (dyn HostWindow + 'static)> {
        self.hosts.get_mut(&window).map(|host| host.as_mut())
    }

    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<DockEvent> {
        std::mem::take(&mut self.events)
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    pub fn create_root_dock(&mut self, id: impl Into<String>) -> Result<NodeId, DockModelError> {
        self.tree.create_root_dock(id)
    }

    pub fn create_document_dock(
        &mut self,
        id: impl Into<String>,
    ) -> Result<NodeId, DockModelError> {
        self.tree.create_document_dock(id)
    }

    pub fn create_tool_dock(
        &mut self,
        id: impl Into<String>,
        alignment: Alignment,
    ) -> Result<NodeId, DockModelError> {
        self.tree.create_tool_dock(id, alignment)
    }

    pub fn create_proportional_dock(
        &mut self,
        id: impl Into<String>,
        orientation: Orientation,
    ) -> Result<NodeId, DockModelError> {
        self.tree.create_proportional_dock(id, orientation)
    }

    pub fn create_stack_dock(&mut self, id: impl Into<String>) -> Result<NodeId, DockModelError> {
        self.tree.create_stack_dock(id)
    }

    pub fn create_tool(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<NodeId, DockModelError> {
        self.tree.create_tool(id, title)
    }

    pub fn create_document(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<NodeId, DockModelError> {
        self.tree.create_document(id, title)
    }

    /// Host the detached root `layout` in a new floating window owned by
    /// `owner_root`, and present it.
    pub fn create_dock_window(
        &mut self,
        layout: NodeId,
        owner_root: NodeId,
        bounds: WindowBounds,
        owner_mode: DockWindowOwnerMode,
    ) -> Result<WindowId, MutationError> {
        // Window ids are allocated monotonically.
        let window = self.tree.next_window_id();
        self.apply(DockMutation::OpenWindow {
            layout,
            owner_root,
            bounds,
            owner_mode,
        })?;
        Ok(window)
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Apply one mutation and sync hosts and events with the result.
    pub fn apply(&mut self, mutation: DockMutation) -> Result<MutationOutcome, MutationError> {
        match self.tree.apply(mutation.clone()) {
            Ok(outcome) => {
                self.after_apply(&mutation, &outcome);
                Ok(outcome)
            }
            Err(err) => {
                tracing::debug!(
                    target: "fdock.factory",
                    kind = ?err.kind,
                    reason = %err.reason,
                    "mutation rejected"
                );
                Err(err)
            }
        }
    }

    /// Apply `mutations` in one transaction. Either all of them apply or the
    /// tree is left exactly as it was.
    pub fn execute(
        &mut self,
        mutations: impl IntoIterator<Item = DockMutation>,
    ) -> Result<Vec<MutationOutcome>, MutationError> {
        self.transaction_counter = self.transaction_counter.saturating_add(1);
        let transaction_id = self.transaction_counter;
        let mut transaction = self.tree.begin_transaction(transaction_id);
        let mut applied = Vec::new();

        for mutation in mutations {
            match transaction.apply(mutation.clone()) {
                Ok(outcome) => applied.push((mutation, outcome)),
                Err(err) => {
                    let rolled_back = transaction.rollback();
                    tracing::debug!(
                        target: "fdock.factory",
                        transaction_id,
                        attempted = rolled_back.journal.len(),
                        kind = ?err.kind,
                        reason = %err.reason,
                        "transaction rolled back"
                    );
                    return Err(err);
                }
            }
        }

        self.tree = transaction.commit().tree;
        for (mutation, outcome) in &applied {
            self.after_apply(mutation, outcome);
        }
        Ok(applied.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Close `dockable`, hiding or removing it per the close policy.
    pub fn close_dockable(&mut self, dockable: NodeId) -> Result<MutationOutcome, MutationError> {
        let hide = match self.tree.node(dockable).map(|node| &node.kind) {
            Some(NodeKind::Tool) => self.config.hide_tools_on_close,
            _ => self.config.hide_documents_on_close,
        };
        self.apply(DockMutation::CloseDockable { dockable, hide })
    }

    /// Float `dockable` into a default-sized window at `position`.
    pub fn float_dockable(
        &mut self,
        dockable: NodeId,
        position: Point,
    ) -> Result<MutationOutcome, MutationError> {
        let rect = Rect::from_origin_size(position, self.config.default_window_size);
        self.apply(DockMutation::FloatDockable {
            dockable,
            bounds: WindowBounds::from(rect),
        })
    }

    // ---------------------------------------------------------------------
    // Windows
    // ---------------------------------------------------------------------

    /// Owner host window for `window` under the configured owner policy.
    #[must_use]
    pub fn window_owner(&self, window: WindowId) -> Option<WindowOwner> {
        self.tree
            .resolve_window_owner(window, self.config.use_owner_for_floating_windows)
    }

    /// Copy the host's position and size back into the model.
    ///
    /// Returns `Ok(true)` when the model changed.
    pub fn sync_window_geometry(&mut self, window: WindowId) -> Result<bool, MutationError> {
        let (Some(host), Some(model)) = (self.hosts.get(&window), self.tree.window(window)) else {
            return Ok(false);
        };
        let bounds = WindowBounds::from(Rect::from_origin_size(host.position(), host.size()));
        if bounds == model.bounds {
            return Ok(false);
        }
        self.apply(DockMutation::SetWindowBounds { window, bounds })?;
        Ok(true)
    }

    /// [`sync_window_geometry`](Self::sync_window_geometry) for every host.
    pub fn sync_all_window_geometry(&mut self) -> Result<usize, MutationError> {
        let windows: Vec<WindowId> = self.hosts.keys().copied().collect();
        let mut changed = 0;
        for window in windows {
            if self.sync_window_geometry(window)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Replace the tree with a validated snapshot and rebuild hosts.
    pub fn load_snapshot(&mut self, snapshot: DockTreeSnapshot) -> Result<(), DockModelError> {
        let tree = DockTree::from_snapshot(snapshot)?;
        for (window, mut host) in std::mem::take(&mut self.hosts) {
            host.exit();
            self.events.push(DockEvent::WindowClosed { window });
        }
        self.tracker = ActiveWindowTracker::new();
        self.tree = tree;
        self.realize_windows();
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> DockTreeSnapshot {
        self.tree.to_snapshot()
    }

    // ---------------------------------------------------------------------
    // Activation
    // ---------------------------------------------------------------------

    /// Make `dockable` active in its dock and focused in its root.
    ///
    /// Ignored while another window is tracked: a background window never
    /// takes focus programmatically.
    pub fn set_active_dockable(&mut self, dockable: NodeId) -> Result<(), MutationError> {
        let owner = self.tree.window_owner_of(dockable).map(WindowRef::from);
        if let Some(current) = self.tracker.current_window()
            && owner != Some(current)
        {
            tracing::debug!(
                target: "fdock.factory",
                dockable = %dockable,
                "set_active_dockable ignored for inactive window"
            );
            return Ok(());
        }
        let dock = self.tree.container_of(dockable).unwrap_or(dockable);
        let mut mutations = vec![DockMutation::SetActiveDockable {
            dock,
            dockable: Some(dockable),
        }];
        if let Some(root) = self.tree.root_of(dockable) {
            mutations.push(DockMutation::SetFocusedDockable {
                dock: root,
                dockable: Some(dockable),
            });
        }
        self.execute(mutations)?;

        if let Some(owner) = owner {
            let events = self.tracker.set_dockable(owner, Some(dockable));
            self.events.extend(events);
        }
        Ok(())
    }

    /// Clear the tracked dockable of `window`.
    pub fn clear_active_dockable(&mut self, window: WindowRef) {
        let events = self.tracker.set_dockable(window, None);
        self.events.extend(events);
    }

    /// `window` gained focus. Returns `false` for unknown windows.
    pub fn activate_window(&mut self, window: WindowRef) -> bool {
        let root = match window {
            WindowRef::Main => self.tree.main_root(),
            WindowRef::Floating(id) => match self.tree.window(id) {
                Some(model) => model.layout,
                None => return false,
            },
        };
        let focused = self.tree.dock_data(root).and_then(|data| data.focused);
        let events = self.tracker.activate(window, root, focused);
        self.events.extend(events);
        if let WindowRef::Floating(id) = window
            && let Some(host) = self.hosts.get_mut(&id)
        {
            host.set_active();
        }
        true
    }

    /// `window` lost focus.
    pub fn deactivate_window(&mut self, window: WindowRef) {
        let events = self.tracker.deactivate(window);
        self.events.extend(events);
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn after_apply(&mut self, mutation: &DockMutation, outcome: &MutationOutcome) {
        for window in &outcome.closed_windows {
            self.retire_host(*window);
        }
        for window in &outcome.opened_windows {
            self.realize(*window);
        }
        let events = events_for_outcome(&self.tree, mutation, outcome);
        self.events.extend(events);
    }

    /// Create hosts for model windows without one and exit hosts whose
    /// window is gone.
    fn realize_windows(&mut self) {
        let stale: Vec<WindowId> = self
            .hosts
            .keys()
            .filter(|window| self.tree.window(**window).is_none())
            .copied()
            .collect();
        for window in stale {
            self.retire_host(window);
        }
        let missing: Vec<WindowId> = self
            .tree
            .windows()
            .map(|window| window.window_id)
            .filter(|window| !self.hosts.contains_key(window))
            .collect();
        for window in missing {
            self.realize(window);
        }
    }

    fn realize(&mut self, window_id: WindowId) {
        if self.hosts.contains_key(&window_id) {
            return;
        }
        let owner = self.window_owner(window_id);
        let Some(window) = self.tree.window(window_id) else {
            return;
        };
        let mut host = self.host_factory.create(window, owner);
        let rect = window.bounds.to_rect();
        host.set_title(&window.title);
        host.set_layout(window.layout);
        host.set_position(rect.origin());
        host.set_size(rect.size());
        host.present(false);
        tracing::info!(
            target: "fdock.factory",
            window = %window_id,
            layout = %window.layout,
            owner = ?owner,
            "window opened"
        );
        self.hosts.insert(window_id, host);
    }

    fn retire_host(&mut self, window: WindowId) {
        self.tracker.forget(WindowRef::Floating(window));
        if let Some(mut host) = self.hosts.remove(&window) {
            host.exit();
            tracing::info!(target: "fdock.factory", window = %window, "window closed");
        }
    }
}
