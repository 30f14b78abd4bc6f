#![forbid(unsafe_code)]

//! Notifications emitted by the dock factory.
//!
//! The factory derives these from each applied mutation's outcome and from
//! the active-window tracker. Hosts drain them with
//! [`DockFactory::drain_events`](crate::factory::DockFactory::drain_events)
//! after each call.

use fdock_layout::{
    DockMutation, DockTree, MutationOutcome, NodeId, WindowId, WindowOwner,
};

/// Host window identity as seen by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WindowRef {
    /// The application's main window, hosting the main root.
    Main,
    Floating(WindowId),
}

impl From<WindowOwner> for WindowRef {
    fn from(owner: WindowOwner) -> Self {
        match owner {
            WindowOwner::Main => Self::Main,
            WindowOwner::Window(id) => Self::Floating(id),
        }
    }
}

/// A change observable by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockEvent {
    DockableAdded { dockable: NodeId, dock: NodeId },
    DockableRemoved { dockable: NodeId },
    DockableMoved { dockable: NodeId, dock: Option<NodeId> },
    DockablesSwapped { first: NodeId, second: NodeId },
    DockableFloated { dockable: NodeId, window: Option<WindowId> },
    DockablePinned { dockable: NodeId },
    DockableUnpinned { dockable: NodeId },
    DockablePreviewChanged { root: NodeId, previewed: Option<NodeId> },
    DockableHidden { dockable: NodeId },
    DockableClosed { dockable: NodeId, hidden: bool },
    DockableRestored { dockable: NodeId },
    ActiveDockableChanged { dock: NodeId, dockable: Option<NodeId> },
    FocusedDockableChanged { dock: NodeId, dockable: Option<NodeId> },
    WindowOpened { window: WindowId },
    WindowClosed { window: WindowId },
    WindowMoved { window: WindowId },
    WindowActivated { window: WindowRef },
    WindowDeactivated { window: WindowRef },
    DockableActivated { dockable: NodeId, window: WindowRef },
    DockableDeactivated { dockable: NodeId, window: WindowRef },
}

/// Events describing `mutation` after it produced `outcome` on `tree`.
///
/// `tree` is the state after the mutation. Window open/close events follow
/// the structural event so hosts see the dockable move before its window
/// appears.
#[must_use]
pub fn events_for_outcome(
    tree: &DockTree,
    mutation: &DockMutation,
    outcome: &MutationOutcome,
) -> Vec<DockEvent> {
    let mut events = Vec::new();
    match mutation {
        DockMutation::AddDockable { dock, dockable } => events.push(DockEvent::DockableAdded {
            dockable: *dockable,
            dock: *dock,
        }),
        DockMutation::RemoveDockable { dockable, .. } => {
            events.push(DockEvent::DockableRemoved {
                dockable: *dockable,
            });
        }
        DockMutation::MoveDockable { dockable, .. }
        | DockMutation::SplitToDock { dockable, .. }
        | DockMutation::DockAsDocument { dockable } => events.push(DockEvent::DockableMoved {
            dockable: *dockable,
            dock: tree.container_of(*dockable),
        }),
        DockMutation::SwapDockable { first, second } => {
            events.push(DockEvent::DockablesSwapped {
                first: *first,
                second: *second,
            });
        }
        DockMutation::FloatDockable { dockable, .. } => events.push(DockEvent::DockableFloated {
            dockable: *dockable,
            window: outcome.opened_windows.first().copied(),
        }),
        DockMutation::PinDockable { dockable } => events.push(DockEvent::DockablePinned {
            dockable: *dockable,
        }),
        DockMutation::UnpinDockable { dockable } => events.push(DockEvent::DockableUnpinned {
            dockable: *dockable,
        }),
        DockMutation::PreviewPinnedDockable { dockable }
        | DockMutation::TogglePreviewPinnedDockable { dockable } => {
            if let Some(root) = tree.root_of(*dockable) {
                events.push(DockEvent::DockablePreviewChanged {
                    root,
                    previewed: previewed_in(tree, root),
                });
            }
        }
        DockMutation::HidePreviewingDockables { root } => {
            events.push(DockEvent::DockablePreviewChanged {
                root: *root,
                previewed: previewed_in(tree, *root),
            });
        }
        DockMutation::HideDockable { dockable } => events.push(DockEvent::DockableHidden {
            dockable: *dockable,
        }),
        DockMutation::CloseDockable { dockable, hide } => events.push(DockEvent::DockableClosed {
            dockable: *dockable,
            hidden: *hide,
        }),
        DockMutation::RestoreDockable { dockable } => events.push(DockEvent::DockableRestored {
            dockable: *dockable,
        }),
        DockMutation::SetActiveDockable { dock, dockable } => {
            events.push(DockEvent::ActiveDockableChanged {
                dock: *dock,
                dockable: *dockable,
            });
        }
        DockMutation::SetFocusedDockable { dock, dockable } => {
            events.push(DockEvent::FocusedDockableChanged {
                dock: *dock,
                dockable: *dockable,
            });
        }
        DockMutation::SetWindowBounds { window, .. } => {
            events.push(DockEvent::WindowMoved { window: *window });
        }
        DockMutation::OpenWindow { .. }
        | DockMutation::CloseWindow { .. }
        | DockMutation::SetProportion { .. }
        | DockMutation::SetConstraints { .. }
        | DockMutation::SetDockGroup { .. }
        | DockMutation::SetCapabilityFlags { .. }
        | DockMutation::SetCapabilityOverrides { .. }
        | DockMutation::SetDockPolicy { .. }
        | DockMutation::SetRootPolicy { .. }
        | DockMutation::SetKeepPinnedVisible { .. }
        | DockMutation::SetCollapsable { .. } => {}
    }
    events.extend(
        outcome
            .opened_windows
            .iter()
            .map(|window| DockEvent::WindowOpened { window: *window }),
    );
    events.extend(
        outcome
            .closed_windows
            .iter()
            .map(|window| DockEvent::WindowClosed { window: *window }),
    );
    events
}

fn previewed_in(tree: &DockTree, root: NodeId) -> Option<NodeId> {
    tree.root_data(root)
        .and_then(|data| data.pinned_dock)
        .and_then(|slot| tree.dock_data(slot))
        .and_then(|slot| slot.visible.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdock_layout::{Alignment, WindowBounds};

    #[test]
    fn window_ref_from_owner() {
        let id = WindowId::new(4).expect("id");
        assert_eq!(WindowRef::from(WindowOwner::Main), WindowRef::Main);
        assert_eq!(
            WindowRef::from(WindowOwner::Window(id)),
            WindowRef::Floating(id)
        );
    }

    #[test]
    fn float_reports_move_then_window() {
        let mut tree = DockTree::new("root");
        let root = tree.main_root();
        let docs = tree.create_document_dock("docs").expect("alloc");
        tree.add_dockable(root, docs).expect("docs");
        let doc = tree.create_document("d", "D").expect("alloc");
        let stay = tree.create_document("s", "S").expect("alloc");
        tree.add_dockable(docs, doc).expect("doc");
        tree.add_dockable(docs, stay).expect("stay");

        let mutation = DockMutation::FloatDockable {
            dockable: doc,
            bounds: WindowBounds::new(0.0, 0.0, 300.0, 400.0),
        };
        let outcome = tree.apply(mutation.clone()).expect("float");
        let events = events_for_outcome(&tree, &mutation, &outcome);
        let window = outcome.opened_windows[0];
        assert_eq!(
            events,
            vec![
                DockEvent::DockableFloated {
                    dockable: doc,
                    window: Some(window)
                },
                DockEvent::WindowOpened { window },
            ]
        );
    }

    #[test]
    fn preview_reports_current_occupant() {
        let mut tree = DockTree::new("root");
        let root = tree.main_root();
        let tools = tree.create_tool_dock("tools", Alignment::Left).expect("alloc");
        tree.add_dockable(root, tools).expect("tools");
        let tool = tree.create_tool("t", "T").expect("alloc");
        tree.add_dockable(tools, tool).expect("tool");
        tree.apply(DockMutation::PinDockable { dockable: tool })
            .expect("pin");

        let mutation = DockMutation::PreviewPinnedDockable { dockable: tool };
        let outcome = tree.apply(mutation.clone()).expect("preview");
        assert_eq!(
            events_for_outcome(&tree, &mutation, &outcome),
            vec![DockEvent::DockablePreviewChanged {
                root,
                previewed: Some(tool)
            }]
        );

        let mutation = DockMutation::HidePreviewingDockables { root };
        let outcome = tree.apply(mutation.clone()).expect("hide previews");
        assert_eq!(
            events_for_outcome(&tree, &mutation, &outcome),
            vec![DockEvent::DockablePreviewChanged {
                root,
                previewed: None
            }]
        );
    }
}
