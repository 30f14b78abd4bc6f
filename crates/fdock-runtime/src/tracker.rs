#![forbid(unsafe_code)]

//! Active-window tracking across the main window and floating windows.
//!
//! The tracker is owned by one [`DockFactory`](crate::factory::DockFactory);
//! two factories never share activation state. Every method returns the
//! events it produced, in emission order.

use fdock_layout::NodeId;

use crate::events::{DockEvent, WindowRef};

/// Currently focused window, its root, and the dockable focused inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveWindowTracker {
    current_window: Option<WindowRef>,
    current_root: Option<NodeId>,
    current_dockable: Option<NodeId>,
}

impl ActiveWindowTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current_window(&self) -> Option<WindowRef> {
        self.current_window
    }

    #[must_use]
    pub const fn current_root(&self) -> Option<NodeId> {
        self.current_root
    }

    #[must_use]
    pub const fn current_dockable(&self) -> Option<NodeId> {
        self.current_dockable
    }

    /// `window` (hosting `root`) gained focus with `dockable` focused in it.
    ///
    /// A different previously active window is deactivated first.
    /// Re-activating the current window only refreshes the dockable; a
    /// re-activation with no focused dockable keeps the window tracked.
    pub fn activate(
        &mut self,
        window: WindowRef,
        root: NodeId,
        dockable: Option<NodeId>,
    ) -> Vec<DockEvent> {
        if self.current_window == Some(window) {
            self.current_root = Some(root);
            return match dockable {
                Some(_) => self.set_dockable(window, dockable),
                None => Vec::new(),
            };
        }

        let mut events = match self.current_window {
            Some(previous) => self.deactivate(previous),
            None => Vec::new(),
        };
        self.current_window = Some(window);
        self.current_root = Some(root);
        self.current_dockable = dockable;
        events.push(DockEvent::WindowActivated { window });
        if let Some(dockable) = dockable {
            events.push(DockEvent::DockableActivated { dockable, window });
        }
        events
    }

    /// `window` lost focus. Ignored unless it is the tracked window.
    pub fn deactivate(&mut self, window: WindowRef) -> Vec<DockEvent> {
        if self.current_window != Some(window) {
            return Vec::new();
        }
        let mut events = vec![DockEvent::WindowDeactivated { window }];
        if let Some(dockable) = self.current_dockable {
            events.push(DockEvent::DockableDeactivated { dockable, window });
        }
        self.clear();
        events
    }

    /// Update the focused dockable of `window`.
    ///
    /// Updates for any window other than the tracked one are ignored.
    /// `None` clears the whole record and emits only a deactivation of the
    /// previous dockable.
    pub fn set_dockable(&mut self, window: WindowRef, dockable: Option<NodeId>) -> Vec<DockEvent> {
        if self.current_window != Some(window) {
            return Vec::new();
        }
        if dockable.is_some() && self.current_dockable == dockable {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(previous) = self.current_dockable {
            events.push(DockEvent::DockableDeactivated {
                dockable: previous,
                window,
            });
        }
        match dockable {
            Some(dockable) => {
                self.current_dockable = Some(dockable);
                events.push(DockEvent::DockableActivated { dockable, window });
            }
            None => self.clear(),
        }
        events
    }

    /// Forget `window` if it is tracked, without emitting events. Used when
    /// its host is torn down.
    pub fn forget(&mut self, window: WindowRef) {
        if self.current_window == Some(window) {
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.current_window = None;
        self.current_root = None;
        self.current_dockable = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdock_layout::WindowId;

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw).expect("non-zero")
    }

    fn floating(raw: u64) -> WindowRef {
        WindowRef::Floating(WindowId::new(raw).expect("non-zero"))
    }

    #[test]
    fn activation_deactivates_previous_window_first() {
        let mut tracker = ActiveWindowTracker::new();
        let first = tracker.activate(WindowRef::Main, id(1), Some(id(5)));
        assert_eq!(
            first,
            vec![
                DockEvent::WindowActivated {
                    window: WindowRef::Main
                },
                DockEvent::DockableActivated {
                    dockable: id(5),
                    window: WindowRef::Main
                },
            ]
        );

        let second = tracker.activate(floating(1), id(9), None);
        assert_eq!(
            second,
            vec![
                DockEvent::WindowDeactivated {
                    window: WindowRef::Main
                },
                DockEvent::DockableDeactivated {
                    dockable: id(5),
                    window: WindowRef::Main
                },
                DockEvent::WindowActivated {
                    window: floating(1)
                },
            ]
        );
        assert_eq!(tracker.current_root(), Some(id(9)));
        assert_eq!(tracker.current_dockable(), None);
    }

    #[test]
    fn deactivation_clears_record() {
        let mut tracker = ActiveWindowTracker::new();
        tracker.activate(WindowRef::Main, id(1), Some(id(5)));
        assert!(tracker.deactivate(floating(3)).is_empty());

        let events = tracker.deactivate(WindowRef::Main);
        assert_eq!(events.len(), 2);
        assert_eq!(tracker, ActiveWindowTracker::default());
    }

    #[test]
    fn dockable_update_for_other_window_is_ignored() {
        let mut tracker = ActiveWindowTracker::new();
        tracker.activate(WindowRef::Main, id(1), Some(id(5)));
        assert!(tracker.set_dockable(floating(2), Some(id(6))).is_empty());
        assert_eq!(tracker.current_dockable(), Some(id(5)));
    }

    #[test]
    fn clearing_dockable_clears_everything_and_emits_one_event() {
        let mut tracker = ActiveWindowTracker::new();
        tracker.activate(WindowRef::Main, id(1), Some(id(5)));
        let events = tracker.set_dockable(WindowRef::Main, None);
        assert_eq!(
            events,
            vec![DockEvent::DockableDeactivated {
                dockable: id(5),
                window: WindowRef::Main
            }]
        );
        assert_eq!(tracker.current_window(), None);
        assert_eq!(tracker.current_root(), None);
        assert_eq!(tracker.current_dockable(), None);
    }

    #[test]
    fn reactivation_without_dockable_keeps_window_tracked() {
        let mut tracker = ActiveWindowTracker::new();
        tracker.activate(WindowRef::Main, id(1), Some(id(5)));
        let events = tracker.activate(WindowRef::Main, id(1), None);
        assert!(events.is_empty());
        assert_eq!(tracker.current_window(), Some(WindowRef::Main));
        assert_eq!(tracker.current_root(), Some(id(1)));
        assert_eq!(tracker.current_dockable(), Some(id(5)));
    }

    #[test]
    fn switching_dockable_within_window() {
        let mut tracker = ActiveWindowTracker::new();
        tracker.activate(WindowRef::Main, id(1), Some(id(5)));
        let events = tracker.set_dockable(WindowRef::Main, Some(id(6)));
        assert_eq!(events.len(), 2);
        assert_eq!(tracker.current_dockable(), Some(id(6)));
        assert!(tracker.set_dockable(WindowRef::Main, Some(id(6))).is_empty());
    }

    #[test]
    fn trackers_are_independent() {
        let mut a = ActiveWindowTracker::new();
        let b = ActiveWindowTracker::new();
        a.activate(WindowRef::Main, id(1), None);
        assert_eq!(a.current_window(), Some(WindowRef::Main));
        assert_eq!(b.current_window(), None);
    }
}
