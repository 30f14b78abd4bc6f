#![forbid(unsafe_code)]

//! Host window contracts.
//!
//! The docking core never creates real windows. A [`HostWindowFactory`]
//! supplied by the embedding toolkit turns each floating [`DockWindow`] into a
//! [`HostWindow`], and the factory drives it through this trait.
//!
//! [`HeadlessHostFactory`] is a complete in-memory implementation for hosts
//! without a windowing system (servers, snapshot tooling) and for tests. It
//! records every call so behavior can be asserted after the fact.

use std::cell::RefCell;
use std::rc::Rc;

use fdock_core::geometry::{Point, Size};
use fdock_layout::{DockWindow, NodeId, WindowId, WindowOwner};

/// Presentation state of a host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
    FullScreen,
}

/// A toolkit window hosting one floating dock root.
pub trait HostWindow {
    /// Show the window. Dialog windows are modal to their owner.
    fn present(&mut self, is_dialog: bool);
    /// Close the window. The factory drops the handle afterwards.
    fn exit(&mut self);
    fn set_position(&mut self, position: Point);
    fn position(&self) -> Point;
    fn set_size(&mut self, size: Size);
    fn size(&self) -> Size;
    fn set_window_state(&mut self, state: WindowState);
    fn window_state(&self) -> WindowState;
    fn set_title(&mut self, title: &str);
    /// Attach the root dock the window renders.
    fn set_layout(&mut self, root: NodeId);
    /// Bring the window to the foreground.
    fn set_active(&mut self);
}

/// Creates host windows for newly opened dock windows.
pub trait HostWindowFactory {
    /// `owner` is the resolved owner window, `None` for a top-level window.
    fn create(&mut self, window: &DockWindow, owner: Option<WindowOwner>) -> Box<dyn HostWindow>;
}

// ---------------------------------------------------------------------------
// Headless implementation
// ---------------------------------------------------------------------------

/// One call observed on a headless window.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Created {
        window: WindowId,
        owner: Option<WindowOwner>,
    },
    Present {
        window: WindowId,
        is_dialog: bool,
    },
    Exit {
        window: WindowId,
    },
    SetPosition {
        window: WindowId,
        position: Point,
    },
    SetSize {
        window: WindowId,
        size: Size,
    },
    SetWindowState {
        window: WindowId,
        state: WindowState,
    },
    SetTitle {
        window: WindowId,
        title: String,
    },
    SetLayout {
        window: WindowId,
        root: NodeId,
    },
    SetActive {
        window: WindowId,
    },
}

/// Shared, clonable record of host calls.
#[derive(Debug, Clone, Default)]
pub struct HostCallLog {
    calls: Rc<RefCell<Vec<HostCall>>>,
}

impl HostCallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: HostCall) {
        self.calls.borrow_mut().push(call);
    }

    /// Snapshot of all calls so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    /// Calls addressed to `window`.
    #[must_use]
    pub fn calls_for(&self, window: WindowId) -> Vec<HostCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.window() == window)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl HostCall {
    /// Window the call was addressed to.
    #[must_use]
    pub const fn window(&self) -> WindowId {
        match self {
            Self::Created { window, .. }
            | Self::Present { window, .. }
            | Self::Exit { window }
            | Self::SetPosition { window, .. }
            | Self::SetSize { window, .. }
            | Self::SetWindowState { window, .. }
            | Self::SetTitle { window, .. }
            | Self::SetLayout { window, .. }
            | Self::SetActive { window } => *window,
        }
    }
}

/// In-memory host window.
#[derive(Debug)]
pub struct HeadlessWindow {
    window: WindowId,
    position: Point,
    size: Size,
    state: WindowState,
    title: String,
    layout: Option<NodeId>,
    visible: bool,
    log: HostCallLog,
}

impl HeadlessWindow {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn layout(&self) -> Option<NodeId> {
        self.layout
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }
}

impl HostWindow for HeadlessWindow {
    fn present(&mut self, is_dialog: bool) {
        self.visible = true;
        self.log.push(HostCall::Present {
            window: self.window,
            is_dialog,
        });
    }

    fn exit(&mut self) {
        self.visible = false;
        self.log.push(HostCall::Exit {
            window: self.window,
        });
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
        self.log.push(HostCall::SetPosition {
            window: self.window,
            position,
        });
    }

    fn position(&self) -> Point {
        self.position
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
        self.log.push(HostCall::SetSize {
            window: self.window,
            size,
        });
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_window_state(&mut self, state: WindowState) {
        self.state = state;
        self.log.push(HostCall::SetWindowState {
            window: self.window,
            state,
        });
    }

    fn window_state(&self) -> WindowState {
        self.state
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_owned();
        self.log.push(HostCall::SetTitle {
            window: self.window,
            title: title.to_owned(),
        });
    }

    fn set_layout(&mut self, root: NodeId) {
        self.layout = Some(root);
        self.log.push(HostCall::SetLayout {
            window: self.window,
            root,
        });
    }

    fn set_active(&mut self) {
        self.log.push(HostCall::SetActive {
            window: self.window,
        });
    }
}

/// Factory producing [`HeadlessWindow`]s that share one [`HostCallLog`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessHostFactory {
    log: HostCallLog,
}

impl HeadlessHostFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log shared by every window this factory creates.
    #[must_use]
    pub fn log(&self) -> HostCallLog {
        self.log.clone()
    }
}

impl HostWindowFactory for HeadlessHostFactory {
    fn create(&mut self, window: &DockWindow, owner: Option<WindowOwner>) -> Box<dyn HostWindow> {
        self.log.push(HostCall::Created {
            window: window.window_id,
            owner,
        });
        Box::new(HeadlessWindow {
            window: window.window_id,
            position: Point::default(),
            size: Size::default(),
            state: WindowState::Normal,
            title: String::new(),
            layout: None,
            visible: false,
            log: self.log.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdock_layout::{DockWindowOwnerMode, WindowBounds};

    fn dock_window(raw: u64) -> DockWindow {
        DockWindow {
            window_id: WindowId::new(raw).expect("non-zero"),
            id: "w".into(),
            title: "W".into(),
            layout: NodeId::new(2).expect("non-zero"),
            owner_root: NodeId::new(1).expect("non-zero"),
            bounds: WindowBounds::new(0.0, 0.0, 10.0, 10.0),
            owner_mode: DockWindowOwnerMode::Default,
            origin: None,
        }
    }

    #[test]
    fn headless_window_records_calls_in_order() {
        let mut factory = HeadlessHostFactory::new();
        let log = factory.log();
        let model = dock_window(3);
        let mut host = factory.create(&model, Some(WindowOwner::Main));
        host.set_title("Tools");
        host.set_position(Point::new(5.0, 6.0));
        host.present(false);
        host.exit();

        assert_eq!(host.position(), Point::new(5.0, 6.0));
        let calls = log.calls_for(model.window_id);
        assert_eq!(calls.len(), 5);
        assert_eq!(
            calls[0],
            HostCall::Created {
                window: model.window_id,
                owner: Some(WindowOwner::Main)
            }
        );
        assert!(matches!(calls[4], HostCall::Exit { .. }));
    }

    #[test]
    fn log_filters_by_window() {
        let mut factory = HeadlessHostFactory::new();
        let log = factory.log();
        let mut first = factory.create(&dock_window(1), None);
        let _second = factory.create(&dock_window(2), None);
        first.set_active();
        assert_eq!(log.calls().len(), 3);
        assert_eq!(log.calls_for(WindowId::new(1).expect("id")).len(), 2);
        log.clear();
        assert!(log.calls().is_empty());
    }

    #[test]
    fn window_state_round_trips() {
        let mut factory = HeadlessHostFactory::new();
        let mut host = factory.create(&dock_window(1), None);
        assert_eq!(host.window_state(), WindowState::Normal);
        host.set_window_state(WindowState::Maximized);
        assert_eq!(host.window_state(), WindowState::Maximized);
        host.set_size(Size::new(10.0, 20.0));
        assert_eq!(host.size(), Size::new(10.0, 20.0));
    }
}
