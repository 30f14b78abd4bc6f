#![forbid(unsafe_code)]

//! fdock public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports common types from the internal crates, bundles the runtime
//! pieces into [`Docking`], and offers a lightweight prelude for day-to-day
//! usage.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use fdock_core::event::{Modifiers, PointerButton, PointerEvent, PointerEventKind};
pub use fdock_core::geometry::{Point, Rect, Size};
pub use fdock_core::gesture::DragThreshold;

// --- Layout re-exports -----------------------------------------------------

pub use fdock_layout::{
    Alignment, Capability, CapabilityFlags, CapabilityPolicy, DockKind, DockLocation,
    DockModelError, DockMutation, DockNode, DockOperation, DockTree, DockTreeSnapshot, DockWindow,
    DockWindowOwnerMode, DragAction, DropScope, InsertPosition, MutationError, MutationOutcome,
    NodeId, NodeKind, Orientation, SizeConstraints, WindowBounds, WindowId, WindowOwner,
};

// --- Runtime re-exports ----------------------------------------------------

pub use fdock_runtime::{
    ActiveWindowTracker, DockDragEffect, DockDragMachine, DockDragState, DockDragTransition,
    DockEvent, DockFactory, DockHit, DockHitTester, DockManager, DockPolicyConfig, DragContext,
    DragInput, DragSessionHost, DropRejection, DropRequest, HeadlessHostFactory, HostWindow,
    HostWindowFactory, PolicyConfigError, WindowRef, WindowState,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for fdock hosts.
#[derive(Debug)]
pub enum Error {
    /// Tree construction or snapshot restore failed.
    Model(DockModelError),
    /// A mutation was rejected; the tree is unchanged.
    Mutation(MutationError),
    /// Policy could not be loaded or is out of range.
    Config(PolicyConfigError),
    /// A drop request was refused by the manager.
    Drop(DropRejection),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(err) => write!(f, "{err}"),
            Self::Mutation(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Drop(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            Self::Mutation(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Drop(err) => Some(err),
        }
    }
}

impl From<DockModelError> for Error {
    fn from(err: DockModelError) -> Self {
        Self::Model(err)
    }
}

impl From<MutationError> for Error {
    fn from(err: MutationError) -> Self {
        Self::Mutation(err)
    }
}

impl From<PolicyConfigError> for Error {
    fn from(err: PolicyConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<DropRejection> for Error {
    fn from(err: DropRejection) -> Self {
        Self::Drop(err)
    }
}

/// Standard result type for fdock APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Docking facade -------------------------------------------------------

/// Factory, manager and drag machine configured from one policy.
#[derive(Debug)]
pub struct Docking {
    factory: DockFactory,
    manager: DockManager,
    drag: DockDragMachine,
}

impl Docking {
    /// Build with default policy.
    pub fn new(tree: DockTree, hosts: impl HostWindowFactory + 'static) -> Self {
        Self::from_parts(tree, hosts, &DockPolicyConfig::default())
    }

    /// Build from `policy`, rejecting out-of-range values.
    pub fn with_policy(
        tree: DockTree,
        hosts: impl HostWindowFactory + 'static,
        policy: DockPolicyConfig,
    ) -> Result<Self> {
        let policy = policy.validated()?;
        Ok(Self::from_parts(tree, hosts, &policy))
    }

    fn from_parts(
        tree: DockTree,
        hosts: impl HostWindowFactory + 'static,
        policy: &DockPolicyConfig,
    ) -> Self {
        Self {
            factory: DockFactory::with_config(tree, hosts, policy.to_factory_config()),
            manager: DockManager::new(policy.to_manager_config()),
            drag: DockDragMachine::new(policy.to_drag_config()),
        }
    }

    #[must_use]
    pub fn tree(&self) -> &DockTree {
        self.factory.tree()
    }

    #[must_use]
    pub fn factory(&self) -> &DockFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut DockFactory {
        &mut self.factory
    }

    #[must_use]
    pub fn drag_state(&self) -> DockDragState {
        self.drag.state()
    }

    /// Apply one mutation directly.
    pub fn apply(&mut self, mutation: DockMutation) -> Result<MutationOutcome> {
        Ok(self.factory.apply(mutation)?)
    }

    /// Whether `request` would be accepted, without executing it.
    #[must_use]
    pub fn can_drop(&mut self, request: DropRequest) -> bool {
        self.manager
            .validate_dockable(&mut self.factory, request, false)
    }

    /// Validate and execute a drop, reporting why it was refused.
    pub fn drop_dockable(&mut self, request: DropRequest) -> Result<Vec<MutationOutcome>> {
        let plan = self.manager.evaluate(self.factory.tree(), &request)?;
        Ok(self.manager.dispatch(&mut self.factory, plan)?)
    }

    /// Feed one pointer input to the drag machine.
    pub fn pointer(
        &mut self,
        input: DragInput,
        hit_tester: &dyn DockHitTester,
        session: &mut dyn DragSessionHost,
    ) -> DockDragTransition {
        let mut ctx = DragContext {
            factory: &mut self.factory,
            manager: &mut self.manager,
            hit_tester,
            session,
        };
        self.drag.apply(input, &mut ctx)
    }

    /// Abort any gesture in progress.
    pub fn cancel_drag(&mut self, session: &mut dyn DragSessionHost) -> Option<DockDragTransition> {
        self.drag.force_cancel(session)
    }

    pub fn drain_events(&mut self) -> Vec<DockEvent> {
        self.factory.drain_events()
    }

    #[must_use]
    pub fn snapshot(&self) -> DockTreeSnapshot {
        self.factory.snapshot()
    }

    /// Replace the layout. Any gesture in progress is canceled first.
    pub fn load_snapshot(
        &mut self,
        snapshot: DockTreeSnapshot,
        session: &mut dyn DragSessionHost,
    ) -> Result<()> {
        self.drag.force_cancel(session);
        Ok(self.factory.load_snapshot(snapshot)?)
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Alignment, DockEvent, DockMutation, DockOperation, DockTree, Docking, DragAction,
        DragInput, DropRequest, DropScope, Error, NodeId, Orientation, Point, Result,
    };

    pub use crate::{core, layout, runtime};
}

pub use fdock_core as core;
pub use fdock_layout as layout;
pub use fdock_runtime as runtime;
