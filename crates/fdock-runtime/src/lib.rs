#![forbid(unsafe_code)]

//! fdock Runtime
//!
//! This crate ties the dock model from `fdock-layout` to a live application:
//! host windows, drop validation, pointer-driven drag/drop and activation
//! tracking.
//!
//! # Key Components
//!
//! - [`DockFactory`] - Owns a dock tree, realizes host windows, queues events
//! - [`DockManager`] - Capability, size and group checks before every drop
//! - [`DockDragMachine`] - Pointer events to drop requests, with thresholding
//! - [`ActiveWindowTracker`] - Focused window, root and dockable
//! - [`DockPolicyConfig`] - Policy-as-data for all of the above
//!
//! # Role in fdock
//! `fdock-runtime` is the orchestrator. The host feeds pointer input to the
//! drag machine, which hit-tests through a [`DockHitTester`] and asks the
//! manager to validate. Accepted drops become mutations applied by the
//! factory, which then presents or exits [`HostWindow`]s and emits
//! [`DockEvent`]s.
//!
//! # How it fits in the system
//! Everything here is single-threaded and synchronous. Hosts implement the
//! traits in [`host`] and [`drag`]; [`host::HeadlessHostFactory`] covers hosts
//! without a windowing system.

pub mod config;
pub mod drag;
pub mod events;
pub mod factory;
pub mod host;
pub mod manager;
pub mod tracker;

pub use config::{
    ClosePolicyConfig, DockPolicyConfig, DragPolicyConfig, ManagerPolicyConfig,
    PolicyConfigError, WindowPolicyConfig,
};
pub use drag::{
    DockDragCancelReason, DockDragEffect, DockDragMachine, DockDragNoopReason, DockDragState,
    DockDragTransition, DockHit, DockHitTester, DragConfig, DragContext, DragInput,
    DragSessionHost,
};
pub use events::{DockEvent, WindowRef};
pub use factory::{DockFactory, FactoryConfig};
pub use host::{HeadlessHostFactory, HostWindow, HostWindowFactory, WindowState};
pub use manager::{DockManager, DropPlan, DropRejection, DropRequest, ManagerConfig};
pub use tracker::ActiveWindowTracker;
