#![forbid(unsafe_code)]

//! Dock tree model, capability rules, and the atomic mutation engine.
//!
//! # Role in fdock
//! `fdock-layout` is the pure model. It owns the node arena ([`DockTree`]),
//! the capability and dock-group rules that gate drops, and the mutation
//! engine every structural change goes through. Nothing here talks to a host
//! window or reads pointer input.
//!
//! # How it fits in the system
//! The runtime (`fdock-runtime`) validates gestures against
//! [`DockTree::effective_capability`] and [`DockTree::validate_group`], then
//! executes them as [`DockMutation`]s inside a [`DockTransaction`]. Hosts
//! persist and reload layouts through [`DockTreeSnapshot`].

pub mod capability;
pub mod error;
pub mod group;
pub mod id;
pub mod invariant;
pub mod model;
pub mod mutation;
pub mod snapshot;
pub mod transaction;
pub mod tree;

pub use capability::{
    Capability, CapabilityFlags, CapabilityPolicy, resolve_capability, resolve_global_docking,
};
pub use error::DockModelError;
pub use group::{validate_docking, validate_global_docking, validate_local_docking};
pub use id::{NodeId, WindowId};
pub use invariant::{
    DockInvariantCode, DockInvariantIssue, DockInvariantReport, DockInvariantSeverity,
    build_invariant_report,
};
pub use model::{
    Alignment, DockData, DockKind, DockNode, DockOperation, DockWindow, DockWindowOwnerMode,
    DragAction, DropScope, InsertPosition, NodeKind, Orientation, RootData, SizeConstraints,
    WindowBounds, WindowOwner,
};
pub use mutation::{
    DockMutation, DockMutationKind, MutationError, MutationFailure, MutationOutcome,
};
pub use snapshot::{DOCK_TREE_SCHEMA_VERSION, DockTreeSnapshot};
pub use transaction::{
    DockJournalEntry, DockJournalResult, DockTransaction, DockTransactionOutcome,
};
pub use tree::{DockLocation, DockTree};
