#![forbid(unsafe_code)]

//! Drop validation and dispatch.
//!
//! # Role in fdock
//! [`DockManager`] decides whether a dragged dockable may land on a target
//! and, when asked to execute, turns the drop into mutations. It is the single
//! entry point used by the drag state machine and by programmatic callers.
//!
//! # Checks
//! Every request runs the same short-circuiting pipeline:
//!
//! 1. effective `CanDrag` on the source and `CanDrop` on the target,
//! 2. resolution of the gesture into a [`DropPlan`] (kind compatibility),
//! 3. size conflicts along the drop axis (unless disabled),
//! 4. the local or global dock group rule,
//!
//! and only then dispatches. Composite drops execute in one transaction via
//! [`DockFactory::execute`], so a failing second step rolls back the first.

use std::fmt;

use fdock_core::geometry::{Point, Rect, Size};
use fdock_layout::{
    Capability, DockLocation, DockMutation, DockOperation, DockTree, DragAction, DropScope,
    InsertPosition, MutationError, MutationOutcome, NodeId, NodeKind, Orientation, WindowBounds,
};

use crate::config::{DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH};
use crate::factory::DockFactory;

/// Manager behavior switches.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    pub prevent_size_conflicts: bool,
    /// Size of windows created by `Window` drops.
    pub float_size: Size,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            prevent_size_conflicts: true,
            float_size: Size::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
        }
    }
}

/// One drop gesture to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropRequest {
    pub source: NodeId,
    /// Node under the pointer: a dock, a dockable, or (for global drops) any
    /// node whose nearest dock receives the drop.
    pub target: NodeId,
    pub action: DragAction,
    pub operation: DockOperation,
    pub scope: DropScope,
}

impl DropRequest {
    #[must_use]
    pub const fn new(
        source: NodeId,
        target: NodeId,
        action: DragAction,
        operation: DockOperation,
        scope: DropScope,
    ) -> Self {
        Self {
            source,
            target,
            action,
            operation,
            scope,
        }
    }

    /// Local `Move` with `operation`.
    #[must_use]
    pub const fn moving(source: NodeId, target: NodeId, operation: DockOperation) -> Self {
        Self::new(source, target, DragAction::Move, operation, DropScope::Local)
    }

    #[must_use]
    pub const fn with_scope(mut self, scope: DropScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub const fn with_action(mut self, action: DragAction) -> Self {
        self.action = action;
        self
    }
}

/// What an accepted drop will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPlan {
    /// Append to `dock` (a pinned source is unpinned into it).
    Move { dockable: NodeId, dock: NodeId },
    Swap { first: NodeId, second: NodeId },
    /// Wrap and split beside the dock `target`.
    Split {
        target: NodeId,
        dockable: NodeId,
        operation: DockOperation,
    },
    Float { dockable: NodeId },
    /// Join the pinned list served by the tool dock `home`.
    JoinPinned { dockable: NodeId, home: NodeId },
}

impl DropPlan {
    /// Mutations executing this plan.
    #[must_use]
    pub fn mutations(&self, float_bounds: WindowBounds) -> Vec<DockMutation> {
        match *self {
            Self::Move { dockable, dock } => vec![DockMutation::MoveDockable {
                dockable,
                target_dock: dock,
                position: InsertPosition::Append,
            }],
            Self::Swap { first, second } => vec![DockMutation::SwapDockable { first, second }],
            Self::Split {
                target,
                dockable,
                operation,
            } => vec![DockMutation::SplitToDock {
                target,
                dockable,
                operation,
                wrap: true,
            }],
            Self::Float { dockable } => vec![DockMutation::FloatDockable {
                dockable,
                bounds: float_bounds,
            }],
            Self::JoinPinned { dockable, home } => vec![
                DockMutation::MoveDockable {
                    dockable,
                    target_dock: home,
                    position: InsertPosition::Append,
                },
                DockMutation::PinDockable { dockable },
            ],
        }
    }
}

/// Why a drop was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    UnknownNode { node_id: NodeId },
    /// The source kind is not handled by the validator that was called.
    WrongSourceKind { node_id: NodeId },
    SameNode { node_id: NodeId },
    CannotDrag { node_id: NodeId },
    CannotDrop { node_id: NodeId },
    UnsupportedGesture {
        action: DragAction,
        operation: DockOperation,
    },
    NoTargetDock { target: NodeId },
    IncompatibleTarget { dock: NodeId, node_id: NodeId },
    SizeConflict { node_id: NodeId, sibling: NodeId },
    GroupMismatch { source: NodeId, target: NodeId },
}

impl fmt::Display for DropRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node_id } => write!(f, "node {node_id} does not exist"),
            Self::WrongSourceKind { node_id } => {
                write!(f, "node {node_id} is not handled by this validator")
            }
            Self::SameNode { node_id } => write!(f, "node {node_id} dropped onto itself"),
            Self::CannotDrag { node_id } => write!(f, "node {node_id} cannot be dragged"),
            Self::CannotDrop { node_id } => write!(f, "node {node_id} does not accept drops"),
            Self::UnsupportedGesture { action, operation } => {
                write!(f, "unsupported gesture {action:?}/{operation:?}")
            }
            Self::NoTargetDock { target } => write!(f, "no dock resolves from target {target}"),
            Self::IncompatibleTarget { dock, node_id } => {
                write!(f, "dock {dock} cannot hold node {node_id}")
            }
            Self::SizeConflict { node_id, sibling } => {
                write!(f, "size constraints of {node_id} conflict with {sibling}")
            }
            Self::GroupMismatch { source, target } => {
                write!(f, "dock group of {source} is not allowed in {target}")
            }
        }
    }
}

impl std::error::Error for DropRejection {}

/// Which sources a validator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFilter {
    Tool,
    Document,
    Any,
}

/// Validates drops and dispatches accepted ones to the factory.
#[derive(Debug, Clone, Default)]
pub struct DockManager {
    config: ManagerConfig,
    float_origin: Point,
}

impl DockManager {
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            float_origin: Point::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Screen position used for the next `Window` drop.
    pub fn set_float_origin(&mut self, origin: Point) {
        self.float_origin = origin;
    }

    /// Validate (and with `execute`, perform) a drop of a tool.
    pub fn validate_tool(
        &mut self,
        factory: &mut DockFactory,
        request: DropRequest,
        execute: bool,
    ) -> bool {
        self.validate_with(factory, SourceFilter::Tool, request, execute)
    }

    /// Validate (and with `execute`, perform) a drop of a document.
    pub fn validate_document(
        &mut self,
        factory: &mut DockFactory,
        request: DropRequest,
        execute: bool,
    ) -> bool {
        self.validate_with(factory, SourceFilter::Document, request, execute)
    }

    /// Validate any dockable, dispatching on the source kind.
    pub fn validate_dockable(
        &mut self,
        factory: &mut DockFactory,
        request: DropRequest,
        execute: bool,
    ) -> bool {
        let filter = match factory.tree().node(request.source).map(|node| &node.kind) {
            Some(NodeKind::Tool) => SourceFilter::Tool,
            Some(NodeKind::Document) => SourceFilter::Document,
            _ => SourceFilter::Any,
        };
        self.validate_with(factory, filter, request, execute)
    }

    /// Run the check pipeline without touching the tree.
    pub fn evaluate(&self, tree: &DockTree, request: &DropRequest) -> Result<DropPlan, DropRejection> {
        let filter = match tree.node(request.source).map(|node| &node.kind) {
            Some(NodeKind::Tool) => SourceFilter::Tool,
            Some(NodeKind::Document) => SourceFilter::Document,
            _ => SourceFilter::Any,
        };
        self.evaluate_with(tree, filter, request)
    }

    fn validate_with(
        &mut self,
        factory: &mut DockFactory,
        filter: SourceFilter,
        request: DropRequest,
        execute: bool,
    ) -> bool {
        let verdict = self.evaluate_with(factory.tree(), filter, &request);
        tracing::debug!(
            target: "fdock.manager",
            source = %request.source,
            target_node = %request.target,
            action = ?request.action,
            operation = ?request.operation,
            scope = ?request.scope,
            execute,
            accepted = verdict.is_ok(),
            reason = %verdict.as_ref().err().map(ToString::to_string).unwrap_or_default(),
            "drop validated"
        );
        match verdict {
            Err(_) => false,
            Ok(_) if !execute => true,
            Ok(plan) => self.execute_plan(factory, request, plan),
        }
    }

    /// Execute an accepted plan in one transaction.
    ///
    /// Callers normally go through the `validate_*` entry points; this is for
    /// hosts that evaluated a plan themselves and want the engine's error.
    pub fn dispatch(
        &self,
        factory: &mut DockFactory,
        plan: DropPlan,
    ) -> Result<Vec<MutationOutcome>, MutationError> {
        let _span = tracing::debug_span!("fdock.drop", plan = ?plan).entered();
        let bounds = WindowBounds::from(Rect::from_origin_size(
            self.float_origin,
            self.config.float_size,
        ));
        factory.execute(plan.mutations(bounds))
    }

    fn execute_plan(&self, factory: &mut DockFactory, request: DropRequest, plan: DropPlan) -> bool {
        match self.dispatch(factory, plan) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(
                    target: "fdock.manager",
                    source = %request.source,
                    kind = ?err.kind,
                    reason = %err.reason,
                    "validated drop rejected by the engine"
                );
                false
            }
        }
    }

    fn evaluate_with(
        &self,
        tree: &DockTree,
        filter: SourceFilter,
        request: &DropRequest,
    ) -> Result<DropPlan, DropRejection> {
        let DropRequest {
            source, target, ..
        } = *request;
        let source_node = tree
            .node(source)
            .ok_or(DropRejection::UnknownNode { node_id: source })?;
        if tree.node(target).is_none() {
            return Err(DropRejection::UnknownNode { node_id: target });
        }
        let kind_ok = match filter {
            SourceFilter::Tool => matches!(source_node.kind, NodeKind::Tool),
            SourceFilter::Document => matches!(source_node.kind, NodeKind::Document),
            SourceFilter::Any => !source_node.kind.is_splitter() && !source_node.kind.is_root(),
        };
        if !kind_ok {
            return Err(DropRejection::WrongSourceKind { node_id: source });
        }
        if source == target {
            return Err(DropRejection::SameNode { node_id: source });
        }

        if !tree.effective_capability(source, Capability::Drag) {
            return Err(DropRejection::CannotDrag { node_id: source });
        }
        if !tree.effective_capability(target, Capability::Drop) {
            return Err(DropRejection::CannotDrop { node_id: target });
        }

        let plan = resolve_plan(tree, filter, request)?;

        if self.config.prevent_size_conflicts
            && let Some(sibling) = size_conflict(tree, source, &plan)
        {
            return Err(DropRejection::SizeConflict {
                node_id: source,
                sibling,
            });
        }

        let group_target = match plan {
            DropPlan::Move { dock, .. } => Some(dock),
            DropPlan::Swap { second, .. } => Some(second),
            DropPlan::Split { target, .. } => Some(target),
            DropPlan::JoinPinned { home, .. } => Some(home),
            DropPlan::Float { .. } => None,
        };
        if let Some(group_target) = group_target
            && !tree.validate_group(source, group_target, request.scope)
        {
            return Err(DropRejection::GroupMismatch {
                source,
                target: group_target,
            });
        }

        Ok(plan)
    }
}

fn resolve_plan(
    tree: &DockTree,
    filter: SourceFilter,
    request: &DropRequest,
) -> Result<DropPlan, DropRejection> {
    let DropRequest {
        source,
        target,
        action,
        operation,
        ..
    } = *request;
    let unsupported = DropRejection::UnsupportedGesture { action, operation };

    if action == DragAction::Move
        && operation != DockOperation::Window
        && matches!(tree.location(target), Some(DockLocation::Pinned { .. }))
    {
        let home = tree
            .node(target)
            .and_then(|node| node.owner)
            .filter(|owner| tree.node(*owner).is_some_and(|node| node.is_tool_dock()))
            .ok_or(DropRejection::NoTargetDock { target })?;
        if filter != SourceFilter::Tool {
            return Err(DropRejection::IncompatibleTarget {
                dock: home,
                node_id: source,
            });
        }
        return Ok(DropPlan::JoinPinned {
            dockable: source,
            home,
        });
    }

    match (action, operation) {
        (DragAction::Move, DockOperation::Fill) => {
            let dock = tree
                .nearest_dock(target)
                .ok_or(DropRejection::NoTargetDock { target })?;
            let dock_node = tree
                .node(dock)
                .ok_or(DropRejection::NoTargetDock { target })?;
            let accepts = tree
                .dock_data(dock)
                .zip(tree.node(source))
                .is_some_and(|(data, node)| data.dock_kind.accepts(&node.kind));
            let kind_ok = match filter {
                SourceFilter::Tool => dock_node.is_tool_dock(),
                SourceFilter::Document => dock_node.is_document_dock(),
                SourceFilter::Any => true,
            };
            if !accepts || !kind_ok || tree.is_descendant(source, dock) {
                return Err(DropRejection::IncompatibleTarget {
                    dock,
                    node_id: source,
                });
            }
            Ok(DropPlan::Move {
                dockable: source,
                dock,
            })
        }
        (DragAction::Link, DockOperation::Fill) => {
            let partner = match tree.dock_data(target) {
                Some(data) => data.active.ok_or(DropRejection::NoTargetDock { target })?,
                None => target,
            };
            if partner == source {
                return Err(DropRejection::SameNode { node_id: source });
            }
            Ok(DropPlan::Swap {
                first: source,
                second: partner,
            })
        }
        (DragAction::Move, op) if op.is_split() => {
            let mut dock = tree
                .nearest_dock(target)
                .ok_or(DropRejection::NoTargetDock { target })?;
            if let Some(root) = tree.dock_data(dock).filter(|data| data.dock_kind.is_root()) {
                // Edge drops on a root split beside its layout.
                dock = root
                    .active
                    .or_else(|| tree.content_children(dock).first().copied())
                    .filter(|layout| tree.dock_data(*layout).is_some())
                    .ok_or(DropRejection::NoTargetDock { target })?;
            }
            if dock == source || tree.is_descendant(source, dock) {
                return Err(DropRejection::IncompatibleTarget {
                    dock,
                    node_id: source,
                });
            }
            Ok(DropPlan::Split {
                target: dock,
                dockable: source,
                operation: op,
            })
        }
        (DragAction::Move, DockOperation::Window) => Ok(DropPlan::Float { dockable: source }),
        _ => Err(unsupported),
    }
}

/// First content sibling whose size interval cannot coexist with `source`.
fn size_conflict(tree: &DockTree, source: NodeId, plan: &DropPlan) -> Option<NodeId> {
    let (siblings, axes): (Vec<NodeId>, &[Orientation]) = match *plan {
        DropPlan::Move { dock, .. } => (
            tree.content_children(dock),
            &[Orientation::Horizontal, Orientation::Vertical],
        ),
        DropPlan::Split {
            target, operation, ..
        } => {
            let axis = operation.orientation()?;
            let container = tree
                .container_of(target)
                .filter(|parent| {
                    tree.dock_data(*parent).is_some_and(|data| {
                        data.dock_kind.supports_proportional_split() && data.orientation == axis
                    })
                });
            let siblings = match container {
                Some(parent) => tree.content_children(parent),
                None => vec![target],
            };
            let axes: &[Orientation] = match axis {
                Orientation::Horizontal => &[Orientation::Horizontal],
                Orientation::Vertical => &[Orientation::Vertical],
            };
            (siblings, axes)
        }
        DropPlan::Swap { .. } | DropPlan::Float { .. } | DropPlan::JoinPinned { .. } => {
            return None;
        }
    };
    let constraints = tree.node(source)?.constraints;
    siblings
        .into_iter()
        .filter(|sibling| *sibling != source)
        .find(|sibling| {
            let Some(other) = tree.node(*sibling) else {
                return false;
            };
            axes.iter().any(|axis| {
                constraints.is_constrained(*axis)
                    && !constraints.compatible_with(&other.constraints, *axis)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHostFactory;
    use fdock_layout::{Alignment, CapabilityFlags, CapabilityPolicy, SizeConstraints};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::registry::LookupSpan;

    struct Fixture {
        factory: DockFactory,
        layout: NodeId,
        left_tools: NodeId,
        right_tools: NodeId,
        docs: NodeId,
        tool: NodeId,
        other_tool: NodeId,
        doc: NodeId,
        other_doc: NodeId,
    }

    /// Main root → horizontal layout [left tools, docs, right tools].
    fn fixture() -> Fixture {
        let mut tree = DockTree::new("root");
        let root = tree.main_root();
        let layout = tree
            .create_proportional_dock("layout", Orientation::Horizontal)
            .expect("alloc");
        let left_tools = tree
            .create_tool_dock("left", Alignment::Left)
            .expect("alloc");
        let docs = tree.create_document_dock("docs").expect("alloc");
        let right_tools = tree
            .create_tool_dock("right", Alignment::Right)
            .expect("alloc");
        tree.add_dockable(root, layout).expect("layout");
        for dock in [left_tools, docs, right_tools] {
            tree.add_dockable(layout, dock).expect("dock");
        }
        let tool = tree.create_tool("tool", "Tool").expect("alloc");
        let other_tool = tree.create_tool("other-tool", "Other").expect("alloc");
        let doc = tree.create_document("doc", "Doc").expect("alloc");
        let other_doc = tree.create_document("other-doc", "Other").expect("alloc");
        tree.add_dockable(left_tools, tool).expect("tool");
        tree.add_dockable(right_tools, other_tool).expect("other tool");
        tree.add_dockable(docs, doc).expect("doc");
        tree.add_dockable(docs, other_doc).expect("other doc");
        Fixture {
            factory: DockFactory::new(tree, HeadlessHostFactory::new()),
            layout,
            left_tools,
            right_tools,
            docs,
            tool,
            other_tool,
            doc,
            other_doc,
        }
    }

    #[test]
    fn tool_fills_tool_dock() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let request = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Fill);
        assert!(manager.validate_tool(&mut fx.factory, request, true));
        assert_eq!(
            fx.factory.tree().content_children(fx.right_tools),
            vec![fx.other_tool, fx.tool]
        );
    }

    #[test]
    fn validators_filter_source_kinds() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let doc_into_tools = DropRequest::moving(fx.doc, fx.right_tools, DockOperation::Fill);
        assert!(!manager.validate_tool(&mut fx.factory, doc_into_tools, false));
        assert!(!manager.validate_document(&mut fx.factory, doc_into_tools, false));
        assert!(!manager.validate_dockable(&mut fx.factory, doc_into_tools, false));

        let tool_into_docs = DropRequest::moving(fx.tool, fx.docs, DockOperation::Fill);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &tool_into_docs),
            Err(DropRejection::IncompatibleTarget {
                dock: fx.docs,
                node_id: fx.tool
            })
        );
    }

    #[test]
    fn dry_run_leaves_tree_untouched() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let before = fx.factory.tree().state_hash();
        let request = DropRequest::moving(fx.doc, fx.docs, DockOperation::Right);
        assert!(manager.validate_document(&mut fx.factory, request, false));
        assert_eq!(fx.factory.tree().state_hash(), before);
    }

    #[test]
    fn target_dockable_resolves_to_its_dock() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let request = DropRequest::moving(fx.other_tool, fx.tool, DockOperation::Fill);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Ok(DropPlan::Move {
                dockable: fx.other_tool,
                dock: fx.left_tools
            })
        );
        assert!(manager.validate_dockable(&mut fx.factory, request, true));
        assert_eq!(
            fx.factory.tree().content_children(fx.left_tools),
            vec![fx.tool, fx.other_tool]
        );
    }

    #[test]
    fn capabilities_gate_first() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        fx.factory
            .apply(DockMutation::SetCapabilityFlags {
                dockable: fx.doc,
                flags: CapabilityFlags {
                    can_drag: false,
                    ..CapabilityFlags::default()
                },
            })
            .expect("flags");
        let request = DropRequest::moving(fx.doc, fx.docs, DockOperation::Left);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Err(DropRejection::CannotDrag { node_id: fx.doc })
        );

        fx.factory
            .apply(DockMutation::SetDockPolicy {
                dock: fx.layout,
                policy: Some(CapabilityPolicy::default().with(Capability::Drop, false)),
            })
            .expect("policy");
        let request = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Fill);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Err(DropRejection::CannotDrop {
                node_id: fx.right_tools
            })
        );
        assert!(!manager.validate_tool(&mut fx.factory, request, true));
    }

    #[test]
    fn size_conflicts_block_splits_unless_disabled() {
        let mut fx = fixture();
        fx.factory
            .apply(DockMutation::SetConstraints {
                dockable: fx.tool,
                constraints: SizeConstraints {
                    min_width: 500.0,
                    ..SizeConstraints::UNCONSTRAINED
                },
            })
            .expect("tool constraints");
        fx.factory
            .apply(DockMutation::SetConstraints {
                dockable: fx.docs,
                constraints: SizeConstraints {
                    max_width: 200.0,
                    ..SizeConstraints::UNCONSTRAINED
                },
            })
            .expect("docs constraints");

        let request = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Left);
        let strict = DockManager::default();
        assert_eq!(
            strict.evaluate(fx.factory.tree(), &request),
            Err(DropRejection::SizeConflict {
                node_id: fx.tool,
                sibling: fx.docs
            })
        );

        // Height is unconstrained, so a vertical split is fine.
        let vertical = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Bottom);
        assert!(strict.evaluate(fx.factory.tree(), &vertical).is_ok());

        let mut relaxed = DockManager::new(ManagerConfig {
            prevent_size_conflicts: false,
            ..ManagerConfig::default()
        });
        assert!(relaxed.validate_tool(&mut fx.factory, request, true));
    }

    #[test]
    fn local_groups_are_strict() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        fx.factory
            .apply(DockMutation::SetDockGroup {
                dockable: fx.doc,
                group: Some("editors".into()),
            })
            .expect("group");
        let request = DropRequest::moving(fx.doc, fx.docs, DockOperation::Right);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Err(DropRejection::GroupMismatch {
                source: fx.doc,
                target: fx.docs
            })
        );
        assert!(!manager.validate_document(&mut fx.factory, request, true));
    }

    #[test]
    fn global_drops_need_global_docking() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let request = DropRequest::moving(fx.tool, fx.other_tool, DockOperation::Fill);
        assert!(matches!(
            manager.evaluate(fx.factory.tree(), &request.with_scope(DropScope::Global)),
            Ok(DropPlan::Move { dock, .. }) if dock == fx.right_tools
        ));

        fx.factory
            .apply(DockMutation::SetDockPolicy {
                dock: fx.right_tools,
                policy: Some(CapabilityPolicy::default().with_global_docking(false)),
            })
            .expect("policy");
        assert!(!manager.validate_tool(
            &mut fx.factory,
            request.with_scope(DropScope::Global),
            true
        ));
        // Local drops ignore the global switch.
        assert!(manager.validate_tool(&mut fx.factory, request, true));
    }

    #[test]
    fn link_fill_swaps_with_active() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let request = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Fill)
            .with_action(DragAction::Link);
        assert!(manager.validate_tool(&mut fx.factory, request, true));
        let tree = fx.factory.tree();
        assert_eq!(tree.content_children(fx.left_tools), vec![fx.other_tool]);
        assert_eq!(tree.content_children(fx.right_tools), vec![fx.tool]);
    }

    #[test]
    fn edge_split_wraps_into_new_dock() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        let request = DropRequest::moving(fx.other_doc, fx.docs, DockOperation::Right);
        assert!(manager.validate_document(&mut fx.factory, request, true));
        let tree = fx.factory.tree();
        let children = tree.content_children(fx.layout);
        assert_eq!(children.len(), 4);
        let wrapper = children[2];
        assert!(tree.node(wrapper).expect("wrapper").is_document_dock());
        assert_eq!(tree.content_children(wrapper), vec![fx.other_doc]);
    }

    #[test]
    fn root_edge_drop_targets_the_layout() {
        let fx = fixture();
        let manager = DockManager::default();
        let root = fx.factory.tree().main_root();
        let request = DropRequest::moving(fx.doc, root, DockOperation::Top);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Ok(DropPlan::Split {
                target: fx.layout,
                dockable: fx.doc,
                operation: DockOperation::Top
            })
        );
    }

    #[test]
    fn window_drop_floats_at_origin() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        manager.set_float_origin(Point::new(70.0, 80.0));
        let root = fx.factory.tree().main_root();
        let request = DropRequest::moving(fx.doc, root, DockOperation::Window);
        assert!(manager.validate_document(&mut fx.factory, request, true));
        let window = fx.factory.tree().windows().next().expect("window");
        assert_eq!(window.bounds, WindowBounds::new(70.0, 80.0, 300.0, 400.0));
    }

    #[test]
    fn pinned_source_is_unpinned_into_tool_dock() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        fx.factory
            .apply(DockMutation::PinDockable { dockable: fx.tool })
            .expect("pin");
        let request = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Fill);
        assert!(manager.validate_tool(&mut fx.factory, request, true));
        let tree = fx.factory.tree();
        assert_eq!(
            tree.location(fx.tool),
            Some(DockLocation::Visible {
                dock: fx.right_tools,
                index: 1
            })
        );
        let root = tree.root_data(tree.main_root()).expect("root");
        assert_eq!(root.pinned().count(), 0);
    }

    #[test]
    fn drop_on_pinned_dockable_joins_its_list() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        fx.factory
            .apply(DockMutation::PinDockable {
                dockable: fx.other_tool,
            })
            .expect("pin");
        let request = DropRequest::moving(fx.tool, fx.other_tool, DockOperation::Fill);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Ok(DropPlan::JoinPinned {
                dockable: fx.tool,
                home: fx.right_tools
            })
        );
        assert!(manager.validate_tool(&mut fx.factory, request, true));
        let tree = fx.factory.tree();
        let root = tree.root_data(tree.main_root()).expect("root");
        assert_eq!(root.right_pinned, vec![fx.other_tool, fx.tool]);
    }

    #[test]
    fn failing_second_step_rolls_back_first() {
        let mut fx = fixture();
        let mut manager = DockManager::default();
        fx.factory
            .apply(DockMutation::PinDockable {
                dockable: fx.other_tool,
            })
            .expect("pin");
        fx.factory
            .apply(DockMutation::SetCapabilityOverrides {
                dockable: fx.tool,
                overrides: Some(CapabilityPolicy::default().with(Capability::Pin, false)),
            })
            .expect("overrides");
        let before = fx.factory.tree().state_hash();
        let request = DropRequest::moving(fx.tool, fx.other_tool, DockOperation::Fill);
        assert!(manager.validate_tool(&mut fx.factory, request, false));
        assert!(!manager.validate_tool(&mut fx.factory, request, true));
        assert_eq!(fx.factory.tree().state_hash(), before);
        assert_eq!(
            fx.factory.tree().content_children(fx.left_tools),
            vec![fx.tool]
        );
    }

    #[test]
    fn unsupported_gestures_are_refused() {
        let fx = fixture();
        let manager = DockManager::default();
        let request = DropRequest::moving(fx.doc, fx.docs, DockOperation::Left)
            .with_action(DragAction::Copy);
        assert_eq!(
            manager.evaluate(fx.factory.tree(), &request),
            Err(DropRejection::UnsupportedGesture {
                action: DragAction::Copy,
                operation: DockOperation::Left
            })
        );
    }

    // Tracing capture infrastructure

    #[derive(Debug, Clone)]
    struct CapturedEvent {
        level: tracing::Level,
        target: String,
        fields: HashMap<String, String>,
    }

    #[derive(Default, Clone)]
    struct Capture {
        spans: Arc<Mutex<Vec<String>>>,
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    struct FieldVisitor(Vec<(String, String)>);

    impl tracing::field::Visit for FieldVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
        fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
    }

    impl<S> tracing_subscriber::Layer<S> for Capture
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.spans
                .lock()
                .unwrap()
                .push(attrs.metadata().name().to_string());
        }

        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = FieldVisitor(Vec::new());
            event.record(&mut visitor);
            self.events.lock().unwrap().push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                fields: visitor.0.into_iter().collect(),
            });
        }
    }

    fn with_captured_tracing(f: impl FnOnce()) -> Capture {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, f);
        capture
    }

    #[test]
    fn verdicts_and_drops_are_traced() {
        let mut fx = fixture();
        let capture = with_captured_tracing(|| {
            let mut manager = DockManager::default();
            let request = DropRequest::moving(fx.tool, fx.right_tools, DockOperation::Fill);
            assert!(manager.validate_tool(&mut fx.factory, request, true));
            let refused = DropRequest::moving(fx.doc, fx.right_tools, DockOperation::Fill);
            assert!(!manager.validate_document(&mut fx.factory, refused, false));
        });

        let spans = capture.spans.lock().unwrap().clone();
        assert_eq!(spans.iter().filter(|name| *name == "fdock.drop").count(), 1);

        let events = capture.events.lock().unwrap().clone();
        let verdicts: Vec<_> = events
            .iter()
            .filter(|event| event.target == "fdock.manager")
            .collect();
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts.iter().all(|event| event.level == tracing::Level::DEBUG));
        assert_eq!(verdicts[0].fields.get("accepted").map(String::as_str), Some("true"));
        assert_eq!(verdicts[1].fields.get("accepted").map(String::as_str), Some("false"));
    }

    #[test]
    fn engine_rejection_after_validation_warns() {
        let mut fx = fixture();
        fx.factory
            .apply(DockMutation::PinDockable {
                dockable: fx.other_tool,
            })
            .expect("pin");
        fx.factory
            .apply(DockMutation::SetCapabilityOverrides {
                dockable: fx.tool,
                overrides: Some(CapabilityPolicy::default().with(Capability::Pin, false)),
            })
            .expect("overrides");
        let capture = with_captured_tracing(|| {
            let mut manager = DockManager::default();
            let request = DropRequest::moving(fx.tool, fx.other_tool, DockOperation::Fill);
            assert!(!manager.validate_tool(&mut fx.factory, request, true));
        });
        let events = capture.events.lock().unwrap().clone();
        assert!(events.iter().any(|event| event.level == tracing::Level::WARN
            && event.target == "fdock.manager"));
    }
}
