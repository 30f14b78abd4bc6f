#![forbid(unsafe_code)]

//! Pointer-driven drag/drop lifecycle.
//!
//! ```text
//! Idle -> Pressed -> Dragging -> Idle
//!            \-------> Idle (release or abort before the threshold)
//! ```
//!
//! [`DockDragMachine`] consumes [`DragInput`]s, asks an injected
//! [`DockHitTester`] what lies under the pointer and keeps the
//! [`DragSessionHost`] informed so it can draw indicators. No mutation happens
//! until the release; only then is the [`DockManager`] asked to execute.
//!
//! Each step returns a [`DockDragTransition`] with a monotonically increasing
//! `transition_id`, so hosts can log or replay gestures deterministically.

use fdock_core::event::{PointerButton, PointerEvent, PointerEventKind};
use fdock_core::geometry::Point;
use fdock_core::gesture::DragThreshold;
use fdock_layout::{DockOperation, DragAction, DropScope, NodeId};

use crate::factory::DockFactory;
use crate::manager::{DockManager, DropRequest};

/// Drag behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConfig {
    pub threshold: DragThreshold,
    /// Releasing over empty space floats the dragged dockable.
    pub float_on_empty_drop: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            threshold: DragThreshold::default(),
            float_on_empty_drop: true,
        }
    }
}

/// Normalized drag input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragInput {
    Pressed { position: Point, source: NodeId },
    Moved { position: Point },
    Released { position: Point },
    CaptureLost,
    Cancel,
}

impl DragInput {
    /// Translate a host pointer event.
    ///
    /// Only the primary button drags. A press needs the dockable under the
    /// pointer as `source`; presses over nothing draggable yield `None`.
    #[must_use]
    pub fn from_pointer_event(event: &PointerEvent, source: Option<NodeId>) -> Option<Self> {
        let position = event.position;
        match event.kind {
            PointerEventKind::Down(PointerButton::Left) => {
                source.map(|source| Self::Pressed { position, source })
            }
            PointerEventKind::Up(PointerButton::Left) => Some(Self::Released { position }),
            PointerEventKind::Moved => Some(Self::Moved { position }),
            PointerEventKind::CaptureLost => Some(Self::CaptureLost),
            PointerEventKind::Cancel => Some(Self::Cancel),
            PointerEventKind::Down(_) | PointerEventKind::Up(_) => None,
        }
    }
}

/// What the hit tester found under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockHit {
    /// For local hits, the node owning the indicator. For global hits, the
    /// data-context node of the surface; the drop lands in its nearest dock.
    pub target: NodeId,
    pub operation: DockOperation,
    pub scope: DropScope,
    pub action: DragAction,
}

impl DockHit {
    /// Local `Move` hit.
    #[must_use]
    pub const fn local(target: NodeId, operation: DockOperation) -> Self {
        Self {
            target,
            operation,
            scope: DropScope::Local,
            action: DragAction::Move,
        }
    }

    /// Window-level `Move` hit.
    #[must_use]
    pub const fn global(target: NodeId, operation: DockOperation) -> Self {
        Self {
            target,
            operation,
            scope: DropScope::Global,
            action: DragAction::Move,
        }
    }

    #[must_use]
    pub const fn with_action(mut self, action: DragAction) -> Self {
        self.action = action;
        self
    }
}

/// Resolves the drop target under a screen position.
pub trait DockHitTester {
    fn resolve(&self, position: Point) -> Option<DockHit>;
}

/// Platform drag session and indicator rendering.
pub trait DragSessionHost {
    fn begin_session(&mut self, source: NodeId, origin: Point);
    /// Current target (if any) and whether a drop there would be accepted.
    fn update_target(&mut self, hit: Option<DockHit>, accepted: bool);
    /// The gesture finished with a release; `dropped` reports success.
    fn end_session(&mut self, dropped: bool);
    /// The gesture was aborted; clear every dragging visual.
    fn cancel_session(&mut self);
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DockDragState {
    Idle,
    Pressed {
        source: NodeId,
        origin: Point,
    },
    Dragging {
        source: NodeId,
        origin: Point,
        current: Point,
        target: Option<DockHit>,
        accepted: bool,
    },
}

/// Inputs that were safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockDragNoopReason {
    IdleWithoutPress,
    GestureAlreadyActive,
    ThresholdNotReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockDragCancelReason {
    CaptureLost,
    Cancel,
    /// [`DockDragMachine::force_cancel`].
    Programmatic,
}

/// Effect of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DockDragEffect {
    Pressed {
        source: NodeId,
        origin: Point,
    },
    DragStarted {
        source: NodeId,
        origin: Point,
        current: Point,
    },
    TargetUpdated {
        source: NodeId,
        target: Option<DockHit>,
        accepted: bool,
    },
    /// Released over a target; `executed` is the manager's verdict.
    Dropped {
        source: NodeId,
        target: DockHit,
        executed: bool,
    },
    /// Released over empty space and floated.
    Floated {
        source: NodeId,
        position: Point,
        executed: bool,
    },
    /// Released without a drop: before the threshold, or over empty space
    /// with floating disabled.
    Released {
        source: NodeId,
    },
    Canceled {
        source: Option<NodeId>,
        reason: DockDragCancelReason,
    },
    Noop {
        reason: DockDragNoopReason,
    },
}

/// One state-machine step.
#[derive(Debug, Clone, PartialEq)]
pub struct DockDragTransition {
    pub transition_id: u64,
    pub from: DockDragState,
    pub to: DockDragState,
    pub effect: DockDragEffect,
}

/// Collaborators borrowed for one step.
pub struct DragContext<'a> {
    pub factory: &'a mut DockFactory,
    pub manager: &'a mut DockManager,
    pub hit_tester: &'a dyn DockHitTester,
    pub session: &'a mut dyn DragSessionHost,
}

/// Drag/drop state machine. One gesture at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct DockDragMachine {
    state: DockDragState,
    config: DragConfig,
    transition_counter: u64,
}

impl Default for DockDragMachine {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DockDragMachine {
    #[must_use]
    pub fn new(config: DragConfig) -> Self {
        Self {
            state: DockDragState::Idle,
            config,
            transition_counter: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DockDragState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Pressed or Dragging.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, DockDragState::Idle)
    }

    /// Reset to Idle from any active state, clearing session visuals.
    ///
    /// Returns `None` when already idle.
    pub fn force_cancel(
        &mut self,
        session: &mut dyn DragSessionHost,
    ) -> Option<DockDragTransition> {
        if !self.is_active() {
            return None;
        }
        Some(self.abort(session, DockDragCancelReason::Programmatic))
    }

    /// Apply one input.
    pub fn apply(&mut self, input: DragInput, ctx: &mut DragContext<'_>) -> DockDragTransition {
        let from = self.state;
        let effect = match (from, input) {
            (DockDragState::Idle, DragInput::Pressed { position, source }) => {
                self.state = DockDragState::Pressed {
                    source,
                    origin: position,
                };
                DockDragEffect::Pressed {
                    source,
                    origin: position,
                }
            }
            (_, DragInput::Pressed { .. }) => DockDragEffect::Noop {
                reason: DockDragNoopReason::GestureAlreadyActive,
            },
            (DockDragState::Idle, _) => DockDragEffect::Noop {
                reason: DockDragNoopReason::IdleWithoutPress,
            },

            (DockDragState::Pressed { source, origin }, DragInput::Moved { position }) => {
                if !self.config.threshold.exceeded(origin, position) {
                    DockDragEffect::Noop {
                        reason: DockDragNoopReason::ThresholdNotReached,
                    }
                } else {
                    ctx.session.begin_session(source, origin);
                    let (target, accepted) = self.probe(ctx, source, position);
                    ctx.session.update_target(target, accepted);
                    self.state = DockDragState::Dragging {
                        source,
                        origin,
                        current: position,
                        target,
                        accepted,
                    };
                    tracing::debug!(
                        target: "fdock.drag",
                        source = %source,
                        x = position.x,
                        y = position.y,
                        "drag started"
                    );
                    DockDragEffect::DragStarted {
                        source,
                        origin,
                        current: position,
                    }
                }
            }
            (DockDragState::Pressed { source, .. }, DragInput::Released { .. }) => {
                self.state = DockDragState::Idle;
                DockDragEffect::Released { source }
            }

            (
                DockDragState::Dragging { source, origin, .. },
                DragInput::Moved { position },
            ) => {
                let (target, accepted) = self.probe(ctx, source, position);
                ctx.session.update_target(target, accepted);
                self.state = DockDragState::Dragging {
                    source,
                    origin,
                    current: position,
                    target,
                    accepted,
                };
                DockDragEffect::TargetUpdated {
                    source,
                    target,
                    accepted,
                }
            }
            (DockDragState::Dragging { source, .. }, DragInput::Released { position }) => {
                let effect = self.drop_at(ctx, source, position);
                let dropped = match effect {
                    DockDragEffect::Dropped { executed, .. }
                    | DockDragEffect::Floated { executed, .. } => executed,
                    _ => false,
                };
                ctx.session.end_session(dropped);
                self.state = DockDragState::Idle;
                effect
            }

            (_, DragInput::CaptureLost) => {
                return self.abort(ctx.session, DockDragCancelReason::CaptureLost);
            }
            (_, DragInput::Cancel) => {
                return self.abort(ctx.session, DockDragCancelReason::Cancel);
            }
        };
        self.transition(from, effect)
    }

    fn transition(&mut self, from: DockDragState, effect: DockDragEffect) -> DockDragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        DockDragTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state,
            effect,
        }
    }

    fn abort(
        &mut self,
        session: &mut dyn DragSessionHost,
        reason: DockDragCancelReason,
    ) -> DockDragTransition {
        let from = self.state;
        let source = match from {
            DockDragState::Idle => {
                return self.transition(
                    from,
                    DockDragEffect::Noop {
                        reason: DockDragNoopReason::IdleWithoutPress,
                    },
                );
            }
            DockDragState::Pressed { source, .. } => source,
            DockDragState::Dragging { source, .. } => {
                session.cancel_session();
                source
            }
        };
        self.state = DockDragState::Idle;
        tracing::debug!(target: "fdock.drag", source = %source, reason = ?reason, "drag canceled");
        self.transition(
            from,
            DockDragEffect::Canceled {
                source: Some(source),
                reason,
            },
        )
    }

    /// Hit-test and dry-run validate at `position`.
    fn probe(
        &self,
        ctx: &mut DragContext<'_>,
        source: NodeId,
        position: Point,
    ) -> (Option<DockHit>, bool) {
        let Some(hit) = ctx.hit_tester.resolve(position) else {
            return (None, false);
        };
        let accepted = match request_for(ctx.factory, source, hit) {
            Some(request) => ctx.manager.validate_dockable(ctx.factory, request, false),
            None => false,
        };
        (Some(hit), accepted)
    }

    fn drop_at(
        &self,
        ctx: &mut DragContext<'_>,
        source: NodeId,
        position: Point,
    ) -> DockDragEffect {
        if let Some(hit) = ctx.hit_tester.resolve(position) {
            let executed = match request_for(ctx.factory, source, hit) {
                Some(request) => ctx.manager.validate_dockable(ctx.factory, request, true),
                None => false,
            };
            tracing::debug!(
                target: "fdock.drag",
                source = %source,
                target_node = %hit.target,
                operation = ?hit.operation,
                executed,
                "drag released over target"
            );
            return DockDragEffect::Dropped {
                source,
                target: hit,
                executed,
            };
        }
        if !self.config.float_on_empty_drop {
            return DockDragEffect::Released { source };
        }
        let executed = match ctx.factory.tree().root_of(source) {
            Some(root) => {
                ctx.manager.set_float_origin(position);
                let request = DropRequest::moving(source, root, DockOperation::Window);
                ctx.manager.validate_dockable(ctx.factory, request, true)
            }
            None => false,
        };
        DockDragEffect::Floated {
            source,
            position,
            executed,
        }
    }
}

/// Manager request for a hit. Global hits resolve to the nearest dock.
fn request_for(factory: &DockFactory, source: NodeId, hit: DockHit) -> Option<DropRequest> {
    let target = match hit.scope {
        DropScope::Local => hit.target,
        DropScope::Global => factory.tree().nearest_dock(hit.target)?,
    };
    Some(DropRequest::new(
        source,
        target,
        hit.action,
        hit.operation,
        hit.scope,
    ))
}
