#![forbid(unsafe_code)]

//! End-to-end drag/drop flows through the public runtime API.

use fdock_core::geometry::{Point, Rect};
use fdock_layout::{Alignment, DockOperation, DockTree, NodeId, Orientation};
use fdock_runtime::host::HostCall;
use fdock_runtime::{
    DockDragEffect, DockDragMachine, DockDragNoopReason, DockDragState, DockDragTransition,
    DockEvent, DockFactory, DockHit, DockHitTester, DockManager, DockPolicyConfig, DragContext,
    DragInput, DragSessionHost, HeadlessHostFactory,
};

#[derive(Default)]
struct Regions(Vec<(Rect, DockHit)>);

impl DockHitTester for Regions {
    fn resolve(&self, position: Point) -> Option<DockHit> {
        self.0
            .iter()
            .find(|(rect, _)| rect.contains(position))
            .map(|(_, hit)| *hit)
    }
}

#[derive(Default)]
struct SessionLog {
    begun: Vec<NodeId>,
    ended: Vec<bool>,
    canceled: usize,
}

impl DragSessionHost for SessionLog {
    fn begin_session(&mut self, source: NodeId, _origin: Point) {
        self.begun.push(source);
    }
    fn update_target(&mut self, _hit: Option<DockHit>, _accepted: bool) {}
    fn end_session(&mut self, dropped: bool) {
        self.ended.push(dropped);
    }
    fn cancel_session(&mut self) {
        self.canceled += 1;
    }
}

struct Harness {
    factory: DockFactory,
    manager: DockManager,
    regions: Regions,
    session: SessionLog,
    machine: DockDragMachine,
}

impl Harness {
    fn new(tree: DockTree, hosts: HeadlessHostFactory, policy: &DockPolicyConfig) -> Self {
        Self {
            factory: DockFactory::with_config(tree, hosts, policy.to_factory_config()),
            manager: DockManager::new(policy.to_manager_config()),
            regions: Regions::default(),
            session: SessionLog::default(),
            machine: DockDragMachine::new(policy.to_drag_config()),
        }
    }

    fn step(&mut self, input: DragInput) -> DockDragTransition {
        let mut ctx = DragContext {
            factory: &mut self.factory,
            manager: &mut self.manager,
            hit_tester: &self.regions,
            session: &mut self.session,
        };
        self.machine.apply(input, &mut ctx)
    }

    fn press(&mut self, x: f64, y: f64, source: NodeId) -> DockDragTransition {
        self.step(DragInput::Pressed {
            position: Point::new(x, y),
            source,
        })
    }

    fn move_to(&mut self, x: f64, y: f64) -> DockDragTransition {
        self.step(DragInput::Moved {
            position: Point::new(x, y),
        })
    }

    fn release(&mut self, x: f64, y: f64) -> DockDragTransition {
        self.step(DragInput::Released {
            position: Point::new(x, y),
        })
    }
}

struct Layout {
    tree: DockTree,
    tools: NodeId,
    tool: NodeId,
    doc: NodeId,
}

/// Main root with a horizontal layout of [tools(tool, keep), docs(doc)].
fn layout() -> Layout {
    let mut tree = DockTree::new("main");
    let root = tree.main_root();
    let split = tree
        .create_proportional_dock("layout", Orientation::Horizontal)
        .expect("alloc");
    let tools = tree
        .create_tool_dock("tools", Alignment::Left)
        .expect("alloc");
    let docs = tree.create_document_dock("docs").expect("alloc");
    tree.add_dockable(root, split).expect("layout");
    tree.add_dockable(split, tools).expect("tools");
    tree.add_dockable(split, docs).expect("docs");
    let tool = tree.create_tool("explorer", "Explorer").expect("alloc");
    let keep = tree.create_tool("outline", "Outline").expect("alloc");
    let doc = tree.create_document("main.rs", "main.rs").expect("alloc");
    tree.add_dockable(tools, tool).expect("tool");
    tree.add_dockable(tools, keep).expect("keep");
    tree.add_dockable(docs, doc).expect("doc");
    Layout {
        tree,
        tools,
        tool,
        doc,
    }
}

#[test]
fn small_motion_keeps_press_large_motion_starts_drag() {
    let Layout { tree, doc, .. } = layout();
    let mut harness = Harness::new(tree, HeadlessHostFactory::new(), &DockPolicyConfig::default());

    harness.press(100.0, 100.0, doc);
    let nudge = harness.move_to(101.0, 101.0);
    assert_eq!(
        nudge.effect,
        DockDragEffect::Noop {
            reason: DockDragNoopReason::ThresholdNotReached
        }
    );
    assert!(matches!(nudge.to, DockDragState::Pressed { .. }));
    assert!(harness.session.begun.is_empty());

    let drag = harness.move_to(110.0, 110.0);
    assert!(matches!(drag.effect, DockDragEffect::DragStarted { .. }));
    assert!(matches!(drag.to, DockDragState::Dragging { .. }));
    assert_eq!(harness.session.begun, vec![doc]);
}

#[test]
fn configured_threshold_applies() {
    let Layout { tree, doc, .. } = layout();
    let mut policy = DockPolicyConfig::default();
    policy.drag.threshold_x = 20.0;
    policy.drag.threshold_y = 20.0;
    assert!(policy.validate().is_empty());
    let mut harness = Harness::new(tree, HeadlessHostFactory::new(), &policy);

    harness.press(0.0, 0.0, doc);
    let moved = harness.move_to(10.0, 10.0);
    assert!(matches!(moved.to, DockDragState::Pressed { .. }));
    let moved = harness.move_to(0.0, 21.0);
    assert!(matches!(moved.to, DockDragState::Dragging { .. }));
}

#[test]
fn float_then_redock_round_trip() {
    let Layout {
        tree, tools, tool, ..
    } = layout();
    let hosts = HeadlessHostFactory::new();
    let log = hosts.log();
    let mut harness = Harness::new(tree, hosts, &DockPolicyConfig::default());

    // Tear the tool out over empty space.
    harness.press(10.0, 10.0, tool);
    harness.move_to(300.0, 200.0);
    let released = harness.release(300.0, 200.0);
    assert!(matches!(
        released.effect,
        DockDragEffect::Floated { executed: true, .. }
    ));
    assert_eq!(harness.machine.state(), DockDragState::Idle);

    let window = harness
        .factory
        .tree()
        .windows()
        .next()
        .map(|window| window.window_id)
        .expect("floating window");
    let events = harness.factory.drain_events();
    assert!(events.contains(&DockEvent::DockableFloated {
        dockable: tool,
        window: Some(window)
    }));
    assert!(events.contains(&DockEvent::WindowOpened { window }));
    assert!(
        log.calls_for(window)
            .iter()
            .any(|call| matches!(call, HostCall::Present { .. }))
    );

    // Drag it back onto the tool dock.
    harness
        .regions
        .0
        .push((Rect::new(0.0, 0.0, 50.0, 50.0), DockHit::local(tools, DockOperation::Fill)));
    harness.press(300.0, 200.0, tool);
    harness.move_to(20.0, 20.0);
    let dropped = harness.release(20.0, 20.0);
    assert!(matches!(
        dropped.effect,
        DockDragEffect::Dropped { executed: true, .. }
    ));
    assert_eq!(harness.factory.tree().container_of(tool), Some(tools));
    assert_eq!(harness.factory.tree().windows().count(), 0);
    assert_eq!(harness.factory.host_count(), 0);
    assert!(
        harness
            .factory
            .drain_events()
            .contains(&DockEvent::WindowClosed { window })
    );
    assert!(
        log.calls_for(window)
            .iter()
            .any(|call| matches!(call, HostCall::Exit { .. }))
    );
    assert_eq!(harness.session.ended, vec![true, true]);
}

#[test]
fn cancel_mid_drag_leaves_layout_alone() {
    let Layout {
        tree, tools, doc, ..
    } = layout();
    let mut harness = Harness::new(tree, HeadlessHostFactory::new(), &DockPolicyConfig::default());
    harness
        .regions
        .0
        .push((Rect::new(0.0, 0.0, 500.0, 500.0), DockHit::local(tools, DockOperation::Right)));
    let before = harness.factory.tree().state_hash();

    harness.press(0.0, 0.0, doc);
    harness.move_to(50.0, 50.0);
    let canceled = harness.step(DragInput::Cancel);
    assert!(matches!(canceled.effect, DockDragEffect::Canceled { .. }));
    assert_eq!(harness.session.canceled, 1);
    assert!(harness.session.ended.is_empty());
    assert_eq!(harness.factory.tree().state_hash(), before);
}

#[test]
fn transition_ids_are_monotonic() {
    let Layout { tree, doc, .. } = layout();
    let mut harness = Harness::new(tree, HeadlessHostFactory::new(), &DockPolicyConfig::default());
    let ids: Vec<u64> = [
        harness.press(0.0, 0.0, doc),
        harness.move_to(1.0, 0.0),
        harness.move_to(30.0, 0.0),
        harness.step(DragInput::CaptureLost),
        harness.step(DragInput::Cancel),
    ]
    .iter()
    .map(|transition| transition.transition_id)
    .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}
