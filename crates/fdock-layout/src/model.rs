#![forbid(unsafe_code)]

//! Dock tree node records.
//!
//! Every node is a [`DockNode`]: a dockable leaf (tool, document), a splitter,
//! or a dock container. Containers carry [`DockData`] whose closed
//! [`DockKind`] decides what they accept and how they lay children out.
//! Behavior dispatches on the kind's capabilities
//! ([`DockKind::supports_proportional_split`], [`DockKind::is_tabbed`],
//! [`DockKind::accepts`]) rather than on a type hierarchy.

use fdock_core::geometry::Rect;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityFlags, CapabilityPolicy};
use crate::id::{NodeId, WindowId};

/// Layout direction of a proportional container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Edge a tool dock is attached to. `Unset` pins to the left side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Unset,
    Left,
    Right,
    Top,
    Bottom,
}

impl Alignment {
    /// Alignment used for pinned-list selection.
    #[must_use]
    pub const fn normalized(self) -> Self {
        match self {
            Self::Unset => Self::Left,
            other => other,
        }
    }

    /// Split operation that places a new tool dock on this side.
    #[must_use]
    pub const fn split_operation(self) -> DockOperation {
        match self.normalized() {
            Self::Right => DockOperation::Right,
            Self::Top => DockOperation::Top,
            Self::Bottom => DockOperation::Bottom,
            _ => DockOperation::Left,
        }
    }
}

/// Drop placement relative to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockOperation {
    Fill,
    Left,
    Right,
    Top,
    Bottom,
    Window,
    None,
}

impl DockOperation {
    /// Axis of a directional split, `None` for non-split operations.
    #[must_use]
    pub const fn orientation(self) -> Option<Orientation> {
        match self {
            Self::Left | Self::Right => Some(Orientation::Horizontal),
            Self::Top | Self::Bottom => Some(Orientation::Vertical),
            Self::Fill | Self::Window | Self::None => None,
        }
    }

    #[must_use]
    pub const fn is_split(self) -> bool {
        self.orientation().is_some()
    }

    /// Left and Top place the new content before the target.
    #[must_use]
    pub const fn inserts_before(self) -> bool {
        matches!(self, Self::Left | Self::Top)
    }
}

/// Drag effect requested by the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragAction {
    #[default]
    None,
    Move,
    Copy,
    Link,
}

/// Whether a drop targets a dock inside its tree or a whole window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropScope {
    #[default]
    Local,
    Global,
}

/// How a floating window picks its host owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockWindowOwnerMode {
    None,
    ParentWindow,
    RootWindow,
    DockableWindow,
    #[default]
    Default,
}

/// Where a moved dockable lands in the target's visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "at", content = "anchor", rename_all = "snake_case")]
pub enum InsertPosition {
    Append,
    Before(NodeId),
    After(NodeId),
}

/// Host window a root or dockable lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOwner {
    Main,
    Window(WindowId),
}

/// Serde adapter mapping `NaN` to `null` and back.
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

fn nan() -> f64 {
    f64::NAN
}

/// Min/max size hints. `NaN` means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeConstraints {
    #[serde(with = "nan_as_null", default = "nan")]
    pub min_width: f64,
    #[serde(with = "nan_as_null", default = "nan")]
    pub max_width: f64,
    #[serde(with = "nan_as_null", default = "nan")]
    pub min_height: f64,
    #[serde(with = "nan_as_null", default = "nan")]
    pub max_height: f64,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self::UNCONSTRAINED
    }
}

impl SizeConstraints {
    pub const UNCONSTRAINED: Self = Self {
        min_width: f64::NAN,
        max_width: f64::NAN,
        min_height: f64::NAN,
        max_height: f64::NAN,
    };

    /// Closed interval allowed along `axis`; unset bounds widen to 0 / +inf.
    #[must_use]
    pub fn interval(&self, axis: Orientation) -> (f64, f64) {
        let (min, max) = match axis {
            Orientation::Horizontal => (self.min_width, self.max_width),
            Orientation::Vertical => (self.min_height, self.max_height),
        };
        let lo = if min.is_finite() { min.max(0.0) } else { 0.0 };
        let hi = if max.is_finite() { max } else { f64::INFINITY };
        (lo, hi)
    }

    /// True when any bound on `axis` is finite.
    #[must_use]
    pub fn is_constrained(&self, axis: Orientation) -> bool {
        match axis {
            Orientation::Horizontal => self.min_width.is_finite() || self.max_width.is_finite(),
            Orientation::Vertical => self.min_height.is_finite() || self.max_height.is_finite(),
        }
    }

    /// Both intervals on `axis` overlap.
    #[must_use]
    pub fn compatible_with(&self, other: &Self, axis: Orientation) -> bool {
        let (a_lo, a_hi) = self.interval(axis);
        let (b_lo, b_hi) = other.interval(axis);
        a_lo <= b_hi && b_lo <= a_hi
    }
}

/// Root-only state: auxiliary lists, preview slot, floating windows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootData {
    #[serde(default)]
    pub hidden: Vec<NodeId>,
    #[serde(default)]
    pub left_pinned: Vec<NodeId>,
    #[serde(default)]
    pub right_pinned: Vec<NodeId>,
    #[serde(default)]
    pub top_pinned: Vec<NodeId>,
    #[serde(default)]
    pub bottom_pinned: Vec<NodeId>,
    /// Transient tool dock showing a previewed pinned dockable.
    #[serde(default)]
    pub pinned_dock: Option<NodeId>,
    #[serde(default)]
    pub windows: Vec<WindowId>,
    #[serde(default)]
    pub root_policy: Option<CapabilityPolicy>,
    /// Window hosting this root; `None` for the main root.
    #[serde(default)]
    pub window: Option<WindowId>,
}

impl RootData {
    #[must_use]
    pub fn pinned_list(&self, alignment: Alignment) -> &Vec<NodeId> {
        match alignment.normalized() {
            Alignment::Right => &self.right_pinned,
            Alignment::Top => &self.top_pinned,
            Alignment::Bottom => &self.bottom_pinned,
            _ => &self.left_pinned,
        }
    }

    pub fn pinned_list_mut(&mut self, alignment: Alignment) -> &mut Vec<NodeId> {
        match alignment.normalized() {
            Alignment::Right => &mut self.right_pinned,
            Alignment::Top => &mut self.top_pinned,
            Alignment::Bottom => &mut self.bottom_pinned,
            _ => &mut self.left_pinned,
        }
    }

    /// Side whose pinned list contains `node_id`.
    #[must_use]
    pub fn pinned_alignment_of(&self, node_id: NodeId) -> Option<Alignment> {
        [
            Alignment::Left,
            Alignment::Right,
            Alignment::Top,
            Alignment::Bottom,
        ]
        .into_iter()
        .find(|alignment| self.pinned_list(*alignment).contains(&node_id))
    }

    /// All pinned entries, left, right, top, bottom.
    pub fn pinned(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.left_pinned
            .iter()
            .chain(&self.right_pinned)
            .chain(&self.top_pinned)
            .chain(&self.bottom_pinned)
            .copied()
    }

    /// Remove `node_id` from every pinned list; true if it was present.
    pub fn unpin_entry(&mut self, node_id: NodeId) -> bool {
        let mut found = false;
        for list in [
            &mut self.left_pinned,
            &mut self.right_pinned,
            &mut self.top_pinned,
            &mut self.bottom_pinned,
        ] {
            let before = list.len();
            list.retain(|id| *id != node_id);
            found |= list.len() != before;
        }
        found
    }
}

/// Closed set of container kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DockKind {
    Root(RootData),
    Proportional,
    Tool,
    Document,
    Stack,
}

impl DockKind {
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root(_))
    }

    /// Children are laid out side by side with splitters between them.
    #[must_use]
    pub const fn supports_proportional_split(&self) -> bool {
        matches!(self, Self::Proportional)
    }

    /// Children share one slot and switch by activation.
    #[must_use]
    pub const fn is_tabbed(&self) -> bool {
        matches!(self, Self::Tool | Self::Document | Self::Stack)
    }

    /// Whether a child of `kind` may be placed in this container.
    #[must_use]
    pub fn accepts(&self, kind: &NodeKind) -> bool {
        if kind.is_root() {
            return false;
        }
        match self {
            Self::Tool => matches!(kind, NodeKind::Tool),
            Self::Document => matches!(kind, NodeKind::Document | NodeKind::Tool),
            Self::Proportional => true,
            Self::Stack | Self::Root(_) => !kind.is_splitter(),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Root(_) => "root",
            Self::Proportional => "proportional",
            Self::Tool => "tool",
            Self::Document => "document",
            Self::Stack => "stack",
        }
    }
}

/// Container state shared by every dock kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockData {
    pub dock_kind: DockKind,
    /// Ordered, unique visible children.
    #[serde(default)]
    pub visible: Vec<NodeId>,
    #[serde(default)]
    pub active: Option<NodeId>,
    #[serde(default)]
    pub focused: Option<NodeId>,
    #[serde(default)]
    pub capability_policy: Option<CapabilityPolicy>,
    #[serde(default)]
    pub alignment: Alignment,
    pub orientation: Orientation,
    pub enable_global_docking: bool,
    /// Removed automatically once its last content child leaves.
    pub collapsable: bool,
}

impl DockData {
    #[must_use]
    pub fn new(dock_kind: DockKind) -> Self {
        let collapsable = !dock_kind.is_root();
        Self {
            dock_kind,
            visible: Vec::new(),
            active: None,
            focused: None,
            capability_policy: None,
            alignment: Alignment::Unset,
            orientation: Orientation::Horizontal,
            enable_global_docking: true,
            collapsable,
        }
    }

    #[must_use]
    pub fn root(&self) -> Option<&RootData> {
        match &self.dock_kind {
            DockKind::Root(root) => Some(root),
            _ => None,
        }
    }

    pub fn root_mut(&mut self) -> Option<&mut RootData> {
        match &mut self.dock_kind {
            DockKind::Root(root) => Some(root),
            _ => None,
        }
    }

    #[must_use]
    pub fn position_of(&self, node_id: NodeId) -> Option<usize> {
        self.visible.iter().position(|id| *id == node_id)
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Tool,
    Document,
    Splitter,
    Dock(DockData),
}

impl NodeKind {
    #[must_use]
    pub const fn is_splitter(&self) -> bool {
        matches!(self, Self::Splitter)
    }

    /// Anything but a splitter counts as content.
    #[must_use]
    pub const fn is_content(&self) -> bool {
        !self.is_splitter()
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        match self {
            Self::Dock(dock) => dock.dock_kind.is_root(),
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_dock(&self) -> Option<&DockData> {
        match self {
            Self::Dock(dock) => Some(dock),
            _ => None,
        }
    }

    pub fn as_dock_mut(&mut self) -> Option<&mut DockData> {
        match self {
            Self::Dock(dock) => Some(dock),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Document => "document",
            Self::Splitter => "splitter",
            Self::Dock(dock) => dock.dock_kind.label(),
        }
    }
}

/// One arena record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockNode {
    pub node_id: NodeId,
    /// Stable string id used by hosts and serialization.
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Containing dock; maintained by the mutation engine.
    #[serde(default)]
    pub owner: Option<NodeId>,
    /// Container to return to while hidden or previewed.
    #[serde(default)]
    pub original_owner: Option<NodeId>,
    /// Share of the parent's extent. `NaN` means natural size.
    #[serde(with = "nan_as_null", default = "nan")]
    pub proportion: f64,
    #[serde(default)]
    pub constraints: SizeConstraints,
    #[serde(default)]
    pub dock_group: Option<String>,
    #[serde(default)]
    pub flags: CapabilityFlags,
    #[serde(default)]
    pub capability_overrides: Option<CapabilityPolicy>,
    /// Survives the "hide all previews" pass.
    #[serde(default)]
    pub keep_pinned_visible: bool,
    pub kind: NodeKind,
}

impl DockNode {
    #[must_use]
    pub fn new(node_id: NodeId, id: impl Into<String>, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            node_id,
            id: id.into(),
            title: title.into(),
            owner: None,
            original_owner: None,
            proportion: f64::NAN,
            constraints: SizeConstraints::UNCONSTRAINED,
            dock_group: None,
            flags: CapabilityFlags::default(),
            capability_overrides: None,
            keep_pinned_visible: false,
            kind,
        }
    }

    #[must_use]
    pub const fn dock(&self) -> Option<&DockData> {
        self.kind.as_dock()
    }

    pub fn dock_mut(&mut self) -> Option<&mut DockData> {
        self.kind.as_dock_mut()
    }

    #[must_use]
    pub const fn is_dock(&self) -> bool {
        matches!(self.kind, NodeKind::Dock(_))
    }

    #[must_use]
    pub fn is_tool_dock(&self) -> bool {
        matches!(
            self.dock(),
            Some(DockData {
                dock_kind: DockKind::Tool,
                ..
            })
        )
    }

    #[must_use]
    pub fn is_document_dock(&self) -> bool {
        matches!(
            self.dock(),
            Some(DockData {
                dock_kind: DockKind::Document,
                ..
            })
        )
    }
}

/// Window geometry in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WindowBounds {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl From<Rect> for WindowBounds {
    fn from(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// Floating window hosting its own root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockWindow {
    pub window_id: WindowId,
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Root node shown in this window.
    pub layout: NodeId,
    /// Root whose `windows` list contains this window.
    pub owner_root: NodeId,
    pub bounds: WindowBounds,
    #[serde(default)]
    pub owner_mode: DockWindowOwnerMode,
    /// Container the floated content came from.
    #[serde(default)]
    pub origin: Option<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_alignment_pins_left() {
        let mut root = RootData::default();
        root.pinned_list_mut(Alignment::Unset).push(NodeId::MIN);
        assert_eq!(root.left_pinned, vec![NodeId::MIN]);
        assert_eq!(root.pinned_alignment_of(NodeId::MIN), Some(Alignment::Left));
        assert!(root.unpin_entry(NodeId::MIN));
        assert!(!root.unpin_entry(NodeId::MIN));
    }

    #[test]
    fn acceptance_by_kind() {
        assert!(DockKind::Tool.accepts(&NodeKind::Tool));
        assert!(!DockKind::Tool.accepts(&NodeKind::Document));
        assert!(DockKind::Document.accepts(&NodeKind::Document));
        assert!(DockKind::Document.accepts(&NodeKind::Tool));
        assert!(!DockKind::Document.accepts(&NodeKind::Splitter));
        assert!(DockKind::Proportional.accepts(&NodeKind::Splitter));
        let nested_root = NodeKind::Dock(DockData::new(DockKind::Root(RootData::default())));
        assert!(!DockKind::Proportional.accepts(&nested_root));
    }

    #[test]
    fn operation_axes() {
        assert_eq!(DockOperation::Left.orientation(), Some(Orientation::Horizontal));
        assert_eq!(DockOperation::Bottom.orientation(), Some(Orientation::Vertical));
        assert_eq!(DockOperation::Fill.orientation(), None);
        assert!(DockOperation::Top.inserts_before());
        assert!(!DockOperation::Right.inserts_before());
    }

    #[test]
    fn constraint_intervals() {
        let narrow = SizeConstraints {
            max_width: 100.0,
            ..SizeConstraints::UNCONSTRAINED
        };
        let wide = SizeConstraints {
            min_width: 200.0,
            ..SizeConstraints::UNCONSTRAINED
        };
        assert!(!narrow.compatible_with(&wide, Orientation::Horizontal));
        assert!(narrow.compatible_with(&wide, Orientation::Vertical));
        assert!(narrow.compatible_with(&SizeConstraints::UNCONSTRAINED, Orientation::Horizontal));
        assert!(narrow.is_constrained(Orientation::Horizontal));
        assert!(!narrow.is_constrained(Orientation::Vertical));
    }

    #[test]
    fn nan_proportion_serializes_as_null() {
        let node = DockNode::new(NodeId::MIN, "doc", "Doc", NodeKind::Document);
        let json = serde_json::to_string(&node).expect("serialize");
        assert!(json.contains("\"proportion\":null"));
        let back: DockNode = serde_json::from_str(&json).expect("deserialize");
        assert!(back.proportion.is_nan());
        assert_eq!(back.kind, NodeKind::Document);
    }
}
