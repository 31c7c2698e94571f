//! Node and value types for substation topology graphs.
//!
//! A topology graph holds one [`Node`] per piece of switchyard equipment
//! (busbar sections, switches, feeders) plus synthetic junctions. The node
//! kind is a closed sum so that downstream dispatch over node categories is
//! exhaustively checked by the compiler.

use serde::{Deserialize, Serialize};

/// Structural grid position of a bus node.
///
/// `h` is the 1-based section slot along a busbar lane, `v` is the 1-based
/// busbar (lane) index. Both are assigned by the position assigner unless the
/// bus carries a pre-supplied hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    h: u32,
    v: u32,
}

impl Position {
    /// Creates a position at horizontal slot `h` on busbar lane `v`.
    pub fn new(h: u32, v: u32) -> Self {
        Self { h, v }
    }

    /// Section index along the busbar lane (horizontal slot).
    pub fn section_index(&self) -> u32 {
        self.h
    }

    /// Busbar lane index (vertical lane).
    pub fn busbar_index(&self) -> u32 {
        self.v
    }
}

/// Vertical orientation of an extern cell and of the feeders it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    Bottom,
}

/// One of the two mergeable extremities of a cluster, or one of the two legs
/// of an intern cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Returns the opposite side.
    pub fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Kind of switching device a switch node models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    Breaker,
    Disconnector,
    LoadBreakSwitch,
}

/// Equipment category behind a node, used for rendering downstream and for
/// the three-winding-transformer rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    BusbarSection,
    Breaker,
    Disconnector,
    LoadBreakSwitch,
    Load,
    Line,
    Generator,
    Capacitor,
    TwoWindingsTransformer,
    ThreeWindingsTransformer,
    /// Synthetic junction with no equipment backing.
    Junction,
}

/// Closed set of node categories.
///
/// Variant payloads hold the state the layout algorithm reads or writes:
/// bus nodes carry their structural position, feeder nodes their order and
/// orientation.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Bus {
        position: Option<Position>,
        /// A pre-supplied position hint that must be preserved, never
        /// overwritten by the assigner.
        fixed: bool,
    },
    Switch {
        kind: SwitchKind,
        open: bool,
    },
    Feeder {
        order: Option<u32>,
        direction: Option<Direction>,
    },
    Fictitious,
}

/// An equipment terminal, switch, bus, feeder, or synthetic junction.
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    component: ComponentKind,
    kind: NodeKind,
}

impl Node {
    /// Creates a busbar-section node with no position assigned yet.
    pub fn bus(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: ComponentKind::BusbarSection,
            kind: NodeKind::Bus {
                position: None,
                fixed: false,
            },
        }
    }

    /// Creates a bus node carrying a pre-supplied structural position.
    ///
    /// The position comes from upstream extension data; the assigner keeps it
    /// untouched.
    pub fn bus_with_position(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            component: ComponentKind::BusbarSection,
            kind: NodeKind::Bus {
                position: Some(position),
                fixed: true,
            },
        }
    }

    /// Creates a fictitious bus, used to repair bus-less connected
    /// components.
    pub fn fictitious_bus(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: ComponentKind::Junction,
            kind: NodeKind::Bus {
                position: None,
                fixed: false,
            },
        }
    }

    /// Creates a switch node.
    pub fn switch(id: impl Into<String>, kind: SwitchKind, open: bool) -> Self {
        let component = match kind {
            SwitchKind::Breaker => ComponentKind::Breaker,
            SwitchKind::Disconnector => ComponentKind::Disconnector,
            SwitchKind::LoadBreakSwitch => ComponentKind::LoadBreakSwitch,
        };
        Self {
            id: id.into(),
            component,
            kind: NodeKind::Switch { kind, open },
        }
    }

    /// Creates a feeder node of the given equipment category.
    pub fn feeder(id: impl Into<String>, component: ComponentKind) -> Self {
        Self {
            id: id.into(),
            component,
            kind: NodeKind::Feeder {
                order: None,
                direction: None,
            },
        }
    }

    /// Creates a fictitious junction node.
    pub fn fictitious(id: impl Into<String>) -> Self {
        Self::fictitious_with_component(id, ComponentKind::Junction)
    }

    /// Creates a fictitious node with an explicit component category, e.g.
    /// the hub of a rewritten three-winding transformer.
    pub fn fictitious_with_component(id: impl Into<String>, component: ComponentKind) -> Self {
        Self {
            id: id.into(),
            component,
            kind: NodeKind::Fictitious,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn component(&self) -> ComponentKind {
        self.component
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_bus(&self) -> bool {
        matches!(self.kind, NodeKind::Bus { .. })
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.kind, NodeKind::Switch { .. })
    }

    pub fn is_feeder(&self) -> bool {
        matches!(self.kind, NodeKind::Feeder { .. })
    }

    pub fn is_fictitious(&self) -> bool {
        matches!(self.kind, NodeKind::Fictitious)
    }

    /// Structural position, bus nodes only.
    pub fn bus_position(&self) -> Option<Position> {
        match &self.kind {
            NodeKind::Bus { position, .. } => *position,
            _ => None,
        }
    }

    /// Whether this bus carries a pre-supplied position hint.
    pub fn has_fixed_position(&self) -> bool {
        matches!(self.kind, NodeKind::Bus { fixed: true, .. })
    }

    /// Assigns the structural position of a bus node.
    ///
    /// # Panics
    /// Panics if the node is not a bus; callers dispatch on the kind first.
    pub fn set_bus_position(&mut self, new_position: Position) {
        match &mut self.kind {
            NodeKind::Bus { position, .. } => *position = Some(new_position),
            _ => panic!("structural position on non-bus node {}", self.id),
        }
    }

    /// Clears the structural position of a non-fixed bus node. No-op on
    /// fixed buses and non-bus nodes.
    pub fn clear_bus_position(&mut self) {
        if let NodeKind::Bus { position, fixed } = &mut self.kind {
            if !*fixed {
                *position = None;
            }
        }
    }

    /// Feeder order, feeder nodes only.
    pub fn feeder_order(&self) -> Option<u32> {
        match &self.kind {
            NodeKind::Feeder { order, .. } => *order,
            _ => None,
        }
    }

    pub fn set_feeder_order(&mut self, new_order: u32) {
        match &mut self.kind {
            NodeKind::Feeder { order, .. } => *order = Some(new_order),
            _ => panic!("feeder order on non-feeder node {}", self.id),
        }
    }

    /// Feeder orientation, feeder nodes only.
    pub fn feeder_direction(&self) -> Option<Direction> {
        match &self.kind {
            NodeKind::Feeder { direction, .. } => *direction,
            _ => None,
        }
    }

    pub fn set_feeder_direction(&mut self, new_direction: Direction) {
        match &mut self.kind {
            NodeKind::Feeder { direction, .. } => *direction = Some(new_direction),
            _ => panic!("feeder direction on non-feeder node {}", self.id),
        }
    }

    /// Whether a switch node is open. Non-switch nodes are never open.
    pub fn is_open(&self) -> bool {
        matches!(self.kind, NodeKind::Switch { open: true, .. })
    }
}
