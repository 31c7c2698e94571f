//! Cells: maximal chains of non-bus equipment bounded by bus nodes.
//!
//! Every non-bus node of a classified topology graph belongs to exactly one
//! cell. The cell kind is a closed sum; a topology that fits none of the
//! variants is rejected by the classifier rather than guessed at.

use crate::graph::NodeIndex;
use crate::node::{Direction, Side};

/// Stable identifier of a cell within its graph, assigned in creation order.
pub type CellId = usize;

/// Closed set of cell categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    /// Touches the busbar through a single leg; carries the cell's feeders.
    Extern,
    /// Connects two legs of bus nodes with no feeder in between.
    ///
    /// A two-bus intern cell is a flat-cell candidate; one spanning more
    /// buses is a crossover candidate.
    Intern {
        /// Bus nodes reachable from each leg, sorted. `legs[0]` is the LEFT
        /// leg, `legs[1]` the RIGHT leg; the labels are structural, not
        /// geometric, until clustering orders the lanes.
        legs: [Vec<NodeIndex>; 2],
    },
    /// Degenerate intern chain looping back onto a single bus path.
    Shunt,
}

/// A maximal connected subgraph of non-bus nodes plus its adjacent buses.
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    kind: CellKind,
    /// Non-bus member nodes, sorted by index.
    nodes: Vec<NodeIndex>,
    /// Distinct adjacent bus nodes, sorted by index.
    buses: Vec<NodeIndex>,
    /// Assigned by the position pass, extern cells only.
    order: Option<u32>,
    direction: Option<Direction>,
}

impl Cell {
    pub fn new(id: CellId, kind: CellKind, nodes: Vec<NodeIndex>, buses: Vec<NodeIndex>) -> Self {
        Self {
            id,
            kind,
            nodes,
            buses,
            order: None,
            direction: None,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    /// Non-bus member nodes, sorted by index.
    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    /// Distinct adjacent bus nodes, sorted by index.
    pub fn buses(&self) -> &[NodeIndex] {
        &self.buses
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn is_extern(&self) -> bool {
        matches!(self.kind, CellKind::Extern)
    }

    pub fn is_intern(&self) -> bool {
        matches!(self.kind, CellKind::Intern { .. })
    }

    pub fn is_shunt(&self) -> bool {
        matches!(self.kind, CellKind::Shunt)
    }

    /// Bus nodes of one leg of an intern cell. Empty for other kinds.
    pub fn leg_buses(&self, side: Side) -> &[NodeIndex] {
        match &self.kind {
            CellKind::Intern { legs } => match side {
                Side::Left => &legs[0],
                Side::Right => &legs[1],
            },
            _ => &[],
        }
    }

    pub fn order(&self) -> Option<u32> {
        self.order
    }

    pub fn set_order(&mut self, order: u32) {
        self.order = Some(order);
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }
}
