//! Leg bus sets and their absorption-based construction.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::debug;

use voltgrid_core::{CellId, CellKind, LayoutError, NodeIndex, Side, TopologyGraph};

/// The set of bus nodes reachable from one leg of a cell, or a single orphan
/// bus, tagged with the cells it carries.
///
/// After building, no two leg bus sets are in a strict subset relation:
/// smaller sets are absorbed into larger ones that contain them.
#[derive(Debug, Clone, Default)]
pub struct LegBusSet {
    buses: BTreeSet<NodeIndex>,
    embedded_cells: BTreeSet<CellId>,
    /// Two-bus intern cells with the leg side this set carries.
    candidate_flat: IndexMap<CellId, Side>,
    /// Intern cells spanning more than two buses, with the carried leg side.
    crossover: IndexMap<CellId, Side>,
}

impl LegBusSet {
    /// A set carrying a whole extern or shunt cell: all its reachable buses.
    fn from_whole_cell(graph: &TopologyGraph, cell_id: CellId) -> Self {
        let cell = graph.cell(cell_id);
        let mut set = Self {
            buses: cell.buses().iter().copied().collect(),
            ..Self::default()
        };
        set.embedded_cells.insert(cell_id);
        set
    }

    /// A set carrying one leg of an intern cell.
    fn from_intern_leg(graph: &TopologyGraph, cell_id: CellId, side: Side) -> Self {
        let cell = graph.cell(cell_id);
        let mut set = Self {
            buses: cell.leg_buses(side).iter().copied().collect(),
            ..Self::default()
        };
        if cell.bus_count() == 2 {
            set.candidate_flat.insert(cell_id, side);
        } else {
            set.crossover.insert(cell_id, side);
        }
        set
    }

    /// A singleton set for an orphan bus covered by no cell.
    pub fn single_bus(bus: NodeIndex) -> Self {
        let mut set = Self::default();
        set.buses.insert(bus);
        set
    }

    /// Bus nodes of this set, sorted by index.
    pub fn buses(&self) -> &BTreeSet<NodeIndex> {
        &self.buses
    }

    /// Cells fully carried by this set, in id order.
    pub fn embedded_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.embedded_cells.iter().copied()
    }

    /// Candidate flat cells this set carries a leg of.
    pub fn candidate_flat_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.candidate_flat.keys().copied()
    }

    pub fn candidate_flat_count(&self) -> usize {
        self.candidate_flat.len()
    }

    /// Crossover cells this set carries a leg of.
    pub fn crossover_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.crossover.keys().copied()
    }

    /// Whether this set's buses are a (non-strict) superset of `other`'s.
    fn contains(&self, other: &LegBusSet) -> bool {
        other.buses.is_subset(&self.buses)
    }

    /// Takes over another set's buses and cells.
    fn absorb(&mut self, other: LegBusSet) {
        self.buses.extend(other.buses);
        self.embedded_cells.extend(other.embedded_cells);
        self.candidate_flat.extend(other.candidate_flat);
        self.crossover.extend(other.crossover);
    }

    /// Demotes candidate flat and crossover cells whose opposite leg is
    /// already fully contained here: such cells do not bridge anywhere and
    /// count as embedded.
    fn check_intern_cells(&mut self, graph: &TopologyGraph) {
        let contained = |buses: &BTreeSet<NodeIndex>, cell_id: CellId, side: Side| {
            graph
                .cell(cell_id)
                .leg_buses(side.flip())
                .iter()
                .all(|b| buses.contains(b))
        };
        let demoted: Vec<CellId> = self
            .candidate_flat
            .iter()
            .filter(|&(&cell_id, &side)| contained(&self.buses, cell_id, side))
            .map(|(&cell_id, _)| cell_id)
            .collect();
        for cell_id in demoted {
            self.candidate_flat.shift_remove(&cell_id);
            self.embedded_cells.insert(cell_id);
        }
        let demoted: Vec<CellId> = self
            .crossover
            .iter()
            .filter(|&(&cell_id, &side)| contained(&self.buses, cell_id, side))
            .map(|(&cell_id, _)| cell_id)
            .collect();
        for cell_id in demoted {
            self.crossover.shift_remove(&cell_id);
            self.embedded_cells.insert(cell_id);
        }
    }
}

/// Derives the leg bus sets of a classified graph.
///
/// Intern cells contribute one set per leg, extern and shunt cells one set
/// with all their buses, orphan buses a singleton each. Subset relations are
/// resolved by absorption on insert.
///
/// # Errors
/// [`LayoutError::InvariantViolation`] if two sets are still in a strict
/// subset relation after the absorption pass.
pub fn build_leg_bus_sets(graph: &TopologyGraph) -> Result<Vec<LegBusSet>, LayoutError> {
    let mut sets: Vec<LegBusSet> = Vec::new();
    for cell in graph.cells() {
        match cell.kind() {
            CellKind::Intern { .. } => {
                push_new(&mut sets, LegBusSet::from_intern_leg(graph, cell.id(), Side::Left));
                push_new(&mut sets, LegBusSet::from_intern_leg(graph, cell.id(), Side::Right));
            }
            CellKind::Extern | CellKind::Shunt => {
                push_new(&mut sets, LegBusSet::from_whole_cell(graph, cell.id()));
            }
        }
    }

    let covered: BTreeSet<NodeIndex> = sets
        .iter()
        .flat_map(|s| s.buses.iter().copied())
        .collect();
    for bus in graph.bus_nodes() {
        if !covered.contains(&bus) {
            sets.push(LegBusSet::single_bus(bus));
        }
    }

    for set in &mut sets {
        set.check_intern_cells(graph);
    }
    validate_no_subset(&sets)?;
    debug!("built {} leg bus sets", sets.len());
    Ok(sets)
}

/// Inserts a freshly derived set, resolving subset relations: an existing
/// superset absorbs the newcomer, a newcomer superset absorbs all existing
/// subsets.
fn push_new(sets: &mut Vec<LegBusSet>, new: LegBusSet) {
    for existing in sets.iter_mut() {
        if existing.contains(&new) {
            existing.absorb(new);
            return;
        }
    }
    let mut new = new;
    let mut i = 0;
    while i < sets.len() {
        if new.contains(&sets[i]) {
            let absorbed = sets.remove(i);
            new.absorb(absorbed);
        } else {
            i += 1;
        }
    }
    sets.push(new);
}

fn validate_no_subset(sets: &[LegBusSet]) -> Result<(), LayoutError> {
    for (i, a) in sets.iter().enumerate() {
        for b in sets.iter().skip(i + 1) {
            let a_in_b = a.buses.is_subset(&b.buses);
            let b_in_a = b.buses.is_subset(&a.buses);
            if a_in_b || b_in_a {
                return Err(LayoutError::InvariantViolation(format!(
                    "leg bus sets left in subset relation: {:?} and {:?}",
                    a.buses, b.buses
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltgrid_core::{ComponentKind, Node, SwitchKind};

    use crate::classify::classify_cells;

    fn classified(graph: &mut TopologyGraph) {
        let cells = classify_cells(graph).unwrap();
        graph.assign_cells(cells);
    }

    /// Double busbar with one feeder selectable on both sections and a
    /// coupler between them.
    fn double_busbar() -> (TopologyGraph, NodeIndex, NodeIndex) {
        let mut graph = TopologyGraph::new();
        let bbs1 = graph.add_node(Node::bus("bbs1"));
        let bbs2 = graph.add_node(Node::bus("bbs2"));
        // feeder selectable on both buses
        let d1 = graph.add_node(Node::switch("d1", SwitchKind::Disconnector, false));
        let d2 = graph.add_node(Node::switch("d2", SwitchKind::Disconnector, false));
        let b1 = graph.add_node(Node::switch("b1", SwitchKind::Breaker, false));
        let load = graph.add_node(Node::feeder("load1", ComponentKind::Load));
        graph.add_edge(bbs1, d1);
        graph.add_edge(bbs2, d2);
        graph.add_edge(d1, b1);
        graph.add_edge(d2, b1);
        graph.add_edge(b1, load);
        // coupler
        let dc1 = graph.add_node(Node::switch("dc1", SwitchKind::Disconnector, false));
        let bc = graph.add_node(Node::switch("bc", SwitchKind::Breaker, false));
        let dc2 = graph.add_node(Node::switch("dc2", SwitchKind::Disconnector, false));
        graph.add_edge(bbs1, dc1);
        graph.add_edge(dc1, bc);
        graph.add_edge(bc, dc2);
        graph.add_edge(dc2, bbs2);
        classified(&mut graph);
        (graph, bbs1, bbs2)
    }

    #[test]
    fn test_intern_cell_yields_two_sets() {
        let mut graph = TopologyGraph::new();
        let bbs1 = graph.add_node(Node::bus("bbs1"));
        let bbs2 = graph.add_node(Node::bus("bbs2"));
        let d = graph.add_node(Node::switch("d1", SwitchKind::Disconnector, false));
        graph.add_edge(bbs1, d);
        graph.add_edge(d, bbs2);
        classified(&mut graph);

        let sets = build_leg_bus_sets(&graph).unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].buses().contains(&bbs1));
        assert!(sets[1].buses().contains(&bbs2));
        assert_eq!(sets[0].candidate_flat_count(), 1);
        assert_eq!(sets[1].candidate_flat_count(), 1);
    }

    #[test]
    fn test_superset_absorbs_legs() {
        // the feeder's extern cell reaches both buses, so both coupler legs
        // are absorbed into it
        let (graph, bbs1, bbs2) = double_busbar();
        let sets = build_leg_bus_sets(&graph).unwrap();

        assert_eq!(sets.len(), 1);
        let set = &sets[0];
        assert!(set.buses().contains(&bbs1) && set.buses().contains(&bbs2));
        // both coupler legs landed here, so the coupler is embedded
        assert_eq!(set.candidate_flat_count(), 0);
        assert_eq!(set.embedded_cells().count(), 2);
    }

    #[test]
    fn test_orphan_bus_gets_singleton_set() {
        let mut graph = TopologyGraph::new();
        let bbs1 = graph.add_node(Node::bus("bbs1"));
        let d = graph.add_node(Node::switch("d1", SwitchKind::Disconnector, false));
        let load = graph.add_node(Node::feeder("load1", ComponentKind::Load));
        graph.add_edge(bbs1, d);
        graph.add_edge(d, load);
        let orphan = graph.add_node(Node::bus("bbs9"));
        classified(&mut graph);

        let sets = build_leg_bus_sets(&graph).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(
            sets[1].buses().iter().copied().collect::<Vec<_>>(),
            vec![orphan]
        );
    }

    #[test]
    fn test_no_subset_pairs_in_output() {
        let (graph, _, _) = double_busbar();
        let sets = build_leg_bus_sets(&graph).unwrap();
        for (i, a) in sets.iter().enumerate() {
            for (j, b) in sets.iter().enumerate() {
                if i != j {
                    assert!(
                        !a.buses().is_subset(b.buses()),
                        "subset pair {i} and {j}"
                    );
                }
            }
        }
    }
}
