//! Position assignment over the final cluster.
//!
//! Walks the root cluster's leg bus sets twice: once to place every bus on
//! the `(h, v)` structural grid lane by lane, once to give every extern cell
//! and feeder an order and a TOP/BOTTOM orientation. Ends with a coverage
//! check; partial assignments are never returned.

use std::collections::BTreeSet;

use log::{debug, info};

use voltgrid_core::{
    CellId, Direction, LayoutError, NodeIndex, Position, TopologyGraph,
};

use crate::cluster::{LbsCluster, LegBusSet};

/// Assigns structural positions to buses and order/orientation to extern
/// cells and feeders.
///
/// # Errors
/// [`LayoutError::InvariantViolation`] if any bus or feeder is left
/// unassigned, which indicates a builder bug upstream.
pub fn assign_positions(graph: &mut TopologyGraph, root: &LbsCluster) -> Result<(), LayoutError> {
    establish_bus_positions(graph, root)?;
    establish_feeder_positions(graph, root);
    check_coverage(graph)
}

/// Walks the cluster lane by lane, placing every not-yet-placed bus.
///
/// Buses with a pre-supplied fixed position are preserved untouched and
/// excluded from the pool; fresh lanes start below the highest fixed lane.
fn establish_bus_positions(
    graph: &mut TopologyGraph,
    root: &LbsCluster,
) -> Result<(), LayoutError> {
    let buses = graph.bus_nodes();
    for &bus in &buses {
        graph.node_mut(bus).clear_bus_position();
    }
    let mut remaining: BTreeSet<NodeIndex> = buses
        .iter()
        .copied()
        .filter(|&b| !graph.node(b).has_fixed_position())
        .collect();
    let mut v = 1 + buses
        .iter()
        .filter(|&&b| graph.node(b).has_fixed_position())
        .filter_map(|&b| graph.node(b).bus_position())
        .map(|p| p.busbar_index())
        .max()
        .unwrap_or(0);

    while !remaining.is_empty() {
        let before = remaining.len();
        build_lane(graph, root, &mut remaining, v);
        if remaining.len() == before {
            return Err(LayoutError::InvariantViolation(
                "lane pass placed no bus; cluster does not cover the graph".into(),
            ));
        }
        v += 1;
    }
    debug!("bus positions established over {} lanes", v - 1);
    Ok(())
}

/// Walking cursor: the bus being placed and the leg-bus-set position it was
/// found in.
struct BusCursor {
    bus: Option<NodeIndex>,
    lbs_index: usize,
}

/// Builds one horizontal lane at vertical index `v`.
///
/// Advances left to right; after placing a bus it prefers continuing into a
/// bus reachable through a candidate flat cell, minimizing wiring crossings.
/// Buses already passed on the left of the walk cannot restart the lane.
fn build_lane(
    graph: &mut TopologyGraph,
    root: &LbsCluster,
    remaining: &mut BTreeSet<NodeIndex>,
    v: u32,
) {
    let lbs_list = root.lbs_list();
    let mut bus_on_left: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut h = 1u32;
    let mut cursor = BusCursor {
        bus: None,
        lbs_index: 0,
    };
    while cursor.lbs_index < lbs_list.len() {
        if cursor.bus.is_none() {
            find_bus_to_position(lbs_list, &mut cursor, remaining, &bus_on_left);
        }
        if let Some(bus) = cursor.bus {
            graph.node_mut(bus).set_bus_position(Position::new(h, v));
            h += 1;
            remaining.remove(&bus);

            let placed_at = cursor.lbs_index;
            move_to_last_lbs_containing(&mut cursor, lbs_list);
            mark_passed_on_left(&mut bus_on_left, lbs_list, placed_at, cursor.lbs_index);

            let continued_from = cursor.lbs_index;
            if continue_through_flat_cell(graph, lbs_list, &mut cursor, remaining, &bus_on_left) {
                mark_passed_on_left(&mut bus_on_left, lbs_list, continued_from, cursor.lbs_index);
            } else {
                cursor.bus = None;
                cursor.lbs_index += 1;
            }
        }
    }
}

/// Finds the next placeable bus at or after the cursor, scanning leg bus
/// sets left to right. Leaves the cursor out of range when none remains.
fn find_bus_to_position(
    lbs_list: &[LegBusSet],
    cursor: &mut BusCursor,
    remaining: &BTreeSet<NodeIndex>,
    bus_on_left: &BTreeSet<NodeIndex>,
) {
    for i in cursor.lbs_index..lbs_list.len() {
        cursor.lbs_index = i;
        for &bus in lbs_list[i].buses() {
            if remaining.contains(&bus) && !bus_on_left.contains(&bus) {
                cursor.bus = Some(bus);
                return;
            }
        }
    }
    cursor.lbs_index = lbs_list.len();
}

/// Moves the cursor to the last leg bus set still containing the current
/// bus, so the lane keeps extending as far right as the bus reaches.
fn move_to_last_lbs_containing(cursor: &mut BusCursor, lbs_list: &[LegBusSet]) {
    let bus = cursor.bus.expect("cursor holds a bus");
    let mut j = lbs_list.len() - 1;
    while j > cursor.lbs_index {
        if lbs_list[j].buses().contains(&bus) {
            break;
        }
        j -= 1;
    }
    cursor.lbs_index = j;
}

/// Marks every bus of the walked-over leg bus sets as passed on the left.
fn mark_passed_on_left(
    bus_on_left: &mut BTreeSet<NodeIndex>,
    lbs_list: &[LegBusSet],
    from: usize,
    to: usize,
) {
    for lbs in lbs_list.iter().take(to.min(lbs_list.len() - 1) + 1).skip(from) {
        bus_on_left.extend(lbs.buses().iter().copied());
    }
}

/// Jumps the cursor to a bus connected to the current one through a
/// candidate flat cell, when one is still placeable.
///
/// Scans all leg bus sets for the first one reintroducing a candidate bus;
/// a set left of the cursor only disqualifies its candidates when the flat
/// cell is its single flat candidate (the bus will be reachable again
/// further right otherwise).
fn continue_through_flat_cell(
    graph: &TopologyGraph,
    lbs_list: &[LegBusSet],
    cursor: &mut BusCursor,
    remaining: &BTreeSet<NodeIndex>,
    bus_on_left: &BTreeSet<NodeIndex>,
) -> bool {
    let bus = cursor.bus.expect("cursor holds a bus");
    let mut candidates: BTreeSet<NodeIndex> = BTreeSet::new();
    for cell_id in lbs_list[cursor.lbs_index].candidate_flat_cells() {
        let cell_buses = graph.cell(cell_id).buses();
        if !cell_buses.contains(&bus) {
            continue;
        }
        candidates.extend(cell_buses.iter().copied().filter(|&b| {
            b != bus && remaining.contains(&b) && !bus_on_left.contains(&b)
        }));
    }
    if candidates.is_empty() {
        return false;
    }

    for (i, lbs) in lbs_list.iter().enumerate() {
        let reachable: Vec<NodeIndex> = lbs
            .buses()
            .iter()
            .copied()
            .filter(|b| candidates.contains(b))
            .collect();
        if reachable.is_empty() {
            continue;
        }
        if i < cursor.lbs_index && lbs.candidate_flat_count() == 1 {
            for b in reachable {
                candidates.remove(&b);
            }
        } else {
            cursor.bus = Some(reachable[0]);
            cursor.lbs_index = i;
            return true;
        }
    }
    false
}

/// Walks the final order once more, assigning extern cells an alternating
/// TOP/BOTTOM orientation and increasing order, and feeders sequential
/// order numbers.
fn establish_feeder_positions(graph: &mut TopologyGraph, root: &LbsCluster) {
    let mut cell_position = 0u32;
    let mut feeder_order = 1u32;
    for lbs in root.lbs_list() {
        let extern_cells: Vec<CellId> = lbs
            .embedded_cells()
            .filter(|&id| graph.cell(id).is_extern())
            .collect();
        for cell_id in extern_cells {
            let direction = if cell_position % 2 == 0 {
                Direction::Top
            } else {
                Direction::Bottom
            };
            let cell = graph.cell_mut(cell_id);
            cell.set_direction(direction);
            cell.set_order(cell_position);
            cell_position += 1;

            let feeders: Vec<NodeIndex> = graph
                .cell(cell_id)
                .nodes()
                .iter()
                .copied()
                .filter(|&n| graph.node(n).is_feeder())
                .collect();
            for feeder in feeders {
                let node = graph.node_mut(feeder);
                node.set_feeder_order(feeder_order);
                node.set_feeder_direction(direction);
                feeder_order += 1;
            }
        }
    }
    info!("ordered {} extern cells", cell_position);
}

/// Verifies the assignment is a total function over buses and feeders.
fn check_coverage(graph: &TopologyGraph) -> Result<(), LayoutError> {
    for (_, node) in graph.nodes() {
        if node.is_bus() && node.bus_position().is_none() {
            return Err(LayoutError::InvariantViolation(format!(
                "bus {} left without structural position",
                node.id()
            )));
        }
        if node.is_feeder() && node.feeder_order().is_none() {
            return Err(LayoutError::InvariantViolation(format!(
                "feeder {} left without order",
                node.id()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltgrid_core::{ComponentKind, Node, SwitchKind};

    use crate::classify::classify_cells;
    use crate::cluster::{build_leg_bus_sets, cluster_leg_bus_sets};

    fn lay_out(graph: &mut TopologyGraph) -> LbsCluster {
        let cells = classify_cells(graph).unwrap();
        graph.assign_cells(cells);
        let sets = build_leg_bus_sets(graph).unwrap();
        let root = cluster_leg_bus_sets(graph, sets).unwrap();
        assign_positions(graph, &root).unwrap();
        root
    }

    fn feeder_chain(graph: &mut TopologyGraph, id: &str, bus: NodeIndex, kind: ComponentKind) {
        let d = graph.add_node(Node::switch(
            format!("{id}_d"),
            SwitchKind::Disconnector,
            false,
        ));
        let b = graph.add_node(Node::switch(format!("{id}_b"), SwitchKind::Breaker, false));
        let f = graph.add_node(Node::feeder(id, kind));
        graph.add_edge(bus, d);
        graph.add_edge(d, b);
        graph.add_edge(b, f);
    }

    #[test]
    fn test_two_sections_share_one_lane() {
        let mut graph = TopologyGraph::new();
        let bbs1 = graph.add_node(Node::bus("bbs1"));
        let bbs2 = graph.add_node(Node::bus("bbs2"));
        let d = graph.add_node(Node::switch("d1", SwitchKind::Disconnector, false));
        graph.add_edge(bbs1, d);
        graph.add_edge(d, bbs2);
        feeder_chain(&mut graph, "load1", bbs1, ComponentKind::Load);

        lay_out(&mut graph);

        let p1 = graph.node(bbs1).bus_position().unwrap();
        let p2 = graph.node(bbs2).bus_position().unwrap();
        assert_eq!(p1.busbar_index(), p2.busbar_index());
        assert_ne!(p1.section_index(), p2.section_index());
    }

    #[test]
    fn test_fixed_position_is_preserved() {
        let mut graph = TopologyGraph::new();
        let fixed = graph.add_node(Node::bus_with_position("bbs1", Position::new(4, 2)));
        let free = graph.add_node(Node::bus("bbs2"));
        feeder_chain(&mut graph, "load1", fixed, ComponentKind::Load);
        feeder_chain(&mut graph, "load2", free, ComponentKind::Load);

        lay_out(&mut graph);

        assert_eq!(
            graph.node(fixed).bus_position(),
            Some(Position::new(4, 2))
        );
        // fresh lanes start below the highest fixed lane
        assert_eq!(
            graph.node(free).bus_position().unwrap().busbar_index(),
            3
        );
    }

    #[test]
    fn test_feeder_orders_are_sequential() {
        let mut graph = TopologyGraph::new();
        let bbs = graph.add_node(Node::bus("bbs1"));
        feeder_chain(&mut graph, "load1", bbs, ComponentKind::Load);
        feeder_chain(&mut graph, "twt1", bbs, ComponentKind::TwoWindingsTransformer);
        feeder_chain(&mut graph, "gen1", bbs, ComponentKind::Generator);

        lay_out(&mut graph);

        let mut orders: Vec<u32> = graph
            .feeder_nodes()
            .iter()
            .map(|&f| graph.node(f).feeder_order().unwrap())
            .collect();
        orders.sort_unstable();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_extern_cells_alternate_orientation() {
        let mut graph = TopologyGraph::new();
        let bbs = graph.add_node(Node::bus("bbs1"));
        feeder_chain(&mut graph, "load1", bbs, ComponentKind::Load);
        feeder_chain(&mut graph, "load2", bbs, ComponentKind::Load);
        feeder_chain(&mut graph, "load3", bbs, ComponentKind::Load);

        lay_out(&mut graph);

        let mut seen: Vec<(u32, Direction)> = graph
            .cells()
            .iter()
            .filter(|c| c.is_extern())
            .map(|c| (c.order().unwrap(), c.direction().unwrap()))
            .collect();
        seen.sort_by_key(|&(order, _)| order);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (0, Direction::Top));
        assert_eq!(seen[1], (1, Direction::Bottom));
        assert_eq!(seen[2], (2, Direction::Top));
    }

    #[test]
    fn test_flat_continuation_keeps_buses_in_one_lane() {
        // three sections chained by flat couplers end up on one lane in
        // section order
        let mut graph = TopologyGraph::new();
        let mut buses = Vec::new();
        for i in 0..3 {
            buses.push(graph.add_node(Node::bus(format!("bbs{i}"))));
        }
        for i in 0..2 {
            let d = graph.add_node(Node::switch(
                format!("d{i}"),
                SwitchKind::Disconnector,
                false,
            ));
            graph.add_edge(buses[i], d);
            graph.add_edge(d, buses[i + 1]);
        }

        lay_out(&mut graph);

        let positions: Vec<Position> = buses
            .iter()
            .map(|&b| graph.node(b).bus_position().unwrap())
            .collect();
        assert!(positions.iter().all(|p| p.busbar_index() == 1));
        let mut sections: Vec<u32> = positions.iter().map(|p| p.section_index()).collect();
        sections.sort_unstable();
        assert_eq!(sections, vec![1, 2, 3]);
    }

    #[test]
    fn test_coverage_failure_is_loud() {
        let mut graph = TopologyGraph::new();
        graph.add_node(Node::bus("bbs1"));
        // an empty cluster covering nothing
        let root = LbsCluster::new(LegBusSet::single_bus(NodeIndex::new(99)));
        assert!(matches!(
            assign_positions(&mut graph, &root),
            Err(LayoutError::InvariantViolation(_))
        ));
    }
}
