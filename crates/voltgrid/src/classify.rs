//! Cell classification.
//!
//! Traces maximal runs of non-bus nodes between bus endpoints and sorts them
//! into extern, intern, and shunt cells. A chain fitting none of the three is
//! a fatal [`LayoutError::UnsupportedShape`]; the classifier does not guess.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use voltgrid_core::{Cell, CellKind, LayoutError, NodeIndex, TopologyGraph};

/// Bus contacts of one chain: bus node -> chain nodes attached to it.
type BusContacts = BTreeMap<NodeIndex, BTreeSet<NodeIndex>>;

/// Partitions the graph's non-bus nodes into classified cells.
///
/// Every non-bus node ends up in exactly one cell. Cells are numbered in
/// discovery order, which follows node-index order and is therefore stable.
pub fn classify_cells(graph: &TopologyGraph) -> Result<Vec<Cell>, LayoutError> {
    let mut visited: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut cells = Vec::new();
    for (start, node) in graph.nodes() {
        if node.is_bus() || visited.contains(&start) {
            continue;
        }
        let (nodes, contacts) = trace_chain(graph, start, &mut visited);
        let kind = classify_chain(graph, &nodes, &contacts)?;
        let buses: Vec<NodeIndex> = contacts.keys().copied().collect();
        cells.push(Cell::new(cells.len(), kind, nodes, buses));
    }
    debug!("classified {} cells", cells.len());
    Ok(cells)
}

/// Collects the maximal connected run of non-bus nodes containing `start`,
/// together with its bus contacts.
fn trace_chain(
    graph: &TopologyGraph,
    start: NodeIndex,
    visited: &mut BTreeSet<NodeIndex>,
) -> (Vec<NodeIndex>, BusContacts) {
    let mut nodes = Vec::new();
    let mut contacts: BusContacts = BTreeMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited.insert(start);
    while let Some(n) = queue.pop_front() {
        nodes.push(n);
        for adjacent in graph.adjacent_nodes(n) {
            if graph.node(adjacent).is_bus() {
                contacts.entry(adjacent).or_default().insert(n);
            } else if visited.insert(adjacent) {
                queue.push_back(adjacent);
            }
        }
    }
    nodes.sort_unstable();
    (nodes, contacts)
}

fn classify_chain(
    graph: &TopologyGraph,
    nodes: &[NodeIndex],
    contacts: &BusContacts,
) -> Result<CellKind, LayoutError> {
    if contacts.is_empty() {
        return Err(LayoutError::UnsupportedShape(format!(
            "equipment chain at {} touches no bus",
            graph.node(nodes[0]).id()
        )));
    }
    // a feeder-bearing chain is always an extern cell, whatever its bus
    // reach: its single leg may park on several parallel busbar sections
    if nodes.iter().any(|&n| graph.node(n).is_feeder()) {
        return Ok(CellKind::Extern);
    }
    if contacts.len() == 1 {
        let attachments = contacts.values().next().expect("one contact entry");
        if attachments.len() >= 2 {
            // the chain loops back onto the same bus
            return Ok(CellKind::Shunt);
        }
        // feederless stub hanging off one bus
        return Ok(CellKind::Extern);
    }
    let legs = group_legs(graph, nodes, contacts)?;
    Ok(CellKind::Intern { legs })
}

/// Groups an intern chain's buses into its two legs.
///
/// Two buses share a leg when their attachment stubs meet inside the chain:
/// a shared attachment node, directly adjacent attachments, or attachments
/// joined through one common chain node (parallel busbar selection). A chain
/// whose buses do not resolve into exactly two legs is unsupported.
fn group_legs(
    graph: &TopologyGraph,
    nodes: &[NodeIndex],
    contacts: &BusContacts,
) -> Result<[Vec<NodeIndex>; 2], LayoutError> {
    let buses: Vec<NodeIndex> = contacts.keys().copied().collect();
    if buses.len() == 2 {
        return Ok([vec![buses[0]], vec![buses[1]]]);
    }

    let members: BTreeSet<NodeIndex> = nodes.iter().copied().collect();
    let mut leg_of: Vec<usize> = (0..buses.len()).collect();
    for i in 0..buses.len() {
        for j in (i + 1)..buses.len() {
            if stubs_coupled(graph, &members, &contacts[&buses[i]], &contacts[&buses[j]]) {
                let (a, b) = (find_leg(&leg_of, i), find_leg(&leg_of, j));
                if a != b {
                    leg_of[a.max(b)] = a.min(b);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for (i, &bus) in buses.iter().enumerate() {
        groups.entry(find_leg(&leg_of, i)).or_default().push(bus);
    }
    if groups.len() != 2 {
        return Err(LayoutError::UnsupportedShape(format!(
            "equipment chain at {} reaches {} buses resolving into {} legs",
            graph.node(nodes[0]).id(),
            buses.len(),
            groups.len()
        )));
    }
    let mut legs = groups.into_values();
    Ok([
        legs.next().expect("two leg groups"),
        legs.next().expect("two leg groups"),
    ])
}

fn find_leg(leg_of: &[usize], mut i: usize) -> usize {
    while leg_of[i] != i {
        i = leg_of[i];
    }
    i
}

/// Whether two bus attachment stub sets meet inside the chain.
fn stubs_coupled(
    graph: &TopologyGraph,
    members: &BTreeSet<NodeIndex>,
    stubs_a: &BTreeSet<NodeIndex>,
    stubs_b: &BTreeSet<NodeIndex>,
) -> bool {
    if stubs_a.intersection(stubs_b).next().is_some() {
        return true;
    }
    for &a in stubs_a {
        let adjacent_a: BTreeSet<NodeIndex> = graph
            .adjacent_nodes(a)
            .into_iter()
            .filter(|n| members.contains(n))
            .collect();
        for &b in stubs_b {
            if adjacent_a.contains(&b) {
                return true;
            }
            if graph
                .adjacent_nodes(b)
                .into_iter()
                .any(|n| members.contains(&n) && adjacent_a.contains(&n))
            {
                return true;
            }
        }
    }
    false
}
