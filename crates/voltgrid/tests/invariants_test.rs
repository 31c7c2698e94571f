//! Property-based invariant tests over randomized small topologies.

use proptest::prelude::*;

use voltgrid::{
    ClusteringEngine, ComponentKind, Node, PositionEngine, SwitchKind, TopologyGraph,
    build_leg_bus_sets, classify_cells,
};

/// Generator-friendly description of a small voltage-level topology.
#[derive(Debug, Clone)]
struct TopologySpec {
    bus_count: usize,
    /// (bus choice, switch chain length) per feeder.
    feeders: Vec<(usize, usize)>,
    /// Bus pairs joined by a coupling chain.
    couplers: Vec<(usize, usize)>,
}

fn topology_strategy() -> impl Strategy<Value = TopologySpec> {
    (
        1usize..=4,
        prop::collection::vec((0usize..4, 1usize..=3), 0..6),
        prop::collection::vec((0usize..4, 0usize..4), 0..4),
    )
        .prop_map(|(bus_count, feeders, couplers)| TopologySpec {
            bus_count,
            feeders,
            couplers: couplers
                .into_iter()
                .filter(|(a, b)| a % bus_count != b % bus_count)
                .collect(),
        })
}

fn build_graph(spec: &TopologySpec) -> TopologyGraph {
    let mut graph = TopologyGraph::new();
    let buses: Vec<_> = (0..spec.bus_count)
        .map(|i| graph.add_node(Node::bus(format!("bbs{i}"))))
        .collect();
    for (f, &(bus, chain_len)) in spec.feeders.iter().enumerate() {
        let mut previous = buses[bus % spec.bus_count];
        for s in 0..chain_len {
            let switch = graph.add_node(Node::switch(
                format!("f{f}_s{s}"),
                if s == 0 {
                    SwitchKind::Disconnector
                } else {
                    SwitchKind::Breaker
                },
                false,
            ));
            graph.add_edge(previous, switch);
            previous = switch;
        }
        let feeder = graph.add_node(Node::feeder(format!("f{f}"), ComponentKind::Load));
        graph.add_edge(previous, feeder);
    }
    for (c, &(a, b)) in spec.couplers.iter().enumerate() {
        let d1 = graph.add_node(Node::switch(
            format!("c{c}_d1"),
            SwitchKind::Disconnector,
            false,
        ));
        let d2 = graph.add_node(Node::switch(
            format!("c{c}_d2"),
            SwitchKind::Disconnector,
            false,
        ));
        graph.add_edge(buses[a % spec.bus_count], d1);
        graph.add_edge(d1, d2);
        graph.add_edge(d2, buses[b % spec.bus_count]);
    }
    graph
}

fn check_total_coverage(spec: &TopologySpec) -> Result<(), TestCaseError> {
    let mut graph = build_graph(spec);
    ClusteringEngine::new()
        .build_layout(&mut graph)
        .map_err(|e| TestCaseError::fail(format!("layout failed: {e}")))?;

    for &bus in &graph.bus_nodes() {
        prop_assert!(
            graph.node(bus).bus_position().is_some(),
            "bus {} without position",
            graph.node(bus).id()
        );
    }
    for &feeder in &graph.feeder_nodes() {
        prop_assert!(
            graph.node(feeder).feeder_order().is_some(),
            "feeder {} without order",
            graph.node(feeder).id()
        );
        prop_assert!(graph.node(feeder).feeder_direction().is_some());
    }
    Ok(())
}

fn check_no_subset_leg_bus_sets(spec: &TopologySpec) -> Result<(), TestCaseError> {
    let mut graph = build_graph(spec);
    let cells = classify_cells(&graph)
        .map_err(|e| TestCaseError::fail(format!("classification failed: {e}")))?;
    graph.assign_cells(cells);
    let sets = build_leg_bus_sets(&graph)
        .map_err(|e| TestCaseError::fail(format!("builder failed: {e}")))?;

    for (i, a) in sets.iter().enumerate() {
        for (j, b) in sets.iter().enumerate() {
            if i != j {
                prop_assert!(
                    !(a.buses().is_subset(b.buses()) && a.buses() != b.buses()),
                    "set {i} is a strict subset of set {j}"
                );
            }
        }
    }
    Ok(())
}

fn check_determinism(spec: &TopologySpec) -> Result<(), TestCaseError> {
    let snapshot = |graph: &TopologyGraph| -> Vec<String> {
        graph
            .nodes()
            .map(|(_, n)| {
                format!(
                    "{} {:?} {:?} {:?}",
                    n.id(),
                    n.bus_position(),
                    n.feeder_order(),
                    n.feeder_direction()
                )
            })
            .collect()
    };

    let mut first = build_graph(spec);
    let mut second = build_graph(spec);
    ClusteringEngine::new()
        .build_layout(&mut first)
        .map_err(|e| TestCaseError::fail(format!("layout failed: {e}")))?;
    ClusteringEngine::new()
        .build_layout(&mut second)
        .map_err(|e| TestCaseError::fail(format!("layout failed: {e}")))?;
    prop_assert_eq!(snapshot(&first), snapshot(&second));
    Ok(())
}

proptest! {
    #[test]
    fn layout_covers_every_bus_and_feeder(spec in topology_strategy()) {
        check_total_coverage(&spec)?;
    }

    #[test]
    fn no_strict_subset_leg_bus_sets(spec in topology_strategy()) {
        check_no_subset_leg_bus_sets(&spec)?;
    }

    #[test]
    fn identical_input_yields_identical_layout(spec in topology_strategy()) {
        check_determinism(&spec)?;
    }
}
