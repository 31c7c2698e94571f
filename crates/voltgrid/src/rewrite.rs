//! Three-winding-transformer rewrite.
//!
//! A three-winding transformer enters a voltage-level topology as a single
//! feeder node. Before classification it is replaced by a fictitious hub
//! node plus two two-winding-style feeders pointing at the two other voltage
//! levels, so the classifier's one-or-two-bus-endpoint rule stays uniform.

use log::{debug, info};

use voltgrid_core::{ComponentKind, Node, TopologyGraph};

/// Rewrites every three-winding-transformer feeder into a fictitious hub and
/// two winding feeders. Returns the number of feeders rewritten.
///
/// The winding feeders inherit the original feeder's direction and, when
/// present, its order (second winding = first + 1).
pub fn rewrite_three_winding_feeders(graph: &mut TopologyGraph) -> usize {
    let targets: Vec<_> = graph
        .nodes()
        .filter(|(_, n)| n.is_feeder() && n.component() == ComponentKind::ThreeWindingsTransformer)
        .map(|(idx, _)| idx)
        .collect();

    for old in &targets {
        let (id, order, direction) = {
            let node = graph.node(*old);
            (node.id().to_string(), node.feeder_order(), node.feeder_direction())
        };
        debug!("rewriting three-winding feeder {id}");

        let hub = Node::fictitious_with_component(
            format!("{id}_hub"),
            ComponentKind::ThreeWindingsTransformer,
        );
        let hub_idx = graph.substitute_node(*old, hub);

        let mut winding2 = Node::feeder(format!("{id}_winding2"), ComponentKind::Line);
        let mut winding3 = Node::feeder(format!("{id}_winding3"), ComponentKind::Line);
        if let Some(order) = order {
            winding2.set_feeder_order(order);
            winding3.set_feeder_order(order + 1);
        }
        if let Some(direction) = direction {
            winding2.set_feeder_direction(direction);
            winding3.set_feeder_direction(direction);
        }

        let winding2_idx = graph.add_node(winding2);
        let winding3_idx = graph.add_node(winding3);
        graph.add_edge(hub_idx, winding2_idx);
        graph.add_edge(hub_idx, winding3_idx);
    }

    if !targets.is_empty() {
        info!("rewrote {} three-winding feeders", targets.len());
    }
    targets.len()
}
