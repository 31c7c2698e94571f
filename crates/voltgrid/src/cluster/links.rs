//! Link scoring and the greedy strongest-link-first merge loop.
//!
//! Vertices of the link graph are cluster sides, not buses. The score is a
//! lexicographic tuple honoring a strict priority order: shared side buses
//! first, then common candidate flat cells (refined by their distance to the
//! cluster edges), then common crossover cells. The loop repeatedly merges
//! the two sides of the strongest link until one cluster remains.
//!
//! Selection uses a max-heap with lazy invalidation: sides are never
//! mutated in place, merging retires both clusters and registers the merged
//! result under a fresh slot, so a heap entry is valid exactly when both of
//! its slots are still alive.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace};

use voltgrid_core::{CellId, LayoutError, Side, TopologyGraph};

use super::lbs_cluster::LbsCluster;
use super::leg_bus_set::LegBusSet;

/// Merge-desirability score between two cluster sides.
///
/// Field order is the comparison priority; the derived ordering is
/// lexicographic by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LinkScore {
    common_buses: usize,
    flat_cells: usize,
    /// Negated total edge distance of the common flat cells, so nearer
    /// flat cells rank higher within the same flat-cell count.
    flat_proximity: i64,
    crossover_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SideRef {
    slot: usize,
    side: Side,
}

impl SideRef {
    fn key(&self) -> (usize, u8) {
        (self.slot, matches!(self.side, Side::Right) as u8)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Link {
    score: LinkScore,
    sides: [SideRef; 2],
}

impl Link {
    /// Stable identity of the side pair, smaller side first.
    fn pair_key(&self) -> ((usize, u8), (usize, u8)) {
        let (a, b) = (self.sides[0].key(), self.sides[1].key());
        (a.min(b), a.max(b))
    }
}

impl Ord for Link {
    fn cmp(&self, other: &Self) -> Ordering {
        // strongest score first; on ties the smaller combined side index
        // wins, so reverse the pair-key comparison for the max-heap
        self.score
            .cmp(&other.score)
            .then_with(|| other.pair_key().cmp(&self.pair_key()))
    }
}

impl PartialOrd for Link {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Clusters the leg bus sets into a single root cluster.
///
/// # Errors
/// [`LayoutError::Structural`] on an empty set list;
/// [`LayoutError::InvariantViolation`] if the link pool drains while more
/// than one cluster remains (cannot happen for a finite non-empty input and
/// indicates a bookkeeping defect).
pub fn cluster_leg_bus_sets(
    graph: &TopologyGraph,
    sets: Vec<LegBusSet>,
) -> Result<LbsCluster, LayoutError> {
    if sets.is_empty() {
        return Err(LayoutError::Structural(
            "no leg bus sets to cluster".into(),
        ));
    }
    let mut slots: Vec<Option<LbsCluster>> = sets
        .into_iter()
        .map(|set| Some(LbsCluster::new(set)))
        .collect();
    let mut alive = slots.len();
    debug!("clustering {alive} leg bus sets");

    let mut pool = BinaryHeap::new();
    for a in 0..slots.len() {
        for b in (a + 1)..slots.len() {
            push_links(graph, &slots, &mut pool, a, b);
        }
    }

    while alive > 1 {
        let link = pool.pop().ok_or_else(|| {
            LayoutError::InvariantViolation(
                "link pool drained with multiple clusters remaining".into(),
            )
        })?;
        let [sa, sb] = link.sides;
        if slots[sa.slot].is_none() || slots[sb.slot].is_none() {
            continue; // stale entry, a side was consumed by an earlier merge
        }
        trace!(
            "merging cluster {} side {:?} with cluster {} side {:?}",
            sa.slot, sa.side, sb.slot, sb.side
        );

        let other = slots[sb.slot].take().expect("checked alive");
        let mut merged = slots[sa.slot].take().expect("checked alive");
        merged.merge(sa.side, other, sb.side);

        let fresh = slots.len();
        slots.push(Some(merged));
        alive -= 1;
        for slot in 0..fresh {
            if slots[slot].is_some() {
                push_links(graph, &slots, &mut pool, slot, fresh);
            }
        }
    }

    Ok(slots
        .into_iter()
        .flatten()
        .next()
        .expect("exactly one cluster remains"))
}

/// Registers the four side-pair links between two live clusters.
fn push_links(
    graph: &TopologyGraph,
    slots: &[Option<LbsCluster>],
    pool: &mut BinaryHeap<Link>,
    a: usize,
    b: usize,
) {
    let cluster_a = slots[a].as_ref().expect("slot a is alive");
    let cluster_b = slots[b].as_ref().expect("slot b is alive");
    for side_a in [Side::Left, Side::Right] {
        for side_b in [Side::Left, Side::Right] {
            let score = link_score(graph, cluster_a, side_a, cluster_b, side_b);
            pool.push(Link {
                score,
                sides: [
                    SideRef { slot: a, side: side_a },
                    SideRef { slot: b, side: side_b },
                ],
            });
        }
    }
}

fn link_score(
    graph: &TopologyGraph,
    cluster_a: &LbsCluster,
    side_a: Side,
    cluster_b: &LbsCluster,
    side_b: Side,
) -> LinkScore {
    let buses_a = cluster_a.side_buses(side_a);
    let buses_b = cluster_b.side_buses(side_b);
    let common_buses = buses_a.intersection(&buses_b).count();

    let flat_a = cluster_a.side_flat_cells(side_a);
    let flat_b = cluster_b.side_flat_cells(side_b);
    let common_flat: Vec<CellId> = flat_a.intersection(&flat_b).copied().collect();
    let mut distance = 0usize;
    for &cell_id in &common_flat {
        let cell_buses = graph.cell(cell_id).buses();
        distance += cluster_a.flat_cell_edge_distance(cell_buses, side_a);
        distance += cluster_b.flat_cell_edge_distance(cell_buses, side_b);
    }

    let crossover_cells = cluster_a
        .crossover_cells()
        .intersection(&cluster_b.crossover_cells())
        .count();

    LinkScore {
        common_buses,
        flat_cells: common_flat.len(),
        flat_proximity: -(distance as i64),
        crossover_cells,
    }
}
