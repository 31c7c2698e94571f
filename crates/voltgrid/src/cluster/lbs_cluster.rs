//! Ordered runs of leg bus sets with two mergeable sides.

use std::collections::BTreeSet;

use voltgrid_core::{CellId, NodeIndex, Side};

use super::leg_bus_set::LegBusSet;

/// A maximal horizontal run of one bus across consecutive cluster lanes.
///
/// `start..end` is the half-open range of leg-bus-set positions the run
/// spans. Runs of the same bus fuse when two clusters merge at a junction
/// both touch.
#[derive(Debug, Clone)]
pub struct HorizontalLane {
    buses: Vec<NodeIndex>,
    start: usize,
    end: usize,
}

impl HorizontalLane {
    fn new(bus: NodeIndex, at: usize) -> Self {
        Self {
            buses: vec![bus],
            start: at,
            end: at + 1,
        }
    }

    /// Buses of the run, left to right.
    pub fn buses(&self) -> &[NodeIndex] {
        &self.buses
    }

    /// Half-open span of leg-bus-set positions the run covers.
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// The bus exposed at one extremity of the run.
    fn side_bus(&self, side: Side) -> NodeIndex {
        match side {
            Side::Left => *self.buses.first().expect("lane is never empty"),
            Side::Right => *self.buses.last().expect("lane is never empty"),
        }
    }

    fn reverse(&mut self, parent_len: usize) {
        self.buses.reverse();
        let (start, end) = (self.start, self.end);
        self.start = parent_len - end;
        self.end = parent_len - start;
    }

    fn shift(&mut self, offset: usize) {
        self.start += offset;
        self.end += offset;
    }
}

/// An ordered sequence of leg bus sets (lanes left-to-right) exposing a LEFT
/// and a RIGHT mergeable side.
///
/// Clusters grow by consuming other clusters until a single root remains;
/// a consumed cluster is discarded, its sets re-homed into the survivor.
#[derive(Debug, Clone)]
pub struct LbsCluster {
    lbs_list: Vec<LegBusSet>,
    lanes: Vec<HorizontalLane>,
}

impl LbsCluster {
    /// A cluster of one leg bus set, one single-bus lane per bus.
    pub fn new(set: LegBusSet) -> Self {
        let lanes = set
            .buses()
            .iter()
            .map(|&bus| HorizontalLane::new(bus, 0))
            .collect();
        Self {
            lbs_list: vec![set],
            lanes,
        }
    }

    pub fn len(&self) -> usize {
        self.lbs_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lbs_list.is_empty()
    }

    /// The leg bus sets in lane order, left to right.
    pub fn lbs_list(&self) -> &[LegBusSet] {
        &self.lbs_list
    }

    /// The horizontal bus runs of this cluster.
    pub fn lanes(&self) -> &[HorizontalLane] {
        &self.lanes
    }

    /// The leg bus set at one extremity.
    fn side_lbs(&self, side: Side) -> &LegBusSet {
        match side {
            Side::Left => self.lbs_list.first().expect("cluster is never empty"),
            Side::Right => self.lbs_list.last().expect("cluster is never empty"),
        }
    }

    /// Buses exposed at one extremity: each lane's edge bus.
    pub fn side_buses(&self, side: Side) -> BTreeSet<NodeIndex> {
        self.lanes.iter().map(|lane| lane.side_bus(side)).collect()
    }

    /// Candidate flat cells carried by the extremity leg bus set.
    pub fn side_flat_cells(&self, side: Side) -> BTreeSet<CellId> {
        self.side_lbs(side).candidate_flat_cells().collect()
    }

    /// Crossover cells carried anywhere in the cluster.
    pub fn crossover_cells(&self) -> BTreeSet<CellId> {
        self.lbs_list
            .iter()
            .flat_map(|set| set.crossover_cells())
            .collect()
    }

    /// Distance from a flat cell's bus run to the given cluster edge, in
    /// lane positions. Zero when the cell's buses do not reach that edge.
    pub fn flat_cell_edge_distance(&self, cell_buses: &[NodeIndex], side: Side) -> usize {
        let side_buses = self.side_buses(side);
        let Some(&bus) = cell_buses.iter().find(|&&b| side_buses.contains(&b)) else {
            return 0;
        };
        let Some(lane) = self.lanes.iter().find(|lane| lane.side_bus(side) == bus) else {
            return 0;
        };
        match side {
            Side::Left => lane.start,
            Side::Right => self.len() - lane.end,
        }
    }

    fn reverse(&mut self) {
        let len = self.lbs_list.len();
        self.lbs_list.reverse();
        for lane in &mut self.lanes {
            lane.reverse(len);
        }
    }

    /// Consumes `other`, appending its lanes so that this cluster's
    /// `my_side` meets the other cluster's `other_side` at the junction.
    pub fn merge(&mut self, my_side: Side, mut other: LbsCluster, other_side: Side) {
        if my_side == Side::Left {
            self.reverse();
        }
        if other_side == Side::Right {
            other.reverse();
        }
        let junction = self.lbs_list.len();

        // fuse runs of the same bus continuing across the junction
        let mut open: Vec<usize> = (0..self.lanes.len())
            .filter(|&i| self.lanes[i].end == junction)
            .collect();
        for mut lane in other.lanes {
            lane.shift(junction);
            if lane.start == junction {
                let continuation = open.iter().position(|&i| {
                    self.lanes[i].side_bus(Side::Right) == lane.side_bus(Side::Left)
                });
                if let Some(at) = continuation {
                    let i = open.remove(at);
                    let fused = &mut self.lanes[i];
                    fused.end = lane.end;
                    fused.buses.extend(lane.buses.into_iter().skip(1));
                    continue;
                }
            }
            self.lanes.push(lane);
        }
        self.lbs_list.extend(other.lbs_list);
    }
}
