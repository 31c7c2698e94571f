//! voltgrid - deterministic clustering layout for substation single-line
//! diagrams.
//!
//! The engine consumes a populated [`TopologyGraph`] and assigns every bus
//! node an integer `(h, v)` structural position and every extern cell and
//! feeder an order and a TOP/BOTTOM orientation, with no manual placement
//! input. The pipeline: three-winding rewrite, connectivity repair, cell
//! classification, leg-bus-set building, greedy strongest-link clustering,
//! position assignment, subsection validation.
//!
//! Identical input topology always yields an identical assignment: every
//! tie-break uses a total stable order, never container iteration order.

mod classify;
mod cluster;
mod position;
mod rewrite;
mod subsection;

pub use voltgrid_core::{
    Cell, CellId, CellKind, ComponentKind, Direction, LayoutError, Node, NodeIndex, NodeKind,
    Position, Side, SwitchKind, TopologyGraph,
};

pub use classify::classify_cells;
pub use cluster::{HorizontalLane, LbsCluster, LegBusSet, build_leg_bus_sets, cluster_leg_bus_sets};
pub use position::assign_positions;
pub use rewrite::rewrite_three_winding_feeders;
pub use subsection::{Subsection, build_subsections};

use log::{debug, info};

/// Hook injecting synthetic nodes into a graph before classification.
///
/// Hooks are passed explicitly to the engine builder; there is no
/// process-wide plugin discovery.
pub trait GraphPostProcessor {
    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Mutates the graph in place before the layout pipeline runs.
    fn process(&self, graph: &mut TopologyGraph);
}

/// Everything the layout pass produces beyond the per-node assignments.
#[derive(Debug)]
pub struct LayoutSummary {
    lanes: Vec<Vec<NodeIndex>>,
    subsections: Vec<Subsection>,
    busbar_count: u32,
    section_count: u32,
}

impl LayoutSummary {
    /// Bus sets of the final cluster's leg bus sets, left to right. The
    /// downstream coordinate layout walks these lanes.
    pub fn lanes(&self) -> &[Vec<NodeIndex>] {
        &self.lanes
    }

    /// Subsections of the final cluster, left to right.
    pub fn subsections(&self) -> &[Subsection] {
        &self.subsections
    }

    /// Highest assigned busbar index.
    pub fn busbar_count(&self) -> u32 {
        self.busbar_count
    }

    /// Highest assigned section index.
    pub fn section_count(&self) -> u32 {
        self.section_count
    }
}

/// Interface of a position-finding strategy.
///
/// The clustering engine is the provided implementation; a force-directed
/// strategy for substation-level diagrams can slot in behind the same seam.
pub trait PositionEngine {
    /// Computes and writes back the structural positions of one graph.
    fn build_layout(&self, graph: &mut TopologyGraph) -> Result<LayoutSummary, LayoutError>;
}

/// The clustering position engine.
///
/// # Examples
///
/// ```
/// use voltgrid::{ClusteringEngine, Node, PositionEngine, SwitchKind, TopologyGraph};
///
/// let mut graph = TopologyGraph::new();
/// let bus = graph.add_node(Node::bus("bbs1"));
/// let d = graph.add_node(Node::switch("d1", SwitchKind::Disconnector, false));
/// let load = graph.add_node(Node::feeder("load1", voltgrid::ComponentKind::Load));
/// graph.add_edge(bus, d);
/// graph.add_edge(d, load);
///
/// let summary = ClusteringEngine::new().build_layout(&mut graph).unwrap();
/// assert_eq!(summary.busbar_count(), 1);
/// assert!(graph.node(bus).bus_position().is_some());
/// ```
#[derive(Default)]
pub struct ClusteringEngine {
    post_processors: Vec<Box<dyn GraphPostProcessor>>,
}

impl ClusteringEngine {
    /// Creates an engine with no post-processors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a post-processing hook, run in registration order before the
    /// layout pipeline.
    pub fn with_post_processor(mut self, post_processor: Box<dyn GraphPostProcessor>) -> Self {
        self.post_processors.push(post_processor);
        self
    }
}

impl PositionEngine for ClusteringEngine {
    fn build_layout(&self, graph: &mut TopologyGraph) -> Result<LayoutSummary, LayoutError> {
        info!("building clustered layout");
        if graph.node_count() == 0 {
            return Err(LayoutError::Structural(
                "empty node set passed to layout".into(),
            ));
        }

        for post_processor in &self.post_processors {
            debug!("running graph post-processor '{}'", post_processor.id());
            post_processor.process(graph);
        }

        rewrite_three_winding_feeders(graph);
        graph.repair_connectivity()?;

        let cells = classify_cells(graph)?;
        graph.assign_cells(cells);

        let sets = build_leg_bus_sets(graph)?;
        let root = cluster_leg_bus_sets(graph, sets)?;
        assign_positions(graph, &root)?;
        let subsections = build_subsections(graph, &root)?;

        let lanes: Vec<Vec<NodeIndex>> = root
            .lbs_list()
            .iter()
            .map(|set| set.buses().iter().copied().collect())
            .collect();
        let (mut busbar_count, mut section_count) = (0, 0);
        for bus in graph.bus_nodes() {
            if let Some(p) = graph.node(bus).bus_position() {
                busbar_count = busbar_count.max(p.busbar_index());
                section_count = section_count.max(p.section_index());
            }
        }
        debug!("layout spans {busbar_count} busbars and {section_count} sections");

        Ok(LayoutSummary {
            lanes,
            subsections,
            busbar_count,
            section_count,
        })
    }
}
