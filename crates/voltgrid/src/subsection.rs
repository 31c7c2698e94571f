//! Subsections: vertical-consistency validation of the assigned grid.
//!
//! A subsection groups consecutive leg bus sets whose buses agree on a
//! single bus per busbar index. Folding the final cluster into subsections
//! proves the assignment has no vertical conflict; downstream coordinate
//! layout also consumes the grouping.

use log::debug;

use voltgrid_core::{CellId, LayoutError, NodeIndex, TopologyGraph};

use crate::cluster::{LbsCluster, LegBusSet};

/// A run of leg bus sets sharing one consistent bus-per-busbar-index column.
#[derive(Debug, Clone)]
pub struct Subsection {
    /// Index `v - 1` holds the bus claiming busbar index `v`, if any.
    column: Vec<Option<NodeIndex>>,
    /// Extern cells of the run, sorted by assigned order.
    extern_cells: Vec<CellId>,
}

impl Subsection {
    fn new(size: usize) -> Self {
        Self {
            column: vec![None; size],
            extern_cells: Vec::new(),
        }
    }

    /// Number of busbar indices the column spans.
    pub fn size(&self) -> usize {
        self.column.len()
    }

    /// The bus claiming busbar index `v`, if any.
    pub fn bus_at(&self, v: u32) -> Option<NodeIndex> {
        self.column.get(v as usize - 1).copied().flatten()
    }

    /// Extern cells of this subsection, sorted by assigned order.
    pub fn extern_cells(&self) -> &[CellId] {
        &self.extern_cells
    }

    /// Whether the set's buses fit the column without displacing another
    /// bus from its busbar index. The set's own claims count too, so a set
    /// carrying two buses on one busbar index never fits.
    fn can_absorb(&self, graph: &TopologyGraph, set: &LegBusSet) -> Result<bool, LayoutError> {
        let mut claims = self.column.clone();
        for &bus in set.buses() {
            let v = busbar_index(graph, bus)?;
            match claims[v - 1] {
                Some(claimed) if claimed != bus => return Ok(false),
                _ => claims[v - 1] = Some(bus),
            }
        }
        Ok(true)
    }

    fn absorb(&mut self, graph: &TopologyGraph, set: &LegBusSet) -> Result<(), LayoutError> {
        for &bus in set.buses() {
            let v = busbar_index(graph, bus)?;
            self.column[v - 1] = Some(bus);
        }
        for cell_id in set.embedded_cells() {
            if graph.cell(cell_id).is_extern() {
                self.extern_cells.push(cell_id);
            }
        }
        Ok(())
    }
}

fn busbar_index(graph: &TopologyGraph, bus: NodeIndex) -> Result<usize, LayoutError> {
    graph
        .node(bus)
        .bus_position()
        .map(|p| p.busbar_index() as usize)
        .ok_or_else(|| {
            LayoutError::InvariantViolation(format!(
                "bus {} has no position during subsection folding",
                graph.node(bus).id()
            ))
        })
}

/// Folds the final cluster into subsections, validating that every busbar
/// index is claimed by a single bus per column region.
///
/// # Errors
/// [`LayoutError::InvariantViolation`] when one leg bus set claims the same
/// busbar index with two different buses, or a bus has no position.
pub fn build_subsections(
    graph: &TopologyGraph,
    root: &LbsCluster,
) -> Result<Vec<Subsection>, LayoutError> {
    let size = graph
        .bus_nodes()
        .iter()
        .filter_map(|&b| graph.node(b).bus_position())
        .map(|p| p.busbar_index() as usize)
        .max()
        .unwrap_or(0);

    let mut subsections: Vec<Subsection> = Vec::new();
    for set in root.lbs_list() {
        let absorbed = match subsections.last_mut() {
            Some(current) if current.can_absorb(graph, set)? => {
                current.absorb(graph, set)?;
                true
            }
            _ => false,
        };
        if !absorbed {
            let mut fresh = Subsection::new(size);
            if !fresh.can_absorb(graph, set)? {
                return Err(LayoutError::InvariantViolation(format!(
                    "conflicting bus positions within one leg bus set: {:?}",
                    set.buses()
                )));
            }
            fresh.absorb(graph, set)?;
            subsections.push(fresh);
        }
    }

    for subsection in &mut subsections {
        subsection
            .extern_cells
            .sort_by_key(|&id| graph.cell(id).order());
    }
    debug!("folded cluster into {} subsections", subsections.len());
    Ok(subsections)
}
