//! Core topology model for voltgrid substation diagram layout.
//!
//! This crate owns the data the layout engine works on: equipment nodes and
//! their undirected adjacency ([`TopologyGraph`]), the cells derived from
//! them ([`Cell`]), the structural position value types, and the error
//! taxonomy. The layout algorithms themselves live in the `voltgrid` crate.

pub mod cell;
pub mod error;
pub mod graph;
pub mod node;

pub use cell::{Cell, CellId, CellKind};
pub use error::LayoutError;
pub use graph::{NodeIndex, TopologyGraph};
pub use node::{ComponentKind, Direction, Node, NodeKind, Position, Side, SwitchKind};
