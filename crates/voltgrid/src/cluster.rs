//! Leg-bus-set clustering.
//!
//! The atomic clustering unit is the [`LegBusSet`]: the buses reachable from
//! one leg of a cell, or a single orphan bus. Sets grow into ordered
//! [`LbsCluster`] runs through a greedy strongest-link-first merge loop until
//! a single root cluster remains.

mod lbs_cluster;
mod leg_bus_set;
mod links;

pub use lbs_cluster::{HorizontalLane, LbsCluster};
pub use leg_bus_set::{LegBusSet, build_leg_bus_sets};
pub use links::cluster_leg_bus_sets;
