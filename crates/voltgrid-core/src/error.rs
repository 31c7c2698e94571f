//! Error types for layout operations.
//!
//! This module provides the main error type [`LayoutError`]. Every variant is
//! a hard failure local to one topology graph: the caller may skip that graph
//! and continue with others, but the core never degrades its output quality.

use thiserror::Error;

/// The main error type for voltgrid layout operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The input graph cannot be repaired into a layoutable shape: an empty
    /// node set, or a bus-less connected component with no fictitious node to
    /// anchor a synthetic bus on.
    #[error("structural error: {0}")]
    Structural(String),

    /// An internal invariant did not hold: leg bus sets left in a subset
    /// relation, a node without a position after the final pass, or a
    /// subsection column conflict. Indicates a topology the builder did not
    /// anticipate; never silently corrected.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A cell classification that resolves to none of extern/intern/shunt.
    #[error("unsupported topology shape: {0}")]
    UnsupportedShape(String),
}
