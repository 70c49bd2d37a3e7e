//! Progressive mesh simplification for level-of-detail generation
//!
//! This crate reduces triangle meshes by collapsing vertices into one of
//! their neighbours, cheapest first:
//! - Quadric error plus boundary and crease penalties as collapse cost
//! - A priority queue of per-vertex collapses, updated locally after each step
//! - Protected vertices that are never removed
//! - Compacted output that remembers where every vertex came from
//! - Parallel LOD chains and an adapter for SDK-side geometry

pub mod quadric;
pub mod params;
pub mod connectivity;
pub mod planner;
pub mod active_set;
pub mod collapse;
pub mod compactor;
pub mod result;
pub mod simplifier;
pub mod adapter;
pub mod lod;

pub use quadric::Quadric;
pub use params::*;
pub use result::*;
pub use simplifier::*;
pub use adapter::{apply_simplified, extract_triangles};
pub use lod::build_lod_chain;

use lodcrate_core::{Result, TriangleMesh};

/// Simplify a mesh down to a reduction target
pub trait MeshSimplifier {
    /// Return a simplified copy of `mesh` with at most the target number of
    /// collapsible vertices left.
    fn simplify(&self, mesh: &TriangleMesh, target: ReductionTarget) -> Result<TriangleMesh>;
}
