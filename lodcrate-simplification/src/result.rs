//! Result types for simplification runs

use lodcrate_core::TriangleMesh;
use std::fmt;
use std::time::Duration;

/// One vertex removal, in the order removals happened.
///
/// Replaying the records of a [`SimplifiedMesh`] backwards from the input
/// gives a progressive mesh stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapseRecord {
    /// Original index of the removed vertex
    pub vertex: u32,
    /// Original index of the vertex it merged into, `None` when it was
    /// dropped for having no triangles left
    pub target: Option<u32>,
    pub cost: f64,
}

/// Counts and timing of a simplification run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimplifyStats {
    pub original_vertices: usize,
    pub original_triangles: usize,
    pub final_vertices: usize,
    pub final_triangles: usize,
    pub collapses: usize,
    pub elapsed: Duration,
}

impl SimplifyStats {
    /// Final vertex count over original vertex count
    pub fn vertex_ratio(&self) -> f64 {
        if self.original_vertices == 0 {
            1.0
        } else {
            self.final_vertices as f64 / self.original_vertices as f64
        }
    }

    pub fn was_simplified(&self) -> bool {
        self.collapses > 0
    }
}

impl fmt::Display for SimplifyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} vertices, {} -> {} triangles ({} collapses, {:.1}% vertices kept) in {:.3?}",
            self.original_vertices,
            self.final_vertices,
            self.original_triangles,
            self.final_triangles,
            self.collapses,
            self.vertex_ratio() * 100.0,
            self.elapsed
        )
    }
}

/// Output of a simplification run
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedMesh {
    /// Compacted positions and triangle indices
    pub mesh: TriangleMesh,
    /// For every output vertex, its index in the input position array
    pub original_indices: Vec<u32>,
    /// Every removed vertex, in removal order
    pub collapses: Vec<CollapseRecord>,
    pub stats: SimplifyStats,
}

impl SimplifiedMesh {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    /// Rewrite every original index through `source`, mapping the indices
    /// of an intermediate mesh back to the caller's input.
    pub(crate) fn remap_original_indices(&mut self, source: &[u32]) {
        for index in &mut self.original_indices {
            *index = source[*index as usize];
        }
        for record in &mut self.collapses {
            record.vertex = source[record.vertex as usize];
            record.target = record.target.map(|t| source[t as usize]);
        }
    }
}
