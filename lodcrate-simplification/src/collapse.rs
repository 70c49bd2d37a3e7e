//! Collapse execution: merging a vertex into its chosen neighbour

use crate::connectivity::{insert_sorted, remove_sorted, Connectivity, TriangleId, VertexId};
use lodcrate_core::{Error, Result};
use tracing::trace;

/// What a single collapse changed
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseOutcome {
    pub vertex: VertexId,
    pub target: VertexId,
    /// `target` plus every vertex adjacent to either endpoint before the collapse
    pub touched: Vec<VertexId>,
    /// Touched vertices removed because they lost their last triangle
    pub isolated: Vec<VertexId>,
    /// Triangles that degenerated or duplicated another face
    pub removed_triangles: usize,
}

impl Connectivity {
    /// Vertices whose cost may change when `id` collapses into its target.
    ///
    /// Must be taken before the collapse: afterwards the adjacency of `id`
    /// is gone.
    pub fn collapse_neighbourhood(&self, id: VertexId) -> Vec<VertexId> {
        let vertex = self.vertex(id);
        let mut touched = vertex.adjacent_vertices.clone();
        if let Some(target) = vertex.collapse_target {
            touched.extend_from_slice(&self.vertex(target).adjacent_vertices);
            touched.push(target);
        }
        touched.retain(|&v| v != id);
        touched.sort_unstable();
        touched.dedup();
        touched
    }

    /// Merge `id` into its cached collapse target.
    ///
    /// Triangles spanning both endpoints degenerate and are removed; the rest
    /// are re-pointed at the target, unless that would duplicate a face the
    /// target already has. The vertex quadric is folded into the target's.
    pub fn collapse(&mut self, id: VertexId) -> Result<CollapseOutcome> {
        let vertex = &self.vertices[id.index()];
        if vertex.removed || vertex.protected {
            return Err(Error::Algorithm(format!(
                "vertex {} is not collapsible",
                id.0
            )));
        }
        let target = match vertex.collapse_target {
            Some(t) if t != id && !self.vertices[t.index()].removed => t,
            other => {
                return Err(Error::Algorithm(format!(
                    "vertex {} has no valid collapse target ({other:?})",
                    id.0
                )))
            }
        };
        if vertex.adjacent_vertices.binary_search(&target).is_err() {
            return Err(Error::Algorithm(format!(
                "collapse target {} is not adjacent to {}",
                target.0, id.0
            )));
        }

        let touched = self.collapse_neighbourhood(id);
        let incident = std::mem::take(&mut self.vertices[id.index()].incident_triangles);
        let mut removed_triangles = 0;

        for t in incident {
            if self.triangles[t.index()].contains(target) {
                self.remove_triangle(t);
                removed_triangles += 1;
                continue;
            }

            for corner in self.triangles[t.index()].vertices.iter_mut() {
                if *corner == id {
                    *corner = target;
                }
            }

            let face = self.triangles[t.index()].sorted_vertices();
            let duplicate = self.vertices[target.index()]
                .incident_triangles
                .iter()
                .any(|&other| self.triangles[other.index()].sorted_vertices() == face);
            if duplicate {
                self.remove_triangle(t);
                removed_triangles += 1;
            } else {
                insert_sorted(&mut self.vertices[target.index()].incident_triangles, t);
            }
        }

        let quadric = self.vertices[id.index()].quadric;
        self.vertices[target.index()].quadric += quadric;
        self.mark_removed(id);

        for &u in &touched {
            self.recompute_adjacency(u);
        }

        let mut isolated = Vec::new();
        for &u in &touched {
            let neighbour = &self.vertices[u.index()];
            if !neighbour.incident_triangles.is_empty() {
                continue;
            }
            let protected = neighbour.protected;
            self.clear_collapse(u);
            if !protected {
                self.mark_removed(u);
                isolated.push(u);
            }
        }

        trace!(
            vertex = id.0,
            target = target.0,
            removed_triangles,
            isolated = isolated.len(),
            "Collapsed vertex"
        );

        Ok(CollapseOutcome {
            vertex: id,
            target,
            touched,
            isolated,
            removed_triangles,
        })
    }

    fn remove_triangle(&mut self, t: TriangleId) {
        let triangle = &mut self.triangles[t.index()];
        debug_assert!(!triangle.removed);
        triangle.removed = true;
        let corners = triangle.vertices;
        for v in corners {
            remove_sorted(&mut self.vertices[v.index()].incident_triangles, t);
        }
        self.live_triangles -= 1;
    }
}
