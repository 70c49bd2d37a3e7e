//! Vertex/triangle arenas with explicit adjacency
//!
//! Vertices and triangles live in two contiguous arenas addressed by
//! [`VertexId`] and [`TriangleId`]. Nothing is ever erased during a run:
//! collapsed vertices and degenerate triangles are tombstoned with a
//! `removed` flag so that ids stay valid until compaction.

use crate::quadric::Quadric;
use lodcrate_core::{to_point3d, Error, Point3f, Result, Vector3d};
use tracing::debug;

/// Index of a vertex in the vertex arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Index of a triangle in the triangle arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TriangleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================
// Arena records
// ============================================================

#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Point3f,
    /// Index into the input position array
    pub original_index: u32,
    /// Index in the compacted output, set by the compactor
    pub simplified_index: Option<u32>,
    /// Live triangles referencing this vertex, sorted
    pub incident_triangles: Vec<TriangleId>,
    /// Vertices sharing a live triangle with this one, sorted
    pub adjacent_vertices: Vec<VertexId>,
    pub quadric: Quadric,
    pub edge_penalty: f64,
    pub collapse_target: Option<VertexId>,
    pub collapse_cost: f64,
    pub protected: bool,
    pub removed: bool,
    pub remove_order: Option<u32>,
}

impl Vertex {
    fn new(position: Point3f, original_index: u32) -> Self {
        Self {
            position,
            original_index,
            simplified_index: None,
            incident_triangles: Vec::new(),
            adjacent_vertices: Vec::new(),
            quadric: Quadric::zero(),
            edge_penalty: 0.0,
            collapse_target: None,
            collapse_cost: 0.0,
            protected: false,
            removed: false,
            remove_order: None,
        }
    }

    /// Eligible for the active set
    pub fn is_collapsible(&self) -> bool {
        !self.removed && !self.protected
    }
}

#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [VertexId; 3],
    /// Unit face normal, zero for degenerate faces
    pub normal: Vector3d,
    pub removed: bool,
}

impl Triangle {
    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    /// Corner ids in ascending order, for comparing faces regardless of winding
    pub fn sorted_vertices(&self) -> [VertexId; 3] {
        let mut sorted = self.vertices;
        sorted.sort_unstable();
        sorted
    }

    fn has_repeated_corner(&self) -> bool {
        let [a, b, c] = self.vertices;
        a == b || b == c || c == a
    }
}

/// Weights turning local topology into a vertex edge penalty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyWeights {
    pub boundary: f64,
    pub crease: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            boundary: 1.0,
            crease: 1.0,
        }
    }
}

// ============================================================
// Connectivity
// ============================================================

/// The mutable vertex/triangle graph a simplification run operates on.
#[derive(Debug, Clone)]
pub struct Connectivity {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) live_vertices: usize,
    pub(crate) live_triangles: usize,
    next_remove_order: u32,
}

impl Connectivity {
    /// Build the arenas, adjacency, quadrics and edge penalties.
    ///
    /// All input validation happens before anything is allocated, so an
    /// error leaves no partially built state behind.
    pub fn build(
        positions: &[Point3f],
        indices: &[u32],
        protected: &[u32],
        weights: PenaltyWeights,
    ) -> Result<Self> {
        validate_input(positions, indices, protected)?;

        // Allocate in input order; this fixes original_index
        let vertices: Vec<Vertex> = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| Vertex::new(p, i as u32))
            .collect();

        let triangles: Vec<Triangle> = indices
            .chunks_exact(3)
            .map(|t| Triangle {
                vertices: [VertexId(t[0]), VertexId(t[1]), VertexId(t[2])],
                normal: Vector3d::zeros(),
                removed: false,
            })
            .collect();

        let mut conn = Connectivity {
            live_vertices: vertices.len(),
            live_triangles: triangles.len(),
            vertices,
            triangles,
            next_remove_order: 0,
        };

        conn.compute_normals();
        conn.register_triangles();
        conn.accumulate_quadrics();

        let mut protected_mask = vec![false; conn.vertices.len()];
        for &p in protected {
            protected_mask[p as usize] = true;
        }

        // Isolated points have no collapse target
        for vi in 0..conn.vertices.len() {
            if conn.vertices[vi].incident_triangles.is_empty() && !protected_mask[vi] {
                conn.mark_removed(VertexId(vi as u32));
            }
        }

        conn.compute_edge_penalties(weights);

        for (vertex, &is_protected) in conn.vertices.iter_mut().zip(&protected_mask) {
            vertex.protected = is_protected;
        }

        debug!(
            vertices = conn.vertices.len(),
            triangles = conn.triangles.len(),
            live_vertices = conn.live_vertices,
            live_triangles = conn.live_triangles,
            protected = protected.len(),
            "Built connectivity"
        );

        Ok(conn)
    }

    fn compute_normals(&mut self) {
        for tri in &mut self.triangles {
            let [a, b, c] = tri.vertices.map(|v| to_point3d(&self.vertices[v.index()].position));
            tri.normal = (b - a)
                .cross(&(c - a))
                .try_normalize(f64::MIN_POSITIVE)
                .unwrap_or_else(Vector3d::zeros);
        }
    }

    fn register_triangles(&mut self) {
        for ti in 0..self.triangles.len() {
            let id = TriangleId(ti as u32);
            if self.triangles[ti].has_repeated_corner() {
                // Index-degenerate input face: never part of the graph
                self.triangles[ti].removed = true;
                self.live_triangles -= 1;
                continue;
            }
            let corners = self.triangles[ti].vertices;
            for (k, &v) in corners.iter().enumerate() {
                let vertex = &mut self.vertices[v.index()];
                insert_sorted(&mut vertex.incident_triangles, id);
                insert_sorted(&mut vertex.adjacent_vertices, corners[(k + 1) % 3]);
                insert_sorted(&mut vertex.adjacent_vertices, corners[(k + 2) % 3]);
            }
        }
    }

    fn accumulate_quadrics(&mut self) {
        for tri in self.triangles.iter().filter(|t| !t.removed) {
            let anchor = to_point3d(&self.vertices[tri.vertices[0].index()].position);
            let q = Quadric::from_normal_and_point(&tri.normal, &anchor);
            for v in tri.vertices {
                self.vertices[v.index()].quadric += q;
            }
        }
    }

    /// Boundary and crease bias, from the triangle count of every incident
    /// edge and the spread of the incident face normals.
    fn compute_edge_penalties(&mut self, weights: PenaltyWeights) {
        for vi in 0..self.vertices.len() {
            if self.vertices[vi].removed {
                continue;
            }
            let id = VertexId(vi as u32);
            let vertex = &self.vertices[vi];

            let on_border = vertex.adjacent_vertices.iter().any(|&n| {
                let shared = vertex
                    .incident_triangles
                    .iter()
                    .filter(|&&t| self.triangles[t.index()].contains(n))
                    .count();
                shared != 2
            });

            let normals: Vec<Vector3d> = vertex
                .incident_triangles
                .iter()
                .map(|&t| self.triangles[t.index()].normal)
                .filter(|n| n.norm_squared() > 0.0)
                .collect();
            let mut min_dot = 1.0f64;
            for (i, a) in normals.iter().enumerate() {
                for b in &normals[i + 1..] {
                    min_dot = min_dot.min(a.dot(b));
                }
            }
            let crease = weights.crease * (1.0 - min_dot.clamp(-1.0, 1.0)) * 0.5;

            let penalty = if on_border {
                weights.boundary + crease
            } else {
                crease
            };
            self.vertices[id.index()].edge_penalty = penalty;
        }
    }

    // ---- accessors ----

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.index()]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Ids of every vertex, in arena order
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len() as u32).map(VertexId)
    }

    pub fn live_vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn live_triangle_count(&self) -> usize {
        self.live_triangles
    }

    // ---- mutation ----

    /// Cache an evaluated collapse on the vertex.
    pub fn set_collapse(&mut self, id: VertexId, target: VertexId, cost: f64) {
        let vertex = &mut self.vertices[id.index()];
        vertex.collapse_target = Some(target);
        vertex.collapse_cost = cost;
    }

    pub fn clear_collapse(&mut self, id: VertexId) {
        let vertex = &mut self.vertices[id.index()];
        vertex.collapse_target = None;
        vertex.collapse_cost = 0.0;
    }

    pub(crate) fn mark_removed(&mut self, id: VertexId) {
        let order = self.next_remove_order;
        let vertex = &mut self.vertices[id.index()];
        debug_assert!(!vertex.removed);
        vertex.removed = true;
        vertex.remove_order = Some(order);
        vertex.incident_triangles.clear();
        vertex.adjacent_vertices.clear();
        self.next_remove_order += 1;
        self.live_vertices -= 1;
    }

    /// Rebuild a vertex's adjacency from its incident triangles.
    pub(crate) fn recompute_adjacency(&mut self, id: VertexId) {
        let mut adjacent: Vec<VertexId> = self.vertices[id.index()]
            .incident_triangles
            .iter()
            .flat_map(|&t| self.triangles[t.index()].vertices)
            .filter(|&v| v != id)
            .collect();
        adjacent.sort_unstable();
        adjacent.dedup();
        self.vertices[id.index()].adjacent_vertices = adjacent;
    }

    /// Check every structural invariant of the arenas.
    ///
    /// Intended for tests and debugging; cost is linear in the mesh size.
    pub fn check_invariants(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Algorithm(msg));

        let mut expected_incident: Vec<Vec<TriangleId>> = vec![Vec::new(); self.vertices.len()];
        let mut live_triangles = 0;
        for (ti, tri) in self.triangles.iter().enumerate() {
            if tri.removed {
                continue;
            }
            live_triangles += 1;
            if tri.has_repeated_corner() {
                return fail(format!("triangle {ti} has repeated corners {:?}", tri.vertices));
            }
            for v in tri.vertices {
                if self.vertices[v.index()].removed {
                    return fail(format!("triangle {ti} references removed vertex {}", v.0));
                }
                expected_incident[v.index()].push(TriangleId(ti as u32));
            }
        }
        if live_triangles != self.live_triangles {
            return fail(format!(
                "live triangle count {} does not match {live_triangles}",
                self.live_triangles
            ));
        }

        let mut live_vertices = 0;
        for (vi, vertex) in self.vertices.iter().enumerate() {
            if vertex.removed {
                if !vertex.incident_triangles.is_empty() || !vertex.adjacent_vertices.is_empty() {
                    return fail(format!("removed vertex {vi} still has adjacency"));
                }
                if vertex.remove_order.is_none() {
                    return fail(format!("removed vertex {vi} has no remove order"));
                }
                continue;
            }
            live_vertices += 1;
            if vertex.incident_triangles != expected_incident[vi] {
                return fail(format!(
                    "vertex {vi} incidence {:?} does not match {:?}",
                    vertex.incident_triangles, expected_incident[vi]
                ));
            }
            let id = VertexId(vi as u32);
            let mut expected_adjacent: Vec<VertexId> = expected_incident[vi]
                .iter()
                .flat_map(|&t| self.triangles[t.index()].vertices)
                .filter(|&v| v != id)
                .collect();
            expected_adjacent.sort_unstable();
            expected_adjacent.dedup();
            if vertex.adjacent_vertices != expected_adjacent {
                return fail(format!(
                    "vertex {vi} adjacency {:?} does not match {:?}",
                    vertex.adjacent_vertices, expected_adjacent
                ));
            }
            if vertex.incident_triangles.is_empty() && !vertex.protected {
                return fail(format!("isolated vertex {vi} was not removed"));
            }
        }
        if live_vertices != self.live_vertices {
            return fail(format!(
                "live vertex count {} does not match {live_vertices}",
                self.live_vertices
            ));
        }

        let mut orders: Vec<u32> = self.vertices.iter().filter_map(|v| v.remove_order).collect();
        orders.sort_unstable();
        if orders.windows(2).any(|w| w[0] == w[1]) {
            return fail("duplicate remove order".to_string());
        }
        Ok(())
    }
}

/// Reject index lists that are not whole triangles and indices outside
/// `positions`, including protected ones.
pub(crate) fn validate_input(positions: &[Point3f], indices: &[u32], protected: &[u32]) -> Result<()> {
    if positions.len() > u32::MAX as usize {
        return Err(Error::InvalidData(format!(
            "{} vertices exceed the 32-bit index range",
            positions.len()
        )));
    }
    if indices.len() % 3 != 0 {
        return Err(Error::InvalidData(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    let vertex_count = positions.len();
    if let Some(&index) = indices
        .iter()
        .chain(protected)
        .find(|&&i| i as usize >= vertex_count)
    {
        return Err(Error::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(())
}

pub(crate) fn insert_sorted<T: Ord + Copy>(set: &mut Vec<T>, value: T) {
    if let Err(pos) = set.binary_search(&value) {
        set.insert(pos, value);
    }
}

pub(crate) fn remove_sorted<T: Ord + Copy>(set: &mut Vec<T>, value: T) {
    if let Ok(pos) = set.binary_search(&value) {
        set.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> (Vec<Point3f>, Vec<u32>) {
        (
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    fn tetrahedron() -> (Vec<Point3f>, Vec<u32>) {
        (
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        )
    }

    #[test]
    fn test_build_quad() {
        let (positions, indices) = quad();
        let conn = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default()).unwrap();

        assert_eq!(conn.live_vertex_count(), 4);
        assert_eq!(conn.live_triangle_count(), 2);
        assert_eq!(
            conn.vertex(VertexId(0)).adjacent_vertices,
            vec![VertexId(1), VertexId(2), VertexId(3)]
        );
        assert_eq!(
            conn.vertex(VertexId(1)).adjacent_vertices,
            vec![VertexId(0), VertexId(2)]
        );
        assert_eq!(
            conn.vertex(VertexId(2)).incident_triangles,
            vec![TriangleId(0), TriangleId(1)]
        );
        assert_relative_eq!(conn.triangle(TriangleId(0)).normal.z, 1.0);
        conn.check_invariants().unwrap();
    }

    #[test]
    fn test_original_index_follows_input_order() {
        let (positions, indices) = tetrahedron();
        let conn = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default()).unwrap();
        for (i, v) in conn.vertices().iter().enumerate() {
            assert_eq!(v.original_index, i as u32);
            assert!(v.simplified_index.is_none());
            assert!(v.collapse_target.is_none());
        }
    }

    #[test]
    fn test_boundary_penalty() {
        let (positions, indices) = quad();
        let weights = PenaltyWeights {
            boundary: 5.0,
            crease: 1.0,
        };
        let conn = Connectivity::build(&positions, &indices, &[], weights).unwrap();
        // Flat, every vertex on the border
        for v in conn.vertices() {
            assert_relative_eq!(v.edge_penalty, 5.0);
        }
    }

    #[test]
    fn test_closed_mesh_has_no_boundary_penalty() {
        let (positions, indices) = tetrahedron();
        let weights = PenaltyWeights {
            boundary: 100.0,
            crease: 0.0,
        };
        let conn = Connectivity::build(&positions, &indices, &[], weights).unwrap();
        for v in conn.vertices() {
            assert_eq!(v.edge_penalty, 0.0);
        }

        let weights = PenaltyWeights {
            boundary: 100.0,
            crease: 1.0,
        };
        let conn = Connectivity::build(&positions, &indices, &[], weights).unwrap();
        for v in conn.vertices() {
            assert!(v.edge_penalty > 0.0 && v.edge_penalty <= 1.0);
        }
    }

    #[test]
    fn test_quadric_is_zero_on_own_plane() {
        let (positions, indices) = quad();
        let conn = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default()).unwrap();
        let q = conn.vertex(VertexId(0)).quadric;
        assert_relative_eq!(q.evaluate(&lodcrate_core::Point3d::new(3.0, -2.0, 0.0)), 0.0);
        // Two coplanar faces: squared distance counted twice
        assert_relative_eq!(q.evaluate(&lodcrate_core::Point3d::new(0.0, 0.0, 1.0)), 2.0);
    }

    #[test]
    fn test_isolated_vertex_removed() {
        let (mut positions, indices) = quad();
        positions.push(Point3f::new(5.0, 5.0, 5.0));
        let conn = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default()).unwrap();

        let isolated = conn.vertex(VertexId(4));
        assert!(isolated.removed);
        assert_eq!(isolated.remove_order, Some(0));
        assert_eq!(conn.live_vertex_count(), 4);
        conn.check_invariants().unwrap();
    }

    #[test]
    fn test_isolated_protected_vertex_kept() {
        let (mut positions, indices) = quad();
        positions.push(Point3f::new(5.0, 5.0, 5.0));
        let conn = Connectivity::build(&positions, &indices, &[4], PenaltyWeights::default()).unwrap();

        let isolated = conn.vertex(VertexId(4));
        assert!(!isolated.removed);
        assert!(isolated.protected);
        assert_eq!(conn.live_vertex_count(), 5);
        conn.check_invariants().unwrap();
    }

    #[test]
    fn test_repeated_corner_triangle_ignored() {
        let (positions, mut indices) = quad();
        indices.extend_from_slice(&[1, 1, 3]);
        let conn = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default()).unwrap();

        assert!(conn.triangle(TriangleId(2)).removed);
        assert_eq!(conn.live_triangle_count(), 2);
        assert_eq!(
            conn.vertex(VertexId(1)).adjacent_vertices,
            vec![VertexId(0), VertexId(2)]
        );
        conn.check_invariants().unwrap();
    }

    #[test]
    fn test_protected_flags() {
        let (positions, indices) = quad();
        let conn = Connectivity::build(&positions, &indices, &[1, 3], PenaltyWeights::default()).unwrap();
        assert!(!conn.vertex(VertexId(0)).protected);
        assert!(conn.vertex(VertexId(1)).protected);
        assert!(conn.vertex(VertexId(3)).protected);
        assert!(!conn.vertex(VertexId(3)).is_collapsible());
    }

    #[test]
    fn test_out_of_range_index() {
        let (positions, mut indices) = quad();
        indices.extend_from_slice(&[0, 1, 9]);
        let err = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default()).unwrap_err();
        assert_eq!(
            err,
            Error::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            }
        );
    }

    #[test]
    fn test_out_of_range_protected() {
        let (positions, indices) = quad();
        let result = Connectivity::build(&positions, &indices, &[4], PenaltyWeights::default());
        assert!(matches!(result, Err(Error::IndexOutOfRange { index: 4, .. })));
    }

    #[test]
    fn test_partial_triangle_rejected() {
        let (positions, mut indices) = quad();
        indices.push(1);
        let result = Connectivity::build(&positions, &indices, &[], PenaltyWeights::default());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_sorted_set_helpers() {
        let mut set = vec![1, 4, 9];
        insert_sorted(&mut set, 5);
        insert_sorted(&mut set, 4);
        assert_eq!(set, vec![1, 4, 5, 9]);
        remove_sorted(&mut set, 1);
        remove_sorted(&mut set, 7);
        assert_eq!(set, vec![4, 5, 9]);
    }
}
