//! Compaction of the surviving arena into dense output arrays

use crate::connectivity::Connectivity;
use crate::result::CollapseRecord;
use itertools::Itertools;
use lodcrate_core::{Error, Result, TriangleMesh};

/// Dense output of a run, before statistics are attached
#[derive(Debug, Clone, PartialEq)]
pub struct Compacted {
    pub mesh: TriangleMesh,
    pub original_indices: Vec<u32>,
}

/// Assign `simplified_index` to every live vertex in original order and emit
/// the live triangles in original order.
///
/// This is the only place vertices are renumbered. A live triangle on a
/// removed vertex is an `Error::Algorithm`.
pub fn compact(conn: &mut Connectivity) -> Result<Compacted> {
    let mut positions = Vec::with_capacity(conn.live_vertices);
    let mut original_indices = Vec::with_capacity(conn.live_vertices);

    for vertex in conn.vertices.iter_mut() {
        if vertex.removed {
            vertex.simplified_index = None;
            continue;
        }
        vertex.simplified_index = Some(positions.len() as u32);
        positions.push(vertex.position);
        original_indices.push(vertex.original_index);
    }

    let mut indices = Vec::with_capacity(conn.live_triangles * 3);
    for triangle in conn.triangles.iter().filter(|t| !t.removed) {
        for v in triangle.vertices {
            let index = conn.vertices[v.index()].simplified_index.ok_or_else(|| {
                Error::Algorithm(format!(
                    "live triangle {:?} references removed vertex {}",
                    triangle.vertices, v.0
                ))
            })?;
            indices.push(index);
        }
    }

    debug_assert_eq!(indices.len(), conn.live_triangles * 3);
    debug_assert!(indices
        .chunks_exact(3)
        .all(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0]));

    Ok(Compacted {
        mesh: TriangleMesh::from_vertices_and_indices(positions, indices),
        original_indices,
    })
}

/// Removal records sorted by `remove_order`.
pub fn removal_records(conn: &Connectivity) -> Vec<CollapseRecord> {
    conn.vertices
        .iter()
        .filter_map(|v| v.remove_order.map(|order| (order, v)))
        .sorted_by_key(|(order, _)| *order)
        .map(|(_, v)| CollapseRecord {
            vertex: v.original_index,
            target: v
                .collapse_target
                .map(|t| conn.vertices[t.index()].original_index),
            cost: v.collapse_cost,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::{PenaltyWeights, VertexId};
    use lodcrate_core::Point3f;

    fn quad_with_isolated() -> Connectivity {
        Connectivity::build(
            &[
                Point3f::new(9.0, 9.0, 9.0),
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            &[1, 2, 3, 1, 3, 4],
            &[],
            PenaltyWeights::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_compact_skips_removed() {
        let mut conn = quad_with_isolated();
        let compacted = compact(&mut conn).unwrap();

        assert_eq!(compacted.mesh.vertex_count(), 4);
        assert_eq!(compacted.original_indices, vec![1, 2, 3, 4]);
        assert_eq!(compacted.mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(conn.vertex(VertexId(0)).simplified_index, None);
        assert_eq!(conn.vertex(VertexId(1)).simplified_index, Some(0));
    }

    #[test]
    fn test_compact_after_collapse() {
        let mut conn = quad_with_isolated();
        conn.set_collapse(VertexId(1), VertexId(2), 1.0);
        conn.collapse(VertexId(1)).unwrap();

        let compacted = compact(&mut conn).unwrap();
        assert_eq!(compacted.original_indices, vec![2, 3, 4]);
        assert_eq!(compacted.mesh.indices, vec![0, 1, 2]);
        assert_eq!(compacted.mesh.vertices[0], Point3f::new(1.0, 0.0, 0.0));

        let records = removal_records(&conn);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].vertex, 0);
        assert_eq!(records[0].target, None);
        assert_eq!(records[1].vertex, 1);
        assert_eq!(records[1].target, Some(2));
        assert_eq!(records[1].cost, 1.0);
    }

    #[test]
    fn test_compact_rejects_triangle_on_removed_vertex() {
        let mut conn = quad_with_isolated();
        // Tombstone a vertex without touching its triangles
        conn.vertices[2].removed = true;
        assert!(matches!(compact(&mut conn), Err(Error::Algorithm(_))));
    }
}
