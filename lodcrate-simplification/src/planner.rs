//! Collapse planning: choosing where a vertex would merge and at what cost

use crate::connectivity::{Connectivity, VertexId};
use lodcrate_core::to_point3d;
use std::cmp::Ordering;

/// Best collapse found for a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collapse {
    pub target: VertexId,
    pub cost: f64,
}

/// Find the cheapest neighbour to merge `id` into.
///
/// The cost of moving onto neighbour `n` is the vertex quadric evaluated at
/// `n`'s position plus the vertex edge penalty scaled by the squared edge
/// length. Equal costs go to the neighbour with the lower original index.
/// Returns `None` when the vertex has no neighbours.
pub fn evaluate(conn: &Connectivity, id: VertexId) -> Option<Collapse> {
    let vertex = conn.vertex(id);
    debug_assert!(!vertex.removed, "evaluating removed vertex {}", id.0);
    let origin = to_point3d(&vertex.position);

    vertex
        .adjacent_vertices
        .iter()
        .map(|&n| {
            let neighbour = conn.vertex(n);
            let p = to_point3d(&neighbour.position);
            let cost = vertex.quadric.evaluate(&p) + vertex.edge_penalty * (p - origin).norm_squared();
            (cost, neighbour.original_index, n)
        })
        .min_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        })
        .map(|(cost, _, target)| Collapse { target, cost })
}
