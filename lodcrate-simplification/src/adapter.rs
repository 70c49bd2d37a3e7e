//! Conversion between SDK geometry and flat triangle meshes

use crate::result::SimplifiedMesh;
use itertools::Itertools;
use lodcrate_core::{
    Error, Geometry, PrimitiveMode, PrimitiveSet, Result, TriangleMesh, VertexArray,
};
use tracing::debug;

/// Merge every primitive set of `geometry` into one triangle list.
///
/// Positions must be stored as `f32` triples; other layouts are rejected
/// rather than converted. Strips and fans are triangulated, point and line
/// primitives are skipped. Normals, colours and texture coordinates are not
/// carried over.
pub fn extract_triangles(geometry: &Geometry) -> Result<TriangleMesh> {
    let positions = match &geometry.vertex_array {
        VertexArray::Float3(positions) => positions.clone(),
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "vertex array must hold float3 positions, found {}",
                other.format_name()
            )))
        }
    };

    let mut indices = Vec::new();
    for (set_index, primitive_set) in geometry.primitive_sets.iter().enumerate() {
        append_triangles(set_index, primitive_set, &mut indices)?;
    }

    Ok(TriangleMesh::from_vertices_and_indices(positions, indices))
}

fn append_triangles(set_index: usize, primitive_set: &PrimitiveSet, out: &mut Vec<u32>) -> Result<()> {
    let indices = primitive_set.indices.to_u32()?;
    match primitive_set.mode {
        PrimitiveMode::Triangles => {
            if indices.len() % 3 != 0 {
                return Err(Error::InvalidData(format!(
                    "primitive set {set_index}: {} triangle indices is not a multiple of 3",
                    indices.len()
                )));
            }
            out.extend_from_slice(&indices);
        }
        PrimitiveMode::TriangleStrip => {
            for (i, (&a, &b, &c)) in indices.iter().tuple_windows().enumerate() {
                // Odd triangles are wound the other way round
                let triangle = if i % 2 == 0 { [a, b, c] } else { [b, a, c] };
                push_non_degenerate(triangle, out);
            }
        }
        PrimitiveMode::TriangleFan => {
            if let Some((&center, rest)) = indices.split_first() {
                for (&b, &c) in rest.iter().tuple_windows() {
                    push_non_degenerate([center, b, c], out);
                }
            }
        }
        PrimitiveMode::Points | PrimitiveMode::Lines | PrimitiveMode::LineStrip => {
            debug!(
                set_index,
                mode = ?primitive_set.mode,
                "Skipping primitive set without triangles"
            );
        }
    }
    Ok(())
}

// Strips restart through repeated indices
fn push_non_degenerate(triangle: [u32; 3], out: &mut Vec<u32>) {
    let [a, b, c] = triangle;
    if a != b && b != c && c != a {
        out.extend_from_slice(&triangle);
    }
}

/// Install a simplified mesh into `geometry`.
///
/// The vertex array and primitive sets are replaced; all other per-vertex
/// attribute arrays are cleared since they no longer line up.
pub fn apply_simplified(geometry: &mut Geometry, simplified: &SimplifiedMesh) {
    geometry.vertex_array = VertexArray::Float3(simplified.mesh.vertices.clone());
    geometry.primitive_sets = vec![PrimitiveSet::triangles(simplified.mesh.indices.clone())];
    geometry.clear_attributes();
}
