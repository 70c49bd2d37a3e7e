//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A triangle mesh stored as a flat position array and a flat index list
///
/// Every three consecutive entries of `indices` form one triangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            indices: faces.into_iter().flatten().collect(),
        }
    }

    /// Create a mesh from vertices and an already flattened index list
    pub fn from_vertices_and_indices(vertices: Vec<Point3f>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of complete triangles
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.len() < 3
    }

    /// Iterate over the triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [u32; 3]) {
        self.indices.extend_from_slice(&face);
    }

    /// Calculate face normals
    ///
    /// Degenerate faces yield a zero vector instead of NaN components.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.triangles()
            .map(|face| {
                let v0 = self.vertices[face[0] as usize];
                let v1 = self.vertices[face[1] as usize];
                let v2 = self.vertices[face[2] as usize];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1
                    .cross(&edge2)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3f::zeros)
            })
            .collect()
    }

    /// Merge vertices with bit-identical positions.
    ///
    /// Indices are rewritten to the first occurrence of each position and
    /// triangles that collapse onto fewer than three distinct vertices are
    /// dropped. Returns the old-to-new vertex remap table.
    pub fn merge_duplicate_vertices(&mut self) -> Vec<u32> {
        let mut unique: HashMap<[u32; 3], u32> = HashMap::with_capacity(self.vertices.len());
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut merged = Vec::with_capacity(self.vertices.len());

        for vertex in &self.vertices {
            let key = position_key(vertex);
            let next = merged.len() as u32;
            let index = *unique.entry(key).or_insert_with(|| {
                merged.push(*vertex);
                next
            });
            remap.push(index);
        }

        let mut indices = Vec::with_capacity(self.indices.len());
        for [a, b, c] in self.triangles() {
            let (a, b, c) = (remap[a as usize], remap[b as usize], remap[c as usize]);
            if a != b && b != c && c != a {
                indices.extend_from_slice(&[a, b, c]);
            }
        }

        self.vertices = merged;
        self.indices = indices;
        remap
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

// -0.0 and 0.0 are the same position
fn position_key(p: &Point3f) -> [u32; 3] {
    let bits = |v: f32| if v == 0.0 { 0.0f32.to_bits() } else { v.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}
