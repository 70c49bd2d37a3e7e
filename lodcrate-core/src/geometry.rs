//! Renderable geometry as handed over by the host graphics SDK
//!
//! A [`Geometry`] owns one vertex array, optional per-vertex attribute
//! arrays and any number of primitive sets drawing from the vertex array.

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Storage layout of the vertex position array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VertexArray {
    Float2(Vec<[f32; 2]>),
    Float3(Vec<Point3f>),
    Float4(Vec<[f32; 4]>),
    Double3(Vec<Point3d>),
}

impl VertexArray {
    pub fn len(&self) -> usize {
        match self {
            VertexArray::Float2(v) => v.len(),
            VertexArray::Float3(v) => v.len(),
            VertexArray::Float4(v) => v.len(),
            VertexArray::Double3(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the layout, used in error messages.
    pub fn format_name(&self) -> &'static str {
        match self {
            VertexArray::Float2(_) => "float2",
            VertexArray::Float3(_) => "float3",
            VertexArray::Float4(_) => "float4",
            VertexArray::Double3(_) => "double3",
        }
    }
}

/// How the indices of a primitive set are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Index source of a primitive set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawIndices {
    /// Consecutive vertices `first..first + count`
    Arrays { first: u32, count: u32 },
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl DrawIndices {
    pub fn len(&self) -> usize {
        match self {
            DrawIndices::Arrays { count, .. } => *count as usize,
            DrawIndices::U8(v) => v.len(),
            DrawIndices::U16(v) => v.len(),
            DrawIndices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand to 32-bit vertex indices.
    ///
    /// Fails when an `Arrays` range runs past `u32::MAX`.
    pub fn to_u32(&self) -> Result<Vec<u32>> {
        Ok(match self {
            DrawIndices::Arrays { first, count } => {
                let end = first.checked_add(*count).ok_or_else(|| {
                    Error::InvalidData(format!(
                        "draw range {first}..{first}+{count} exceeds the 32-bit index range"
                    ))
                })?;
                (*first..end).collect()
            }
            DrawIndices::U8(v) => v.iter().map(|&i| i as u32).collect(),
            DrawIndices::U16(v) => v.iter().map(|&i| i as u32).collect(),
            DrawIndices::U32(v) => v.clone(),
        })
    }
}

/// One draw call over the geometry's vertex array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveSet {
    pub mode: PrimitiveMode,
    pub indices: DrawIndices,
}

impl PrimitiveSet {
    pub fn new(mode: PrimitiveMode, indices: DrawIndices) -> Self {
        Self { mode, indices }
    }

    /// Indexed triangle list
    pub fn triangles(indices: Vec<u32>) -> Self {
        Self::new(PrimitiveMode::Triangles, DrawIndices::U32(indices))
    }
}

/// Geometry with positions, optional attributes and primitive sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub vertex_array: VertexArray,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    pub primitive_sets: Vec<PrimitiveSet>,
}

impl Geometry {
    /// Create a geometry from a position array, without primitives
    pub fn new(vertex_array: VertexArray) -> Self {
        Self {
            vertex_array,
            normals: None,
            colors: None,
            tex_coords: Vec::new(),
            primitive_sets: Vec::new(),
        }
    }

    /// Create a geometry with float positions and one indexed triangle list
    pub fn from_triangles(positions: Vec<Point3f>, indices: Vec<u32>) -> Self {
        let mut geometry = Self::new(VertexArray::Float3(positions));
        geometry.add_primitive_set(PrimitiveSet::triangles(indices));
        geometry
    }

    pub fn add_primitive_set(&mut self, primitive_set: PrimitiveSet) {
        self.primitive_sets.push(primitive_set);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_array.len()
    }

    /// Drop every per-vertex attribute array except positions
    pub fn clear_attributes(&mut self) {
        self.normals = None;
        self.colors = None;
        self.tex_coords.clear();
    }
}
