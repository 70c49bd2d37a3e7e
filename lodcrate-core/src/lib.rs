//! Core data structures for lodcrate
//!
//! This crate provides the fundamental types shared by the simplification
//! engine: points, flat triangle meshes, SDK-side geometry with primitive
//! sets, and the common error type.

pub mod point;
pub mod mesh;
pub mod geometry;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use geometry::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3, Vector4};
