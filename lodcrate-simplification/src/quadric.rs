//! Plane quadrics for the quadric error metric

use lodcrate_core::{Point3d, Vector3d};
use nalgebra::{Matrix4, Vector4};
use std::ops::{Add, AddAssign};

/// Sum of squared distances to a set of planes, as a symmetric 4x4 form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric(Matrix4<f64>);

impl Quadric {
    pub fn zero() -> Self {
        Self(Matrix4::zeros())
    }

    /// Quadric of the plane `ax + by + cz + d = 0`; `(a, b, c)` must be unit length.
    pub fn from_plane(plane: &Vector4<f64>) -> Self {
        Self(plane * plane.transpose())
    }

    /// Quadric of the plane with the given unit normal passing through `point`.
    ///
    /// A zero normal (degenerate triangle) gives the zero quadric.
    pub fn from_normal_and_point(normal: &Vector3d, point: &Point3d) -> Self {
        if normal.norm_squared() == 0.0 || !normal.iter().all(|x| x.is_finite()) {
            return Self::zero();
        }
        let d = -normal.dot(&point.coords);
        Self::from_plane(&Vector4::new(normal.x, normal.y, normal.z, d))
    }

    /// Evaluate `p^T Q p` in homogeneous coordinates.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let vh = p.to_homogeneous();
        (vh.transpose() * self.0 * vh)[0].max(0.0)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }
}

impl Default for Quadric {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
