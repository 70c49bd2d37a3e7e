//! Parameters for progressive simplification

use lodcrate_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Smallest vertex count a simplification may be asked to reach
pub const MIN_TARGET_VERTICES: usize = 3;

/// How far a mesh should be reduced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReductionTarget {
    /// Fraction of the input vertex count to keep, in `(0, 1]`
    Ratio(f32),
    /// Absolute number of vertices to keep, at least 3
    VertexCount(usize),
}

impl ReductionTarget {
    /// Check the target without looking at a mesh.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ReductionTarget::Ratio(ratio) => {
                // NaN fails both comparisons
                if ratio > 0.0 && ratio <= 1.0 {
                    Ok(())
                } else {
                    Err(Error::InvalidTarget(format!(
                        "ratio {ratio} is outside (0, 1]"
                    )))
                }
            }
            ReductionTarget::VertexCount(count) => {
                if count >= MIN_TARGET_VERTICES {
                    Ok(())
                } else {
                    Err(Error::InvalidTarget(format!(
                        "vertex count {count} is below {MIN_TARGET_VERTICES}"
                    )))
                }
            }
        }
    }

    /// Resolve to an absolute vertex count for a mesh with `vertex_count` vertices.
    pub fn resolve(&self, vertex_count: usize) -> Result<usize> {
        self.validate()?;
        Ok(match *self {
            ReductionTarget::Ratio(ratio) => {
                let target = (ratio as f64 * vertex_count as f64).round() as usize;
                target.max(MIN_TARGET_VERTICES)
            }
            ReductionTarget::VertexCount(count) => count,
        })
    }
}

impl Default for ReductionTarget {
    fn default() -> Self {
        ReductionTarget::Ratio(0.5)
    }
}

/// Parameters for a simplification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyParams {
    /// Reduction target. Default: 50% of the input vertices
    pub target: ReductionTarget,

    /// Indices into the input position array that are never collapsed
    pub protected_vertices: Vec<u32>,

    /// Merge bit-identical positions before simplifying. Default: false
    pub merge_duplicates: bool,

    /// Edge penalty given to vertices on an open or non-manifold border.
    /// Default: 1.0
    pub boundary_weight: f64,

    /// Scale of the crease penalty derived from the spread of incident face
    /// normals. Default: 1.0
    pub crease_weight: f64,

    /// Stop once the cheapest collapse costs more than this. If None, no limit.
    pub max_cost: Option<f64>,

    /// Report statistics at info level instead of debug. Default: false
    pub verbose: bool,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            target: ReductionTarget::default(),
            protected_vertices: Vec::new(),
            merge_duplicates: false,
            boundary_weight: 1.0,
            crease_weight: 1.0,
            max_cost: None,
            verbose: false,
        }
    }
}

impl SimplifyParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params keeping a fraction of the input vertices.
    pub fn with_ratio(ratio: f32) -> Self {
        Self {
            target: ReductionTarget::Ratio(ratio),
            ..Default::default()
        }
    }

    /// Params keeping an absolute number of vertices.
    pub fn with_vertex_count(count: usize) -> Self {
        Self {
            target: ReductionTarget::VertexCount(count),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: ReductionTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_protected_vertices(mut self, protected: Vec<u32>) -> Self {
        self.protected_vertices = protected;
        self
    }

    pub fn with_merge_duplicates(mut self, merge: bool) -> Self {
        self.merge_duplicates = merge;
        self
    }

    pub fn with_weights(mut self, boundary_weight: f64, crease_weight: f64) -> Self {
        self.boundary_weight = boundary_weight;
        self.crease_weight = crease_weight;
        self
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate everything that does not depend on the mesh.
    pub fn validate(&self) -> Result<()> {
        self.target.validate()?;
        for (name, weight) in [
            ("boundary_weight", self.boundary_weight),
            ("crease_weight", self.crease_weight),
        ] {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(Error::InvalidData(format!(
                    "{name} must be finite and non-negative, got {weight}"
                )));
            }
        }
        if let Some(max_cost) = self.max_cost {
            if max_cost.is_nan() {
                return Err(Error::InvalidData("max_cost is NaN".to_string()));
            }
        }
        Ok(())
    }
}
