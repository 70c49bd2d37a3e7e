//! The driving loop of a simplification run
//!
//! A run moves through `Building -> Evaluating -> (Extracting -> Collapsing
//! -> Reevaluating)* -> Compacting -> Done`. [`Simplification`] exposes the
//! loop one collapse at a time; [`ProgressiveSimplifier`] runs it to the end.

use crate::active_set::{ActiveSet, CollapseKey};
use crate::collapse::CollapseOutcome;
use crate::compactor;
use crate::connectivity::{self, Connectivity, PenaltyWeights, VertexId};
use crate::params::{ReductionTarget, SimplifyParams};
use crate::planner;
use crate::result::{SimplifiedMesh, SimplifyStats};
use crate::{adapter, MeshSimplifier};
use lodcrate_core::{Error, Geometry, Result, TriangleMesh};
use std::time::Instant;
use tracing::{debug, info, trace};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Building,
    Evaluating,
    Extracting,
    Collapsing,
    Reevaluating,
    Compacting,
    Done,
}

/// One simplification run over its own arena.
#[derive(Debug)]
pub struct Simplification {
    connectivity: Connectivity,
    active: ActiveSet,
    target_vertex_count: usize,
    max_cost: Option<f64>,
    stage: Stage,
    collapses: usize,
    original_vertices: usize,
    original_triangles: usize,
    started: Instant,
}

impl Simplification {
    /// Build the arena and evaluate every collapsible vertex.
    ///
    /// `params.protected_vertices` index into `mesh.vertices`. Duplicate
    /// merging is not applied here; see [`ProgressiveSimplifier::run`].
    pub fn new(mesh: &TriangleMesh, params: &SimplifyParams) -> Result<Self> {
        let started = Instant::now();
        params.validate()?;
        let target_vertex_count = params.target.resolve(mesh.vertex_count())?;

        trace!(stage = ?Stage::Building);
        let weights = PenaltyWeights {
            boundary: params.boundary_weight,
            crease: params.crease_weight,
        };
        let connectivity = Connectivity::build(
            &mesh.vertices,
            &mesh.indices,
            &params.protected_vertices,
            weights,
        )?;

        let mut run = Simplification {
            active: ActiveSet::with_capacity(connectivity.live_vertex_count()),
            connectivity,
            target_vertex_count,
            max_cost: params.max_cost,
            stage: Stage::Evaluating,
            collapses: 0,
            original_vertices: mesh.vertex_count(),
            original_triangles: mesh.face_count(),
            started,
        };

        trace!(stage = ?run.stage);
        let ids: Vec<VertexId> = run.connectivity.vertex_ids().collect();
        for id in ids {
            if run.connectivity.vertex(id).is_collapsible() {
                run.reevaluate(id);
            }
        }
        Ok(run)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn active_set(&self) -> &ActiveSet {
        &self.active
    }

    pub fn target_vertex_count(&self) -> usize {
        self.target_vertex_count
    }

    pub fn collapse_count(&self) -> usize {
        self.collapses
    }

    /// Whether the loop would perform another collapse
    pub fn can_step(&self) -> bool {
        !matches!(self.stage, Stage::Compacting | Stage::Done)
            && !self.active.is_empty()
            && self.active.len() > self.target_vertex_count
    }

    /// Collapse the cheapest active vertex.
    ///
    /// Returns `Ok(None)` once the target is reached, the active set is
    /// empty, or the cheapest collapse exceeds `max_cost`.
    pub fn step(&mut self) -> Result<Option<CollapseOutcome>> {
        if !self.can_step() {
            return Ok(None);
        }

        self.stage = Stage::Extracting;
        let (id, key) = self.active.extract_min();
        if let Some(max_cost) = self.max_cost {
            if key.cost > max_cost {
                self.active.insert(id, key);
                self.stage = Stage::Compacting;
                debug!(cost = key.cost, max_cost, "Stopping at cost limit");
                return Ok(None);
            }
        }

        // Every vertex whose key may change leaves the set before any mutation
        let touched = self.connectivity.collapse_neighbourhood(id);
        for &u in &touched {
            self.active.remove(u);
        }

        self.stage = Stage::Collapsing;
        let outcome = self.connectivity.collapse(id)?;
        self.collapses += 1;

        self.stage = Stage::Reevaluating;
        for &u in &outcome.touched {
            if self.connectivity.vertex(u).is_collapsible() {
                self.reevaluate(u);
            }
        }
        Ok(Some(outcome))
    }

    /// Recompute the cached collapse of a vertex that is not in the active
    /// set and insert it again if it still has a neighbour.
    fn reevaluate(&mut self, id: VertexId) {
        debug_assert!(!self.active.contains(id));
        match planner::evaluate(&self.connectivity, id) {
            Some(collapse) => {
                self.connectivity.set_collapse(id, collapse.target, collapse.cost);
                let original_index = self.connectivity.vertex(id).original_index;
                self.active
                    .insert(id, CollapseKey::new(collapse.cost, original_index));
            }
            None => self.connectivity.clear_collapse(id),
        }
    }

    /// Run the loop until it stops.
    pub fn run_to_completion(&mut self) -> Result<()> {
        while self.step()?.is_some() {}
        Ok(())
    }

    /// Finish the loop and compact the survivors.
    pub fn finish(mut self) -> Result<SimplifiedMesh> {
        self.run_to_completion()?;
        self.stage = Stage::Compacting;
        trace!(stage = ?self.stage);

        let compacted = compactor::compact(&mut self.connectivity)?;
        let collapses = compactor::removal_records(&self.connectivity);
        self.stage = Stage::Done;

        let stats = SimplifyStats {
            original_vertices: self.original_vertices,
            original_triangles: self.original_triangles,
            final_vertices: compacted.mesh.vertex_count(),
            final_triangles: compacted.mesh.face_count(),
            collapses: self.collapses,
            elapsed: self.started.elapsed(),
        };

        Ok(SimplifiedMesh {
            mesh: compacted.mesh,
            original_indices: compacted.original_indices,
            collapses,
            stats,
        })
    }

    /// Check the arena invariants and active set membership.
    pub fn check_invariants(&self) -> Result<()> {
        self.connectivity.check_invariants()?;

        for id in self.connectivity.vertex_ids() {
            let vertex = self.connectivity.vertex(id);
            let states = [self.active.contains(id), vertex.removed, vertex.protected];
            if states.iter().filter(|&&s| s).count() != 1 {
                return Err(Error::Algorithm(format!(
                    "vertex {} is in {states:?} (active, removed, protected)",
                    id.0
                )));
            }
            let Some(key) = self.active.key(id) else {
                continue;
            };
            let consistent = key.cost == vertex.collapse_cost
                && key.original_index == vertex.original_index
                && vertex.collapse_target.map_or(false, |t| {
                    !self.connectivity.vertex(t).removed
                        && vertex.adjacent_vertices.binary_search(&t).is_ok()
                });
            if !consistent {
                return Err(Error::Algorithm(format!(
                    "active vertex {} has a stale collapse {:?} -> {:?}",
                    id.0, key, vertex.collapse_target
                )));
            }
        }
        Ok(())
    }
}

// ============================================================
// Progressive Simplifier
// ============================================================

/// Vertex-collapse simplifier driven by quadric error and edge penalties.
///
/// Each call builds a fresh arena from its input; nothing is shared between
/// runs.
#[derive(Debug, Clone, Default)]
pub struct ProgressiveSimplifier {
    pub params: SimplifyParams,
}

impl ProgressiveSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: SimplifyParams) -> Self {
        Self { params }
    }

    /// Simplify `mesh` according to the configured parameters.
    ///
    /// With `merge_duplicates`, coincident positions are merged first; the
    /// returned original indices and collapse records still refer to
    /// `mesh.vertices`.
    pub fn run(&self, mesh: &TriangleMesh) -> Result<SimplifiedMesh> {
        let params = &self.params;
        params.validate()?;

        let mut simplified = if params.merge_duplicates {
            let started = Instant::now();
            // The merge indexes through the input, so check it first
            connectivity::validate_input(&mesh.vertices, &mesh.indices, &params.protected_vertices)?;
            let mut merged = mesh.clone();
            let remap = merged.merge_duplicate_vertices();

            let mut protected = Vec::with_capacity(params.protected_vertices.len());
            for &p in &params.protected_vertices {
                match remap.get(p as usize) {
                    Some(&m) => protected.push(m),
                    None => {
                        return Err(Error::IndexOutOfRange {
                            index: p,
                            vertex_count: mesh.vertex_count(),
                        })
                    }
                }
            }

            // First input vertex of every merged vertex
            let mut source = vec![u32::MAX; merged.vertex_count()];
            for (old, &new) in remap.iter().enumerate().rev() {
                source[new as usize] = old as u32;
            }
            debug!(
                before = mesh.vertex_count(),
                after = merged.vertex_count(),
                "Merged duplicate vertices"
            );

            let merged_params = SimplifyParams {
                protected_vertices: protected,
                target: ReductionTarget::VertexCount(params.target.resolve(mesh.vertex_count())?),
                ..params.clone()
            };
            let mut simplified = Simplification::new(&merged, &merged_params)?.finish()?;
            simplified.remap_original_indices(&source);
            simplified.stats.original_vertices = mesh.vertex_count();
            simplified.stats.original_triangles = mesh.face_count();
            simplified.stats.elapsed = started.elapsed();
            simplified
        } else {
            Simplification::new(mesh, params)?.finish()?
        };

        log_stats(&simplified.stats, params.verbose);
        Ok(simplified)
    }
}

impl MeshSimplifier for ProgressiveSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, target: ReductionTarget) -> Result<TriangleMesh> {
        let simplifier = ProgressiveSimplifier::with_params(SimplifyParams {
            target,
            ..self.params.clone()
        });
        Ok(simplifier.run(mesh)?.mesh)
    }
}

/// Simplify a geometry in place.
///
/// The positions and primitive sets are replaced by the simplified mesh and
/// every other per-vertex attribute is cleared. On error the geometry is
/// left untouched.
pub fn simplify_geometry(geometry: &mut Geometry, params: &SimplifyParams) -> Result<SimplifyStats> {
    let mesh = adapter::extract_triangles(geometry)?;
    let simplified = ProgressiveSimplifier::with_params(params.clone()).run(&mesh)?;
    adapter::apply_simplified(geometry, &simplified);
    Ok(simplified.stats)
}

fn log_stats(stats: &SimplifyStats, verbose: bool) {
    if verbose {
        info!(
            original_vertices = stats.original_vertices,
            original_triangles = stats.original_triangles,
            final_vertices = stats.final_vertices,
            final_triangles = stats.final_triangles,
            collapses = stats.collapses,
            elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0,
            "Simplified mesh"
        );
    } else {
        debug!(%stats, "Simplified mesh");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodcrate_core::Point3f;

    fn make_quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn make_plane_grid(size: u32) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3f::new(x as f32, y as f32, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_quad_to_single_triangle() {
        let result = ProgressiveSimplifier::with_params(SimplifyParams::with_vertex_count(3))
            .run(&make_quad())
            .unwrap();

        assert_eq!(result.vertex_count(), 3);
        assert_eq!(result.face_count(), 1);
        assert_eq!(result.original_indices, vec![1, 2, 3]);
        assert_eq!(result.mesh.indices, vec![0, 1, 2]);
        assert_eq!(result.collapses.len(), 1);
        assert_eq!(result.collapses[0].vertex, 0);
        assert_eq!(result.collapses[0].target, Some(1));
        assert_eq!(result.stats.collapses, 1);
    }

    #[test]
    fn test_initial_state() {
        let run = Simplification::new(&make_quad(), &SimplifyParams::with_vertex_count(3)).unwrap();
        assert_eq!(run.stage(), Stage::Evaluating);
        assert_eq!(run.active_set().len(), 4);
        assert_eq!(run.target_vertex_count(), 3);
        assert!(run.can_step());
        run.check_invariants().unwrap();
    }

    #[test]
    fn test_step_by_step_invariants() {
        let mesh = make_plane_grid(6);
        let mut run = Simplification::new(&mesh, &SimplifyParams::with_vertex_count(3)).unwrap();
        run.check_invariants().unwrap();

        while let Some(outcome) = run.step().unwrap() {
            assert_eq!(run.stage(), Stage::Reevaluating);
            assert!(run.connectivity().vertex(outcome.vertex).removed);
            run.check_invariants().unwrap();
        }
        assert!(run.active_set().len() <= 3);

        let result = run.finish().unwrap();
        assert!(result.vertex_count() <= 3);
    }

    #[test]
    fn test_protected_vertices_never_collapse() {
        let mesh = make_plane_grid(5);
        let protected = vec![0, 4, 12, 20, 24];
        let params = SimplifyParams::with_vertex_count(3).with_protected_vertices(protected.clone());
        let result = ProgressiveSimplifier::with_params(params).run(&mesh).unwrap();

        for p in protected {
            let out = result
                .original_indices
                .iter()
                .position(|&o| o == p)
                .expect("protected vertex missing");
            assert_eq!(result.mesh.vertices[out], mesh.vertices[p as usize]);
        }
    }

    #[test]
    fn test_max_cost_stops_early() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        );
        let params = SimplifyParams::with_vertex_count(3).with_max_cost(0.0);
        let result = ProgressiveSimplifier::with_params(params).run(&mesh).unwrap();
        // Every collapse of a tetrahedron moves a vertex off some face plane
        assert_eq!(result.vertex_count(), 4);
        assert_eq!(result.stats.collapses, 0);
    }

    #[test]
    fn test_invalid_target_rejected() {
        let s = ProgressiveSimplifier::new();
        assert!(matches!(
            s.simplify(&make_quad(), ReductionTarget::Ratio(1.5)),
            Err(Error::InvalidTarget(_))
        ));
        assert!(matches!(
            s.simplify(&make_quad(), ReductionTarget::VertexCount(2)),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_merge_duplicates_maps_back() {
        // The quad's triangles stored with separate corners
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let params = SimplifyParams::with_vertex_count(3).with_merge_duplicates(true);
        let result = ProgressiveSimplifier::with_params(params.clone()).run(&mesh).unwrap();

        assert_eq!(result.vertex_count(), 3);
        assert_eq!(result.face_count(), 1);
        assert_eq!(result.stats.original_vertices, 6);
        assert_eq!(result.stats.original_triangles, 2);
        // Merged vertices report their first input occurrence
        assert_eq!(result.original_indices, vec![1, 2, 5]);
        assert_eq!(result.collapses[0].vertex, 0);
        assert_eq!(result.collapses[0].target, Some(1));

        // Protecting the second copy protects the merged vertex
        let params = params.with_protected_vertices(vec![3]);
        let result = ProgressiveSimplifier::with_params(params).run(&mesh).unwrap();
        assert!(result.original_indices.contains(&0));
    }

    #[test]
    fn test_merge_duplicates_validates_input_first() {
        let merge = SimplifyParams::with_vertex_count(3).with_merge_duplicates(true);
        let triangle = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];

        let out_of_range = TriangleMesh::from_vertices_and_indices(triangle.clone(), vec![0, 1, 3]);
        assert!(matches!(
            ProgressiveSimplifier::with_params(merge.clone()).run(&out_of_range),
            Err(Error::IndexOutOfRange { index: 3, vertex_count: 3 })
        ));

        // Same error with and without the merge pre-pass
        let partial = TriangleMesh::from_vertices_and_indices(triangle, vec![0, 1, 2, 1]);
        for params in [merge.clone(), merge.with_merge_duplicates(false)] {
            assert!(matches!(
                ProgressiveSimplifier::with_params(params).run(&partial),
                Err(Error::InvalidData(_))
            ));
        }
    }

    #[test]
    fn test_simplify_trait() {
        let s = ProgressiveSimplifier::new();
        let mesh = make_plane_grid(6);
        let result = s.simplify(&mesh, ReductionTarget::Ratio(0.5)).unwrap();
        assert!(result.vertex_count() <= 18);
        assert!(result.face_count() > 0);
    }
}
