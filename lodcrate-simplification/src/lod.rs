//! Level-of-detail chains

use crate::params::{ReductionTarget, SimplifyParams};
use crate::result::SimplifiedMesh;
use crate::simplifier::ProgressiveSimplifier;
use lodcrate_core::{Result, TriangleMesh};
use rayon::prelude::*;
use tracing::debug;

/// Simplify `mesh` once per target, returning the levels in target order.
///
/// Every level starts from the full input on its own arena, so the levels
/// are computed in parallel. All targets are checked before any work is
/// done; `params.target` is ignored.
pub fn build_lod_chain(
    mesh: &TriangleMesh,
    targets: &[ReductionTarget],
    params: &SimplifyParams,
) -> Result<Vec<SimplifiedMesh>> {
    params.validate()?;
    for target in targets {
        target.validate()?;
    }

    debug!(
        levels = targets.len(),
        vertices = mesh.vertex_count(),
        "Building LOD chain"
    );

    targets
        .par_iter()
        .map(|&target| {
            let level = SimplifyParams {
                target,
                ..params.clone()
            };
            ProgressiveSimplifier::with_params(level).run(mesh)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodcrate_core::{Error, Point3f};

    fn make_wavy_grid(size: u32) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        for y in 0..size {
            for x in 0..size {
                let z = ((x as f32 * 0.7).sin() + (y as f32 * 0.4).cos()) * 0.3;
                mesh.add_vertex(Point3f::new(x as f32, y as f32, z));
            }
        }
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let tl = y * size + x;
                let bl = tl + size;
                mesh.add_face([tl, bl, tl + 1]);
                mesh.add_face([tl + 1, bl, bl + 1]);
            }
        }
        mesh
    }

    #[test]
    fn test_levels_in_target_order() {
        let mesh = make_wavy_grid(8);
        let targets = [
            ReductionTarget::Ratio(1.0),
            ReductionTarget::Ratio(0.5),
            ReductionTarget::VertexCount(10),
        ];
        let chain = build_lod_chain(&mesh, &targets, &SimplifyParams::default()).unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].vertex_count(), 64);
        assert_eq!(chain[0].stats.collapses, 0);
        assert!(chain[1].vertex_count() <= 32);
        assert!(chain[2].vertex_count() <= 10);
        assert!(chain[1].vertex_count() >= chain[2].vertex_count());
    }

    #[test]
    fn test_levels_match_single_runs() {
        let mesh = make_wavy_grid(7);
        let params = SimplifyParams::default();
        let targets = [ReductionTarget::Ratio(0.6), ReductionTarget::Ratio(0.3)];
        let chain = build_lod_chain(&mesh, &targets, &params).unwrap();

        for (level, &target) in chain.iter().zip(targets.iter()) {
            let single = ProgressiveSimplifier::with_params(params.clone().with_target(target))
                .run(&mesh)
                .unwrap();
            assert_eq!(level.mesh, single.mesh);
            assert_eq!(level.original_indices, single.original_indices);
        }
    }

    #[test]
    fn test_invalid_target_fails_whole_chain() {
        let mesh = make_wavy_grid(4);
        let targets = [ReductionTarget::Ratio(0.5), ReductionTarget::VertexCount(1)];
        assert!(matches!(
            build_lod_chain(&mesh, &targets, &SimplifyParams::default()),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_empty_chain() {
        let chain =
            build_lod_chain(&make_wavy_grid(3), &[], &SimplifyParams::default()).unwrap();
        assert!(chain.is_empty());
    }
}
