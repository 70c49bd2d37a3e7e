//! LOD chain example for lodcrate
//!
//! Builds a UV sphere, simplifies it to several levels in parallel and
//! prints what each level kept.
//!
//! Run with: cargo run -p lodcrate-demos --bin lod_chain -- --ratios 0.5 0.25 0.1

use anyhow::{bail, Context, Result};
use clap::Parser;
use lodcrate_core::{Point3f, TriangleMesh};
use lodcrate_simplification::{build_lod_chain, ReductionTarget, SimplifyParams};

#[derive(Parser)]
#[command(name = "lod_chain")]
#[command(about = "Simplify a procedural sphere into a chain of LOD levels", long_about = None)]
struct Args {
    /// Fractions of the input vertices to keep, one per level
    #[arg(long, num_args = 1.., default_values_t = [0.5f32, 0.25, 0.1])]
    ratios: Vec<f32>,

    /// Sphere rings; the sphere has rings * segments + 2 vertices
    #[arg(long, default_value_t = 32)]
    rings: u32,

    /// Sphere segments around the axis
    #[arg(long, default_value_t = 64)]
    segments: u32,

    /// Indices of vertices that must survive every level
    #[arg(long, num_args = 0..)]
    protect: Vec<u32>,

    /// Stop a level early once the cheapest collapse costs more than this
    #[arg(long)]
    max_cost: Option<f64>,
}

/// UV sphere of radius 1 with a pole vertex at each end
fn create_sphere(rings: u32, segments: u32) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    let top = mesh.add_vertex(Point3f::new(0.0, 0.0, 1.0));

    for ring in 1..=rings {
        let phi = std::f32::consts::PI * ring as f32 / (rings + 1) as f32;
        for segment in 0..segments {
            let theta = 2.0 * std::f32::consts::PI * segment as f32 / segments as f32;
            mesh.add_vertex(Point3f::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            ));
        }
    }
    let bottom = mesh.add_vertex(Point3f::new(0.0, 0.0, -1.0));

    let at = |ring: u32, segment: u32| 1 + ring * segments + segment % segments;
    for s in 0..segments {
        mesh.add_face([top, at(0, s), at(0, s + 1)]);
        mesh.add_face([bottom, at(rings - 1, s + 1), at(rings - 1, s)]);
    }
    for r in 0..rings - 1 {
        for s in 0..segments {
            let (a, b) = (at(r, s), at(r, s + 1));
            let (c, d) = (at(r + 1, s), at(r + 1, s + 1));
            mesh.add_face([a, c, b]);
            mesh.add_face([b, c, d]);
        }
    }
    mesh
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.rings < 1 || args.segments < 3 {
        bail!("a sphere needs at least 1 ring and 3 segments");
    }

    let sphere = create_sphere(args.rings, args.segments);
    println!("lodcrate LOD Chain Example");
    println!("==========================");
    println!(
        "Input sphere: {} vertices, {} triangles",
        sphere.vertex_count(),
        sphere.face_count()
    );

    let mut params = SimplifyParams::new().with_protected_vertices(args.protect.clone());
    if let Some(max_cost) = args.max_cost {
        params = params.with_max_cost(max_cost);
    }

    let targets: Vec<ReductionTarget> = args.ratios.iter().map(|&r| ReductionTarget::Ratio(r)).collect();
    let chain = build_lod_chain(&sphere, &targets, &params).context("building LOD chain")?;

    for (level, (ratio, lod)) in args.ratios.iter().zip(&chain).enumerate() {
        println!("\nLevel {} (ratio {ratio}):", level + 1);
        println!("- {}", lod.stats);
        if let (Some(first), Some(last)) = (lod.collapses.first(), lod.collapses.last()) {
            println!(
                "- Collapse cost grew from {:.3e} to {:.3e}",
                first.cost, last.cost
            );
        }
    }

    println!("\nExample completed successfully!");
    Ok(())
}
