//! Geometry simplification example for lodcrate
//!
//! Builds a terrain patch drawn as one triangle strip per row, attaches
//! normals and colours, then simplifies it in place.
//!
//! Run with: cargo run -p lodcrate-demos --bin simplify_geometry -- --ratio 0.2

use anyhow::Result;
use clap::Parser;
use lodcrate_core::{DrawIndices, Geometry, PrimitiveMode, PrimitiveSet, Point3f, Vector3f, VertexArray};
use lodcrate_simplification::{simplify_geometry, SimplifyParams};

#[derive(Parser)]
#[command(name = "simplify_geometry")]
#[command(about = "Simplify strip-based terrain geometry in place", long_about = None)]
struct Args {
    /// Fraction of the input vertices to keep
    #[arg(long, default_value_t = 0.25)]
    ratio: f32,

    /// Terrain resolution along each axis
    #[arg(long, default_value_t = 48)]
    size: u32,

    /// Merge coincident positions before simplifying
    #[arg(long)]
    merge_duplicates: bool,

    /// Log run statistics at info level
    #[arg(long)]
    verbose: bool,
}

fn height(x: f32, y: f32) -> f32 {
    (x * 0.31).sin() * (y * 0.17).cos() * 3.0 + (x * 0.05 + y * 0.07).sin()
}

fn create_terrain(size: u32) -> Geometry {
    let mut positions = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            positions.push(Point3f::new(x as f32, y as f32, height(x as f32, y as f32)));
        }
    }
    let count = positions.len();

    let mut geometry = Geometry::new(VertexArray::Float3(positions));
    for row in 0..size - 1 {
        let mut strip = Vec::with_capacity(2 * size as usize);
        for x in 0..size {
            strip.push(row * size + x);
            strip.push((row + 1) * size + x);
        }
        geometry.add_primitive_set(PrimitiveSet::new(
            PrimitiveMode::TriangleStrip,
            DrawIndices::U32(strip),
        ));
    }
    geometry.normals = Some(vec![Vector3f::z(); count]);
    geometry.colors = Some(vec![[0.4, 0.6, 0.3, 1.0]; count]);
    geometry
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut geometry = create_terrain(args.size.max(2));

    println!("lodcrate Geometry Simplification Example");
    println!("========================================");
    println!(
        "Input: {} vertices in {} strips",
        geometry.vertex_count(),
        geometry.primitive_sets.len()
    );

    let params = SimplifyParams::with_ratio(args.ratio)
        .with_merge_duplicates(args.merge_duplicates)
        .with_verbose(args.verbose);
    let stats = simplify_geometry(&mut geometry, &params)?;

    println!("\nResult:");
    println!("- {stats}");
    println!("- Primitive sets: {}", geometry.primitive_sets.len());
    println!("- Normals kept: {}", geometry.normals.is_some());

    println!("\nExample completed successfully!");
    Ok(())
}
