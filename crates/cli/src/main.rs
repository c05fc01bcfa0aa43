//! Topotrace CLI - geometry operations and boundary tracing on WKT input

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_types::Coord;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use topotrace_algorithms::engine::{
    BufferParams, BufferSide, EndCapStyle, EngineContext, GeometryEngine, JoinStyle,
};
use topotrace_algorithms::tracer::{PathError, Tracer};
use topotrace_core::geometry::{Geometry, LineString, Rectangle};
use topotrace_core::vector::{FeatureSource, MemoryLayer};
use topotrace_core::CRS;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "topotrace")]
#[command(author, version, about = "Geometry operations and boundary tracing", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// DE-9IM matrix and named predicates between two geometries
    Relate {
        /// First geometry (WKT)
        a: String,
        /// Second geometry (WKT)
        b: String,
        /// Also test a DE-9IM pattern such as T*F**FFF*
        #[arg(short, long)]
        pattern: Option<String>,
    },
    /// Boolean overlay of two geometries
    Overlay {
        /// intersection, union, difference, symdifference
        op: String,
        /// First geometry (WKT)
        a: String,
        /// Second geometry (WKT)
        b: String,
    },
    /// Buffer, single-sided buffer or offset curve
    Buffer {
        /// Input geometry (WKT)
        geometry: String,
        /// Buffer distance
        #[arg(short, long)]
        distance: f64,
        /// Segments per quarter circle
        #[arg(short, long, default_value = "8")]
        segments: usize,
        /// End cap: round, flat, square
        #[arg(long, default_value = "round")]
        cap: String,
        /// Join: round, mitre, bevel
        #[arg(long, default_value = "round")]
        join: String,
        /// Mitre limit, as a multiple of the distance
        #[arg(long, default_value = "5.0")]
        miter_limit: f64,
        /// Buffer only one side: left, right
        #[arg(long)]
        side: Option<String>,
        /// Output the offset curve instead of a polygon
        #[arg(long)]
        offset_curve: bool,
    },
    /// Split a geometry with a line
    Split {
        /// Geometry to split (WKT)
        geometry: String,
        /// Splitting line (WKT LINESTRING)
        line: String,
        /// Report points where neighbouring features need new vertices
        #[arg(short, long)]
        topological: bool,
    },
    /// Reshape a line or polygon along a line
    Reshape {
        /// Geometry to reshape (WKT)
        geometry: String,
        /// Reshape line (WKT LINESTRING)
        line: String,
    },
    /// Split a geometry into parts with a bounded vertex count
    Subdivide {
        /// Input geometry (WKT)
        geometry: String,
        /// Maximum vertices per part
        #[arg(short, long, default_value = "256")]
        max_nodes: usize,
    },
    /// Delaunay triangulation of the vertices of a geometry
    Triangulate {
        /// Input geometry (WKT)
        geometry: String,
        /// Snapping tolerance for the input vertices
        #[arg(short, long, default_value = "0.0")]
        tolerance: f64,
        /// Output edges instead of triangles
        #[arg(short, long)]
        edges: bool,
    },
    /// Voronoi diagram of the vertices of a geometry
    Voronoi {
        /// Input geometry (WKT)
        geometry: String,
        /// Snapping tolerance for the input vertices
        #[arg(short, long, default_value = "0.0")]
        tolerance: f64,
        /// Output edges instead of cells
        #[arg(short, long)]
        edges: bool,
        /// Diagram extent as xmin,ymin,xmax,ymax
        #[arg(long)]
        extent: Option<String>,
    },
    /// Shortest path along the boundaries of the given lines and polygons
    Trace {
        /// Boundary geometry (WKT), repeatable
        #[arg(short, long = "line", required = true)]
        lines: Vec<String>,
        /// Start point as x,y
        #[arg(long)]
        from: String,
        /// End point as x,y
        #[arg(long)]
        to: String,
        /// Only trace features meeting xmin,ymin,xmax,ymax
        #[arg(long)]
        extent: Option<String>,
        /// Offset the path to the left (negative: right)
        #[arg(long, default_value = "0.0")]
        offset: f64,
        /// Refuse to trace more features than this (0: no limit)
        #[arg(long, default_value = "0")]
        max_features: usize,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging was already initialized");
    }
}

fn read_geometry(wkt: &str) -> Result<Geometry> {
    Geometry::from_wkt(wkt).with_context(|| format!("Failed to parse WKT: {}", wkt))
}

fn read_line(wkt: &str) -> Result<LineString> {
    match read_geometry(wkt)?.linearize(topotrace_core::geometry::DEFAULT_ARC_STEP) {
        Geometry::LineString(line) => Ok(line),
        other => anyhow::bail!("Expected a LINESTRING, got {:?}", other.geometry_type()),
    }
}

fn parse_point(s: &str) -> Result<Coord<f64>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        anyhow::bail!("Point must be 'x,y', got: {}", s);
    }
    let x: f64 = parts[0].trim().parse().context("Invalid x")?;
    let y: f64 = parts[1].trim().parse().context("Invalid y")?;
    Ok(Coord { x, y })
}

fn parse_extent(s: &str) -> Result<Rectangle> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().context("Invalid extent value"))
        .collect::<Result<_>>()?;
    if values.len() != 4 {
        anyhow::bail!("Extent must be 'xmin,ymin,xmax,ymax', got: {}", s);
    }
    Ok(Rectangle::new(values[0], values[1], values[2], values[3]))
}

fn parse_cap(s: &str) -> Result<EndCapStyle> {
    match s.to_lowercase().as_str() {
        "round" => Ok(EndCapStyle::Round),
        "flat" | "butt" => Ok(EndCapStyle::Flat),
        "square" => Ok(EndCapStyle::Square),
        _ => anyhow::bail!("Unknown end cap: {}. Use round, flat, or square.", s),
    }
}

fn parse_join(s: &str) -> Result<JoinStyle> {
    match s.to_lowercase().as_str() {
        "round" => Ok(JoinStyle::Round),
        "mitre" | "miter" => Ok(JoinStyle::Mitre),
        "bevel" => Ok(JoinStyle::Bevel),
        _ => anyhow::bail!("Unknown join: {}. Use round, mitre, or bevel.", s),
    }
}

fn parse_side(s: &str) -> Result<BufferSide> {
    match s.to_lowercase().as_str() {
        "left" | "l" => Ok(BufferSide::Left),
        "right" | "r" => Ok(BufferSide::Right),
        _ => anyhow::bail!("Unknown side: {}. Use left or right.", s),
    }
}

fn print_geometry(geometry: &Geometry) {
    println!("{}", geometry.to_wkt());
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let ctx = EngineContext::init();
    let start = Instant::now();

    match cli.command {
        // ── Predicates ───────────────────────────────────────────────
        Commands::Relate { a, b, pattern } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&a)?);
            let b = read_geometry(&b)?;
            let matrix = engine.relate(&b).context("Failed to compute DE-9IM matrix")?;
            println!("Matrix: {}", matrix);
            println!("  intersects: {}", engine.intersects(&b)?);
            println!("  disjoint:   {}", engine.disjoint(&b)?);
            println!("  touches:    {}", engine.touches(&b)?);
            println!("  crosses:    {}", engine.crosses(&b)?);
            println!("  within:     {}", engine.within(&b)?);
            println!("  contains:   {}", engine.contains(&b)?);
            println!("  overlaps:   {}", engine.overlaps(&b)?);
            println!("  equals:     {}", engine.is_equal(&b)?);
            if let Some(pattern) = pattern {
                let matches = engine
                    .relate_pattern(&b, &pattern)
                    .context("Failed to evaluate pattern")?;
                println!("Pattern {}: {}", pattern, matches);
            }
        }

        // ── Overlay ──────────────────────────────────────────────────
        Commands::Overlay { op, a, b } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&a)?);
            let b = read_geometry(&b)?;
            let result = match op.to_lowercase().as_str() {
                "intersection" | "and" => engine.intersection(&b),
                "union" | "or" => engine.union(&b),
                "difference" | "diff" => engine.difference(&b),
                "symdifference" | "symdiff" | "xor" => engine.sym_difference(&b),
                _ => anyhow::bail!(
                    "Unknown overlay: {}. Use intersection, union, difference, symdifference.",
                    op
                ),
            }
            .with_context(|| format!("Failed to compute {}", op))?;
            print_geometry(&result);
        }

        // ── Buffer ───────────────────────────────────────────────────
        Commands::Buffer {
            geometry,
            distance,
            segments,
            cap,
            join,
            miter_limit,
            side,
            offset_curve,
        } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&geometry)?);
            let params = BufferParams {
                segments,
                end_cap: parse_cap(&cap)?,
                join: parse_join(&join)?,
                miter_limit,
            };
            let result = if offset_curve {
                engine.offset_curve(distance, &params)
            } else if let Some(side) = side {
                engine.single_sided_buffer(distance, parse_side(&side)?, &params)
            } else {
                engine.buffer(distance, &params)
            }
            .context("Failed to compute buffer")?;
            print_geometry(&result);
        }

        // ── Editing ──────────────────────────────────────────────────
        Commands::Split {
            geometry,
            line,
            topological,
        } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&geometry)?);
            let outcome = engine.split_geometry(&read_line(&line)?, topological);
            println!("Result: {:?}", outcome.result);
            for piece in &outcome.new_geometries {
                print_geometry(piece);
            }
            if topological {
                for p in &outcome.topology_test_points {
                    println!("Topology point: {} {}", p.x, p.y);
                }
            }
        }

        Commands::Reshape { geometry, line } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&geometry)?);
            let result = engine
                .reshape_geometry(&read_line(&line)?)
                .context("Failed to reshape geometry")?;
            print_geometry(&result);
        }

        Commands::Subdivide { geometry, max_nodes } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&geometry)?);
            let result = engine
                .subdivide(max_nodes)
                .context("Failed to subdivide geometry")?;
            info!("{} parts", result.parts().len());
            print_geometry(&result);
        }

        // ── Triangulation ────────────────────────────────────────────
        Commands::Triangulate {
            geometry,
            tolerance,
            edges,
        } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&geometry)?);
            let result = engine
                .delaunay_triangulation(tolerance, edges)
                .context("Failed to triangulate")?;
            print_geometry(&result);
        }

        Commands::Voronoi {
            geometry,
            tolerance,
            edges,
            extent,
        } => {
            let engine = GeometryEngine::new(ctx.clone(), read_geometry(&geometry)?);
            let extent = extent.as_deref().map(parse_extent).transpose()?;
            let result = engine
                .voronoi_diagram(extent.as_ref(), tolerance, edges)
                .context("Failed to compute Voronoi diagram")?;
            print_geometry(&result);
        }

        // ── Tracing ──────────────────────────────────────────────────
        Commands::Trace {
            lines,
            from,
            to,
            extent,
            offset,
            max_features,
        } => {
            let layer = Arc::new(MemoryLayer::new("input", CRS::default()));
            for wkt in &lines {
                layer.add_feature(Some(read_geometry(wkt)?));
            }
            debug!("{} features loaded", layer.feature_count());

            let mut tracer = Tracer::new(ctx.clone());
            tracer.set_layers(vec![layer as Arc<dyn FeatureSource>]);
            tracer.set_extent(extent.as_deref().map(parse_extent).transpose()?);
            tracer.set_max_feature_count(max_features);
            tracer.set_offset(offset);

            let (path, error) = tracer.find_shortest_path_with_error(parse_point(&from)?, parse_point(&to)?);
            if tracer.has_topology_problem() {
                eprintln!("Warning: noding failed, tracing over the raw lines");
            }
            match error {
                PathError::None => {
                    let line = LineString::from_xy(&path.iter().map(|c| (c.x, c.y)).collect::<Vec<_>>());
                    print_geometry(&Geometry::LineString(line));
                }
                PathError::TooManyFeatures => anyhow::bail!("Too many features to trace"),
                PathError::Point1 => anyhow::bail!("Start point {} is not on any boundary", from),
                PathError::Point2 => anyhow::bail!("End point {} is not on any boundary", to),
                PathError::NoPath => anyhow::bail!("No path between {} and {}", from, to),
            }
        }
    }

    debug!("Processing time: {:.2?}", start.elapsed());
    ctx.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5, -2").unwrap(), Coord { x: 1.5, y: -2.0 });
        assert!(parse_point("1").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn test_parse_extent() {
        let r = parse_extent("0,0,5,5").unwrap();
        assert_eq!(r, Rectangle::new(0.0, 0.0, 5.0, 5.0));
        assert!(parse_extent("0,0,5").is_err());
    }

    #[test]
    fn test_read_line_rejects_polygon() {
        assert!(read_line("LINESTRING(0 0,1 1)").is_ok());
        assert!(read_line("POLYGON((0 0,1 0,1 1,0 0))").is_err());
    }
}
