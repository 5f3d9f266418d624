//! CLI for triangulating, warping and aligning facial landmark sets.
//!
//! Usage:
//!   face-warp triangulate reference.json -o reference.tri
//!   face-warp warp --reference reference.json --live live.json --json
//!   face-warp align --reference reference.json --live live.json
//!   face-warp composite --reference-image mona.png --source-image me.png \
//!       --reference mona.json --live me.json -o out.png
//!
//! Landmark files are JSON arrays of `{"x": .., "y": .., "z": ..}` objects
//! (`z` optional).

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use face_warp::{
    alignment_info, alignment_info_from_groups, compute_similarity_with_epsilon, draw_warp_plan,
    plan_warps, triangulate, EngineConfig, GrayImage, ImageAccess, LandmarkSet, RasterSurface, Triangulation,
    WarpPlan,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "face-warp")]
#[command(author, version, about = "Triangle warping and face alignment", long_about = None)]
struct Args {
    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delaunay-triangulate a reference landmark set
    Triangulate {
        /// Landmark file
        landmarks: PathBuf,

        /// Save the triangulation (bincode) to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the flat index list as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Solve per-triangle affine transforms from a live face onto a reference
    Warp {
        #[arg(long)]
        reference: PathBuf,

        #[arg(long)]
        live: PathBuf,

        /// Saved triangulation (default: triangulate the reference)
        #[arg(long)]
        triangulation: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Compute the eye-based similarity transform between two faces
    Align {
        #[arg(long)]
        reference: PathBuf,

        #[arg(long)]
        live: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Warp the source face onto the reference image and save a grayscale PNG
    Composite {
        #[arg(long)]
        reference_image: PathBuf,

        #[arg(long)]
        source_image: PathBuf,

        /// Landmarks of the reference image
        #[arg(long)]
        reference: PathBuf,

        /// Landmarks of the source image
        #[arg(long)]
        live: PathBuf,

        /// Output image
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct AlignOutput {
    scale: f32,
    rotation: f32,
    rotation_degrees: f32,
    translation: [f32; 2],
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut filter = EnvFilter::from_default_env();
    let level = if verbose { "face_warp=debug" } else { "face_warp=info" };
    if let Ok(d) = level.parse() {
        filter = filter.add_directive(d);
    }
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    debug!(?config, "configuration");

    match &args.command {
        Command::Triangulate {
            landmarks,
            output,
            json,
        } => {
            let set = load_landmarks(landmarks)?;
            let tri = triangulate(&set.points);
            if tri.is_empty() {
                return Err("landmarks are degenerate, no triangles produced".into());
            }
            info!(triangles = tri.len(), "triangulated {}", landmarks.display());
            if let Some(path) = output {
                tri.save(path)?;
                info!("triangulation written to {}", path.display());
            }
            if *json {
                println!("{}", serde_json::to_string(&tri.to_flat())?);
            } else if output.is_none() {
                for t in tri.triangles() {
                    println!("{} {} {}", t[0], t[1], t[2]);
                }
            }
        }
        Command::Warp {
            reference,
            live,
            triangulation,
            json,
        } => {
            let reference = load_landmarks(reference)?;
            let live = load_landmarks(live)?;
            let tri = load_or_triangulate(triangulation.as_deref(), &reference)?;
            let plan = plan_warps(&tri, &live, &reference, config.epsilon)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{}", format_plan(&plan));
            }
        }
        Command::Align {
            reference,
            live,
            json,
        } => {
            let reference = load_landmarks(reference)?;
            let live = load_landmarks(live)?;
            let (ref_info, live_info) = match config.model.eye_contours() {
                Some((a, b)) if config.eye_contours => (
                    alignment_info_from_groups(&reference, a, b)?,
                    alignment_info_from_groups(&live, a, b)?,
                ),
                _ => {
                    let (a, b) = config.eye_pair();
                    (alignment_info(&reference, a, b)?, alignment_info(&live, a, b)?)
                }
            };
            let s = compute_similarity_with_epsilon(&ref_info, &live_info, config.epsilon)?;
            let output = AlignOutput {
                scale: s.scale,
                rotation: s.rotation,
                rotation_degrees: s.rotation.to_degrees(),
                translation: [s.translation.x, s.translation.y],
            };
            if *json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Scale:       {:.4}", output.scale);
                println!("Rotation:    {:.4} rad ({:.1} deg)", output.rotation, output.rotation_degrees);
                println!(
                    "Translation: ({:.2}, {:.2})",
                    output.translation[0], output.translation[1]
                );
            }
        }
        Command::Composite {
            reference_image,
            source_image,
            reference,
            live,
            output,
        } => {
            let reference = load_landmarks(reference)?;
            let live = load_landmarks(live)?;
            let tri = triangulate(&reference.points);
            let plan = plan_warps(&tri, &live, &reference, config.epsilon)?;

            let canvas = load_gray(reference_image)?;
            let source = load_gray(source_image)?;
            let (width, height) = (canvas.width(), canvas.height());

            let mut surface = RasterSurface::new(canvas);
            let drawn = draw_warp_plan(&mut surface, &source, &plan);
            info!(drawn, skipped = plan.skipped, "composited");

            let pixels = surface.into_canvas().into_raw();
            let out = image::GrayImage::from_raw(width, height, pixels)
                .ok_or("composite buffer has the wrong size")?;
            out.save(output)?;
            info!("composite written to {}", output.display());
        }
    }

    Ok(())
}

fn load_landmarks(path: &Path) -> Result<LandmarkSet, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let set: LandmarkSet = serde_json::from_str(&text)?;
    debug!(points = set.len(), "loaded {}", path.display());
    Ok(set)
}

fn load_or_triangulate(
    path: Option<&Path>,
    reference: &LandmarkSet,
) -> Result<Triangulation, Box<dyn std::error::Error>> {
    let tri = match path {
        Some(path) => Triangulation::load(path)?,
        None => triangulate(&reference.points),
    };
    tri.check_compatible(reference)?;
    Ok(tri)
}

fn load_gray(path: &Path) -> Result<GrayImage, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_luma8();
    let (width, height) = img.dimensions();
    Ok(GrayImage::new(img.into_raw(), width, height))
}

fn format_plan(plan: &WarpPlan) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "Triangles: {} solved, {} skipped\n",
        plan.len(),
        plan.skipped
    ));
    for warp in &plan.warps {
        let t = &warp.transform;
        s.push_str(&format!(
            "  #{:<4} [{:>3} {:>3} {:>3}]  a={:.4} b={:.4} c={:.4} d={:.4} e={:.2} f={:.2}\n",
            warp.triangle,
            warp.indices[0],
            warp.indices[1],
            warp.indices[2],
            t.a,
            t.b,
            t.c,
            t.d,
            t.e,
            t.f
        ));
    }
    s
}
