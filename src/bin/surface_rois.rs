//! Build a labelled dense-scalar ROI map from a table of seed vertices.
//!
//! ```bash
//! surface-rois seeds.csv 6 lh.midthickness.surf.gii rh.midthickness.surf.gii \
//!     out.dscalar.nii --dilate 2
//! ```
//!
//! The seed table has `hemi` (L/R) and `vertex` columns, and optionally a
//! `label` column; without one the rows are numbered in order.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use meants::error::Result;
use meants::rois::{build_surface_rois, SurfaceRoisRequest};
use meants::wb::{RunSettings, Workbench};

/// Build a labelled ROI map from geodesic regions around seed vertices
#[derive(Parser, Debug)]
#[command(
    name = "surface-rois",
    version,
    about = "Geodesic ROI map from seed vertices"
)]
struct Cli {
    /// Seed-vertex table (hemi, vertex and optional label columns)
    table: PathBuf,

    /// Geodesic radius around each seed vertex, in mm
    radius: f64,

    /// Left-hemisphere surface the regions are grown on
    left_surface: PathBuf,

    /// Right-hemisphere surface the regions are grown on
    right_surface: PathBuf,

    /// Output dense-scalar path
    output: PathBuf,

    /// Dilate the combined map by this many mm
    #[arg(long)]
    dilate: Option<f64>,

    /// Log every delegated wb_command invocation
    #[arg(long)]
    debug: bool,

    /// Log the planned wb_command invocations without executing them
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = RunSettings {
        debug: cli.debug,
        dry_run: cli.dry_run,
    };
    let wb = Workbench::discover(settings)?;

    let request = SurfaceRoisRequest {
        table: cli.table.clone(),
        radius_mm: cli.radius,
        left_surface: cli.left_surface.clone(),
        right_surface: cli.right_surface.clone(),
        output: cli.output.clone(),
        dilate_mm: cli.dilate,
    };
    build_surface_rois(&request, &wb, settings)
}
