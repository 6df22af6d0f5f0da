//! Extract mean time-series per seed region from functional neuroimaging
//! data.
//!
//! ```bash
//! # one row per label in the seed map
//! meants rest.dtseries.nii atlas.dlabel.nii --outputcsv rest_atlas.csv
//!
//! # volumetric inputs, restricted to one label, with a mask
//! meants rest.nii.gz rois.nii.gz --roi-label 4 --mask brainmask.nii.gz
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use ndarray::Array2;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use meants::error::{MeantsError, Result};
use meants::extract::{roi_mean_timeseries, ExtractOptions};
use meants::format::{
    check_compatible, default_output_path, determine_filetype, FileKind, Hemisphere,
};
use meants::loader::SeriesLoader;
use meants::table;
use meants::wb::{NoWorkbench, RunSettings, Workbench, WorkbenchRunner};

/// Extract mean time-series per seed region from functional MRI data
#[derive(Parser, Debug)]
#[command(name = "meants", version, about = "Mean time-series per seed region")]
struct Cli {
    /// Functional data: nifti volume, gifti metric or cifti dense file
    func: PathBuf,

    /// Seed map assigning a numeric region label to each sample
    seed: PathBuf,

    /// Path for the mean time-series table. Defaults to
    /// <func>_<seed>_meants.csv in the working directory.
    #[arg(long)]
    outputcsv: Option<PathBuf>,

    /// Also write the region labels, one per output row
    #[arg(long)]
    outputlabels: Option<PathBuf>,

    /// Mask: seed labels outside its non-zero support are dropped
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Only extract from this one seed label
    #[arg(long)]
    roi_label: Option<f64>,

    /// One seed-weighted average row instead of per-region means
    #[arg(long, conflicts_with = "roi_label")]
    weighted: bool,

    /// Restrict cifti inputs to their surface part (both hemispheres)
    #[arg(long)]
    surface_only: bool,

    /// Hemisphere (L or R) to pull out of cifti functional data when the
    /// seed is a gifti metric
    #[arg(long)]
    hemi: Option<Hemisphere>,

    /// Log every delegated wb_command invocation
    #[arg(long)]
    debug: bool,

    /// Log the planned operations without touching any data
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
    let func_kind = determine_filetype(&cli.func)?;
    let seed_kind = determine_filetype(&cli.seed)?;
    let mask_kind = match &cli.mask {
        Some(mask) => Some(determine_filetype(mask)?),
        None => None,
    };
    check_compatible(func_kind, seed_kind, mask_kind, cli.hemi)?;
    if cli.surface_only && (func_kind, seed_kind) != (FileKind::Cifti, FileKind::Cifti) {
        return Err(MeantsError::UnsupportedFormatCombination(String::from(
            "--surface-only needs cifti functional and seed inputs",
        )));
    }

    let outputcsv = match &cli.outputcsv {
        Some(path) => path.clone(),
        None => default_output_path(&cli.func, &cli.seed)?,
    };

    let settings = RunSettings {
        debug: cli.debug,
        dry_run: cli.dry_run,
    };
    let needs_wb = func_kind != FileKind::Nifti
        || seed_kind != FileKind::Nifti
        || mask_kind.map_or(false, |k| k != FileKind::Nifti);

    if cli.dry_run {
        info!(
            "would extract {} means from {} ({}) with seed {} ({}) into {}",
            if cli.weighted { "weighted" } else { "per-region" },
            cli.func.display(),
            func_kind,
            cli.seed.display(),
            seed_kind,
            outputcsv.display()
        );
        if needs_wb {
            let wb = Workbench::discover(settings)?;
            info!("conversions would use {}", wb.executable().display());
        }
        return Ok(());
    }

    let wb: Box<dyn WorkbenchRunner> = if needs_wb {
        let wb = Workbench::discover(settings)?;
        if cli.debug {
            debug!("wb_command:\n    {}", wb.version()?);
        }
        Box::new(wb)
    } else {
        Box::new(NoWorkbench)
    };
    let loader = SeriesLoader::new(wb.as_ref())?;

    let func = load_input(&loader, &cli.func, func_kind, seed_kind, cli)?;
    let seed = load_input(&loader, &cli.seed, seed_kind, seed_kind, cli)?;
    let mask = match (&cli.mask, mask_kind) {
        (Some(path), Some(kind)) => Some(load_input(&loader, path, kind, seed_kind, cli)?),
        _ => None,
    };

    let options = ExtractOptions {
        roi_label: cli.roi_label,
        weighted: cli.weighted,
    };
    let out = roi_mean_timeseries(&func, &seed, mask.as_ref(), &options)?;

    table::write_matrix(&outputcsv, &out.means)?;
    info!(
        "wrote {} mean time-series rows to {}",
        out.means.nrows(),
        outputcsv.display()
    );
    if let Some(labels_path) = &cli.outputlabels {
        table::write_labels(labels_path, &out.labels)?;
        info!("wrote region labels to {}", labels_path.display());
    }
    Ok(())
}

/// Load one input, honoring the surface restriction and the hemisphere
/// selection for grayordinate functional data against a surface seed.
fn load_input(
    loader: &SeriesLoader,
    path: &PathBuf,
    kind: FileKind,
    seed_kind: FileKind,
    cli: &Cli,
) -> Result<Array2<f64>> {
    if cli.surface_only && kind == FileKind::Cifti {
        return loader.load_cifti_surface(path);
    }
    if kind == FileKind::Cifti && seed_kind == FileKind::Gifti {
        // check_compatible has already required the hemisphere.
        if let Some(hemi) = cli.hemi {
            return loader.load_cifti_hemisphere(path, hemi);
        }
    }
    loader.load(path, kind)
}
