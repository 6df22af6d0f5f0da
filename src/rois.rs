//! Labelled ROI maps built from seed vertices.
//!
//! A seed-vertex table names surface vertices (per hemisphere, each with an
//! optional numeric label). Geodesic regions around the seeds are generated
//! by wb_command; this module's own contribution is the table parsing and
//! the arithmetic that folds the per-seed binary maps into one labelled map.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use tracing::{info, warn};

use crate::error::{MeantsError, Result};
use crate::format::Hemisphere;
use crate::loader::{load_nifti_timeseries, write_map_as_nifti};
use crate::wb::{RunSettings, WorkbenchRunner};

/// One row of the seed-vertex table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedVertex {
    pub hemi: Hemisphere,
    pub vertex: u32,
    pub label: f64,
}

/// Read the seed-vertex table. Expected columns: `hemi` (L/R), `vertex`,
/// and optionally `label`; rows without a label column are numbered 1..n in
/// row order.
pub fn read_seed_table<P: AsRef<Path>>(path: P) -> Result<Vec<SeedVertex>> {
    let file = BufReader::new(fs::File::open(path.as_ref())?);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let hemi_col = column(&headers, "hemi").ok_or(MeantsError::MissingColumn("hemi"))?;
    let vertex_col = column(&headers, "vertex").ok_or(MeantsError::MissingColumn("vertex"))?;
    let label_col = column(&headers, "label");

    let mut seeds = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let hemi: Hemisphere = field(&record, hemi_col, row)?
            .parse()
            .map_err(|e: String| MeantsError::InvalidTableRow(row + 1, e))?;
        let vertex: u32 = field(&record, vertex_col, row)?
            .parse()
            .map_err(|_| {
                MeantsError::InvalidTableRow(row + 1, String::from("vertex is not an integer"))
            })?;
        let label = match label_col {
            Some(col) => field(&record, col, row)?.parse().map_err(|_| {
                MeantsError::InvalidTableRow(row + 1, String::from("label is not numeric"))
            })?,
            None => (seeds.len() + 1) as f64,
        };
        seeds.push(SeedVertex {
            hemi,
            vertex,
            label,
        });
    }
    Ok(seeds)
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
}

fn field<'r>(record: &'r csv::StringRecord, col: usize, row: usize) -> Result<&'r str> {
    record
        .get(col)
        .ok_or_else(|| MeantsError::InvalidTableRow(row + 1, String::from("short record")))
}

/// Fold per-seed binary ROI maps (one column per seed) into one labelled
/// map: each column scaled by its label, then summed. Returns the combined
/// map and the number of samples covered by more than one seed region.
pub fn combine_labelled_rois(labels: &[f64], maps: &Array2<f64>) -> Result<(Array1<f64>, usize)> {
    if labels.len() != maps.ncols() {
        return Err(MeantsError::ShapeMismatch(
            "roi maps",
            labels.len(),
            maps.ncols(),
        ));
    }
    let mut combined = Array1::<f64>::zeros(maps.nrows());
    let mut overlap = 0usize;
    for (s, row) in maps.rows().into_iter().enumerate() {
        let covering = row.iter().filter(|v| **v != 0.0).count();
        if covering > 1 {
            overlap += 1;
        }
        combined[s] = row.iter().zip(labels).map(|(v, l)| v * l).sum();
    }
    Ok((combined, overlap))
}

/// What to build: seed table, geodesic radius, the two surfaces and the
/// dense-scalar output path.
#[derive(Debug, Clone)]
pub struct SurfaceRoisRequest {
    pub table: PathBuf,
    pub radius_mm: f64,
    pub left_surface: PathBuf,
    pub right_surface: PathBuf,
    pub output: PathBuf,
    pub dilate_mm: Option<f64>,
}

/// Build a labelled dense-scalar ROI map from the seed-vertex table.
///
/// Per hemisphere with at least one seed: generate one geodesic region per
/// seed vertex, combine the regions into a single labelled metric, and
/// optionally dilate it. Hemispheres without seeds are omitted from the
/// final dense-scalar call. With `dry_run` set, the planned geodesic-ROI
/// commands are logged and nothing further happens.
pub fn build_surface_rois(
    request: &SurfaceRoisRequest,
    wb: &dyn WorkbenchRunner,
    settings: RunSettings,
) -> Result<()> {
    let seeds = read_seed_table(&request.table)?;
    if seeds.is_empty() {
        return Err(MeantsError::EmptyRoiTable(request.table.clone()));
    }

    let stage = tempfile::Builder::new().prefix("meants-rois").tempdir()?;
    let sides = [
        (Hemisphere::Left, &request.left_surface, "-left-metric", "L"),
        (
            Hemisphere::Right,
            &request.right_surface,
            "-right-metric",
            "R",
        ),
    ];

    let mut metric_args: Vec<String> = Vec::new();
    for (hemi, surface, flag, tag) in sides {
        let rows: Vec<&SeedVertex> = seeds.iter().filter(|s| s.hemi == hemi).collect();
        if rows.is_empty() {
            info!("no seed vertices for the {} hemisphere, omitting it", tag);
            continue;
        }

        let list_path = stage.path().join(format!("{}_vertices.txt", tag));
        let mut list = String::new();
        for seed in &rows {
            list.push_str(&seed.vertex.to_string());
            list.push('\n');
        }
        fs::write(&list_path, list)?;

        let rois_metric = stage.path().join(format!("{}_rois.func.gii", tag));
        wb.run(&[
            String::from("-surface-geodesic-rois"),
            lossy(surface),
            request.radius_mm.to_string(),
            lossy(&list_path),
            lossy(&rois_metric),
        ])?;
        if settings.dry_run {
            continue;
        }

        let rois_nii = stage.path().join(format!("{}_rois.nii", tag));
        wb.run(&[
            String::from("-metric-convert"),
            String::from("-to-nifti"),
            lossy(&rois_metric),
            lossy(&rois_nii),
        ])?;
        let maps = load_nifti_timeseries(&rois_nii)?;
        let labels: Vec<f64> = rows.iter().map(|s| s.label).collect();
        let (combined, overlap) = combine_labelled_rois(&labels, &maps)?;
        if overlap > 0 {
            warn!(
                "{} samples on the {} surface fall inside more than one seed region",
                overlap, tag
            );
        }

        let combined_nii = stage.path().join(format!("{}_combined.nii", tag));
        write_map_as_nifti(&combined_nii, &combined)?;
        let mut combined_metric = stage.path().join(format!("{}_combined.func.gii", tag));
        wb.run(&[
            String::from("-metric-convert"),
            String::from("-from-nifti"),
            lossy(&combined_nii),
            lossy(surface),
            lossy(&combined_metric),
        ])?;

        if let Some(mm) = request.dilate_mm {
            let dilated = stage.path().join(format!("{}_dilated.func.gii", tag));
            wb.run(&[
                String::from("-metric-dilate"),
                lossy(&combined_metric),
                lossy(surface),
                mm.to_string(),
                lossy(&dilated),
                String::from("-nearest"),
            ])?;
            combined_metric = dilated;
        }

        metric_args.push(String::from(flag));
        metric_args.push(lossy(&combined_metric));
    }

    if settings.dry_run {
        info!("dry run, stopping before map combination");
        return Ok(());
    }

    let mut final_args = vec![
        String::from("-cifti-create-dense-scalar"),
        lossy(&request.output),
    ];
    final_args.extend(metric_args);
    wb.run(&final_args)?;
    info!("wrote {}", request.output.display());
    Ok(())
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
