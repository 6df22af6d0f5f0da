//! Loaders that turn any supported input into one `(samples x observations)`
//! array.
//!
//! Volumetric NIfTI files are read directly. GIfTI metrics and CIfTI
//! grayordinate files are first converted by wb_command into NIfTI files in
//! a temporary staging directory and then read back through the same code
//! path, so every format converges on the same numeric container and the
//! extractor never sees a format detail.

use std::cell::Cell;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::bufread::GzDecoder;
use ndarray::{Array1, Array2, Array3, ArrayD, Axis};
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiObject};
use tempfile::TempDir;

use crate::error::{MeantsError, Result};
use crate::format::{FileKind, Hemisphere};
use crate::wb::WorkbenchRunner;

/// Check whether the file extension ends with ".gz".
fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Read a volumetric NIfTI file as a `(samples x timepoints)` array.
///
/// Voxels are flattened x-fastest, so `s = i + nx * (j + ny * k)`; the
/// fourth dimension (1 when absent) becomes the observation axis. Files
/// produced by wb_command conversions arrive here shaped `(S, 1, 1, T)` and
/// fall out of the same arithmetic.
pub fn load_nifti_timeseries<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let gz = is_gz_file(&path);
    let file = BufReader::new(File::open(&path)?);
    let obj: InMemNiftiObject = if gz {
        InMemNiftiObject::from_reader(GzDecoder::new(file))?
    } else {
        InMemNiftiObject::from_reader(file)?
    };
    let volume = obj.into_volume();
    let array: ArrayD<f64> = volume.into_ndarray()?;
    flatten_samples(array)
}

/// Write a one-column sample map as a `(S, 1, 1)` NIfTI volume, the shape
/// wb_command expects when converting back to a surface metric.
pub fn write_map_as_nifti<P: AsRef<Path>>(path: P, map: &Array1<f64>) -> Result<()> {
    let volume: Array3<f64> = map
        .view()
        .insert_axis(Axis(1))
        .insert_axis(Axis(2))
        .to_owned();
    nifti::writer::WriterOptions::new(path.as_ref()).write_nifti(&volume)?;
    Ok(())
}

/// Reshape an `(x, y, z, t, ...)` volume into `(x*y*z, t*...)`, voxels
/// x-fastest within a sample column.
fn flatten_samples(array: ArrayD<f64>) -> Result<Array2<f64>> {
    let shape = array.shape().to_vec();
    let ndim = shape.len();
    if ndim == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    let nx = shape[0];
    let ny = if ndim > 1 { shape[1] } else { 1 };
    let nz = if ndim > 2 { shape[2] } else { 1 };
    let nt: usize = shape.iter().skip(3).product();
    let samples = nx * ny * nz;

    let mut out = Array2::<f64>::zeros((samples, nt));
    let mut idx = vec![0usize; ndim];
    for t in 0..nt {
        let mut rem = t;
        for d in 3..ndim {
            idx[d] = rem % shape[d];
            rem /= shape[d];
        }
        for k in 0..nz {
            if ndim > 2 {
                idx[2] = k;
            }
            for j in 0..ny {
                if ndim > 1 {
                    idx[1] = j;
                }
                for i in 0..nx {
                    idx[0] = i;
                    out[(i + nx * (j + ny * k), t)] = array[idx.as_slice()];
                }
            }
        }
    }
    Ok(out)
}

/// Loads series arrays, staging any format conversion through the given
/// workbench runner. The staging directory lives as long as the loader and
/// is removed with it.
pub struct SeriesLoader<'a> {
    wb: &'a dyn WorkbenchRunner,
    stage: TempDir,
    next: Cell<usize>,
}

impl<'a> SeriesLoader<'a> {
    /// Create a loader with a fresh staging directory.
    pub fn new(wb: &'a dyn WorkbenchRunner) -> Result<SeriesLoader<'a>> {
        let stage = tempfile::Builder::new().prefix("meants-stage").tempdir()?;
        Ok(SeriesLoader {
            wb,
            stage,
            next: Cell::new(0),
        })
    }

    /// Load any supported input as a `(samples x observations)` array.
    pub fn load(&self, path: &Path, kind: FileKind) -> Result<Array2<f64>> {
        match kind {
            FileKind::Nifti => load_nifti_timeseries(path),
            FileKind::Gifti => self.load_gifti(path),
            FileKind::Cifti => self.load_cifti(path),
        }
    }

    /// Pull one hemisphere's cortex metric out of a cifti file and load it.
    pub fn load_cifti_hemisphere(&self, path: &Path, hemi: Hemisphere) -> Result<Array2<f64>> {
        let metric = self.staged(".func.gii");
        self.wb.run(&[
            String::from("-cifti-separate"),
            lossy(path),
            String::from("COLUMN"),
            String::from("-metric"),
            String::from(hemi.cortex_structure()),
            lossy(&metric),
        ])?;
        self.load_gifti(&metric)
    }

    /// Load only the surface part of a cifti file: both cortex metrics,
    /// left hemisphere vertices above right.
    pub fn load_cifti_surface(&self, path: &Path) -> Result<Array2<f64>> {
        let left = self.load_cifti_hemisphere(path, Hemisphere::Left)?;
        let right = self.load_cifti_hemisphere(path, Hemisphere::Right)?;
        if left.ncols() != right.ncols() {
            return Err(MeantsError::ShapeMismatch(
                "right cortex",
                left.ncols(),
                right.ncols(),
            ));
        }
        ndarray::concatenate(Axis(0), &[left.view(), right.view()]).map_err(|_| {
            MeantsError::ShapeMismatch("surface concatenation", left.nrows(), right.nrows())
        })
    }

    fn load_gifti(&self, path: &Path) -> Result<Array2<f64>> {
        let staged = self.staged(".nii");
        self.wb.run(&[
            String::from("-metric-convert"),
            String::from("-to-nifti"),
            lossy(path),
            lossy(&staged),
        ])?;
        load_nifti_timeseries(&staged)
    }

    fn load_cifti(&self, path: &Path) -> Result<Array2<f64>> {
        let staged = self.staged(".nii");
        self.wb.run(&[
            String::from("-cifti-convert"),
            String::from("-to-nifti"),
            lossy(path),
            lossy(&staged),
        ])?;
        load_nifti_timeseries(&staged)
    }

    fn staged(&self, suffix: &str) -> PathBuf {
        let n = self.next.get();
        self.next.set(n + 1);
        self.stage.path().join(format!("stage_{:02}{}", n, suffix))
    }
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
