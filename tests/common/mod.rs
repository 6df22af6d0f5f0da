//! Common test utilities for meants integration tests

use ndarray::{Array2, Array4};
use std::path::Path;

/// Write a `(samples x timepoints)` series to disk as an `(S, 1, 1, T)`
/// NIfTI volume, the shape wb_command conversions produce.
pub fn write_series_nifti(path: &Path, series: &Array2<f64>) {
    let (s, t) = series.dim();
    let volume = Array4::from_shape_fn((s, 1, 1, t), |(i, _, _, j)| series[(i, j)]);
    nifti::writer::WriterOptions::new(path)
        .write_nifti(&volume)
        .unwrap();
}
