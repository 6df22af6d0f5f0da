//! The ROI mean-time-series extractor.
//!
//! Given a functional data array and a seed array that assigns a numeric
//! label to each sample (voxel, vertex or grayordinate), this module computes
//! one mean time-series row per distinct non-zero label. The label 0 is
//! reserved as background and never aggregated. All inputs are plain
//! `(samples x observations)` arrays; file formats are resolved by the
//! loaders before this code runs.

use ndarray::{Array1, Array2, Axis};
use ndarray_stats::SummaryStatisticsExt;
use tracing::warn;

use crate::error::{MeantsError, Result};

/// Settings for a single extraction run, passed explicitly by the caller.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Restrict the output to this single seed label.
    pub roi_label: Option<f64>,
    /// Collapse everything to one row: the seed-weighted average of the
    /// functional data over the sample axis.
    pub weighted: bool,
}

/// Result of an extraction: one mean time-series row per seed label, with
/// the labels in the same row order. In weighted mode there is exactly one
/// row and the label list is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiMeans {
    pub means: Array2<f64>,
    pub labels: Vec<f64>,
}

/// Collect the distinct non-zero values of a seed column, ascending.
pub fn distinct_nonzero_labels(seed: &Array1<f64>) -> Vec<f64> {
    let mut labels: Vec<f64> = seed.iter().copied().filter(|v| *v != 0.0).collect();
    labels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    labels.dedup();
    labels
}

/// Reduce a seed array to its label column. Seed inputs with more than one
/// observation column collapse to the first column; this is worth a notice
/// but does not block execution.
fn seed_column(seed: &Array2<f64>) -> Array1<f64> {
    if seed.ncols() > 1 {
        warn!(
            "seed input has {} observation columns, using the first",
            seed.ncols()
        );
    }
    seed.column(0).to_owned()
}

/// Compute one mean time-series row per distinct non-zero seed label.
///
/// `func` is the functional data, shaped `(samples, timepoints)`. `seed`
/// assigns a label to each sample; `mask`, when given, zeroes out seed
/// labels outside its non-zero support. The sample axes of all three arrays
/// must agree exactly.
///
/// A mask that removes every member sample of a label is a data-quality
/// error ([`MeantsError::LabelFullyMasked`]), not a recoverable condition.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use meants::{roi_mean_timeseries, ExtractOptions};
///
/// let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
/// let seed = array![[0.0], [1.0], [1.0]];
/// let out = roi_mean_timeseries(&func, &seed, None, &ExtractOptions::default()).unwrap();
/// assert_eq!(out.labels, vec![1.0]);
/// assert_eq!(out.means, array![[4.0, 5.0]]);
/// ```
pub fn roi_mean_timeseries(
    func: &Array2<f64>,
    seed: &Array2<f64>,
    mask: Option<&Array2<f64>>,
    options: &ExtractOptions,
) -> Result<RoiMeans> {
    if func.nrows() != seed.nrows() {
        return Err(MeantsError::ShapeMismatch(
            "seed",
            func.nrows(),
            seed.nrows(),
        ));
    }

    let seed_col = seed_column(seed);

    let masked = match mask {
        Some(mask) => {
            if seed.nrows() != mask.nrows() {
                return Err(MeantsError::ShapeMismatch(
                    "mask",
                    seed.nrows(),
                    mask.nrows(),
                ));
            }
            let before = distinct_nonzero_labels(&seed_col).len();
            let masked = &seed_col * &mask.column(0);
            let after = distinct_nonzero_labels(&masked).len();
            if after < before {
                return Err(MeantsError::LabelFullyMasked(before, after));
            }
            masked
        }
        None => seed_col.clone(),
    };

    if options.weighted {
        // Weights are the seed values as loaded, not the masked ones.
        let row = func
            .weighted_mean_axis(Axis(0), &seed_col)
            .map_err(|_| MeantsError::ShapeMismatch("weights", func.nrows(), seed_col.len()))?;
        return Ok(RoiMeans {
            means: row.insert_axis(Axis(0)),
            labels: Vec::new(),
        });
    }

    let labels = match options.roi_label {
        Some(wanted) => {
            if !distinct_nonzero_labels(&masked).contains(&wanted) {
                return Err(MeantsError::UnknownLabel(wanted));
            }
            vec![wanted]
        }
        None => distinct_nonzero_labels(&masked),
    };

    let mut means = Array2::<f64>::zeros((labels.len(), func.ncols()));
    for (out_row, &label) in labels.iter().enumerate() {
        let members: Vec<usize> = masked
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == label)
            .map(|(idx, _)| idx)
            .collect();
        let subset = func.select(Axis(0), &members);
        // mean_axis only returns None for a zero-length axis, which cannot
        // happen for labels drawn from the masked seed itself.
        let row = subset
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::from_elem(func.ncols(), f64::NAN));
        means.row_mut(out_row).assign(&row);
    }

    Ok(RoiMeans { means, labels })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn the_mean_row_is_computed_per_label_and_zero_is_excluded() {
        let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let seed = array![[0.0], [1.0], [1.0]];

        let out = roi_mean_timeseries(&func, &seed, None, &ExtractOptions::default()).unwrap();

        assert_eq!(out.labels, vec![1.0]);
        assert_abs_diff_eq!(out.means, array![[4.0, 5.0]], epsilon = 1e-12);
    }

    #[test]
    fn rows_are_ordered_by_ascending_label_value() {
        let func = array![[10.0], [20.0], [30.0], [40.0]];
        let seed = array![[7.0], [2.0], [7.0], [2.0]];

        let out = roi_mean_timeseries(&func, &seed, None, &ExtractOptions::default()).unwrap();

        assert_eq!(out.labels, vec![2.0, 7.0]);
        assert_abs_diff_eq!(out.means, array![[30.0], [20.0]], epsilon = 1e-12);
    }

    #[test]
    fn sample_axis_mismatch_is_rejected() {
        let func = array![[1.0], [2.0]];
        let seed = array![[1.0], [1.0], [1.0]];

        let res = roi_mean_timeseries(&func, &seed, None, &ExtractOptions::default());
        assert!(matches!(res, Err(MeantsError::ShapeMismatch(..))));
    }

    #[test]
    fn mask_axis_mismatch_is_rejected() {
        let func = array![[1.0], [2.0]];
        let seed = array![[1.0], [1.0]];
        let mask = array![[1.0]];

        let res = roi_mean_timeseries(&func, &seed, Some(&mask), &ExtractOptions::default());
        assert!(matches!(res, Err(MeantsError::ShapeMismatch(..))));
    }

    #[test]
    fn a_fully_masked_label_is_a_data_quality_error() {
        let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let seed = array![[1.0], [2.0], [1.0]];
        let mask = array![[1.0], [0.0], [1.0]];

        let res = roi_mean_timeseries(&func, &seed, Some(&mask), &ExtractOptions::default());
        assert!(matches!(res, Err(MeantsError::LabelFullyMasked(2, 1))));
    }

    #[test]
    fn a_mask_covering_every_label_restricts_the_member_samples() {
        let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let seed = array![[1.0], [1.0], [2.0]];
        let mask = array![[1.0], [0.0], [1.0]];

        let out =
            roi_mean_timeseries(&func, &seed, Some(&mask), &ExtractOptions::default()).unwrap();

        // Label 1 keeps only its first sample, label 2 is untouched.
        assert_eq!(out.labels, vec![1.0, 2.0]);
        assert_abs_diff_eq!(out.means, array![[1.0, 2.0], [5.0, 6.0]], epsilon = 1e-12);
    }

    #[test]
    fn an_all_ones_mask_changes_nothing() {
        let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]];
        let seed = array![[3.0], [0.0], [3.0], [5.0]];
        let mask = array![[1.0], [1.0], [1.0], [1.0]];

        let unmasked =
            roi_mean_timeseries(&func, &seed, None, &ExtractOptions::default()).unwrap();
        let masked =
            roi_mean_timeseries(&func, &seed, Some(&mask), &ExtractOptions::default()).unwrap();

        assert_eq!(unmasked.labels, masked.labels);
        assert_abs_diff_eq!(unmasked.means, masked.means, epsilon = 1e-12);
    }

    #[test]
    fn an_unknown_single_label_is_rejected() {
        let func = array![[1.0], [2.0]];
        let seed = array![[1.0], [2.0]];
        let options = ExtractOptions {
            roi_label: Some(9.0),
            ..Default::default()
        };

        let res = roi_mean_timeseries(&func, &seed, None, &options);
        assert!(matches!(res, Err(MeantsError::UnknownLabel(l)) if l == 9.0));
    }

    #[test]
    fn a_single_label_request_restricts_the_output() {
        let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let seed = array![[1.0], [2.0], [2.0]];
        let options = ExtractOptions {
            roi_label: Some(2.0),
            ..Default::default()
        };

        let out = roi_mean_timeseries(&func, &seed, None, &options).unwrap();

        assert_eq!(out.labels, vec![2.0]);
        assert_abs_diff_eq!(out.means, array![[4.0, 5.0]], epsilon = 1e-12);
    }

    #[test]
    fn weighted_mode_always_collapses_to_one_row() {
        let func = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let seed = array![[0.0], [1.0], [3.0]];
        let options = ExtractOptions {
            weighted: true,
            ..Default::default()
        };

        let out = roi_mean_timeseries(&func, &seed, None, &options).unwrap();

        assert_eq!(out.means.nrows(), 1);
        assert!(out.labels.is_empty());
        // (1*3 + 3*5) / 4 and (1*4 + 3*6) / 4
        assert_abs_diff_eq!(out.means, array![[4.5, 5.5]], epsilon = 1e-12);
    }

    #[test]
    fn a_multi_column_seed_collapses_to_its_first_column() {
        let func = array![[1.0], [3.0], [5.0]];
        let seed = array![[0.0, 9.0], [1.0, 9.0], [1.0, 9.0]];

        let out = roi_mean_timeseries(&func, &seed, None, &ExtractOptions::default()).unwrap();

        assert_eq!(out.labels, vec![1.0]);
        assert_abs_diff_eq!(out.means, array![[4.0]], epsilon = 1e-12);
    }

    #[test]
    fn distinct_labels_are_sorted_and_deduplicated() {
        let seed = array![4.0, 0.0, 2.0, 4.0, 2.0, 0.0];
        assert_eq!(distinct_nonzero_labels(&seed), vec![2.0, 4.0]);
    }
}
