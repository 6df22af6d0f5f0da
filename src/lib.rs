//! Extraction of regional mean time-series and region-of-interest maps from
//! volumetric (NIfTI), surface (GIfTI) and grayordinate (CIfTI) neuroimaging
//! data.
//!
//! The computationally heavy surface and volume operations are delegated to
//! the external Connectome Workbench binary (`wb_command`); this crate
//! contributes the format dispatch, the temporary-file staging around the
//! delegated conversions, and the numeric reductions over the loaded
//! arrays.

pub mod error;
pub mod extract;
pub mod format;
pub mod loader;
pub mod rois;
pub mod table;
pub mod wb;

pub use error::{MeantsError, Result};
pub use extract::{distinct_nonzero_labels, roi_mean_timeseries, ExtractOptions, RoiMeans};
pub use format::{
    check_compatible, default_output_path, determine_filetype, FileKind, Hemisphere,
};
pub use loader::{load_nifti_timeseries, SeriesLoader};
pub use rois::{build_surface_rois, combine_labelled_rois, SurfaceRoisRequest};
pub use wb::{find_wb_command, RunSettings, Workbench, WorkbenchRunner};
