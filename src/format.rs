//! File-kind dispatch for neuroimaging inputs.
//!
//! The supported formats are recognized purely by their (possibly multi-part)
//! file extensions: combined grayordinate CIfTI files, volumetric NIfTI
//! files, and surface GIfTI metric files. Everything downstream of this
//! module works on `(samples x observations)` arrays and never sees a file
//! extension again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MeantsError, Result};

/// The file kind of a functional, seed or mask input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Combined surface + volume grayordinate data (`.dtseries.nii`,
    /// `.dscalar.nii`, `.dlabel.nii`, `.ptseries.nii`).
    Cifti,
    /// Volumetric data (`.nii`, `.nii.gz`).
    Nifti,
    /// Surface metric data (`.func.gii`, `.shape.gii`, `.label.gii`, `.gii`).
    Gifti,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            FileKind::Cifti => "cifti",
            FileKind::Nifti => "nifti",
            FileKind::Gifti => "gifti",
        };
        write!(f, "{}", name)
    }
}

/// A cortical hemisphere, as selected on the command line with `--hemi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    /// The wb_command structure name for this hemisphere's cortex.
    pub fn cortex_structure(&self) -> &'static str {
        match self {
            Hemisphere::Left => "CORTEX_LEFT",
            Hemisphere::Right => "CORTEX_RIGHT",
        }
    }
}

impl FromStr for Hemisphere {
    type Err = String;

    fn from_str(s: &str) -> ::std::result::Result<Hemisphere, String> {
        match s {
            "L" | "l" => Ok(Hemisphere::Left),
            "R" | "r" => Ok(Hemisphere::Right),
            other => Err(format!("invalid hemisphere '{}', expected L or R", other)),
        }
    }
}

/// Known suffixes, most specific first: the multi-part CIfTI endings must be
/// tested before the plain `.nii` they share, and the metric GIfTI endings
/// before bare `.gii`.
const KNOWN_SUFFIXES: [(&str, FileKind); 10] = [
    (".dtseries.nii", FileKind::Cifti),
    (".dscalar.nii", FileKind::Cifti),
    (".dlabel.nii", FileKind::Cifti),
    (".ptseries.nii", FileKind::Cifti),
    (".nii.gz", FileKind::Nifti),
    (".nii", FileKind::Nifti),
    (".func.gii", FileKind::Gifti),
    (".shape.gii", FileKind::Gifti),
    (".label.gii", FileKind::Gifti),
    (".gii", FileKind::Gifti),
];

/// Determine the file kind of an input path from its extension.
///
/// # Examples
///
/// ```
/// use meants::format::{determine_filetype, FileKind};
///
/// let kind = determine_filetype("sub-01_task-rest.dtseries.nii").unwrap();
/// assert_eq!(kind, FileKind::Cifti);
/// ```
pub fn determine_filetype<P: AsRef<Path>>(path: P) -> Result<FileKind> {
    let name = file_name(path.as_ref())?;
    for (suffix, kind) in KNOWN_SUFFIXES {
        if name.ends_with(suffix) {
            return Ok(kind);
        }
    }
    Err(MeantsError::UnsupportedFileFormat(
        path.as_ref().to_path_buf(),
    ))
}

/// The file name of a path with its full known (multi-part) extension
/// removed. Used to derive default output names from the input paths.
pub fn strip_known_extension<P: AsRef<Path>>(path: P) -> Result<String> {
    let name = file_name(path.as_ref())?;
    for (suffix, _) in KNOWN_SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix) {
            return Ok(base.to_string());
        }
    }
    Err(MeantsError::UnsupportedFileFormat(
        path.as_ref().to_path_buf(),
    ))
}

/// The default matrix output path: `<func_base>_<seed_base>_meants.csv` in
/// the current working directory.
pub fn default_output_path<P: AsRef<Path>>(func: P, seed: P) -> Result<PathBuf> {
    let func_base = strip_known_extension(&func)?;
    let seed_base = strip_known_extension(&seed)?;
    Ok(PathBuf::from(format!(
        "{}_{}_meants.csv",
        func_base, seed_base
    )))
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MeantsError::UnsupportedFileFormat(path.to_path_buf()))
}

/// Enforce the precondition on the functional/seed/mask input combination.
///
/// Volumetric functional data requires a volumetric seed, surface data a
/// surface seed. A grayordinate functional input accepts a grayordinate
/// seed, or a surface seed when a hemisphere is selected (the matching
/// cortex is then pulled out of the cifti). The mask must always be of the
/// same kind as the seed.
pub fn check_compatible(
    func: FileKind,
    seed: FileKind,
    mask: Option<FileKind>,
    hemi: Option<Hemisphere>,
) -> Result<()> {
    match (func, seed) {
        (FileKind::Nifti, FileKind::Nifti)
        | (FileKind::Gifti, FileKind::Gifti)
        | (FileKind::Cifti, FileKind::Cifti) => {}
        (FileKind::Cifti, FileKind::Gifti) => {
            if hemi.is_none() {
                return Err(MeantsError::UnsupportedFormatCombination(String::from(
                    "a gifti seed against cifti functional data requires a hemisphere (--hemi)",
                )));
            }
        }
        (func, seed) => {
            return Err(MeantsError::UnsupportedFormatCombination(format!(
                "{} functional data cannot be combined with a {} seed",
                func, seed
            )));
        }
    }
    if let Some(mask) = mask {
        if mask != seed {
            return Err(MeantsError::UnsupportedFormatCombination(format!(
                "the mask must match the seed kind ({} mask against {} seed)",
                mask, seed
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_known_extension_maps_to_its_kind() {
        assert_eq!(
            determine_filetype("a.dtseries.nii").unwrap(),
            FileKind::Cifti
        );
        assert_eq!(
            determine_filetype("a.dscalar.nii").unwrap(),
            FileKind::Cifti
        );
        assert_eq!(determine_filetype("a.dlabel.nii").unwrap(), FileKind::Cifti);
        assert_eq!(
            determine_filetype("a.ptseries.nii").unwrap(),
            FileKind::Cifti
        );
        assert_eq!(determine_filetype("a.nii").unwrap(), FileKind::Nifti);
        assert_eq!(determine_filetype("a.nii.gz").unwrap(), FileKind::Nifti);
        assert_eq!(determine_filetype("a.func.gii").unwrap(), FileKind::Gifti);
        assert_eq!(determine_filetype("a.shape.gii").unwrap(), FileKind::Gifti);
        assert_eq!(determine_filetype("a.label.gii").unwrap(), FileKind::Gifti);
        assert_eq!(determine_filetype("a.gii").unwrap(), FileKind::Gifti);
    }

    #[test]
    fn an_unknown_extension_is_rejected() {
        let res = determine_filetype("scan.mgz");
        assert!(matches!(res, Err(MeantsError::UnsupportedFileFormat(_))));
    }

    #[test]
    fn the_full_multi_part_extension_is_stripped() {
        assert_eq!(
            strip_known_extension("/data/sub-01_rest.dtseries.nii").unwrap(),
            "sub-01_rest"
        );
        assert_eq!(strip_known_extension("seed.nii.gz").unwrap(), "seed");
        assert_eq!(strip_known_extension("lh.roi.func.gii").unwrap(), "lh.roi");
    }

    #[test]
    fn the_default_output_name_is_derived_from_both_inputs() {
        let out = default_output_path("func.dtseries.nii", "seed.dscalar.nii").unwrap();
        assert_eq!(out, PathBuf::from("func_seed_meants.csv"));
    }

    #[test]
    fn matching_kinds_are_compatible() {
        assert!(check_compatible(FileKind::Nifti, FileKind::Nifti, None, None).is_ok());
        assert!(check_compatible(FileKind::Gifti, FileKind::Gifti, None, None).is_ok());
        assert!(check_compatible(
            FileKind::Cifti,
            FileKind::Cifti,
            Some(FileKind::Cifti),
            None
        )
        .is_ok());
    }

    #[test]
    fn a_volume_seed_against_surface_data_is_rejected() {
        let res = check_compatible(FileKind::Gifti, FileKind::Nifti, None, None);
        assert!(matches!(
            res,
            Err(MeantsError::UnsupportedFormatCombination(_))
        ));
    }

    #[test]
    fn a_gifti_seed_against_cifti_data_requires_a_hemisphere() {
        let res = check_compatible(FileKind::Cifti, FileKind::Gifti, None, None);
        assert!(matches!(
            res,
            Err(MeantsError::UnsupportedFormatCombination(_))
        ));

        assert!(check_compatible(
            FileKind::Cifti,
            FileKind::Gifti,
            None,
            Some(Hemisphere::Left)
        )
        .is_ok());
    }

    #[test]
    fn a_mask_of_a_different_kind_than_the_seed_is_rejected() {
        let res = check_compatible(
            FileKind::Nifti,
            FileKind::Nifti,
            Some(FileKind::Gifti),
            None,
        );
        assert!(matches!(
            res,
            Err(MeantsError::UnsupportedFormatCombination(_))
        ));
    }

    #[test]
    fn hemispheres_parse_from_cli_letters() {
        assert_eq!("L".parse::<Hemisphere>().unwrap(), Hemisphere::Left);
        assert_eq!("r".parse::<Hemisphere>().unwrap(), Hemisphere::Right);
        assert!("X".parse::<Hemisphere>().is_err());
    }
}
