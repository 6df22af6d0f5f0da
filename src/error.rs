use quick_error::quick_error;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum MeantsError {
        /// The sample axes of two input arrays disagree in length.
        ShapeMismatch(what: &'static str, expected: usize, found: usize) {
            display("Sample axis mismatch for {}: expected {} samples, found {}", what, expected, found)
        }

        /// Masking removed every member sample of at least one seed label.
        LabelFullyMasked(before: usize, after: usize) {
            display("Mask eliminated all samples of at least one seed label ({} labels before masking, {} after)", before, after)
        }

        /// A requested single label does not occur in the seed data.
        UnknownLabel(label: f64) {
            display("Label {} not found in the seed data", label)
        }

        /// Functional, seed and mask inputs are of incompatible file kinds.
        UnsupportedFormatCombination(detail: String) {
            display("Incompatible input formats: {}", detail)
        }

        /// A path whose extension matches no supported file kind.
        UnsupportedFileFormat(path: PathBuf) {
            display("Unrecognized neuroimaging file format: {}", path.display())
        }

        /// A delegated wb_command invocation exited non-zero.
        ExternalToolFailure(cmdline: String, detail: String) {
            display("External command failed: {} ({})", cmdline, detail)
        }

        /// wb_command is required for the requested inputs but was not found.
        WorkbenchNotFound {
            display("wb_command not found. Please check that Connectome Workbench is installed and on the PATH, or set WB_COMMAND.")
        }

        /// A seed-vertex table with no usable rows.
        EmptyRoiTable(path: PathBuf) {
            display("No seed vertices found in {}", path.display())
        }

        /// A delimited table lacks a required column.
        MissingColumn(name: &'static str) {
            display("Table is missing the required '{}' column", name)
        }

        /// A delimited table row that does not parse.
        InvalidTableRow(row: usize, detail: String) {
            display("Invalid table row {}: {}", row, detail)
        }

        /// NIfTI read/write error.
        Nifti(err: nifti::NiftiError) {
            from()
            source(err)
        }

        /// Delimited table error.
        Csv(err: csv::Error) {
            from()
            source(err)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, MeantsError>;
