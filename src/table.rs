//! Delimited text artifacts.
//!
//! The extractor's outputs are plain comma-separated tables: the mean
//! time-series matrix (one row per label, one column per time point, no
//! header) and optionally the list of numeric labels in the same row order.
//! The matching readers exist so the artifacts round-trip.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::Array2;

use crate::error::{MeantsError, Result};

/// Write a matrix as comma-separated text, no header.
pub fn write_matrix<P: AsRef<Path>>(path: P, matrix: &Array2<f64>) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;
    for row in matrix.rows() {
        let record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a comma-separated matrix written by [`write_matrix`].
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;

    let mut values: Vec<f64> = Vec::new();
    let mut ncols = 0;
    let mut nrows = 0;
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        ncols = record.len();
        nrows += 1;
        for field in record.iter() {
            let value: f64 = field
                .parse()
                .map_err(|_| MeantsError::InvalidTableRow(row + 1, format!("'{}'", field)))?;
            values.push(value);
        }
    }

    Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|_| MeantsError::ShapeMismatch("table", nrows, ncols))
}

/// Write the label list, one numeric label per line. Integral labels render
/// without a fractional part.
pub fn write_labels<P: AsRef<Path>>(path: P, labels: &[f64]) -> Result<()> {
    let mut text = String::new();
    for label in labels {
        text.push_str(&label.to_string());
        text.push('\n');
    }
    fs::write(path.as_ref(), text)?;
    Ok(())
}

/// Read a label list written by [`write_labels`].
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path.as_ref())?;
    let mut labels = Vec::new();
    for (row, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let label: f64 = line
            .parse()
            .map_err(|_| MeantsError::InvalidTableRow(row + 1, format!("'{}'", line)))?;
        labels.push(label);
    }
    Ok(labels)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn matrices_round_trip_through_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meants.csv");
        let matrix = array![[1.0, 2.5, -3.125], [4.0, 0.1, 6.0]];

        write_matrix(&path, &matrix).unwrap();
        let back = read_matrix(&path).unwrap();

        assert_abs_diff_eq!(matrix, back, epsilon = 1e-12);
    }

    #[test]
    fn the_written_table_has_no_header_and_comma_separators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meants.csv");

        write_matrix(&path, &array![[4.0, 5.0]]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "4,5");
    }

    #[test]
    fn labels_round_trip_and_integral_labels_render_without_fraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let labels = vec![1.0, 2.0, 7.5];

        write_labels(&path, &labels).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1\n2\n7.5\n");
        assert_eq!(read_labels(&path).unwrap(), labels);
    }

    #[test]
    fn an_unparseable_field_is_reported_with_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meants.csv");
        fs::write(&path, "1,2\n3,oops\n").unwrap();

        let res = read_matrix(&path);
        assert!(matches!(res, Err(MeantsError::InvalidTableRow(2, _))));
    }
}
