//! Dataset ingestion: approximate the sample count of an uploaded CSV.
//!
//! The count is the number of non-blank lines minus one header line, floored
//! at 1. No delimiter detection, no quoting support, no schema validation —
//! the file only needs to be readable as text.

use anyhow::{Context, Result};
use std::path::Path;

/// Count data rows in a newline-delimited text file.
pub fn count_samples(path: &Path) -> Result<u64> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file {}", path.display()))?;
    Ok(count_data_rows(&text))
}

/// Count non-blank lines, treating the first as a header.
pub fn count_data_rows(text: &str) -> u64 {
    let non_blank = text.lines().filter(|line| !line.trim().is_empty()).count();
    non_blank.saturating_sub(1).max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn header_is_excluded() {
        assert_eq!(count_data_rows("a,b,c\n1,2,3\n4,5,6\n"), 2);
    }

    #[test]
    fn single_line_floors_at_one() {
        assert_eq!(count_data_rows("a,b,c"), 1);
    }

    #[test]
    fn empty_input_floors_at_one() {
        assert_eq!(count_data_rows(""), 1);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(count_data_rows("a,b\n\n1,2\n   \n3,4\n\n"), 2);
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(count_data_rows("a,b\r\n1,2\r\n3,4\r\n"), 2);
    }

    #[test]
    fn reads_from_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "flux,period\n0.1,3.2\n0.2,4.1\n0.3,5.0\n").unwrap();
        assert_eq!(count_samples(f.path()).unwrap(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(count_samples(Path::new("/nonexistent/light_curves.csv")).is_err());
    }
}
