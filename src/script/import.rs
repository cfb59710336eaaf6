//! Importers for legacy data tables
//!
//! Both formats start with two header lines, followed by rows of numbers
//! separated by whitespace or commas.

use std::path::Path;
use std::rc::Rc;
use tracing::debug;

use crate::core::error::{Result, SlatError};
use crate::entities::detfn::DetFn;
use crate::entities::im::IntensityMeasure;
use crate::entities::probfn::ProbFn;
use crate::math::lognormal::{MuType, SigmaType};

const HEADER_LINES: usize = 2;

/// Read the numeric rows of a table file
pub fn read_table(path: &Path) -> Result<Vec<Vec<f64>>> {
    let contents = std::fs::read_to_string(path).map_err(|e| SlatError::io(path, e))?;
    parse_table(&contents, &path.display().to_string())
}

fn parse_table(contents: &str, name: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (n, line) in contents.lines().enumerate().skip(HEADER_LINES) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>().map_err(|_| {
                    SlatError::invalid(format!("number on line {} of {}", n + 1, name), s, &["a number"])
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    if let Some(first) = rows.first() {
        let width = first.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(SlatError::shape(format!("rows of {}", name), width, bad.len()));
        }
    }
    Ok(rows)
}

/// Build a demand function from an IDA table: each row is an IM level
/// followed by one response per record, where 0 marks a collapsed record.
/// The non-collapse responses give the mean and sample standard deviation at
/// that level, and a point at (0, 0) anchors the curves.
pub fn import_probfn(id: &str, path: &Path) -> Result<ProbFn> {
    let rows = read_table(path)?;
    if rows.first().map_or(true, |r| r.len() < 2) {
        return Err(SlatError::domain(format!(
            "{} needs at least one row with an IM level and a response",
            path.display()
        )));
    }

    let mut x = vec![0.0];
    let mut mean = vec![0.0];
    let mut sd = vec![0.0];
    for row in &rows {
        let responses: Vec<f64> = row[1..].iter().copied().filter(|v| *v != 0.0).collect();
        let collapsed = row.len() - 1 - responses.len();
        let (m, s) = sample_moments(&responses);
        debug!(im = row[0], collapsed, mean = m, sd = s, "imported IDA level");
        x.push(row[0]);
        mean.push(m);
        sd.push(s);
    }

    let mu_fn = DetFn::linear(None, x.clone(), mean)?;
    let sigma_fn = DetFn::linear(None, x, sd)?;
    Ok(ProbFn::new(
        id,
        MuType::MeanX,
        Rc::new(mu_fn),
        SigmaType::SdX,
        Rc::new(sigma_fn),
    ))
}

/// Mean and sample standard deviation; zero for fewer values than needed
fn sample_moments(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, var.sqrt())
}

/// Build an IM from a table of (IM level, annual exceedance rate) rows,
/// interpolated log-log
pub fn import_im(id: &str, path: &Path) -> Result<IntensityMeasure> {
    let rows = read_table(path)?;
    if rows.first().map_or(true, |r| r.len() < 2) {
        return Err(SlatError::domain(format!(
            "{} needs rows of IM level and rate",
            path.display()
        )));
    }
    let x = rows.iter().map(|r| r[0]).collect();
    let y = rows.iter().map(|r| r[1]).collect();
    Ok(IntensityMeasure::new(id, Rc::new(DetFn::loglog(None, x, y)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_headers_skipped_and_separators_mixed() {
        let rows = parse_table("title\ncolumns\n0.1 1e-2\n0.2,5e-3\n\n", "t").unwrap();
        assert_eq!(rows, vec![vec![0.1, 1e-2], vec![0.2, 5e-3]]);
    }

    #[test]
    fn test_bad_number_names_line() {
        let err = parse_table("a\nb\n0.1 x\n", "t").unwrap_err();
        match err {
            SlatError::InvalidValue { what, .. } => assert!(what.contains("line 3")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(matches!(
            parse_table("a\nb\n1 2 3\n4 5\n", "t"),
            Err(SlatError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_import_probfn_ignores_collapsed_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ida.txt");
        fs::write(&path, "IDA\nim r1 r2 r3\n0.5 0.01 0.03 0\n1.0 0.02 0.04 0.06\n").unwrap();
        let f = import_probfn("DEMAND", &path).unwrap();
        assert!((f.mean(0.5) - 0.02).abs() < 1e-12);
        let expected_sd = (0.0002f64).sqrt();
        assert!((f.sd(0.5) - expected_sd).abs() < 1e-9);
        assert!((f.mean(1.0) - 0.04).abs() < 1e-12);
        assert!((f.mean(0.75) - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_import_im_interpolates_log_log() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hazard.txt");
        fs::write(&path, "hazard\nim rate\n0.1 0.01\n1.0 0.0001\n").unwrap();
        let im = import_im("IM_1", &path).unwrap();
        assert!((im.lambda((0.1f64 * 1.0).sqrt()) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_table(Path::new("/nonexistent/slat/table.txt")),
            Err(SlatError::Io { .. })
        ));
    }
}
