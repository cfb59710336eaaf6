//! Output tables and where they are written

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::error::{Result, SlatError};

/// One table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Number(v) => format_value(*v),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

/// A labeled table produced by one recorder run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Numeric values of one column, skipping text cells
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.get(index).and_then(Cell::as_f64))
            .collect()
    }

    pub fn write_to(&self, out: &mut dyn Write, style: &TableStyle) -> Result<()> {
        match style.format {
            TableFormat::Text => self.write_text(out, style.width),
            TableFormat::Csv => self.write_csv(out),
            TableFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, self)?;
                writeln!(out)?;
                Ok(())
            }
        }
    }

    fn write_text(&self, out: &mut dyn Write, width: usize) -> Result<()> {
        let line = |cells: Vec<String>| -> String {
            cells.iter().map(|c| justify(c, width)).collect::<String>()
        };
        if !self.header.is_empty() {
            writeln!(out, "{}", line(self.header.clone()))?;
        }
        for row in &self.rows {
            writeln!(out, "{}", line(row.iter().map(Cell::render).collect()))?;
        }
        Ok(())
    }

    fn write_csv(&self, out: &mut dyn Write) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        if !self.header.is_empty() {
            writer.write_record(&self.header)?;
        }
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Right-justify to `width`, keeping one separating space for long cells
fn justify(s: &str, width: usize) -> String {
    if s.chars().count() >= width {
        format!(" {}", s)
    } else {
        format!("{:>width$}", s, width = width)
    }
}

/// Format a value with six significant digits in general notation: fixed
/// point keeps at least one decimal, and exponents have a sign and at least
/// two digits.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    const PRECISION: i32 = 6;
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };

    if (-4..PRECISION).contains(&exponent) {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", decimals, v);
        let trimmed = if fixed.contains('.') {
            fixed.trim_end_matches('0').to_string()
        } else {
            fixed
        };
        if trimmed.ends_with('.') {
            format!("{}0", trimmed)
        } else if trimmed.contains('.') {
            trimmed
        } else {
            format!("{}.0", trimmed)
        }
    } else {
        let mantissa = if mantissa.contains('.') {
            mantissa.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            mantissa
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Table encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Fixed-width, right-justified columns
    #[default]
    Text,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStyle {
    pub format: TableFormat,
    pub width: usize,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            format: TableFormat::Text,
            width: 15,
        }
    }
}

/// Where a recorder writes its table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    #[default]
    Console,
    File { path: PathBuf, append: bool },
}

impl Destination {
    /// Resolve a script file name: bare names land in `dir`, and a name
    /// without extension gets `.csv`
    pub fn file(name: &str, dir: &Path, append: bool) -> Self {
        Destination::File {
            path: resolve_path(name, dir, "csv"),
            append,
        }
    }

    /// Write `table` here. A file is opened for this write only and closed
    /// when the write finishes or fails.
    pub fn write_table(&self, table: &Table, style: &TableStyle, console: &mut dyn Write) -> Result<()> {
        match self {
            Destination::Console => {
                table.write_to(console, style)?;
                console.flush()?;
                Ok(())
            }
            Destination::File { path, append } => {
                let mut writer = open_output(path, *append)?;
                table.write_to(&mut writer, style)?;
                writer.flush().map_err(|e| SlatError::io(path, e))
            }
        }
    }
}

/// Open a file for writing, truncating unless `append`
pub fn open_output(path: &Path, append: bool) -> Result<BufWriter<std::fs::File>> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| SlatError::io(path, e))?;
    Ok(BufWriter::new(file))
}

/// Place a bare file name under `dir` and default its extension
pub fn resolve_path(name: &str, dir: &Path, extension: &str) -> PathBuf {
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension(extension);
    }
    let bare = path
        .parent()
        .map_or(true, |p| p.as_os_str().is_empty());
    if bare && !path.is_absolute() {
        dir.join(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Table {
        let mut t = Table::new(vec!["IM_1".into(), "lambda".into()]);
        t.push(vec![0.0.into(), 0.0.into()]);
        t.push(vec![1.0.into(), 10.0.into()]);
        t
    }

    #[test]
    fn test_format_value_general_notation() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(10.0), "10.0");
        assert_eq!(format_value(1e-5), "1e-05");
        assert_eq!(format_value(123456789.0), "1.23457e+08");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(0.000123), "0.000123");
        assert_eq!(format_value(123456.0), "123456.0");
        assert_eq!(format_value(-2.5e-7), "-2.5e-07");
        assert_eq!(format_value(f64::NAN), "nan");
        assert_eq!(format_value(1.0 / 3.0), "0.333333");
    }

    #[test]
    fn test_text_columns_are_right_justified() {
        let mut out = Vec::new();
        sample().write_to(&mut out, &TableStyle::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{:>15}{:>15}", "IM_1", "lambda"));
        assert_eq!(lines[2], format!("{:>15}{:>15}", "1.0", "10.0"));
    }

    #[test]
    fn test_long_cells_stay_separated() {
        assert_eq!(justify("a_very_long_header", 5), " a_very_long_header");
    }

    #[test]
    fn test_csv_and_json_encodings() {
        let mut csv_out = Vec::new();
        let style = TableStyle {
            format: TableFormat::Csv,
            width: 15,
        };
        sample().write_to(&mut csv_out, &style).unwrap();
        assert_eq!(String::from_utf8(csv_out).unwrap(), "IM_1,lambda\n0.0,0.0\n1.0,10.0\n");

        let mut json_out = Vec::new();
        let style = TableStyle {
            format: TableFormat::Json,
            width: 15,
        };
        sample().write_to(&mut json_out, &style).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json_out).unwrap();
        assert_eq!(parsed["header"][1], "lambda");
        assert_eq!(parsed["rows"][1][1], 10.0);
    }

    #[test]
    fn test_resolve_path() {
        let dir = Path::new("/tmp/out");
        assert_eq!(resolve_path("imrate", dir, "csv"), PathBuf::from("/tmp/out/imrate.csv"));
        assert_eq!(resolve_path("r.txt", dir, "csv"), PathBuf::from("/tmp/out/r.txt"));
        assert_eq!(resolve_path("sub/r", dir, "csv"), PathBuf::from("sub/r.csv"));
    }

    #[test]
    fn test_file_truncate_versus_append() {
        let tmp = TempDir::new().unwrap();
        let style = TableStyle::default();
        let mut console = Vec::new();

        let truncate = Destination::file("out.csv", tmp.path(), false);
        truncate.write_table(&sample(), &style, &mut console).unwrap();
        truncate.write_table(&sample(), &style, &mut console).unwrap();
        let once = fs::read_to_string(tmp.path().join("out.csv")).unwrap();
        assert_eq!(once.lines().count(), 3);

        let append = Destination::file("out.csv", tmp.path(), true);
        append.write_table(&sample(), &style, &mut console).unwrap();
        let twice = fs::read_to_string(tmp.path().join("out.csv")).unwrap();
        assert_eq!(twice.lines().count(), 6);
        assert!(twice.starts_with(&once));
        assert!(console.is_empty());
    }
}
