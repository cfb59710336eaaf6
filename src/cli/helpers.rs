//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::GlobalOpts;
use crate::core::Config;

/// Expand the given paths into script files
///
/// Files are taken as given. Directories are walked recursively for
/// `*.yaml`/`*.yml` files, skipping hidden entries and the local config
/// file, in sorted order.
pub fn collect_scripts(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            {
                let entry = entry.into_diagnostic()?;
                if entry.file_type().is_file() && is_script(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            scripts.extend(found);
        } else if path.exists() {
            scripts.push(path.clone());
        } else {
            return Err(miette::miette!("No such file or directory: {}", path.display()));
        }
    }
    Ok(scripts)
}

fn is_script(path: &Path) -> bool {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let is_config = path
        .file_name()
        .is_some_and(|n| n == crate::core::config::LOCAL_CONFIG_FILE);
    is_yaml && !is_config
}

/// Overrides a command can apply on top of the loaded configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub width: Option<usize>,
    pub tolerance: Option<f64>,
}

/// Load the layered configuration and apply CLI flags last
pub fn load_config(global: &GlobalOpts, overrides: &ConfigOverrides) -> Config {
    let mut config = Config::load();
    apply_overrides(&mut config, global, overrides);
    config
}

fn apply_overrides(config: &mut Config, global: &GlobalOpts, overrides: &ConfigOverrides) {
    if let Some(format) = global.format.table_format() {
        config.format = Some(format);
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(dir) = &overrides.input_dir {
        config.input_dir = Some(dir.clone());
    }
    if let Some(width) = overrides.width {
        config.column_width = Some(width);
    }
    if let Some(tolerance) = overrides.tolerance {
        config.integration.tolerance = Some(tolerance);
    }
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::recorder::TableFormat;
    use std::fs;
    use tempfile::TempDir;

    fn global(format: OutputFormat) -> GlobalOpts {
        GlobalOpts {
            format,
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("this is a long string", 10), "this is...");
        assert_eq!(truncate_str("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("has,comma"), "\"has,comma\"");
        assert_eq!(escape_csv("has\"quote"), "\"has\"\"quote\"");
        assert_eq!(escape_csv("has\nnewline"), "\"has\nnewline\"");
    }

    #[test]
    fn test_collect_scripts_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("b");
        fs::create_dir(&nested).unwrap();
        fs::write(tmp.path().join("c.yaml"), "").unwrap();
        fs::write(tmp.path().join("a.yml"), "").unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();
        fs::write(tmp.path().join("slat.config.yaml"), "").unwrap();
        fs::write(nested.join("d.yaml"), "").unwrap();

        let scripts = collect_scripts(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<String> = scripts
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.yml", "b/d.yaml", "c.yaml"]);
    }

    #[test]
    fn test_collect_scripts_missing_path() {
        assert!(collect_scripts(&[PathBuf::from("/nonexistent/slat/run.yaml")]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.column_width = Some(20);
        let overrides = ConfigOverrides {
            width: Some(12),
            tolerance: Some(1e-3),
            ..Default::default()
        };
        apply_overrides(&mut config, &global(OutputFormat::Csv), &overrides);
        let style = config.table_style();
        assert_eq!(style.width, 12);
        assert_eq!(style.format, TableFormat::Csv);
        assert_eq!(config.integration().tolerance, 1e-3);
    }

    #[test]
    fn test_auto_format_keeps_config() {
        let mut config = Config::default();
        config.format = Some(TableFormat::Json);
        apply_overrides(&mut config, &global(OutputFormat::Auto), &ConfigOverrides::default());
        assert_eq!(config.table_style().format, TableFormat::Json);
    }
}
