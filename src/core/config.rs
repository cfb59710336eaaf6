//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::math::integration::{IntegrationConfig, SearchMethod};
use crate::recorder::{TableFormat, TableStyle};

/// Name of the per-directory config file
pub const LOCAL_CONFIG_FILE: &str = "slat.config.yaml";

/// SLAT configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for recorder output files
    pub output_dir: Option<PathBuf>,

    /// Directory that import commands read from
    pub input_dir: Option<PathBuf>,

    /// Field width of text tables
    pub column_width: Option<usize>,

    /// Default table format
    pub format: Option<TableFormat>,

    /// Initial integration settings for every script
    pub integration: IntegrationOverrides,
}

/// Integration settings that override the built-in defaults
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrationOverrides {
    pub tolerance: Option<f64>,
    pub max_evals: Option<u32>,
    pub search: Option<SearchMethod>,
    pub search_limit: Option<u32>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/slat/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read(&global_path) {
                config.merge(global);
            }
        }

        // 3. Local config in the working directory
        if let Some(local) = Self::read(Path::new(LOCAL_CONFIG_FILE)) {
            config.merge(local);
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    fn read(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        serde_yml::from_str::<Config>(&contents).ok()
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "slat")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("SLAT_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var("SLAT_INPUT_DIR") {
            self.input_dir = Some(PathBuf::from(dir));
        }
        if let Some(tolerance) = var("SLAT_TOLERANCE").and_then(|t| t.parse().ok()) {
            self.integration.tolerance = Some(tolerance);
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.input_dir.is_some() {
            self.input_dir = other.input_dir;
        }
        if other.column_width.is_some() {
            self.column_width = other.column_width;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        let theirs = other.integration;
        let ours = &mut self.integration;
        if theirs.tolerance.is_some() {
            ours.tolerance = theirs.tolerance;
        }
        if theirs.max_evals.is_some() {
            ours.max_evals = theirs.max_evals;
        }
        if theirs.search.is_some() {
            ours.search = theirs.search;
        }
        if theirs.search_limit.is_some() {
            ours.search_limit = theirs.search_limit;
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn input_dir(&self) -> PathBuf {
        self.input_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn table_style(&self) -> TableStyle {
        let defaults = TableStyle::default();
        TableStyle {
            format: self.format.unwrap_or(defaults.format),
            width: self.column_width.unwrap_or(defaults.width),
        }
    }

    pub fn integration(&self) -> IntegrationConfig {
        let mut config = IntegrationConfig::default();
        let o = &self.integration;
        if let Some(t) = o.tolerance {
            config.tolerance = t;
        }
        if let Some(m) = o.max_evals {
            config.max_evals = m;
        }
        if let Some(s) = o.search {
            config.search = s;
        }
        if let Some(l) = o.search_limit {
            config.search_limit = l;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output_dir(), PathBuf::from("."));
        assert_eq!(config.table_style(), TableStyle::default());
        assert_eq!(config.integration(), IntegrationConfig::default());
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base: Config = serde_yml::from_str("column_width: 12\nintegration:\n  tolerance: 0.001\n").unwrap();
        let local: Config = serde_yml::from_str("format: csv\nintegration:\n  max_evals: 50\n").unwrap();
        base.merge(local);
        let style = base.table_style();
        assert_eq!(style.width, 12);
        assert_eq!(style.format, TableFormat::Csv);
        let integ = base.integration();
        assert_eq!(integ.tolerance, 0.001);
        assert_eq!(integ.max_evals, 50);
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "SLAT_OUTPUT_DIR" => Some("/tmp/results".to_string()),
            "SLAT_TOLERANCE" => Some("1e-4".to_string()),
            _ => None,
        });
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/results"));
        assert_eq!(config.integration().tolerance, 1e-4);
        assert_eq!(config.input_dir(), PathBuf::from("."));
    }
}
