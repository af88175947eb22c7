// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pipeline configuration, loaded from an optional `config.yaml`.
/// Every field has a default matching the standard project layout, so the
/// binaries run with no config file present at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the raw source CSVs are written to and read from.
    pub raw_dir: PathBuf,
    /// Path of the DuckDB database file.
    pub db_path: PathBuf,
    /// CPI base year for inflation adjustment.
    pub base_year: i32,
    /// Historical years the affordability gap is computed against.
    pub comparison_years: Vec<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            db_path: PathBuf::from("data/database/economic_data.db"),
            base_year: 2020,
            comparison_years: vec![1970, 1980, 1990, 2000, 2010],
        }
    }
}

impl Config {
    /// Load configuration from `path` if it exists, otherwise defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load from the conventional `config.yaml` in the working directory.
    pub fn load_default() -> Result<Self> {
        Self::load("config.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_absent() -> Result<()> {
        let cfg = Config::load("definitely-not-here.yaml")?;
        assert_eq!(cfg.base_year, 2020);
        assert_eq!(cfg.comparison_years, vec![1970, 1980, 1990, 2000, 2010]);
        assert_eq!(cfg.raw_dir, PathBuf::from("data/raw"));
        Ok(())
    }

    #[test]
    fn partial_yaml_fills_defaults() -> Result<()> {
        let mut f = tempfile::NamedTempFile::new()?;
        writeln!(f, "base_year: 1990")?;
        writeln!(f, "db_path: /tmp/econ.db")?;
        let cfg = Config::load(f.path())?;
        assert_eq!(cfg.base_year, 1990);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/econ.db"));
        // untouched fields keep their defaults
        assert_eq!(cfg.raw_dir, PathBuf::from("data/raw"));
        Ok(())
    }
}
