// src/series/manual.rs
//
// Historical tables with no machine-readable public feed. Values compiled by
// hand from Department of Labor and NCES published figures, nominal dollars.

use anyhow::{Context, Result};
use csv::Writer;
use std::path::{Path, PathBuf};
use tracing::info;

/// Federal minimum wage, $/hour, at five-year steps.
pub static MIN_WAGE: &[(i32, f64)] = &[
    (1970, 1.60),
    (1975, 2.10),
    (1980, 3.10),
    (1985, 3.35),
    (1990, 3.80),
    (1995, 4.25),
    (2000, 5.15),
    (2005, 5.15),
    (2010, 7.25),
    (2015, 7.25),
    (2020, 7.25),
    (2023, 7.25),
];

/// Average annual college tuition, (year, public, private), $/year.
pub static TUITION: &[(i32, f64, f64)] = &[
    (1970, 500.0, 1900.0),
    (1975, 640.0, 2500.0),
    (1980, 800.0, 3500.0),
    (1985, 1300.0, 6100.0),
    (1990, 2100.0, 9300.0),
    (1995, 2800.0, 12200.0),
    (2000, 3500.0, 16000.0),
    (2005, 5800.0, 22000.0),
    (2010, 7600.0, 27000.0),
    (2015, 9400.0, 32000.0),
    (2020, 10500.0, 36000.0),
    (2023, 11600.0, 39400.0),
];

/// Write `minimum_wage.csv` and `college_tuition.csv` under `dest_dir`,
/// with a `year` column and a `date` column pinned to January 1st.
/// Returns the two paths written.
pub fn write_manual_csvs(dest_dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let dest_dir = dest_dir.as_ref();
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let wage_path = dest_dir.join("minimum_wage.csv");
    let mut w = Writer::from_path(&wage_path)
        .with_context(|| format!("creating {}", wage_path.display()))?;
    w.write_record(["year", "federal_min_wage", "date"])?;
    for &(year, wage) in MIN_WAGE {
        w.write_record([
            year.to_string(),
            format!("{wage:.2}"),
            format!("{year}-01-01"),
        ])?;
    }
    w.flush()?;

    let tuition_path = dest_dir.join("college_tuition.csv");
    let mut w = Writer::from_path(&tuition_path)
        .with_context(|| format!("creating {}", tuition_path.display()))?;
    w.write_record(["year", "avg_public_tuition", "avg_private_tuition", "date"])?;
    for &(year, public, private) in TUITION {
        w.write_record([
            year.to_string(),
            format!("{public}"),
            format!("{private}"),
            format!("{year}-01-01"),
        ])?;
    }
    w.flush()?;

    info!(dir = %dest_dir.display(), "manual tables written");
    Ok((wage_path, tuition_path))
}
