// src/series/mod.rs

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

pub mod manual;

/// One dated observation from a raw series file. FRED publishes missing
/// values as "."; those become `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Parse one value field. "." and the empty string mean missing; anything
/// else must be a number.
pub fn parse_value(field: &str) -> Result<Option<f64>> {
    let field = field.trim();
    if field.is_empty() || field == "." {
        return Ok(None);
    }
    let v: f64 = field
        .parse()
        .with_context(|| format!("invalid numeric field {field:?}"))?;
    Ok(Some(v))
}

/// Read a normalized two-column series file (`date,<name>`) into memory.
/// Malformed rows abort the run; there is no row-level recovery.
pub fn read_observations(path: impl AsRef<Path>) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let mut out = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {} of {}", i + 1, path.display()))?;
        if record.len() < 2 {
            bail!("row {} of {} has {} fields, expected 2", i + 1, path.display(), record.len());
        }
        let date = NaiveDate::parse_from_str(record[0].trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date {:?} in {}", &record[0], path.display()))?;
        let value = parse_value(&record[1])
            .with_context(|| format!("row {} of {}", i + 1, path.display()))?;
        out.push(Observation { date, value });
    }

    debug!(path = %path.display(), rows = out.len(), "series loaded");
    Ok(out)
}

/// Mean of the non-missing observations per calendar year, ordered by year.
/// Years where every observation is missing are dropped.
pub fn annual_average(observations: &[Observation]) -> BTreeMap<i32, f64> {
    let mut sums: BTreeMap<i32, (f64, u32)> = BTreeMap::new();
    for obs in observations {
        if let Some(v) = obs.value {
            let entry = sums.entry(obs.year()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(year, (sum, count))| (year, sum / count as f64))
        .collect()
}
