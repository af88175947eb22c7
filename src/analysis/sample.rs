// src/analysis/sample.rs

use super::YearlyRecord;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::ops::RangeInclusive;
use std::path::Path;

// 1970 seed values and annual growth rates that roughly track the real
// series: home prices 7%/yr, incomes 4.5%/yr, CPI 4%/yr.
const SEED_HOME_PRICE: f64 = 23_000.0;
const SEED_INCOME: f64 = 9_870.0;
const SEED_CPI: f64 = 38.8;
const HOME_PRICE_GROWTH: f64 = 1.07;
const INCOME_GROWTH: f64 = 1.045;
const CPI_GROWTH: f64 = 1.04;

/// Deterministic synthetic yearly records for demos and tests that must not
/// touch the network. Same range in, same records out.
pub fn synthetic_records(years: RangeInclusive<i32>) -> Vec<YearlyRecord> {
    let start = *years.start();
    years
        .map(|year| {
            let i = (year - start) as f64;
            YearlyRecord {
                year,
                median_home_price: SEED_HOME_PRICE * HOME_PRICE_GROWTH.powf(i),
                median_household_income: SEED_INCOME * INCOME_GROWTH.powf(i),
                consumer_price_index: SEED_CPI * CPI_GROWTH.powf(i),
            }
        })
        .collect()
}

/// Write the three normalized series CSVs for `years` under `dest_dir`, in
/// the same shape real downloads have: quarterly rows for home price and
/// CPI, annual rows for income plus a missing ("." ) mid-year observation.
pub fn write_sample_csvs(dest_dir: impl AsRef<Path>, years: RangeInclusive<i32>) -> Result<()> {
    let dest_dir = dest_dir.as_ref();
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let records = synthetic_records(years);
    let mut price = String::from("date,median_home_price\n");
    let mut income = String::from("date,median_household_income\n");
    let mut cpi = String::from("date,consumer_price_index\n");
    for r in &records {
        for month in [1, 4, 7, 10] {
            writeln!(price, "{}-{month:02}-01,{}", r.year, r.median_home_price)?;
            writeln!(cpi, "{}-{month:02}-01,{}", r.year, r.consumer_price_index)?;
        }
        writeln!(income, "{}-01-01,{}", r.year, r.median_household_income)?;
        writeln!(income, "{}-07-01,.", r.year)?;
    }
    std::fs::write(dest_dir.join("median_home_price.csv"), price)?;
    std::fs::write(dest_dir.join("median_household_income.csv"), income)?;
    std::fs::write(dest_dir.join("consumer_price_index.csv"), cpi)?;
    Ok(())
}
