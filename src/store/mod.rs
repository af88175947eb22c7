// src/store/mod.rs
//
// The single local relational file every stage converges on. Raw series land
// in one table each, the annual view aligns them by year, and the derived
// tables are materialized from the Rust-side arithmetic in `analysis`.

use crate::analysis::{self, ComparisonRow, DecadeRow, GapRow, YearlyRecord};
use crate::series::{self, Observation};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use duckdb::{params, Connection};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Open (or create) the database file at `path`, creating parent directories
/// as needed.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(conn)
}

/// In-memory database, used by tests and the sample builder.
pub fn open_in_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

fn append_series(conn: &Connection, table: &str, observations: &[Observation]) -> Result<()> {
    let mut appender = conn
        .appender(table)
        .with_context(|| format!("appender for {table}"))?;
    for obs in observations {
        appender.append_row(params![
            obs.date.to_string(),
            obs.value,
            obs.year()
        ])?;
    }
    appender.flush()?;
    debug!(table, rows = observations.len(), "raw series loaded");
    Ok(())
}

fn load_fred_table(conn: &Connection, raw_dir: &Path, column: &str) -> Result<usize> {
    let path = raw_dir.join(format!("{column}.csv"));
    let observations = series::read_observations(&path)?;

    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {column} (
            date VARCHAR NOT NULL,
            {column} DOUBLE,
            year INTEGER NOT NULL
        );"
    ))?;
    append_series(conn, column, &observations)?;
    Ok(observations.len())
}

fn load_minimum_wage(conn: &Connection, raw_dir: &Path) -> Result<usize> {
    let path = raw_dir.join("minimum_wage.csv");
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));

    conn.execute_batch(
        "CREATE OR REPLACE TABLE minimum_wage (
            year INTEGER NOT NULL,
            federal_min_wage DOUBLE NOT NULL,
            date VARCHAR NOT NULL
        );",
    )?;
    let mut appender = conn.appender("minimum_wage")?;
    let mut rows = 0;
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        let year: i32 = record[0].trim().parse()?;
        let wage: f64 = record[1].trim().parse()?;
        appender.append_row(params![year, wage, record[2].trim()])?;
        rows += 1;
    }
    appender.flush()?;
    Ok(rows)
}

fn load_college_tuition(conn: &Connection, raw_dir: &Path) -> Result<usize> {
    let path = raw_dir.join("college_tuition.csv");
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));

    conn.execute_batch(
        "CREATE OR REPLACE TABLE college_tuition (
            year INTEGER NOT NULL,
            avg_public_tuition DOUBLE NOT NULL,
            avg_private_tuition DOUBLE NOT NULL,
            date VARCHAR NOT NULL
        );",
    )?;
    let mut appender = conn.appender("college_tuition")?;
    let mut rows = 0;
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        let year: i32 = record[0].trim().parse()?;
        let public: f64 = record[1].trim().parse()?;
        let private: f64 = record[2].trim().parse()?;
        appender.append_row(params![year, public, private, record[3].trim()])?;
        rows += 1;
    }
    appender.flush()?;
    Ok(rows)
}

/// Load the five raw tables from the CSVs under `raw_dir`. Tables are
/// replaced wholesale, so reruns against the same files are idempotent.
pub fn load_raw(conn: &Connection, raw_dir: impl AsRef<Path>) -> Result<()> {
    let raw_dir = raw_dir.as_ref();
    for column in [
        "median_home_price",
        "median_household_income",
        "consumer_price_index",
    ] {
        let rows = load_fred_table(conn, raw_dir, column)?;
        info!(table = column, rows, "loaded");
    }
    let rows = load_minimum_wage(conn, raw_dir)?;
    info!(table = "minimum_wage", rows, "loaded");
    let rows = load_college_tuition(conn, raw_dir)?;
    info!(table = "college_tuition", rows, "loaded");
    Ok(())
}

/// The `annual_economic_indicators` view: annual averages of the three FRED
/// series, inner-joined by year. Years missing any series are excluded.
pub fn create_annual_view(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE OR REPLACE VIEW annual_economic_indicators AS
        WITH home_price_annual AS (
            SELECT year, AVG(median_home_price) AS median_home_price
            FROM median_home_price GROUP BY year
        ),
        income_annual AS (
            SELECT year, AVG(median_household_income) AS median_household_income
            FROM median_household_income GROUP BY year
        ),
        cpi_annual AS (
            SELECT year, AVG(consumer_price_index) AS consumer_price_index
            FROM consumer_price_index GROUP BY year
        )
        SELECT
            hp.year,
            hp.median_home_price,
            i.median_household_income,
            c.consumer_price_index
        FROM home_price_annual hp
        LEFT JOIN income_annual i ON hp.year = i.year
        LEFT JOIN cpi_annual c ON hp.year = c.year
        WHERE hp.median_home_price IS NOT NULL
          AND i.median_household_income IS NOT NULL
          AND c.consumer_price_index IS NOT NULL
        ORDER BY hp.year;",
    )?;
    Ok(())
}

/// Read the annual view back as aligned yearly records, ordered by year.
pub fn load_annual(conn: &Connection) -> Result<Vec<YearlyRecord>> {
    let mut stmt = conn.prepare(
        "SELECT year, median_home_price, median_household_income, consumer_price_index
         FROM annual_economic_indicators ORDER BY year",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(YearlyRecord {
                year: row.get(0)?,
                median_home_price: row.get(1)?,
                median_household_income: row.get(2)?,
                consumer_price_index: row.get(3)?,
            })
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Materialize `economic_comparison`, replacing any previous contents.
pub fn write_comparison(conn: &Connection, rows: &[ComparisonRow]) -> Result<()> {
    conn.execute_batch(
        "CREATE OR REPLACE TABLE economic_comparison (
            year INTEGER NOT NULL,
            median_home_price DOUBLE NOT NULL,
            median_household_income DOUBLE NOT NULL,
            consumer_price_index DOUBLE NOT NULL,
            home_price_to_income_ratio DOUBLE NOT NULL,
            inflation_adjusted_home_price DOUBLE NOT NULL,
            inflation_adjusted_income DOUBLE NOT NULL
        );",
    )?;
    let mut appender = conn.appender("economic_comparison")?;
    for r in rows {
        appender.append_row(params![
            r.year,
            r.median_home_price,
            r.median_household_income,
            r.consumer_price_index,
            r.home_price_to_income_ratio,
            r.inflation_adjusted_home_price,
            r.inflation_adjusted_income,
        ])?;
    }
    appender.flush()?;
    Ok(())
}

/// Materialize `affordability_comparison`.
pub fn write_affordability(conn: &Connection, rows: &[GapRow]) -> Result<()> {
    conn.execute_batch(
        "CREATE OR REPLACE TABLE affordability_comparison (
            comparison_year INTEGER NOT NULL,
            current_ratio DOUBLE NOT NULL,
            historical_ratio DOUBLE NOT NULL,
            home_price_decrease_needed DOUBLE NOT NULL,
            income_increase_needed DOUBLE NOT NULL
        );",
    )?;
    let mut appender = conn.appender("affordability_comparison")?;
    for r in rows {
        appender.append_row(params![
            r.comparison_year,
            r.current_ratio,
            r.historical_ratio,
            r.home_price_decrease_needed,
            r.income_increase_needed,
        ])?;
    }
    appender.flush()?;
    Ok(())
}

/// Materialize `decade_summary`.
pub fn write_decade_summary(conn: &Connection, rows: &[DecadeRow]) -> Result<()> {
    conn.execute_batch(
        "CREATE OR REPLACE TABLE decade_summary (
            decade INTEGER NOT NULL,
            avg_home_price DOUBLE NOT NULL,
            avg_income DOUBLE NOT NULL,
            avg_price_to_income_ratio DOUBLE NOT NULL,
            avg_adj_home_price DOUBLE NOT NULL,
            avg_adj_income DOUBLE NOT NULL
        );",
    )?;
    let mut appender = conn.appender("decade_summary")?;
    for r in rows {
        appender.append_row(params![
            r.decade,
            r.avg_home_price,
            r.avg_income,
            r.avg_price_to_income_ratio,
            r.avg_adj_home_price,
            r.avg_adj_income,
        ])?;
    }
    appender.flush()?;
    Ok(())
}

/// Read `economic_comparison` back, ordered by year.
pub fn load_comparison(conn: &Connection) -> Result<Vec<ComparisonRow>> {
    let mut stmt = conn.prepare(
        "SELECT year, median_home_price, median_household_income, consumer_price_index,
                home_price_to_income_ratio, inflation_adjusted_home_price,
                inflation_adjusted_income
         FROM economic_comparison ORDER BY year",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ComparisonRow {
                year: row.get(0)?,
                median_home_price: row.get(1)?,
                median_household_income: row.get(2)?,
                consumer_price_index: row.get(3)?,
                home_price_to_income_ratio: row.get(4)?,
                inflation_adjusted_home_price: row.get(5)?,
                inflation_adjusted_income: row.get(6)?,
            })
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Compute and materialize all three derived tables from the annual view.
pub fn build_derived(conn: &Connection, base_year: i32, comparison_years: &[i32]) -> Result<()> {
    let annual = load_annual(conn)?;
    if annual.is_empty() {
        bail!("annual_economic_indicators is empty; nothing to derive");
    }
    let comparison = analysis::comparison_rows(&annual, base_year)?;
    let gaps = analysis::affordability_gap(&comparison, comparison_years);
    let decades = analysis::decade_summary(&comparison);

    write_comparison(conn, &comparison)?;
    write_affordability(conn, &gaps)?;
    write_decade_summary(conn, &decades)?;
    info!(
        comparison_rows = comparison.len(),
        gap_rows = gaps.len(),
        decade_rows = decades.len(),
        "derived tables materialized"
    );
    Ok(())
}

fn count(conn: &Connection, table: &str) -> Result<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(n)
}

/// Row counts of the tables the queries read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub home_price_rows: i64,
    pub comparison_rows: i64,
    pub affordability_rows: i64,
    pub decade_rows: i64,
}

/// Integrity checks over the built database:
/// - exactly one comparison row per year,
/// - ratio equals price / income and is positive,
/// - adjusted values equal nominal * base_cpi / cpi,
/// - re-deriving from the stored nominal inputs reproduces the stored rows.
pub fn verify(conn: &Connection, base_year: i32) -> Result<VerifyReport> {
    const TOL: f64 = 1e-6;

    let (total, distinct): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT year) FROM economic_comparison",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    if total != distinct {
        bail!("economic_comparison has duplicate years ({total} rows, {distinct} distinct)");
    }
    if total == 0 {
        bail!("economic_comparison is empty");
    }

    let stored = load_comparison(conn)?;
    let base_cpi = stored
        .iter()
        .find(|r| r.year == base_year)
        .map(|r| r.consumer_price_index)
        .with_context(|| format!("base year {base_year} missing from economic_comparison"))?;

    for row in &stored {
        let ratio = row.median_home_price / row.median_household_income;
        if (row.home_price_to_income_ratio - ratio).abs() > TOL
            || row.home_price_to_income_ratio <= 0.0
        {
            bail!("ratio mismatch for year {}", row.year);
        }
        let adj_price = row.median_home_price * base_cpi / row.consumer_price_index;
        let adj_income = row.median_household_income * base_cpi / row.consumer_price_index;
        if (row.inflation_adjusted_home_price - adj_price).abs() > TOL
            || (row.inflation_adjusted_income - adj_income).abs() > TOL
        {
            bail!("inflation adjustment mismatch for year {}", row.year);
        }
    }

    // rerunning the derivation from the same nominal inputs must reproduce
    // the stored rows exactly
    let annual: Vec<YearlyRecord> = stored
        .iter()
        .map(|r| YearlyRecord {
            year: r.year,
            median_home_price: r.median_home_price,
            median_household_income: r.median_household_income,
            consumer_price_index: r.consumer_price_index,
        })
        .collect();
    let recomputed = analysis::comparison_rows(&annual, base_year)?;
    if recomputed.len() != stored.len() {
        bail!("recomputation changed the row count");
    }
    for (a, b) in recomputed.iter().zip(&stored) {
        if a.year != b.year
            || (a.home_price_to_income_ratio - b.home_price_to_income_ratio).abs() > TOL
            || (a.inflation_adjusted_home_price - b.inflation_adjusted_home_price).abs() > TOL
            || (a.inflation_adjusted_income - b.inflation_adjusted_income).abs() > TOL
        {
            bail!("recomputation diverged at year {}", a.year);
        }
    }

    Ok(VerifyReport {
        home_price_rows: count(conn, "median_home_price")?,
        comparison_rows: total,
        affordability_rows: count(conn, "affordability_comparison")?,
        decade_rows: count(conn, "decade_summary")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample::{synthetic_records, write_sample_csvs};
    use crate::series::manual::write_manual_csvs;

    fn built_db(raw_dir: &Path) -> Result<Connection> {
        write_sample_csvs(raw_dir, 1970..=2023)?;
        write_manual_csvs(raw_dir)?;
        let conn = open_in_memory()?;
        load_raw(&conn, raw_dir)?;
        create_annual_view(&conn)?;
        build_derived(&conn, 2020, &[1970, 1980, 1990, 2000, 2010])?;
        Ok(conn)
    }

    #[test]
    fn end_to_end_build_and_verify() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let conn = built_db(dir.path())?;

        let report = verify(&conn, 2020)?;
        assert_eq!(report.comparison_rows, 54);
        assert_eq!(report.affordability_rows, 5);
        assert_eq!(report.decade_rows, 6); // 1970..2020 decades
        assert_eq!(report.home_price_rows, 54 * 4);
        Ok(())
    }

    #[test]
    fn annual_view_averages_and_joins() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let conn = built_db(dir.path())?;

        let annual = load_annual(&conn)?;
        assert_eq!(annual.len(), 54);
        let years: Vec<i32> = annual.iter().map(|r| r.year).collect();
        let mut sorted = years.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(years, sorted);

        // quarterly rows of a constant value average to that value, and the
        // missing income row does not drag the average down
        let expected = synthetic_records(1970..=2023);
        for (got, want) in annual.iter().zip(&expected) {
            assert_eq!(got.year, want.year);
            assert!((got.median_home_price - want.median_home_price).abs() < 1e-6);
            assert!((got.median_household_income - want.median_household_income).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn rebuild_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let conn = built_db(dir.path())?;
        let first = load_comparison(&conn)?;

        // run the load + derive stages again against the same raw files
        load_raw(&conn, dir.path())?;
        create_annual_view(&conn)?;
        build_derived(&conn, 2020, &[1970, 1980, 1990, 2000, 2010])?;
        let second = load_comparison(&conn)?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn verify_catches_tampered_ratio() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let conn = built_db(dir.path())?;
        conn.execute(
            "UPDATE economic_comparison SET home_price_to_income_ratio = -1 WHERE year = 1980",
            [],
        )?;
        assert!(verify(&conn, 2020).is_err());
        Ok(())
    }

    #[test]
    fn verify_catches_duplicate_years() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let conn = built_db(dir.path())?;
        conn.execute(
            "INSERT INTO economic_comparison SELECT * FROM economic_comparison WHERE year = 1990",
            [],
        )?;
        assert!(verify(&conn, 2020).is_err());
        Ok(())
    }

    #[test]
    fn derive_on_empty_view_fails() -> Result<()> {
        let conn = open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE median_home_price (date VARCHAR, median_home_price DOUBLE, year INTEGER);
             CREATE TABLE median_household_income (date VARCHAR, median_household_income DOUBLE, year INTEGER);
             CREATE TABLE consumer_price_index (date VARCHAR, consumer_price_index DOUBLE, year INTEGER);",
        )?;
        create_annual_view(&conn)?;
        assert!(build_derived(&conn, 2020, &[1970]).is_err());
        Ok(())
    }

    #[test]
    fn disk_database_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("db").join("economic_data.db");
        write_sample_csvs(dir.path(), 1970..=2023)?;
        write_manual_csvs(dir.path())?;
        {
            let conn = open(&db_path)?;
            load_raw(&conn, dir.path())?;
            create_annual_view(&conn)?;
            build_derived(&conn, 2020, &[1970, 1980])?;
        }
        let conn = open(&db_path)?;
        let rows = load_comparison(&conn)?;
        assert_eq!(rows.len(), 54);
        Ok(())
    }
}
