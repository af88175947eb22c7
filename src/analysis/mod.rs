// src/analysis/mod.rs
//
// Derived affordability arithmetic. Everything here is a pure function of the
// annual nominal inputs, so rebuilding the derived tables from the same raw
// data always produces identical rows.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::warn;

pub mod sample;

/// One aligned "yearly economic record": the three nominal inputs for a year
/// in which all of them are present.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyRecord {
    pub year: i32,
    pub median_home_price: f64,
    pub median_household_income: f64,
    pub consumer_price_index: f64,
}

/// A yearly record plus its derived columns, mirroring the
/// `economic_comparison` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub year: i32,
    pub median_home_price: f64,
    pub median_household_income: f64,
    pub consumer_price_index: f64,
    pub home_price_to_income_ratio: f64,
    pub inflation_adjusted_home_price: f64,
    pub inflation_adjusted_income: f64,
}

/// One row of the affordability gap table: what would have to change to get
/// back to a historical price-to-income ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct GapRow {
    pub comparison_year: i32,
    pub current_ratio: f64,
    pub historical_ratio: f64,
    pub home_price_decrease_needed: f64,
    pub income_increase_needed: f64,
}

/// Per-decade averages of the comparison columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DecadeRow {
    pub decade: i32,
    pub avg_home_price: f64,
    pub avg_income: f64,
    pub avg_price_to_income_ratio: f64,
    pub avg_adj_home_price: f64,
    pub avg_adj_income: f64,
}

/// Inner-join the three annual series by year. Only years present in all
/// three produce a record; the BTreeMap keys keep the output ordered and
/// duplicate-free.
pub fn align_years(
    home_price: &BTreeMap<i32, f64>,
    income: &BTreeMap<i32, f64>,
    cpi: &BTreeMap<i32, f64>,
) -> Vec<YearlyRecord> {
    home_price
        .iter()
        .filter_map(|(&year, &price)| {
            let income = *income.get(&year)?;
            let cpi = *cpi.get(&year)?;
            Some(YearlyRecord {
                year,
                median_home_price: price,
                median_household_income: income,
                consumer_price_index: cpi,
            })
        })
        .collect()
}

/// `nominal * base_cpi / cpi`, or `None` when `cpi` is zero or non-finite.
pub fn inflation_adjust(nominal: f64, base_cpi: f64, cpi: f64) -> Option<f64> {
    if cpi == 0.0 || !cpi.is_finite() || !base_cpi.is_finite() {
        return None;
    }
    Some(nominal * base_cpi / cpi)
}

/// Relative change from `from` to `to`, in percent. `None` on a zero base.
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    Some((to / from - 1.0) * 100.0)
}

/// Compute the derived columns for every record, inflation-adjusted to the
/// CPI of `base_year`. Fails if the base year is not in the data. Records
/// whose CPI is zero are dropped with a warning rather than poisoning the
/// output with infinities.
pub fn comparison_rows(records: &[YearlyRecord], base_year: i32) -> Result<Vec<ComparisonRow>> {
    let base_cpi = records
        .iter()
        .find(|r| r.year == base_year)
        .map(|r| r.consumer_price_index)
        .with_context(|| format!("base year {base_year} not present in the aligned data"))?;

    let mut out = Vec::with_capacity(records.len());
    for r in records {
        let adj_price = inflation_adjust(r.median_home_price, base_cpi, r.consumer_price_index);
        let adj_income =
            inflation_adjust(r.median_household_income, base_cpi, r.consumer_price_index);
        let (Some(adj_price), Some(adj_income)) = (adj_price, adj_income) else {
            warn!(year = r.year, "zero or invalid CPI, year dropped");
            continue;
        };
        out.push(ComparisonRow {
            year: r.year,
            median_home_price: r.median_home_price,
            median_household_income: r.median_household_income,
            consumer_price_index: r.consumer_price_index,
            home_price_to_income_ratio: r.median_home_price / r.median_household_income,
            inflation_adjusted_home_price: adj_price,
            inflation_adjusted_income: adj_income,
        });
    }
    Ok(out)
}

/// For each requested historical year, how far today's ratio is from that
/// year's: the home price decrease, or income increase, that would restore
/// it. The current ratio is the latest year's. Requested years absent from
/// the data are skipped.
pub fn affordability_gap(rows: &[ComparisonRow], comparison_years: &[i32]) -> Vec<GapRow> {
    let Some(current) = rows.last() else {
        return Vec::new();
    };
    let current_ratio = current.home_price_to_income_ratio;

    comparison_years
        .iter()
        .filter_map(|&year| {
            let hist = rows.iter().find(|r| r.year == year)?;
            let historical_ratio = hist.home_price_to_income_ratio;
            Some(GapRow {
                comparison_year: year,
                current_ratio,
                historical_ratio,
                home_price_decrease_needed: (1.0 - historical_ratio / current_ratio) * 100.0,
                income_increase_needed: (current_ratio / historical_ratio - 1.0) * 100.0,
            })
        })
        .collect()
}

/// Average the comparison columns per decade (`year / 10 * 10`), ordered.
pub fn decade_summary(rows: &[ComparisonRow]) -> Vec<DecadeRow> {
    let mut buckets: BTreeMap<i32, Vec<&ComparisonRow>> = BTreeMap::new();
    for row in rows {
        buckets.entry(row.year / 10 * 10).or_default().push(row);
    }

    buckets
        .into_iter()
        .map(|(decade, rows)| {
            let n = rows.len() as f64;
            let mean =
                |f: fn(&ComparisonRow) -> f64| rows.iter().copied().map(f).sum::<f64>() / n;
            DecadeRow {
                decade,
                avg_home_price: mean(|r| r.median_home_price),
                avg_income: mean(|r| r.median_household_income),
                avg_price_to_income_ratio: mean(|r| r.home_price_to_income_ratio),
                avg_adj_home_price: mean(|r| r.inflation_adjusted_home_price),
                avg_adj_income: mean(|r| r.inflation_adjusted_income),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, price: f64, income: f64, cpi: f64) -> YearlyRecord {
        YearlyRecord {
            year,
            median_home_price: price,
            median_household_income: income,
            consumer_price_index: cpi,
        }
    }

    fn fixture() -> Vec<YearlyRecord> {
        vec![
            record(1970, 23000.0, 9870.0, 38.8),
            record(1971, 25000.0, 10200.0, 40.5),
            record(1980, 64600.0, 21020.0, 82.4),
            record(2020, 329000.0, 67520.0, 258.8),
        ]
    }

    #[test]
    fn alignment_is_an_inner_join() {
        let price = BTreeMap::from([(1970, 23000.0), (1971, 25000.0), (1972, 27000.0)]);
        let income = BTreeMap::from([(1970, 9870.0), (1972, 11000.0)]);
        let cpi = BTreeMap::from([(1970, 38.8), (1971, 40.5), (1972, 41.8)]);

        let records = align_years(&price, &income, &cpi);
        let years: Vec<i32> = records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![1970, 1972]);
        assert_eq!(records[0].median_household_income, 9870.0);
    }

    #[test]
    fn adjustment_guards_zero_cpi() {
        assert_eq!(inflation_adjust(100.0, 258.8, 0.0), None);
        assert_eq!(inflation_adjust(100.0, f64::NAN, 38.8), None);
        let adj = inflation_adjust(23000.0, 258.8, 38.8).unwrap();
        assert!((adj - 23000.0 * 258.8 / 38.8).abs() < 1e-9);
    }

    #[test]
    fn derived_columns_match_their_definitions() -> Result<()> {
        let rows = comparison_rows(&fixture(), 2020)?;
        assert_eq!(rows.len(), 4);
        for row in &rows {
            let expected_ratio = row.median_home_price / row.median_household_income;
            assert!((row.home_price_to_income_ratio - expected_ratio).abs() < 1e-12);
            assert!(row.home_price_to_income_ratio > 0.0);
            let expected_adj = row.median_home_price * 258.8 / row.consumer_price_index;
            assert!((row.inflation_adjusted_home_price - expected_adj).abs() < 1e-9);
        }
        // base year adjusts to itself
        let base = rows.iter().find(|r| r.year == 2020).unwrap();
        assert!((base.inflation_adjusted_home_price - base.median_home_price).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn missing_base_year_is_an_error() {
        assert!(comparison_rows(&fixture(), 1999).is_err());
    }

    #[test]
    fn zero_cpi_year_is_dropped_not_infinite() -> Result<()> {
        let mut records = fixture();
        records.insert(2, record(1975, 40000.0, 12000.0, 0.0));
        let rows = comparison_rows(&records, 2020)?;
        assert!(rows.iter().all(|r| r.year != 1975));
        assert!(rows.iter().all(|r| r.inflation_adjusted_home_price.is_finite()));
        Ok(())
    }

    #[test]
    fn recomputation_is_idempotent() -> Result<()> {
        let records = fixture();
        let first = comparison_rows(&records, 2020)?;
        let second = comparison_rows(&records, 2020)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn gap_formulas() -> Result<()> {
        // historical ratio 2.0 vs current 4.0: prices must halve, or income double
        let records = vec![
            record(1970, 20000.0, 10000.0, 38.8),
            record(2020, 280000.0, 70000.0, 258.8),
        ];
        let rows = comparison_rows(&records, 2020)?;
        let gaps = affordability_gap(&rows, &[1970, 1985]);
        assert_eq!(gaps.len(), 1); // 1985 not in the data
        let gap = &gaps[0];
        assert_eq!(gap.comparison_year, 1970);
        assert!((gap.current_ratio - 4.0).abs() < 1e-12);
        assert!((gap.historical_ratio - 2.0).abs() < 1e-12);
        assert!((gap.home_price_decrease_needed - 50.0).abs() < 1e-9);
        assert!((gap.income_increase_needed - 100.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn gap_of_empty_data_is_empty() {
        assert!(affordability_gap(&[], &[1970]).is_empty());
    }

    #[test]
    fn decades_bucket_and_average() -> Result<()> {
        let rows = comparison_rows(&fixture(), 2020)?;
        let decades = decade_summary(&rows);
        let keys: Vec<i32> = decades.iter().map(|d| d.decade).collect();
        assert_eq!(keys, vec![1970, 1980, 2020]);
        // 1970 decade averages its two member years
        let d70 = &decades[0];
        assert!((d70.avg_home_price - 24000.0).abs() < 1e-9);
        assert!((d70.avg_income - 10035.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn pct_change_basics() {
        assert_eq!(pct_change(0.0, 10.0), None);
        assert!((pct_change(100.0, 150.0).unwrap() - 50.0).abs() < 1e-12);
        assert!((pct_change(100.0, 50.0).unwrap() + 50.0).abs() < 1e-12);
    }
}
