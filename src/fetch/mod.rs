// src/fetch/mod.rs

use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, task};
use tracing::{debug, info};
use url::Url;

const FRED_CSV_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

/// A FRED series we download, and the column name its values get locally.
#[derive(Debug, Clone, Copy)]
pub struct FredSeries {
    pub id: &'static str,
    pub column: &'static str,
}

/// The three source series: median home price, median household income, CPI.
pub static FRED_SERIES: &[FredSeries] = &[
    FredSeries {
        id: "MSPUS",
        column: "median_home_price",
    },
    FredSeries {
        id: "MEHOINUSA646N",
        column: "median_household_income",
    },
    FredSeries {
        id: "CPIAUCSL",
        column: "consumer_price_index",
    },
];

/// Build the fredgraph CSV export URL for a series id.
pub fn series_url(id: &str) -> Result<Url> {
    Url::parse_with_params(FRED_CSV_URL, &[("id", id)])
        .with_context(|| format!("building FRED URL for {id}"))
}

/// Rewrite the header row of a FRED CSV body to `date,<column>`; the data
/// rows are kept verbatim (missing observations stay encoded as ".").
pub fn normalize_csv(body: &str, column: &str) -> Result<String> {
    match body.split_once('\n') {
        Some((_header, rest)) => Ok(format!("date,{column}\n{rest}")),
        None => bail!("FRED response has no header row"),
    }
}

/// Download one series and write it under `dest_dir` as `<column>.csv`.
/// Returns the path of the written file.
pub async fn download_series(
    client: &Client,
    series: &FredSeries,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let url = series_url(series.id)?;
    debug!(id = series.id, %url, "fetching series");

    let body = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?
        .error_for_status()
        .with_context(|| format!("non-success status from {url}"))?
        .text()
        .await
        .with_context(|| format!("reading body from {url}"))?;

    let csv = normalize_csv(&body, series.column)?;

    let dest = dest_dir.as_ref().join(format!("{}.csv", series.column));
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&dest, csv.as_bytes())
        .await
        .with_context(|| format!("writing {}", dest.display()))?;

    info!(id = series.id, path = %dest.display(), "series downloaded");
    Ok(dest)
}

/// Download all FRED series concurrently. Any single failure fails the run.
pub async fn download_all(client: &Client, dest_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dest_dir = dest_dir.as_ref().to_path_buf();
    let mut handles = Vec::with_capacity(FRED_SERIES.len());

    for series in FRED_SERIES {
        let client = client.clone();
        let dest_dir = dest_dir.clone();
        handles.push(task::spawn(async move {
            download_series(&client, series, &dest_dir).await
        }));
    }

    let mut paths = Vec::with_capacity(handles.len());
    for handle in handles {
        paths.push(handle.await??);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_series_id() -> Result<()> {
        let url = series_url("MSPUS")?;
        assert_eq!(
            url.as_str(),
            "https://fred.stlouisfed.org/graph/fredgraph.csv?id=MSPUS"
        );
        Ok(())
    }

    #[test]
    fn header_is_rewritten_rows_kept() -> Result<()> {
        let body = "DATE,MSPUS\n1970-01-01,23900\n1970-04-01,.\n";
        let out = normalize_csv(body, "median_home_price")?;
        assert_eq!(
            out,
            "date,median_home_price\n1970-01-01,23900\n1970-04-01,.\n"
        );
        Ok(())
    }

    #[test]
    fn headerless_body_is_rejected() {
        assert!(normalize_csv("no newline at all", "x").is_err());
    }
}
