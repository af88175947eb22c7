// Build a demonstration database from deterministic synthetic series, with
// no network access. Useful for trying the queries before running the real
// collection. The raw CSVs go to a scratch directory so a real raw_dir is
// never overwritten.

use affordability::{analysis::sample, config::Config, series::manual, store};
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cfg = Config::load_default()?;
    warn!("building a SYNTHETIC demonstration database, not real data");

    let scratch = std::env::temp_dir().join("affordability-sample-raw");
    sample::write_sample_csvs(&scratch, 1970..=2023)?;
    manual::write_manual_csvs(&scratch)?;

    let conn = store::open(&cfg.db_path)?;
    store::load_raw(&conn, &scratch)?;
    store::create_annual_view(&conn)?;
    store::build_derived(&conn, cfg.base_year, &cfg.comparison_years)?;

    let report = store::verify(&conn, cfg.base_year)?;
    info!(
        comparison_rows = report.comparison_rows,
        db = %cfg.db_path.display(),
        "sample database built"
    );
    Ok(())
}
