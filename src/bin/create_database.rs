// Database stage only: load the raw CSVs, build the annual view and the
// derived tables, then verify. Aborts if the raw files are missing; run
// collect_data first. Takes no arguments.

use affordability::{config::Config, store};
use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cfg = Config::load_default()?;

    let conn = store::open(&cfg.db_path)?;
    store::load_raw(&conn, &cfg.raw_dir)?;
    store::create_annual_view(&conn)?;
    store::build_derived(&conn, cfg.base_year, &cfg.comparison_years)?;

    let report = store::verify(&conn, cfg.base_year)?;
    info!(
        home_price_rows = report.home_price_rows,
        comparison_rows = report.comparison_rows,
        affordability_rows = report.affordability_rows,
        decade_rows = report.decade_rows,
        db = %cfg.db_path.display(),
        "database created"
    );
    Ok(())
}
