use affordability::{config::Config, fetch, series::manual, store};
use anyhow::Result;
use reqwest::Client;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    let cfg = Config::load_default()?;

    // ─── 2) collect raw series ───────────────────────────────────────
    let client = Client::new();
    let paths = fetch::download_all(&client, &cfg.raw_dir).await?;
    info!(files = paths.len(), "FRED series downloaded");
    manual::write_manual_csvs(&cfg.raw_dir)?;

    // ─── 3) build the database ───────────────────────────────────────
    let conn = store::open(&cfg.db_path)?;
    store::load_raw(&conn, &cfg.raw_dir)?;
    store::create_annual_view(&conn)?;
    store::build_derived(&conn, cfg.base_year, &cfg.comparison_years)?;

    // ─── 4) verify ───────────────────────────────────────────────────
    let report = store::verify(&conn, cfg.base_year)?;
    info!(
        home_price_rows = report.home_price_rows,
        comparison_rows = report.comparison_rows,
        affordability_rows = report.affordability_rows,
        decade_rows = report.decade_rows,
        db = %cfg.db_path.display(),
        "pipeline complete"
    );
    Ok(())
}
