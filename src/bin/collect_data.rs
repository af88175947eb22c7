// Collection stage only: download the FRED series and write the manual
// tables into the raw data directory. Takes no arguments.

use affordability::{config::Config, fetch, series::manual};
use anyhow::Result;
use reqwest::Client;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cfg = Config::load_default()?;
    let client = Client::new();

    let paths = fetch::download_all(&client, &cfg.raw_dir).await?;
    for path in &paths {
        info!(path = %path.display(), "downloaded");
    }
    manual::write_manual_csvs(&cfg.raw_dir)?;
    info!(dir = %cfg.raw_dir.display(), "data collection complete");
    Ok(())
}
