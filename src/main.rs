use anyhow::Result;
use ifsc_scraper::{
    browse::Session,
    config::ScrapeConfig,
    normalize::{consolidate, ResultTable},
    store,
};
use std::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const CONFIG_PATH: &str = "scraper.yaml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load + validate config ───────────────────────────────────
    let config = ScrapeConfig::load(CONFIG_PATH)?;
    config.validate()?;
    fs::create_dir_all(&config.output_dir)?;

    // ─── 3) scrape everything through one browser session ────────────
    let session = Session::open(&config).await?;
    let outcome = ifsc_scraper::scrape::run(&session, &config).await;
    // the session is closed on every exit path, including fatal timeouts
    if let Err(e) = session.close().await {
        warn!("closing browser session: {e:#}");
    }
    let buckets = outcome?;

    // ─── 4) normalize + save per discipline ──────────────────────────
    for (discipline, records) in &buckets {
        if records.is_empty() {
            continue;
        }
        let table = ResultTable::from_records(records);
        let table = consolidate(&table, config.alias_tables.for_discipline(*discipline));
        let path = config
            .output_dir
            .join(format!("{}_results.csv", discipline.name()));
        store::save(&table, &path, config.merge_existing)?;
        info!(
            discipline = discipline.name(),
            rows = table.rows.len(),
            path = %path.display(),
            "results saved"
        );
    }

    Ok(())
}
