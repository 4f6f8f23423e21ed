use anyhow::{Context, Result};
use issuance::{fetch, pipeline, PipelineConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = PipelineConfig::from_env().context("loading configuration")?;
    info!(
        endpoint = %config.fetch.endpoint,
        query = ?config.fetch.form,
        out = %config.output.dir.display(),
        "configured"
    );

    // ─── 3) run once ─────────────────────────────────────────────────
    let client = fetch::build_client(&config.fetch).context("building HTTP client")?;
    let output = pipeline::run(&client, &config, &mut std::io::stdout())
        .await
        .context("quarter issuance pipeline failed")?;

    info!(
        csv = %output.csv_path.display(),
        parquet = ?output.parquet_path,
        chart = ?output.chart_path,
        "all done"
    );
    Ok(())
}
