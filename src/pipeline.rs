// src/pipeline.rs
//! One pass of fetch → parse → pivot → export → render.

use reqwest::Client;
use std::{io::Write, path::PathBuf, time::Instant};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::fetch;
use crate::process::{self, PivotTable};
use crate::sink;

/// Files produced by a successful run.
#[derive(Debug)]
pub struct RunOutput {
    pub table: PivotTable,
    pub csv_path: PathBuf,
    pub parquet_path: Option<PathBuf>,
    pub chart_path: Option<PathBuf>,
}

/// Run the pipeline once, printing the raw response, the parsed series and
/// the pivot table to `report` as they become available.
///
/// Nothing is written to disk unless a complete table was built.
#[instrument(level = "info", skip_all, fields(endpoint = %config.fetch.endpoint))]
pub async fn run<W: Write>(
    client: &Client,
    config: &PipelineConfig,
    report: &mut W,
) -> Result<RunOutput> {
    let start = Instant::now();

    // ─── 1) fetch ────────────────────────────────────────────────────
    let body = fetch::fetch(client, &config.fetch).await?;
    writeln!(report, "Response from server: {body}").map_err(Error::Report)?;

    // ─── 2) parse ────────────────────────────────────────────────────
    let raw = process::parse_response(body)?;
    let parsed = process::parse(raw)?;
    let pretty = serde_json::to_string_pretty(&parsed).map_err(|e| Error::Report(e.into()))?;
    writeln!(report, "{pretty}").map_err(Error::Report)?;

    // ─── 3) pivot ────────────────────────────────────────────────────
    let table = process::pivot(&parsed)?;
    writeln!(report, "{table}").map_err(Error::Report)?;
    if table.is_empty() {
        warn!("response contained no observations");
    }
    info!(
        years = table.years().len(),
        quarters = table.quarters().len(),
        cells = table.populated_cells(),
        "pivot built"
    );

    // ─── 4) sinks ────────────────────────────────────────────────────
    let csv_path = config.output.csv_path();
    sink::csv::export(&table, &csv_path)?;

    let parquet_path = if config.output.parquet {
        let path = config.output.parquet_path();
        sink::parquet::export(&table, &path)?;
        Some(path)
    } else {
        None
    };

    let chart_path = if config.chart.enabled {
        let path = config.output.chart_path();
        sink::chart::render_to_file(&table, &config.chart, &path)?;
        Some(path)
    } else {
        None
    };

    info!(elapsed = ?start.elapsed(), csv = %csv_path.display(), "run complete");
    Ok(RunOutput {
        table,
        csv_path,
        parquet_path,
        chart_path,
    })
}

/// Build a client from `config.fetch` and [`run`].
pub async fn run_with_config<W: Write>(
    config: &PipelineConfig,
    report: &mut W,
) -> Result<RunOutput> {
    let client = fetch::build_client(&config.fetch)?;
    run(&client, config, report).await
}
