// src/process/parse.rs

use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{ParsedObservation, ParsedSeriesMap, RawSeries};
use crate::error::{Error, Result};

/// Validate the response document and decode it into raw series.
///
/// The body must be a JSON array of objects. Each element is decoded on its
/// own so a type mismatch can be reported with the series index.
pub fn parse_response(body: Value) -> Result<Vec<RawSeries>> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(Error::MalformedResponse(format!(
                "expected a JSON array of series, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            if !item.is_object() {
                return Err(Error::MalformedResponse(format!(
                    "series #{idx}: expected an object, got {}",
                    json_kind(&item)
                )));
            }
            serde_json::from_value::<RawSeries>(item)
                .map_err(|e| Error::MalformedResponse(format!("series #{idx}: {e}")))
        })
        .collect()
}

/// Turn raw series into `SeriesName → [{year, value}]`.
///
/// A repeated `SeriesName` replaces the earlier series' observations but
/// keeps its column position.
#[instrument(level = "debug", skip(series), fields(series = series.len()))]
pub fn parse(series: Vec<RawSeries>) -> Result<ParsedSeriesMap> {
    let mut out = ParsedSeriesMap::with_capacity(series.len());

    for (idx, raw) in series.into_iter().enumerate() {
        let name = raw.series_name.ok_or_else(|| {
            Error::MalformedResponse(format!("series #{idx} is missing `SeriesName`"))
        })?;
        let points = raw.points.ok_or_else(|| {
            Error::MalformedResponse(format!("series #{idx} ({name:?}) is missing `Points`"))
        })?;

        let mut observations = Vec::with_capacity(points.len());
        for (p_idx, point) in points.into_iter().enumerate() {
            let year = point
                .x
                .ok_or_else(|| missing_field(idx, &name, p_idx, "X"))?
                .normalize();
            let value = point.y.ok_or_else(|| missing_field(idx, &name, p_idx, "Y"))?;
            observations.push(ParsedObservation { year, value });
        }

        debug!(series = %name, points = observations.len(), "parsed series");
        if let Some(previous) = out.insert(name.clone(), observations) {
            warn!(
                series = %name,
                dropped = previous.len(),
                "duplicate SeriesName; keeping the later series"
            );
        }
    }

    Ok(out)
}

fn missing_field(series_idx: usize, name: &str, point_idx: usize, field: &str) -> Error {
    Error::MalformedResponse(format!(
        "series #{series_idx} ({name:?}): point #{point_idx} is missing `{field}`"
    ))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
