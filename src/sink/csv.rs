// src/sink/csv.rs

use ::csv::{ReaderBuilder, WriterBuilder};
use std::{iter, path::Path};
use tracing::{debug, instrument};

use super::{persist, staging_file};
use crate::error::{Error, Result};
use crate::process::{PivotTable, Year};

/// Header of the leading index column.
pub const INDEX_HEADER: &str = "Year";

/// Write `table` as CSV: `Year` then the quarter labels in column order, one
/// row per year, empty fields for absent cells. Overwrites `path`.
#[instrument(level = "info", skip(table, path), fields(path = %path.as_ref().display()))]
pub fn export(table: &PivotTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut tmp = staging_file(path)?;
    {
        let mut wtr = WriterBuilder::new().from_writer(tmp.as_file_mut());
        wtr.write_record(
            iter::once(INDEX_HEADER).chain(table.quarters().iter().map(String::as_str)),
        )?;
        for (year, row) in table.rows() {
            let record = iter::once(year.to_string()).chain(
                row.iter()
                    .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(record)?;
        }
        wtr.flush().map_err(|e| Error::io(path, e))?;
    }
    persist(tmp, path)?;
    debug!(rows = table.years().len(), "csv written");
    Ok(())
}

/// Read a file written by [`export`] back into a table.
pub fn read_table(path: impl AsRef<Path>) -> Result<PivotTable> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let headers = rdr.headers()?.clone();
    let quarters: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows: Vec<(Year, Vec<Option<f64>>)> = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let year = Year::from_field(record.get(0).unwrap_or_default());
        let cells = record
            .iter()
            .skip(1)
            .map(|field| {
                let field = field.trim();
                if field.is_empty() {
                    return Ok(None);
                }
                field.parse::<f64>().map(Some).map_err(|e| Error::InvalidTable {
                    path: path.to_path_buf(),
                    message: format!("row {idx}: {field:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push((year, cells));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let (years, cells): (Vec<Year>, Vec<Vec<Option<f64>>>) = rows.into_iter().unzip();
    Ok(PivotTable::from_parts(years, quarters, cells))
}
