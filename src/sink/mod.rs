// src/sink/mod.rs
//! Outputs for a finished [`PivotTable`](crate::process::PivotTable).

pub mod chart;
pub mod csv;
pub mod parquet;

use std::{fs, path::Path};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Create `path`'s parent and a temp file beside it. Writers fill the temp
/// file and [`persist`] it over `path`, so a failed write leaves nothing behind.
pub(crate) fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))
}

pub(crate) fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
