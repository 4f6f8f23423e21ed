// src/sink/parquet.rs

use ::parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{path::Path, sync::Arc};
use tracing::{debug, instrument};

use super::{persist, staging_file};
use crate::error::Result;
use crate::process::{PivotTable, Year};

/// Name of the year column in the Arrow schema.
pub const YEAR_COLUMN: &str = "year";

/// Build a single-batch Arrow view of the table.
///
/// - `year` → Int64 when every year is numeric, Utf8 otherwise
/// - one nullable Float64 column per quarter; absent cells are nulls
pub fn to_record_batch(table: &PivotTable) -> Result<RecordBatch> {
    let numeric_years = table.years().iter().all(|y| matches!(y, Year::Number(_)));

    let (year_type, year_array): (DataType, ArrayRef) = if numeric_years {
        let values = table.years().iter().filter_map(|y| match y {
            Year::Number(n) => Some(*n),
            Year::Label(_) => None,
        });
        (
            DataType::Int64,
            Arc::new(Int64Array::from_iter_values(values)),
        )
    } else {
        (
            DataType::Utf8,
            Arc::new(StringArray::from_iter_values(
                table.years().iter().map(ToString::to_string),
            )),
        )
    };

    let mut fields = Vec::with_capacity(table.quarters().len() + 1);
    fields.push(Field::new(YEAR_COLUMN, year_type, false));
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    columns.push(year_array);

    for (c, quarter) in table.quarters().iter().enumerate() {
        fields.push(Field::new(quarter, DataType::Float64, true));
        let values: Vec<Option<f64>> = table.rows().map(|(_, row)| row[c]).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Write the table as a Snappy-compressed Parquet file at `path`.
#[instrument(level = "info", skip(table, path), fields(path = %path.as_ref().display()))]
pub fn export(table: &PivotTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let batch = to_record_batch(table)?;

    let mut tmp = staging_file(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    persist(tmp, path)?;

    debug!(rows = batch.num_rows(), "parquet written");
    Ok(())
}
