//! Save an hourly series to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, TimestampSecondArray},
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::weather::HourlySeries;

/// Writes one row per hour: a UTC `time` column, then one nullable column per
/// variable in request order.
pub fn save_hourly(series: &HourlySeries, file_path: &Path) -> Result<()> {
    let mut fields = vec![Field::new(
        "time",
        DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
        false,
    )];
    fields.extend(
        series
            .variables
            .iter()
            .map(|v| Field::new(v.as_str(), DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let times: Vec<i64> = series.rows.iter().map(|r| r.time.timestamp()).collect();
    let mut columns: Vec<ArrayRef> =
        vec![Arc::new(TimestampSecondArray::from(times).with_timezone("UTC"))];

    for variable in &series.variables {
        let values: Vec<Option<f64>> = series
            .rows
            .iter()
            .map(|r| r.values.get(variable).copied().flatten())
            .collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let file = File::create(file_path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
