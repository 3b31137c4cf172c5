//! Parquet read/write for record sets.
//!
//! Reading maps arrow types onto `Value` variants; writing infers one arrow
//! type per column from the values it holds.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float64Array, Int64Array, RecordBatch,
    RecordBatchOptions, StringArray, TimestampMicrosecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Field, Float64Type, Int64Type, Schema, TimeUnit,
    TimestampMicrosecondType,
};
use arrow::util::display::array_value_to_string;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::debug;

use super::{RecordSet, Value};
use crate::error::{EtlError, Result};

/// Read a whole parquet file into memory
pub fn read_parquet(path: &Path) -> Result<RecordSet> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut columns: Vec<(String, Vec<Value>)> = schema
        .fields()
        .iter()
        .map(|f| (f.name().clone(), Vec::new()))
        .collect();
    let mut rows = 0usize;

    for batch in reader {
        let batch = batch?;
        rows += batch.num_rows();
        for (i, array) in batch.columns().iter().enumerate() {
            columns[i].1.extend(array_values(array)?);
        }
    }

    debug!(path = %path.display(), rows, columns = columns.len(), "read parquet");
    RecordSet::from_parts(columns, rows)
}

fn array_values(array: &ArrayRef) -> Result<Vec<Value>> {
    let len = array.len();
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; len],
        DataType::Boolean => {
            let arr = array.as_boolean();
            (0..len)
                .map(|i| if arr.is_null(i) { Value::Null } else { Value::Bool(arr.value(i)) })
                .collect()
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let casted = cast(array, &DataType::Int64)?;
            let arr = casted.as_primitive::<Int64Type>();
            (0..len)
                .map(|i| if arr.is_null(i) { Value::Null } else { Value::Int(arr.value(i)) })
                .collect()
        }
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => {
            let casted = cast(array, &DataType::Float64)?;
            let arr = casted.as_primitive::<Float64Type>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        Value::from(arr.value(i))
                    }
                })
                .collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let casted = cast(array, &DataType::Utf8)?;
            let arr = casted.as_string::<i32>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        Value::Str(arr.value(i).to_string())
                    }
                })
                .collect()
        }
        DataType::Date32 | DataType::Date64 => {
            let casted = cast(array, &DataType::Date32)?;
            let arr = casted.as_primitive::<Date32Type>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        arr.value_as_date(i).map(Value::Date).unwrap_or(Value::Null)
                    }
                })
                .collect()
        }
        DataType::Timestamp(_, tz) => {
            let casted = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, tz.clone()))?;
            let arr = casted.as_primitive::<TimestampMicrosecondType>();
            (0..len)
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        arr.value_as_datetime(i)
                            .map(Value::DateTime)
                            .unwrap_or(Value::Null)
                    }
                })
                .collect()
        }
        DataType::Dictionary(_, value_type) => {
            let decoded = cast(array, value_type)?;
            return array_values(&decoded);
        }
        _ => (0..len)
            .map(|i| {
                if array.is_null(i) {
                    Ok(Value::Null)
                } else {
                    array_value_to_string(array.as_ref(), i).map(Value::Str)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(values)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Str,
    Date,
    DateTime,
    Text,
}

fn infer_kind(values: &[Value]) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let this = match value {
            Value::Null => continue,
            Value::Int(_) => ColumnKind::Int,
            Value::Float(_) => ColumnKind::Float,
            Value::Bool(_) => ColumnKind::Bool,
            Value::Str(_) => ColumnKind::Str,
            Value::Date(_) => ColumnKind::Date,
            Value::DateTime(_) => ColumnKind::DateTime,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Str)
}

fn build_array(values: &[Value]) -> (DataType, ArrayRef) {
    match infer_kind(values) {
        ColumnKind::Int => (
            DataType::Int64,
            Arc::new(values.iter().map(Value::as_i64).collect::<Int64Array>()),
        ),
        ColumnKind::Float => (
            DataType::Float64,
            Arc::new(values.iter().map(Value::as_f64).collect::<Float64Array>()),
        ),
        ColumnKind::Bool => (
            DataType::Boolean,
            Arc::new(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect::<BooleanArray>(),
            ),
        ),
        ColumnKind::Date => (
            DataType::Date32,
            Arc::new(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Date(d) => Some(days_since_epoch(*d)),
                        _ => None,
                    })
                    .collect::<Date32Array>(),
            ),
        ),
        ColumnKind::DateTime => (
            DataType::Timestamp(TimeUnit::Microsecond, None),
            Arc::new(
                values
                    .iter()
                    .map(|v| match v {
                        Value::DateTime(dt) => Some(dt.and_utc().timestamp_micros()),
                        _ => None,
                    })
                    .collect::<TimestampMicrosecondArray>(),
            ),
        ),
        ColumnKind::Str | ColumnKind::Text => (
            DataType::Utf8,
            Arc::new(values.iter().map(Value::to_text).collect::<StringArray>()),
        ),
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

/// Write a record set as a single-row-group Snappy parquet file, replacing any
/// existing file at `path`.
pub fn write_parquet(set: &RecordSet, path: &Path) -> Result<()> {
    if set.num_columns() == 0 {
        return Err(EtlError::Schema {
            table: path.display().to_string(),
            message: "cannot write a record set without columns".to_string(),
        });
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut fields = Vec::with_capacity(set.num_columns());
    let mut arrays = Vec::with_capacity(set.num_columns());
    for column in set.columns() {
        let (data_type, array) = build_array(&column.values);
        fields.push(Field::new(column.name.as_str(), data_type, true));
        arrays.push(array);
    }
    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(set.num_rows()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    debug!(path = %path.display(), rows = set.num_rows(), "wrote parquet");
    Ok(())
}
