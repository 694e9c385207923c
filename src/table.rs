// src/table.rs

use anyhow::{Context, Result};
use arrow::{
    array::{new_null_array, Array, ArrayRef, AsArray, StringArray},
    compute::{cast, concat_batches},
    datatypes::{
        ArrowTemporalType, DataType, Date32Type, Date64Type, Field, FieldRef, Schema, SchemaRef,
        TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
        TimestampSecondType,
    },
    record_batch::{RecordBatch, RecordBatchOptions},
};
use bytes::Bytes;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{collections::HashMap, iter, sync::Arc};

const NAIVE_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";
const UTC_FMT: &str = "%Y-%m-%d %H:%M:%S%.f+00:00";
const DATE_FMT: &str = "%Y-%m-%d";
const UTC_TZ: &str = "+00:00";

/// Zero rows, zero columns.
pub fn empty_table() -> RecordBatch {
    RecordBatch::new_empty(Arc::new(Schema::empty()))
}

/// Decode a complete Parquet file held in memory into one batch.
pub fn read_parquet(body: Bytes) -> Result<RecordBatch> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(body).context("reading Parquet footer")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building Parquet reader")?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("decoding Parquet row groups")?;
    concat_batches(&schema, &batches).context("joining Parquet row groups")
}

/// Set `name` to `value` on every row, replacing a column of the same name.
pub fn with_constant_column(batch: &RecordBatch, name: &str, value: &str) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let constant: ArrayRef = Arc::new(StringArray::from_iter_values(
        iter::repeat(value).take(rows),
    ));

    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = Vec::with_capacity(batch.num_columns() + 1);
    let mut cols: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns() + 1);
    for (field, col) in schema.fields().iter().zip(batch.columns()) {
        if field.name() != name {
            fields.push(field.clone());
            cols.push(col.clone());
        }
    }
    fields.push(Arc::new(Field::new(name, DataType::Utf8, false)));
    cols.push(constant);

    rebuild(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        cols,
        rows,
    )
    .with_context(|| format!("adding column {}", name))
}

/// Common type for one column name seen with two types.
///
/// - identical                      → unchanged
/// - Null + x                       → x
/// - timestamp + timestamp          → finer unit; zone kept when both agree,
///                                    UTC when both are zoned differently
/// - Date32 + Date64                → Date64
/// - integer + integer              → narrowest integer holding both
/// - other numeric pairs            → Float64
/// - anything else                  → Utf8
pub fn unify_types(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        _ if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Timestamp(ua, tza), DataType::Timestamp(ub, tzb)) => {
            let unit = if unit_rank(ua) >= unit_rank(ub) {
                ua.clone()
            } else {
                ub.clone()
            };
            match (tza, tzb) {
                (None, None) => DataType::Timestamp(unit, None),
                (Some(x), Some(y)) if x == y => DataType::Timestamp(unit, Some(x.clone())),
                (Some(_), Some(_)) => DataType::Timestamp(unit, Some(UTC_TZ.into())),
                _ => DataType::Utf8,
            }
        }
        (DataType::Date32, DataType::Date64) | (DataType::Date64, DataType::Date32) => {
            DataType::Date64
        }
        _ => match (integer_shape(a), integer_shape(b)) {
            (Some(x), Some(y)) => wider_integer(x, y),
            _ if a.is_numeric() && b.is_numeric() => DataType::Float64,
            _ => DataType::Utf8,
        },
    }
}

fn unit_rank(unit: &TimeUnit) -> u8 {
    match unit {
        TimeUnit::Second => 0,
        TimeUnit::Millisecond => 1,
        TimeUnit::Microsecond => 2,
        TimeUnit::Nanosecond => 3,
    }
}

/// (signed, bit width) of an integer type.
fn integer_shape(dt: &DataType) -> Option<(bool, u32)> {
    match dt {
        DataType::Int8 => Some((true, 8)),
        DataType::Int16 => Some((true, 16)),
        DataType::Int32 => Some((true, 32)),
        DataType::Int64 => Some((true, 64)),
        DataType::UInt8 => Some((false, 8)),
        DataType::UInt16 => Some((false, 16)),
        DataType::UInt32 => Some((false, 32)),
        DataType::UInt64 => Some((false, 64)),
        _ => None,
    }
}

// Mixed signedness needs a signed type twice the unsigned width; past 64 bits
// only Float64 holds both.
fn wider_integer((sa, ba): (bool, u32), (sb, bb): (bool, u32)) -> DataType {
    let (signed, bits) = if sa == sb {
        (sa, ba.max(bb))
    } else {
        let (signed_bits, unsigned_bits) = if sa { (ba, bb) } else { (bb, ba) };
        (true, signed_bits.max(unsigned_bits * 2))
    };
    match (signed, bits) {
        (true, 8) => DataType::Int8,
        (true, 16) => DataType::Int16,
        (true, 32) => DataType::Int32,
        (true, 64) => DataType::Int64,
        (false, 8) => DataType::UInt8,
        (false, 16) => DataType::UInt16,
        (false, 32) => DataType::UInt32,
        (false, 64) => DataType::UInt64,
        _ => DataType::Float64,
    }
}

/// Union batches by column name.
///
/// Columns keep first-appearance order, a column missing from a batch is
/// null-filled for that batch's rows, and rows keep concatenation order.
pub fn union_by_name(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let mut order: Vec<String> = Vec::new();
    let mut types: HashMap<String, DataType> = HashMap::new();
    for batch in batches {
        for field in batch.schema().fields() {
            match types.get_mut(field.name()) {
                Some(seen) => *seen = unify_types(seen, field.data_type()),
                None => {
                    order.push(field.name().clone());
                    types.insert(field.name().clone(), field.data_type().clone());
                }
            }
        }
    }

    let schema: SchemaRef = Arc::new(Schema::new(
        order
            .iter()
            .map(|name| Field::new(name, types[name].clone(), true))
            .collect::<Vec<_>>(),
    ));

    let mut aligned = Vec::with_capacity(batches.len());
    for batch in batches {
        let rows = batch.num_rows();
        let cols = schema
            .fields()
            .iter()
            .map(|field| match batch.column_by_name(field.name()) {
                Some(col) if col.data_type() == field.data_type() => Ok(col.clone()),
                Some(col) => conform(col, field.data_type()).with_context(|| {
                    format!(
                        "casting column {} from {} to {}",
                        field.name(),
                        col.data_type(),
                        field.data_type()
                    )
                }),
                None => Ok(new_null_array(field.data_type(), rows)),
            })
            .collect::<Result<Vec<_>>>()?;
        aligned.push(rebuild(schema.clone(), cols, rows)?);
    }

    concat_batches(&schema, &aligned).context("concatenating tables")
}

// Temporal columns falling back to text use the same rendering as
// `temporal_to_text`, not arrow's ISO cast.
fn conform(col: &ArrayRef, target: &DataType) -> Result<ArrayRef> {
    if *target == DataType::Utf8 {
        if let Some(text) = render_temporal(col) {
            return Ok(text);
        }
    }
    cast(col, target).map_err(Into::into)
}

/// Render every timestamp and date column as text.
///
/// Naive timestamps print as `YYYY-MM-DD HH:MM:SS[.fff…]`. Zoned timestamps
/// are stored as UTC instants, so they print in UTC with a `+00:00` suffix and
/// never consult a timezone database. Dates print as `YYYY-MM-DD`.
pub fn temporal_to_text(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = Vec::with_capacity(batch.num_columns());
    let mut cols: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, col) in schema.fields().iter().zip(batch.columns()) {
        match render_temporal(col) {
            Some(text) => {
                fields.push(Arc::new(Field::new(
                    field.name(),
                    DataType::Utf8,
                    field.is_nullable(),
                )));
                cols.push(text);
            }
            None => {
                fields.push(field.clone());
                cols.push(col.clone());
            }
        }
    }

    rebuild(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        cols,
        batch.num_rows(),
    )
    .context("rendering temporal columns")
}

fn render_temporal(col: &ArrayRef) -> Option<ArrayRef> {
    let (values, fmt) = match col.data_type() {
        DataType::Timestamp(unit, tz) => {
            let values = match unit {
                TimeUnit::Second => datetimes::<TimestampSecondType>(col),
                TimeUnit::Millisecond => datetimes::<TimestampMillisecondType>(col),
                TimeUnit::Microsecond => datetimes::<TimestampMicrosecondType>(col),
                TimeUnit::Nanosecond => datetimes::<TimestampNanosecondType>(col),
            };
            (values, if tz.is_some() { UTC_FMT } else { NAIVE_FMT })
        }
        DataType::Date32 => (datetimes::<Date32Type>(col), DATE_FMT),
        DataType::Date64 => (datetimes::<Date64Type>(col), DATE_FMT),
        _ => return None,
    };

    let text: StringArray = values
        .into_iter()
        .map(|v| v.map(|dt| dt.format(fmt).to_string()))
        .collect();
    Some(Arc::new(text))
}

fn datetimes<T>(col: &ArrayRef) -> Vec<Option<NaiveDateTime>>
where
    T: ArrowTemporalType,
    i64: From<T::Native>,
{
    let arr = col.as_primitive::<T>();
    (0..arr.len())
        .map(|i| {
            if arr.is_null(i) {
                None
            } else {
                arr.value_as_datetime(i)
            }
        })
        .collect()
}

// Row count is explicit so zero-column batches survive.
fn rebuild(schema: SchemaRef, cols: Vec<ArrayRef>, rows: usize) -> Result<RecordBatch> {
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    RecordBatch::try_new_with_options(schema, cols, &options).map_err(Into::into)
}
