//! Declared input schemas and JSON to Arrow conversion
//!
//! Both inputs are read against a fixed schema rather than an inferred one,
//! so a column that is absent from every record still exists (all null) and
//! a value of the wrong type is reported instead of silently widening the
//! column.

use crate::error::{Error, Result};
use crate::types::col;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::{Arc, LazyLock};

static SONG_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(col::NUM_SONGS, DataType::Int64, true),
        Field::new(col::ARTIST_ID, DataType::Utf8, true),
        Field::new(col::ARTIST_LATITUDE, DataType::Float64, true),
        Field::new(col::ARTIST_LONGITUDE, DataType::Float64, true),
        Field::new(col::ARTIST_LOCATION, DataType::Utf8, true),
        Field::new(col::ARTIST_NAME, DataType::Utf8, true),
        Field::new(col::SONG_ID, DataType::Utf8, true),
        Field::new(col::TITLE, DataType::Utf8, true),
        Field::new(col::DURATION, DataType::Float64, true),
        Field::new(col::YEAR, DataType::Int64, true),
    ]))
});

static LOG_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(col::ARTIST, DataType::Utf8, true),
        Field::new(col::AUTH, DataType::Utf8, true),
        Field::new(col::FIRST_NAME, DataType::Utf8, true),
        Field::new(col::GENDER, DataType::Utf8, true),
        Field::new(col::ITEM_IN_SESSION, DataType::Int64, true),
        Field::new(col::LAST_NAME, DataType::Utf8, true),
        Field::new(col::LENGTH, DataType::Float64, true),
        Field::new(col::LEVEL, DataType::Utf8, true),
        Field::new(col::LOCATION, DataType::Utf8, true),
        Field::new(col::METHOD, DataType::Utf8, true),
        Field::new(col::PAGE, DataType::Utf8, true),
        Field::new(col::REGISTRATION, DataType::Float64, true),
        Field::new(col::SESSION_ID, DataType::Int64, true),
        Field::new(col::SONG, DataType::Utf8, true),
        Field::new(col::STATUS, DataType::Int64, true),
        Field::new(col::TS, DataType::Int64, true),
        Field::new(col::USER_AGENT, DataType::Utf8, true),
        Field::new(col::USER_ID, DataType::Utf8, true),
    ]))
});

/// Schema of a song metadata record (song and artist fields together)
pub fn song_schema() -> SchemaRef {
    Arc::clone(&SONG_SCHEMA)
}

/// Schema of an event log record
pub fn log_schema() -> SchemaRef {
    Arc::clone(&LOG_SCHEMA)
}

/// Convert JSON objects to a record batch with the given schema.
///
/// Fields missing from a record, or explicitly null, become null. Integers
/// are accepted for double columns, and numbers or booleans for string
/// columns (rendered as their JSON text). Anything else is an error.
pub fn records_to_batch(records: &[Value], schema: &SchemaRef) -> Result<RecordBatch> {
    if records.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::clone(schema)));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
            .collect();

        columns.push(build_array(field.name(), &values, field.data_type())?);
    }

    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

/// Build an Arrow array from JSON values
fn build_array(name: &str, values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Int64 => {
            let arr = values
                .iter()
                .enumerate()
                .map(|(row, v)| convert(name, row, *v, "integer", as_integer))
                .collect::<Result<Int64Array>>()?;
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr = values
                .iter()
                .enumerate()
                .map(|(row, v)| convert(name, row, *v, "number", Value::as_f64))
                .collect::<Result<Float64Array>>()?;
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr = values
                .iter()
                .enumerate()
                .map(|(row, v)| convert(name, row, *v, "string", as_text))
                .collect::<Result<StringArray>>()?;
            Ok(Arc::new(arr))
        }

        other => Err(Error::decode(format!(
            "column '{name}' has unsupported type {other:?}"
        ))),
    }
}

fn convert<T>(
    name: &str,
    row: usize,
    value: Option<&Value>,
    expected: &str,
    extract: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(v) => extract(v).map(Some).ok_or_else(|| {
            Error::decode(format!(
                "record {}: field '{name}' expected {expected}, found {v}",
                row + 1
            ))
        }),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}
