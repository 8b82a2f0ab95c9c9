//! Record codecs: CSV, Parquet and JSON
//!
//! A codec turns a blob into an ordered `Vec` of typed records and back.
//! CSV and Parquet go through Arrow record batches, so a record type only
//! has to describe itself once via [`Columnar`]; JSON goes through serde.

mod csv;
mod json;
mod parquet;

pub use self::csv::CsvCodec;
pub use self::json::JsonCodec;
pub use self::parquet::{DEFAULT_ZSTD_LEVEL, ParquetCodec};

use std::fmt;

use arrow::array::{Array, AsArray, PrimitiveArray, RecordBatch, StringArray};
use arrow::datatypes::{ArrowPrimitiveType, Schema, SchemaRef};
use arrow::error::ArrowError;

/// Physical encoding of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    Parquet,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
        })
    }
}

/// Error decoding or encoding a blob.
#[derive(Debug)]
pub enum CodecError {
    /// Blob is not well-formed for the codec.
    Format { format: Format, message: String },
    /// Stored table layout differs from the record type.
    SchemaMismatch { expected: String, found: String },
    /// Null in a column the record type requires.
    MissingValue { column: String, row: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { format, message } => write!(f, "malformed {format}: {message}"),
            Self::SchemaMismatch { expected, found } => {
                write!(f, "schema mismatch: expected [{expected}], found [{found}]")
            }
            Self::MissingValue { column, row } => {
                write!(f, "null in required column {column} at row {row}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl CodecError {
    pub fn format(format: Format, message: impl fmt::Display) -> Self {
        Self::Format {
            format,
            message: message.to_string(),
        }
    }
}

/// Decode/encode pair for one physical format.
///
/// `encode` is deterministic for a given input order and `decode(encode(r))`
/// yields `r` back for any records of the codec's type.
pub trait Codec {
    type Record;

    fn format(&self) -> Format;

    fn decode(&self, data: &[u8]) -> Result<Vec<Self::Record>, CodecError>;

    fn encode(&self, records: &[Self::Record]) -> Result<Vec<u8>, CodecError>;
}

/// A record type with a fixed Arrow layout.
pub trait Columnar: Sized {
    /// Declared schema; field order is also the CSV column order.
    fn schema() -> SchemaRef;

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError>;

    /// Rebuild records from a batch whose schema already matched [`Columnar::schema`].
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, CodecError>;
}

/// Comma-separated `name:type` list, for mismatch messages.
pub fn describe_schema(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("{}:{}", f.name(), f.data_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compare field names and types, ignoring metadata and nullability.
pub fn check_schema(expected: &Schema, found: &Schema) -> Result<(), CodecError> {
    let same = expected.fields().len() == found.fields().len()
        && expected
            .fields()
            .iter()
            .zip(found.fields().iter())
            .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());
    if same {
        Ok(())
    } else {
        Err(CodecError::SchemaMismatch {
            expected: describe_schema(expected),
            found: describe_schema(found),
        })
    }
}

fn missing_column(batch: &RecordBatch, name: &str, kind: &str) -> CodecError {
    CodecError::SchemaMismatch {
        expected: format!("{name}:{kind}"),
        found: describe_schema(&batch.schema()),
    }
}

/// Typed access to a primitive column by name.
pub fn primitive_column<'a, T: ArrowPrimitiveType>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a PrimitiveArray<T>, CodecError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_primitive_opt::<T>())
        .ok_or_else(|| missing_column(batch, name, &T::DATA_TYPE.to_string()))
}

/// Typed access to a UTF-8 column by name.
pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, CodecError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_string_opt::<i32>())
        .ok_or_else(|| missing_column(batch, name, "Utf8"))
}

/// Value of a non-nullable primitive column, rejecting unexpected nulls.
pub fn required<T: ArrowPrimitiveType>(
    array: &PrimitiveArray<T>,
    row: usize,
    name: &str,
) -> Result<T::Native, CodecError> {
    if array.is_null(row) {
        return Err(CodecError::MissingValue {
            column: name.to_string(),
            row,
        });
    }
    Ok(array.value(row))
}

/// Value of a non-nullable string column, rejecting unexpected nulls.
pub fn required_str(array: &StringArray, row: usize, name: &str) -> Result<String, CodecError> {
    if array.is_null(row) {
        return Err(CodecError::MissingValue {
            column: name.to_string(),
            row,
        });
    }
    Ok(array.value(row).to_string())
}

/// Value of a nullable string column.
pub fn optional_str(array: &StringArray, row: usize) -> Option<String> {
    if array.is_null(row) {
        None
    } else {
        Some(array.value(row).to_string())
    }
}
