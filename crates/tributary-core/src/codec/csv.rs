//! CSV codec: header row + one record per line, via arrow-csv

use std::io::Cursor;
use std::marker::PhantomData;

use arrow::csv::reader::Format as CsvFormat;
use arrow::csv::{ReaderBuilder, WriterBuilder};

use super::{Codec, CodecError, Columnar, Format};

/// CSV codec for any [`Columnar`] record type.
///
/// The header must list exactly the record's fields, in schema order.
/// Column types come from the record schema: a text-only schema keeps every
/// value as a string and leaves coercion to the caller.
pub struct CsvCodec<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> CsvCodec<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for CsvCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for CsvCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsvCodec")
    }
}

fn csv_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::format(Format::Csv, e)
}

/// Column names from the header row.
fn header_names(data: &[u8]) -> Result<Vec<String>, CodecError> {
    let (schema, _) = CsvFormat::default()
        .with_header(true)
        .infer_schema(Cursor::new(data), Some(0))
        .map_err(csv_err)?;
    Ok(schema.fields().iter().map(|f| f.name().clone()).collect())
}

impl<T: Columnar> Codec for CsvCodec<T> {
    type Record = T;

    fn format(&self) -> Format {
        Format::Csv
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<T>, CodecError> {
        // Zero-byte object: a table that never got its header
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let schema = T::schema();
        let expected: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        let found = header_names(data)?;
        if found != expected {
            return Err(csv_err(format!(
                "header [{}] does not match fields [{}]",
                found.join(","),
                expected.join(",")
            )));
        }

        let reader = ReaderBuilder::new(schema)
            .with_header(true)
            .build(Cursor::new(data))
            .map_err(csv_err)?;

        let mut records = Vec::new();
        for batch in reader {
            let batch = batch.map_err(csv_err)?;
            records.extend(T::from_batch(&batch)?);
        }
        Ok(records)
    }

    fn encode(&self, records: &[T]) -> Result<Vec<u8>, CodecError> {
        let batch = T::to_batch(records).map_err(csv_err)?;
        let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
        // Header is written even for an empty batch
        writer.write(&batch).map_err(csv_err)?;
        Ok(writer.into_inner())
    }
}
