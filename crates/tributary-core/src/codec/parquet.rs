//! Parquet codec: zstd-compressed single-file tables held in memory

use std::marker::PhantomData;

use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use super::{Codec, CodecError, Columnar, Format, check_schema};

/// Default zstd level for encoded objects.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Parquet codec for any [`Columnar`] record type.
///
/// Declared column types survive the round trip. A stored file whose
/// schema differs from the record schema is a [`CodecError::SchemaMismatch`],
/// so two incompatible tables are never concatenated.
pub struct ParquetCodec<T> {
    zstd_level: i32,
    _record: PhantomData<fn() -> T>,
}

impl<T> ParquetCodec<T> {
    pub fn new(zstd_level: i32) -> Self {
        Self {
            zstd_level,
            _record: PhantomData,
        }
    }
}

impl<T> Default for ParquetCodec<T> {
    fn default() -> Self {
        Self::new(DEFAULT_ZSTD_LEVEL)
    }
}

impl<T> std::fmt::Debug for ParquetCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetCodec")
            .field("zstd_level", &self.zstd_level)
            .finish()
    }
}

fn parquet_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::format(Format::Parquet, e)
}

impl<T: Columnar> Codec for ParquetCodec<T> {
    type Record = T;

    fn format(&self) -> Format {
        Format::Parquet
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<T>, CodecError> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(data))
            .map_err(parquet_err)?;
        check_schema(&T::schema(), builder.schema())?;

        let reader = builder.build().map_err(parquet_err)?;
        let mut records = Vec::new();
        for batch in reader {
            let batch = batch.map_err(parquet_err)?;
            records.extend(T::from_batch(&batch)?);
        }
        Ok(records)
    }

    fn encode(&self, records: &[T]) -> Result<Vec<u8>, CodecError> {
        let batch = T::to_batch(records).map_err(parquet_err)?;
        let level = ZstdLevel::try_new(self.zstd_level).map_err(parquet_err)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build();

        let mut writer =
            ArrowWriter::try_new(Vec::new(), T::schema(), Some(props)).map_err(parquet_err)?;
        writer.write(&batch).map_err(parquet_err)?;
        writer.into_inner().map_err(parquet_err)
    }
}
