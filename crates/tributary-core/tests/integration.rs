use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::error::ArrowError;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use tributary_core::codec::{optional_str, primitive_column, required, required_str, string_column};
use tributary_core::{
    Codec, CodecError, Columnar, ConflictRetry, CsvCodec, JsonCodec, LocalStore, MergeError,
    ObjectStore, ParquetCodec, append_records, ensure_bucket,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Reading {
    id: i64,
    label: String,
    value: f64,
    note: Option<String>,
}

impl Columnar for Reading {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("label", DataType::Utf8, false),
            Field::new("value", DataType::Float64, false),
            Field::new("note", DataType::Utf8, true),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.id))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.label))),
            Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.value))),
            Arc::new(StringArray::from_iter(records.iter().map(|r| r.note.as_deref()))),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, CodecError> {
        let id = primitive_column::<Int64Type>(batch, "id")?;
        let label = string_column(batch, "label")?;
        let value = primitive_column::<Float64Type>(batch, "value")?;
        let note = string_column(batch, "note")?;
        (0..batch.num_rows())
            .map(|i| {
                Ok(Reading {
                    id: required(id, i, "id")?,
                    label: required_str(label, i, "label")?,
                    value: required(value, i, "value")?,
                    note: optional_str(note, i),
                })
            })
            .collect()
    }
}

/// Same column names as `Reading`, but `id` stored as text.
#[derive(Debug, Clone)]
struct TextIdReading;

impl Columnar for TextIdReading {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("label", DataType::Utf8, false),
            Field::new("value", DataType::Float64, false),
            Field::new("note", DataType::Utf8, true),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        let n = records.len();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values((0..n).map(|i| format!("id-{i}")))),
            Arc::new(StringArray::from_iter_values((0..n).map(|_| "x"))),
            Arc::new(Float64Array::from_iter_values((0..n).map(|i| i as f64))),
            Arc::new(StringArray::from_iter((0..n).map(|_| None::<&str>))),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, CodecError> {
        Ok(vec![TextIdReading; batch.num_rows()])
    }
}

fn sample() -> Vec<Reading> {
    vec![
        Reading {
            id: 1,
            label: "alpha".into(),
            value: 100.25,
            note: Some("has, comma".into()),
        },
        Reading {
            id: 2,
            label: "beta".into(),
            value: 1718000000.123456,
            note: None,
        },
        Reading {
            id: 3,
            label: "Very High".into(),
            value: -0.0001,
            note: Some("120/80".into()),
        },
    ]
}

#[test]
fn csv_roundtrip() {
    let codec = CsvCodec::<Reading>::new();
    let data = codec.encode(&sample()).unwrap();
    assert!(String::from_utf8_lossy(&data).starts_with("id,label,value,note"));
    assert_eq!(codec.decode(&data).unwrap(), sample());
}

#[test]
fn csv_header_only_and_empty_decode_to_nothing() {
    let codec = CsvCodec::<Reading>::new();
    let header_only = codec.encode(&[]).unwrap();
    assert!(!header_only.is_empty());
    assert!(codec.decode(&header_only).unwrap().is_empty());
    assert!(codec.decode(b"").unwrap().is_empty());
}

#[test]
fn csv_rejects_unknown_columns() {
    let codec = CsvCodec::<Reading>::new();
    let err = codec
        .decode(b"id,label,value,note,extra\n1,a,1.0,,x\n")
        .unwrap_err();
    assert!(matches!(err, CodecError::Format { .. }));
}

#[test]
fn csv_rejects_malformed_number_in_typed_column() {
    let codec = CsvCodec::<Reading>::new();
    assert!(codec.decode(b"id,label,value,note\n1,a,abc,\n").is_err());
}

#[test]
fn parquet_roundtrip() {
    let codec = ParquetCodec::<Reading>::default();
    let data = codec.encode(&sample()).unwrap();
    assert_eq!(&data[..4], b"PAR1");
    assert_eq!(codec.decode(&data).unwrap(), sample());
}

#[test]
fn parquet_schema_mismatch() {
    let other = ParquetCodec::<TextIdReading>::default()
        .encode(&[TextIdReading, TextIdReading])
        .unwrap();
    let err = ParquetCodec::<Reading>::default().decode(&other).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }));
}

#[test]
fn parquet_garbage_is_format_error() {
    let err = ParquetCodec::<Reading>::default()
        .decode(b"definitely not parquet")
        .unwrap_err();
    assert!(matches!(err, CodecError::Format { .. }));
}

#[test]
fn json_roundtrip_and_bare_object() {
    let codec = JsonCodec::<Reading>::new();
    let data = codec.encode(&sample()).unwrap();
    assert_eq!(codec.decode(&data).unwrap(), sample());

    let bare = br#"{"id": 9, "label": "solo", "value": 1.5, "note": null}"#;
    let decoded = codec.decode(bare).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].label, "solo");
}

#[test]
fn json_rejects_scalars_and_unknown_fields() {
    let codec = JsonCodec::<Reading>::new();
    assert!(codec.decode(b"42").is_err());
    let err = codec
        .decode(br#"[{"id": 1, "label": "a", "value": 1.0, "note": null, "extra": 1}]"#)
        .unwrap_err();
    assert!(err.to_string().contains("element 0"));
}

#[test]
fn reencode_without_new_records_preserves_content() {
    // CSV and JSON: decode -> encode -> decode gives the same records
    let csv = CsvCodec::<Reading>::new();
    let stored = csv.encode(&sample()).unwrap();
    let again = csv.encode(&csv.decode(&stored).unwrap()).unwrap();
    assert_eq!(csv.decode(&again).unwrap(), csv.decode(&stored).unwrap());

    let json = JsonCodec::<Reading>::new();
    let pretty = serde_json::to_vec_pretty(&sample()).unwrap();
    let compact = json.encode(&json.decode(&pretty).unwrap()).unwrap();
    assert_ne!(pretty, compact);
    assert_eq!(json.decode(&compact).unwrap(), sample());
}

#[test]
fn merge_on_local_store_for_every_codec() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();
    ensure_bucket(&store, "b").unwrap();
    let retry = ConflictRetry::default();
    let records = sample();

    fn twice<C: Codec<Record = Reading>>(
        store: &dyn ObjectStore,
        name: &str,
        codec: &C,
        records: &[Reading],
        retry: &ConflictRetry,
    ) {
        append_records(store, "b", name, &records[..1], codec, retry).unwrap();
        let summary = append_records(store, "b", name, &records[1..], codec, retry).unwrap();
        assert_eq!(summary.existing, 1);
        assert_eq!(summary.total, records.len());
        let obj = store.get_object("b", name).unwrap();
        assert_eq!(codec.decode(&obj.data).unwrap(), records);
    }

    twice(&store, "r.csv", &CsvCodec::new(), &records, &retry);
    twice(&store, "r.parquet", &ParquetCodec::default(), &records, &retry);
    twice(&store, "r.json", &JsonCodec::new(), &records, &retry);
}

#[test]
fn merge_refuses_incompatible_parquet_schema() {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();
    store.create_bucket("b").unwrap();
    let foreign = ParquetCodec::<TextIdReading>::default()
        .encode(&[TextIdReading])
        .unwrap();
    store.put_object("b", "r.parquet", &foreign).unwrap();

    let err = append_records(
        &store,
        "b",
        "r.parquet",
        &sample(),
        &ParquetCodec::default(),
        &ConflictRetry::none(),
    )
    .unwrap_err();
    match err {
        MergeError::Decode { source, .. } => {
            assert!(matches!(source, CodecError::SchemaMismatch { .. }))
        }
        other => panic!("expected decode error, got {other}"),
    }
    assert_eq!(store.get_object("b", "r.parquet").unwrap().data, foreign);
}
