//! JSON codec: a top-level array of objects

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Codec, CodecError, Format};

/// JSON array codec for any serde record type.
///
/// Decoding also accepts a bare top-level object as a one-element
/// sequence, since an earlier writer may have stored a single record.
/// Unknown fields are rejected when the record type denies them.
pub struct JsonCodec<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

fn json_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::format(Format::Json, e)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Record = T;

    fn format(&self) -> Format {
        Format::Json
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<T>, CodecError> {
        let value: Value = serde_json::from_slice(data).map_err(json_err)?;
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    serde_json::from_value(item).map_err(|e| json_err(format!("element {i}: {e}")))
                })
                .collect(),
            obj @ Value::Object(_) => {
                log::warn!("JSON object stored without enclosing array, reading as one record");
                Ok(vec![serde_json::from_value(obj).map_err(json_err)?])
            }
            other => Err(json_err(format!(
                "expected array or object, found {}",
                kind(&other)
            ))),
        }
    }

    fn encode(&self, records: &[T]) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(records).map_err(json_err)
    }
}
