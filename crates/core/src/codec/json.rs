//! JSON codec.

use super::{DocumentReader, DocumentWriter};
use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::value::Value;

/// `application/json`. Reader preserves object key order; writer honors
/// an `indent` parameter (number of spaces) and `preserveorder=false`
/// (sort keys recursively).
pub struct JsonCodec;

impl DocumentReader for JsonCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![MediaType::new("application", "json")]
    }

    fn read(&self, data: &str, _media_type: &MediaType) -> Result<Value> {
        let json: serde_json::Value =
            serde_json::from_str(data).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Value::from_json(json))
    }
}

impl DocumentWriter for JsonCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![MediaType::new("application", "json")]
    }

    fn write(&self, value: &Value, media_type: &MediaType) -> Result<String> {
        let mut json = value.to_json()?;
        if media_type.param("preserveorder") == Some("false") {
            sort_keys(&mut json);
        }
        match media_type.param("indent") {
            Some(width) => {
                let width: usize = width
                    .parse()
                    .map_err(|_| Error::Codec(format!("invalid indent parameter: {width}")))?;
                let indent = " ".repeat(width);
                let mut out = Vec::new();
                let formatter =
                    serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut serializer =
                    serde_json::Serializer::with_formatter(&mut out, formatter);
                serde::Serialize::serialize(&json, &mut serializer)
                    .map_err(|e| Error::Codec(e.to_string()))?;
                String::from_utf8(out).map_err(|e| Error::Codec(e.to_string()))
            }
            None => serde_json::to_string(&json).map_err(|e| Error::Codec(e.to_string())),
        }
    }
}

fn sort_keys(json: &mut serde_json::Value) {
    match json {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> =
                std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, item) in &mut entries {
                sort_keys(item);
            }
            *map = entries.into_iter().collect();
        }
        serde_json::Value::Array(items) => {
            for item in items {
                sort_keys(item);
            }
        }
        _ => {}
    }
}
