//! YAML codec.

use super::{DocumentReader, DocumentWriter};
use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::value::Value;

pub struct YamlCodec;

impl DocumentReader for YamlCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![
            MediaType::new("application", "x-yaml"),
            MediaType::new("text", "yaml"),
        ]
    }

    fn read(&self, data: &str, _media_type: &MediaType) -> Result<Value> {
        let json: serde_json::Value =
            serde_yaml::from_str(data).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Value::from_json(json))
    }
}

impl DocumentWriter for YamlCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![
            MediaType::new("application", "x-yaml"),
            MediaType::new("text", "yaml"),
        ]
    }

    fn write(&self, value: &Value, _media_type: &MediaType) -> Result<String> {
        serde_yaml::to_string(&value.to_json()?).map_err(|e| Error::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_nested_document() {
        let mt = MediaType::new("application", "x-yaml");
        let value = YamlCodec.read("name: alice\ntags:\n  - a\n  - b\n", &mt).unwrap();
        assert_eq!(
            value.to_json().unwrap(),
            serde_json::json!({"name": "alice", "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_write_object() {
        let mt = MediaType::new("application", "x-yaml");
        let value = Value::from_json(serde_json::json!({"a": 1}));
        assert_eq!(YamlCodec.write(&value, &mt).unwrap(), "a: 1\n");
    }
}
