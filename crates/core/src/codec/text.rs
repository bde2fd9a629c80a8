//! Plain-text codec: the document is the string.

use super::{DocumentReader, DocumentWriter};
use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::value::{number_to_string, Value};

pub struct TextCodec;

impl DocumentReader for TextCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![MediaType::new("text", "plain")]
    }

    fn read(&self, data: &str, _media_type: &MediaType) -> Result<Value> {
        Ok(Value::string(data))
    }
}

impl DocumentWriter for TextCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![MediaType::new("text", "plain")]
    }

    fn write(&self, value: &Value, _media_type: &MediaType) -> Result<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Num(n) => Ok(number_to_string(*n)),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(Error::type_mismatch("String, Number, Boolean, or Null", other)),
        }
    }
}
