//! Codec registry and the bundled document codecs.
//!
//! Readers and writers are capability traits; the registry stores boxed
//! handles and selects by `(type, subtype)` with registration order
//! breaking ties.

mod csv_codec;
mod json;
mod text;
mod xml;
mod yaml;

pub use csv_codec::CsvCodec;
pub use json::JsonCodec;
pub use text::TextCodec;
pub use xml::XmlCodec;
pub use yaml::YamlCodec;

use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::value::Value;

/// Reads documents of the advertised media types into values.
pub trait DocumentReader: Send + Sync {
    /// Media types this reader handles.
    fn media_types(&self) -> Vec<MediaType>;

    /// Construct a value from document text. The media type carries the
    /// merged parameters.
    fn read(&self, data: &str, media_type: &MediaType) -> Result<Value>;

    /// Whether this reader handles the given index.
    fn accepts(&self, media_type: &MediaType) -> bool {
        self.media_types().iter().any(|mt| mt.same_index(media_type))
    }
}

/// Writes values to documents of the advertised media types.
pub trait DocumentWriter: Send + Sync {
    fn media_types(&self) -> Vec<MediaType>;

    fn write(&self, value: &Value, media_type: &MediaType) -> Result<String>;

    fn accepts(&self, media_type: &MediaType) -> bool {
        self.media_types().iter().any(|mt| mt.same_index(media_type))
    }
}

/// Immutable-after-construction registry of codec plugins.
#[derive(Default)]
pub struct CodecRegistry {
    readers: Vec<Box<dyn DocumentReader>>,
    writers: Vec<Box<dyn DocumentWriter>>,
}

impl CodecRegistry {
    /// An empty registry, for callers replacing the bundled codec set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled codecs: JSON, CSV, XML, YAML, and
    /// plain text.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(JsonCodec));
        registry.register_writer(Box::new(JsonCodec));
        registry.register_reader(Box::new(CsvCodec));
        registry.register_writer(Box::new(CsvCodec));
        registry.register_reader(Box::new(XmlCodec));
        registry.register_writer(Box::new(XmlCodec));
        registry.register_reader(Box::new(YamlCodec));
        registry.register_writer(Box::new(YamlCodec));
        registry.register_reader(Box::new(TextCodec));
        registry.register_writer(Box::new(TextCodec));
        registry
    }

    pub fn register_reader(&mut self, reader: Box<dyn DocumentReader>) {
        self.readers.push(reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn DocumentWriter>) {
        self.writers.push(writer);
    }

    /// Read a document into a value; fails with the codec-not-found
    /// message when no reader matches the index.
    pub fn read(&self, data: &str, media_type: &MediaType) -> Result<Value> {
        tracing::debug!(media_type = %media_type, "selecting reader");
        self.readers
            .iter()
            .find(|r| r.accepts(media_type))
            .ok_or_else(|| Error::CodecNotFound {
                kind: media_type.kind.clone(),
                subtype: media_type.subtype.clone(),
            })?
            .read(data, media_type)
    }

    /// Serialize a value; fails with the codec-not-found message when
    /// no writer matches the index.
    pub fn write(&self, value: &Value, media_type: &MediaType) -> Result<String> {
        tracing::debug!(media_type = %media_type, "selecting writer");
        self.writers
            .iter()
            .find(|w| w.accepts(media_type))
            .ok_or_else(|| Error::CodecNotFound {
                kind: media_type.kind.clone(),
                subtype: media_type.subtype.clone(),
            })?
            .write(value, media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_media_type_message() {
        let registry = CodecRegistry::with_defaults();
        let mt = MediaType::new("application", "x-nonexistent");
        let err = registry.read("{}", &mt).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No suitable plugin found for mime type: application/x-nonexistent"
        );
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        struct Fixed(&'static str);
        impl DocumentReader for Fixed {
            fn media_types(&self) -> Vec<MediaType> {
                vec![MediaType::new("application", "test")]
            }
            fn read(&self, _: &str, _: &MediaType) -> Result<Value> {
                Ok(Value::string(self.0))
            }
        }
        let mut registry = CodecRegistry::new();
        registry.register_reader(Box::new(Fixed("first")));
        registry.register_reader(Box::new(Fixed("second")));
        let value = registry
            .read("", &MediaType::new("application", "test"))
            .unwrap();
        assert!(matches!(value, Value::Str(s) if s.as_ref() == "first"));
    }
}
