//! CSV codec.
//!
//! Parameters: `separator` (default `,`), `quote` (default `"`), and
//! `header` (default `true`). With a header row the reader produces an
//! array of objects keyed by column name; without one, an array of
//! string arrays. The writer mirrors both shapes.

use super::{DocumentReader, DocumentWriter};
use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::value::{number_to_string, ObjectBuilder, Value};

pub struct CsvCodec;

struct CsvParams {
    separator: u8,
    quote: u8,
    header: bool,
}

impl CsvParams {
    fn from(media_type: &MediaType) -> Result<Self> {
        fn single_byte(value: &str, what: &str) -> Result<u8> {
            let bytes = value.as_bytes();
            if bytes.len() != 1 {
                return Err(Error::Codec(format!(
                    "{what} must be a single character, got: {value}"
                )));
            }
            Ok(bytes[0])
        }
        Ok(Self {
            separator: match media_type.param("separator") {
                Some(s) => single_byte(s, "separator")?,
                None => b',',
            },
            quote: match media_type.param("quote") {
                Some(q) => single_byte(q, "quote")?,
                None => b'"',
            },
            header: media_type.param("header") != Some("false"),
        })
    }
}

impl DocumentReader for CsvCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![
            MediaType::new("application", "csv"),
            MediaType::new("text", "csv"),
        ]
    }

    fn read(&self, data: &str, media_type: &MediaType) -> Result<Value> {
        let params = CsvParams::from(media_type)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(params.separator)
            .quote(params.quote)
            .has_headers(params.header)
            .from_reader(data.as_bytes());

        let mut rows = Vec::new();
        if params.header {
            let headers = reader
                .headers()
                .map_err(|e| Error::Codec(e.to_string()))?
                .clone();
            for record in reader.records() {
                let record = record.map_err(|e| Error::Codec(e.to_string()))?;
                let mut builder = ObjectBuilder::new();
                for (name, field) in headers.iter().zip(record.iter()) {
                    builder.insert_value(name, Value::string(field));
                }
                rows.push(Value::Obj(builder.build()));
            }
        } else {
            for record in reader.records() {
                let record = record.map_err(|e| Error::Codec(e.to_string()))?;
                rows.push(Value::array_of(
                    record.iter().map(Value::string).collect(),
                ));
            }
        }
        Ok(Value::array_of(rows))
    }
}

impl DocumentWriter for CsvCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![
            MediaType::new("application", "csv"),
            MediaType::new("text", "csv"),
        ]
    }

    fn write(&self, value: &Value, media_type: &MediaType) -> Result<String> {
        let params = CsvParams::from(media_type)?;
        let Value::Arr(rows) = value else {
            return Err(Error::type_mismatch("Array", value));
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(params.separator)
            .quote(params.quote)
            .from_writer(Vec::new());

        let mut header_written = false;
        for cell in rows.iter() {
            let row = cell.force()?;
            match &row {
                Value::Obj(obj) => {
                    if params.header && !header_written {
                        writer
                            .write_record(obj.visible_keys())
                            .map_err(|e| Error::Codec(e.to_string()))?;
                        header_written = true;
                    }
                    let mut fields = Vec::new();
                    for (_, cell) in obj.visible_entries() {
                        fields.push(scalar_field(&cell.force()?)?);
                    }
                    writer
                        .write_record(&fields)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                }
                Value::Arr(items) => {
                    let fields = items
                        .iter()
                        .map(|item| scalar_field(&item.force()?))
                        .collect::<Result<Vec<_>>>()?;
                    writer
                        .write_record(&fields)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                }
                other => return Err(Error::type_mismatch("Array or Object", other)),
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Codec(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}

fn scalar_field(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Num(n) => Ok(number_to_string(*n)),
        Value::Str(s) => Ok(s.to_string()),
        other => Err(Error::type_mismatch("String, Number, Boolean, or Null", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CSV: &str = "name,age\nalice,30\nbob,41\n";

    #[test]
    fn test_read_with_header_produces_objects() {
        let mt = MediaType::new("application", "csv");
        let value = CsvCodec.read(CSV, &mt).unwrap();
        let json = value.to_json().unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"name": "alice", "age": "30"},
                {"name": "bob", "age": "41"}
            ])
        );
    }

    #[test]
    fn test_round_trip() {
        let mt = MediaType::new("application", "csv");
        let value = CsvCodec.read(CSV, &mt).unwrap();
        assert_eq!(CsvCodec.write(&value, &mt).unwrap(), CSV);
    }

    #[test]
    fn test_custom_separator() {
        let mt = MediaType::new("application", "csv").with_param("separator", "|");
        let value = CsvCodec.read("a|b\n1|2\n", &mt).unwrap();
        let json = value.to_json().unwrap();
        assert_eq!(json, serde_json::json!([{"a": "1", "b": "2"}]));
    }

    #[test]
    fn test_headerless_rows_are_arrays() {
        let mt = MediaType::new("application", "csv").with_param("header", "false");
        let value = CsvCodec.read("1,2\n3,4\n", &mt).unwrap();
        let json = value.to_json().unwrap();
        assert_eq!(json, serde_json::json!([["1", "2"], ["3", "4"]]));
    }
}
