//! XML codec.
//!
//! Maps a single-rooted document to an object: attributes become
//! `@name` keys, concatenated text content lands under `$`, and child
//! elements keep their names, collapsing to arrays when a name repeats.
//! The writer reverses the mapping and expects a single-keyed object.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{DocumentReader, DocumentWriter};
use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::value::{number_to_string, Object, ObjectBuilder, Value};

pub struct XmlCodec;

struct Pending {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<(String, Value)>,
}

impl Pending {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Codec(e.to_string()))?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                attr.unescape_value()
                    .map_err(|e| Error::Codec(e.to_string()))?
                    .into_owned(),
            ));
        }
        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    fn finish(self) -> (String, Value) {
        let mut builder = ObjectBuilder::new();
        for (key, value) in self.attributes {
            builder.insert_value(format!("@{key}"), Value::string(value));
        }
        if !self.text.is_empty() {
            builder.insert_value("$", Value::string(self.text));
        }
        // Group repeated child names into arrays, first position wins.
        let mut grouped: indexmap::IndexMap<String, Vec<Value>> = indexmap::IndexMap::new();
        for (name, value) in self.children {
            grouped.entry(name).or_default().push(value);
        }
        for (name, mut values) in grouped {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::array_of(values)
            };
            builder.insert_value(name, value);
        }
        (self.name, Value::Obj(builder.build()))
    }
}

impl DocumentReader for XmlCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![
            MediaType::new("application", "xml"),
            MediaType::new("text", "xml"),
        ]
    }

    fn read(&self, data: &str, _media_type: &MediaType) -> Result<Value> {
        let mut reader = Reader::from_str(data);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Pending> = Vec::new();
        let mut root: Option<(String, Value)> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(Pending::from_start(&start)?),
                Ok(Event::Empty(start)) => {
                    let (name, value) = Pending::from_start(&start)?.finish();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push((name, value)),
                        None => root = Some((name, value)),
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|e| Error::Codec(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text
                            .push_str(&String::from_utf8_lossy(data.as_ref()));
                    }
                }
                Ok(Event::End(_)) => {
                    let (name, value) = stack
                        .pop()
                        .ok_or_else(|| Error::Codec("unbalanced end tag".to_string()))?
                        .finish();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push((name, value)),
                        None => root = Some((name, value)),
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Codec(e.to_string())),
            }
        }

        let (name, value) = root.ok_or_else(|| Error::Codec("no root element".to_string()))?;
        let mut builder = ObjectBuilder::new();
        builder.insert_value(name, value);
        Ok(Value::Obj(builder.build()))
    }
}

impl DocumentWriter for XmlCodec {
    fn media_types(&self) -> Vec<MediaType> {
        vec![
            MediaType::new("application", "xml"),
            MediaType::new("text", "xml"),
        ]
    }

    fn write(&self, value: &Value, _media_type: &MediaType) -> Result<String> {
        let Value::Obj(obj) = value else {
            return Err(Error::type_mismatch("Object", value));
        };
        let mut entries = obj.visible_entries();
        let (root_name, root_cell) = entries
            .next()
            .ok_or_else(|| Error::Codec("expected a single root element".to_string()))?;
        if entries.next().is_some() {
            return Err(Error::Codec("expected a single root element".to_string()));
        }

        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, root_name, &root_cell.force()?)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Codec(e.to_string()))
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Obj(obj) => write_mapped_element(writer, name, obj),
        Value::Arr(items) => {
            for item in items.iter() {
                write_element(writer, name, &item.force()?)?;
            }
            Ok(())
        }
        scalar => {
            let text = scalar_text(scalar)?;
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .and_then(|()| writer.write_event(Event::Text(BytesText::new(&text))))
                .and_then(|()| writer.write_event(Event::End(BytesEnd::new(name))))
                .map_err(|e| Error::Codec(e.to_string()))
        }
    }
}

fn write_mapped_element(writer: &mut Writer<Vec<u8>>, name: &str, obj: &Object) -> Result<()> {
    let mut start = BytesStart::new(name);
    let mut text = None;
    let mut children = Vec::new();
    for (key, cell) in obj.visible_entries() {
        if let Some(attr) = key.strip_prefix('@') {
            start.push_attribute((attr, scalar_text(&cell.force()?)?.as_str()));
        } else if key == "$" {
            text = Some(scalar_text(&cell.force()?)?);
        } else {
            children.push((key.to_string(), cell.force()?));
        }
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| Error::Codec(e.to_string()))?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(|e| Error::Codec(e.to_string()))?;
    }
    for (child_name, child) in children {
        write_element(writer, &child_name, &child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| Error::Codec(e.to_string()))
}

fn scalar_text(value: &Value) -> Result<String> {
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

    const DOC: &str = r#"<order id="7"><item>widget</item><item>gadget</item><note>rush</note></order>"#;

    #[test]
    fn test_read_maps_attributes_text_and_repeats() {
        let mt = MediaType::new("application", "xml");
        let value = XmlCodec.read(DOC, &mt).unwrap();
        assert_eq!(
            value.to_json().unwrap(),
            serde_json::json!({
                "order": {
                    "@id": "7",
                    "item": [{"$": "widget"}, {"$": "gadget"}],
                    "note": {"$": "rush"}
                }
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let mt = MediaType::new("application", "xml");
        let value = XmlCodec.read(DOC, &mt).unwrap();
        assert_eq!(XmlCodec.write(&value, &mt).unwrap(), DOC);
    }

    #[test]
    fn test_write_rejects_multi_rooted() {
        let mt = MediaType::new("application", "xml");
        let mut builder = ObjectBuilder::new();
        builder.insert_value("a", Value::Null);
        builder.insert_value("b", Value::Null);
        assert!(XmlCodec.write(&Value::Obj(builder.build()), &mt).is_err());
    }
}
