//! `ds.xml` — helpers over the XML codec's element mapping.

use crate::error::{Error, Result};
use crate::value::{Function, Object, Value};

use super::{as_obj, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![Function::native("flattenContents", &["element"], |_, args| {
        expect_arity("flattenContents", args, 1)?;
        let element = as_obj(&args[0])?;
        let mut out = String::new();
        flatten_text(&element, &mut out)?;
        Ok(Value::string(out))
    })]
}

/// Concatenate the text content of an element and its children in
/// document order. Attribute members carry no content.
fn flatten_text(element: &Object, out: &mut String) -> Result<()> {
    for (key, cell) in element.visible_entries() {
        if key.starts_with('@') {
            continue;
        }
        match cell.force()? {
            Value::Str(text) if key == "$" => out.push_str(&text),
            Value::Obj(child) => flatten_text(&child, out)?,
            Value::Arr(children) => {
                for child in children.iter() {
                    match child.force()? {
                        Value::Obj(child) => flatten_text(&child, out)?,
                        Value::Str(text) => out.push_str(&text),
                        other => {
                            return Err(Error::type_mismatch("Object or String", &other))
                        }
                    }
                }
            }
            Value::Str(text) => out.push_str(&text),
            other => return Err(Error::type_mismatch("Object, Array, or String", &other)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DocumentReader, XmlCodec};
    use crate::eval::{apply, test_context};
    use crate::media::MediaType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_contents_of_mixed_element() {
        let doc = XmlCodec
            .read(
                "<p>hello <b>big</b> <i>world</i></p>",
                &MediaType::new("application", "xml"),
            )
            .unwrap();
        let Value::Obj(root) = doc else { panic!("Expected object") };
        let element = root.get_visible("p").unwrap().force().unwrap();

        let ctx = test_context();
        let func = entries().pop().unwrap();
        let out = apply(&ctx, &func, &[element]).unwrap();
        // whitespace-only segments are trimmed by the reader; the
        // element's own text lands ahead of its children
        let Value::Str(text) = out else { panic!("Expected string") };
        assert_eq!(text.as_ref(), "hellobigworld");
    }
}
