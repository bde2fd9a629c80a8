//! `ds.url` — form-style percent encoding.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Error, Result};
use crate::value::{Function, Value};

use super::{as_str, expect_arity_range};

/// Everything but `[A-Za-z0-9*\-._]` and space is escaped; spaces then
/// swap to `+`.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b' ');

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("encode", &["data", "encoding"], |_, args| {
            expect_arity_range("encode", args, 1, 2)?;
            check_encoding(args.get(1))?;
            let data = as_str(&args[0])?;
            let encoded = utf8_percent_encode(&data, FORM).to_string();
            Ok(Value::string(encoded.replace(' ', "+")))
        }),
        Function::native("decode", &["data", "encoding"], |_, args| {
            expect_arity_range("decode", args, 1, 2)?;
            check_encoding(args.get(1))?;
            let data = as_str(&args[0])?.replace('+', " ");
            percent_decode_str(&data)
                .decode_utf8()
                .map(|s| Value::string(s.into_owned()))
                .map_err(|e| Error::Domain(format!("Could not decode url data: {e}")))
        }),
    ]
}

fn check_encoding(encoding: Option<&Value>) -> Result<()> {
    if let Some(encoding) = encoding {
        let name = as_str(encoding)?;
        if !name.eq_ignore_ascii_case("UTF-8") {
            return Err(Error::Domain(format!("Unsupported encoding: {name}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{apply, test_context};
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> Result<Value> {
        let ctx = test_context();
        let func = entries()
            .into_iter()
            .find(|f| f.name() == Some(name))
            .unwrap_or_else(|| panic!("missing {name}"));
        apply(&ctx, &func, args)
    }

    fn s(v: &Value) -> String {
        match v {
            Value::Str(s) => s.to_string(),
            other => panic!("Expected string, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_form_style() {
        let out = call("encode", &[Value::string("Hello World")]).unwrap();
        assert_eq!(s(&out), "Hello+World");
        let out = call("encode", &[Value::string("a=1&b=2")]).unwrap();
        assert_eq!(s(&out), "a%3D1%26b%3D2");
    }

    #[test]
    fn test_decode_round_trip() {
        let original = "key=value & more?";
        let encoded = call("encode", &[Value::string(original)]).unwrap();
        let decoded = call("decode", &[encoded]).unwrap();
        assert_eq!(s(&decoded), original);
    }

    #[test]
    fn test_unsupported_encoding_rejected() {
        let err = call(
            "encode",
            &[Value::string("x"), Value::string("ISO-8859-1")],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported encoding: ISO-8859-1");
    }
}
