//! `ds.binaries` — base64 and hex transport of string bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};
use crate::value::{number_to_string, Function, Value};

use super::{as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("toBase64", &["value"], |_, args| {
            expect_arity("toBase64", args, 1)?;
            let text = coerce_text(&args[0])?;
            Ok(Value::string(STANDARD.encode(text.as_bytes())))
        }),
        Function::native("fromBase64", &["value"], |_, args| {
            expect_arity("fromBase64", args, 1)?;
            let encoded = as_str(&args[0])?;
            let bytes = STANDARD
                .decode(encoded.as_ref())
                .map_err(|e| Error::Domain(format!("Could not decode base64: {e}")))?;
            String::from_utf8(bytes)
                .map(Value::string)
                .map_err(|e| Error::Domain(format!("Decoded base64 is not UTF-8: {e}")))
        }),
        Function::native("toHex", &["value"], |_, args| {
            expect_arity("toHex", args, 1)?;
            match &args[0] {
                Value::Num(n) => {
                    let value = *n as i64;
                    Ok(Value::string(format!("{value:X}")))
                }
                Value::Str(s) => Ok(Value::string(hex_encode(s.as_bytes()))),
                other => Err(Error::type_mismatch("String or Number", other)),
            }
        }),
        Function::native("fromHex", &["value"], |_, args| {
            expect_arity("fromHex", args, 1)?;
            let encoded = as_str(&args[0])?;
            let bytes = hex_decode(&encoded)?;
            String::from_utf8(bytes)
                .map(Value::string)
                .map_err(|e| Error::Domain(format!("Decoded hex is not UTF-8: {e}")))
        }),
    ]
}

fn coerce_text(value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Num(n) => Ok(number_to_string(*n)),
        other => Err(Error::type_mismatch("String or Number", other)),
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(Error::Domain(format!("Odd-length hex string: {s}")));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| Error::Domain(format!("Could not decode hex: {s}")))
        })
        .collect()
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
    fn test_base64_round_trip() {
        let out = call("toBase64", &[Value::string("Hello World")]).unwrap();
        assert_eq!(s(&out), "SGVsbG8gV29ybGQ=");
        let out = call("fromBase64", &[out]).unwrap();
        assert_eq!(s(&out), "Hello World");
    }

    #[test]
    fn test_to_base64_renders_integers_without_fraction() {
        let out = call("toBase64", &[Value::Num(100.0)]).unwrap();
        assert_eq!(s(&out), "MTAw");
    }

    #[test]
    fn test_hex_of_string_bytes() {
        let out = call("toHex", &[Value::string("Hello")]).unwrap();
        assert_eq!(s(&out), "48656C6C6F");
        let out = call("fromHex", &[out]).unwrap();
        assert_eq!(s(&out), "Hello");
    }

    #[test]
    fn test_hex_of_number() {
        let out = call("toHex", &[Value::Num(255.0)]).unwrap();
        assert_eq!(s(&out), "FF");
    }
}
