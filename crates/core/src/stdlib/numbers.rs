//! `ds.numbers` — signed integer base conversions.

use crate::error::{Error, Result};
use crate::value::{number_to_string, Function, Value};

use super::{as_int, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("toBinary", &["num"], |_, args| {
            expect_arity("toBinary", args, 1)?;
            Ok(Value::string(render_radix(as_int(&args[0])?, 2)))
        }),
        Function::native("toHex", &["num"], |_, args| {
            expect_arity("toHex", args, 1)?;
            Ok(Value::string(render_radix(as_int(&args[0])?, 16)))
        }),
        Function::native("toRadixNumber", &["num", "radix"], |_, args| {
            expect_arity("toRadixNumber", args, 2)?;
            let radix = radix_arg(&args[1])?;
            Ok(Value::string(render_radix(as_int(&args[0])?, radix)))
        }),
        Function::native("fromBinary", &["value"], |_, args| {
            expect_arity("fromBinary", args, 1)?;
            parse_value(&args[0], 2, "Binary")
        }),
        Function::native("fromHex", &["value"], |_, args| {
            expect_arity("fromHex", args, 1)?;
            parse_value(&args[0], 16, "Hex")
        }),
        Function::native("fromRadixNumber", &["num", "radix"], |_, args| {
            expect_arity("fromRadixNumber", args, 2)?;
            let radix = radix_arg(&args[1])?;
            parse_value(&args[0], radix, "Radix")
        }),
    ]
}

fn radix_arg(value: &Value) -> Result<u32> {
    let radix = as_int(value)?;
    if !(2..=36).contains(&radix) {
        return Err(Error::Domain(format!(
            "Expected a radix between 2 and 36, got: {radix}"
        )));
    }
    Ok(radix as u32)
}

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Signed rendering: a leading `-` followed by the magnitude's digits.
fn render_radix(n: i64, radix: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut magnitude = n.unsigned_abs();
    let mut digits = Vec::new();
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % u64::from(radix)) as usize] as char);
        magnitude /= u64::from(radix);
    }
    let body: String = digits.into_iter().rev().collect();
    if n < 0 {
        format!("-{body}")
    } else {
        body
    }
}

/// Parse a number or string in the given base. A Number argument is
/// validated through its decimal rendering: digits beyond the base are
/// a type error, not a parse error.
fn parse_value(value: &Value, radix: u32, base_name: &str) -> Result<Value> {
    let (digits, pretty) = match value {
        Value::Num(n) => (number_to_string(*n), "Number"),
        Value::Str(s) => (s.to_string(), "String"),
        other => return Err(Error::type_mismatch(base_name, other)),
    };
    let (negative, magnitude) = match digits.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, digits.as_str()),
    };
    let parsed = i64::from_str_radix(magnitude, radix).map_err(|_| {
        Error::type_mismatch_str(base_name, pretty)
    })?;
    let n = if negative { -parsed } else { parsed };
    Ok(Value::Num(n as f64))
}
