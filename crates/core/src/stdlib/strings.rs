//! `ds.strings` — case transforms, padding, and substring helpers.

use crate::error::{Error, Result};
use crate::value::{Function, Value};

use super::{as_int, as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("appendIfMissing", &["str", "value"], |_, args| {
            expect_arity("appendIfMissing", args, 2)?;
            let s = as_str(&args[0])?;
            let suffix = as_str(&args[1])?;
            if s.ends_with(suffix.as_ref()) {
                Ok(Value::Str(s))
            } else {
                Ok(Value::string(format!("{s}{suffix}")))
            }
        }),
        Function::native("prependIfMissing", &["str", "value"], |_, args| {
            expect_arity("prependIfMissing", args, 2)?;
            let s = as_str(&args[0])?;
            let prefix = as_str(&args[1])?;
            if s.starts_with(prefix.as_ref()) {
                Ok(Value::Str(s))
            } else {
                Ok(Value::string(format!("{prefix}{s}")))
            }
        }),
        Function::native("camelize", &["str"], |_, args| {
            expect_arity("camelize", args, 1)?;
            let s = as_str(&args[0])?;
            let mut out = String::new();
            for (i, word) in words(&s).iter().enumerate() {
                if i == 0 {
                    out.push_str(&word.to_lowercase());
                } else {
                    out.push_str(&capitalize_word(word));
                }
            }
            Ok(Value::string(out))
        }),
        Function::native("capitalize", &["str"], |_, args| {
            expect_arity("capitalize", args, 1)?;
            let s = as_str(&args[0])?;
            let parts: Vec<String> = words(&s).iter().map(|w| capitalize_word(w)).collect();
            Ok(Value::string(parts.join(" ")))
        }),
        Function::native("dasherize", &["str"], |_, args| {
            expect_arity("dasherize", args, 1)?;
            let s = as_str(&args[0])?;
            let parts: Vec<String> = words(&s).iter().map(|w| w.to_lowercase()).collect();
            Ok(Value::string(parts.join("-")))
        }),
        Function::native("underscore", &["str"], |_, args| {
            expect_arity("underscore", args, 1)?;
            let s = as_str(&args[0])?;
            let parts: Vec<String> = words(&s).iter().map(|w| w.to_lowercase()).collect();
            Ok(Value::string(parts.join("_")))
        }),
        Function::native("charCode", &["str"], |_, args| {
            expect_arity("charCode", args, 1)?;
            let s = as_str(&args[0])?;
            let c = s
                .chars()
                .next()
                .ok_or_else(|| Error::Domain("Expected a non-empty string".to_string()))?;
            Ok(Value::Num(c as u32 as f64))
        }),
        Function::native("charCodeAt", &["str", "index"], |_, args| {
            expect_arity("charCodeAt", args, 2)?;
            let s = as_str(&args[0])?;
            let index = as_int(&args[1])? as usize;
            let c = s.chars().nth(index).ok_or_else(|| {
                Error::Domain(format!("String index out of bounds: {index}"))
            })?;
            Ok(Value::Num(c as u32 as f64))
        }),
        Function::native("fromCharCode", &["num"], |_, args| {
            expect_arity("fromCharCode", args, 1)?;
            let code = as_int(&args[0])? as u32;
            let c = char::from_u32(code)
                .ok_or_else(|| Error::Domain(format!("Invalid character code: {code}")))?;
            Ok(Value::string(c.to_string()))
        }),
        Function::native("isAlpha", &["str"], |_, args| {
            expect_arity("isAlpha", args, 1)?;
            char_class(&args[0], |c| c.is_ascii_alphabetic())
        }),
        Function::native("isAlphanumeric", &["str"], |_, args| {
            expect_arity("isAlphanumeric", args, 1)?;
            char_class(&args[0], |c| c.is_ascii_alphanumeric())
        }),
        Function::native("isLowerCase", &["str"], |_, args| {
            expect_arity("isLowerCase", args, 1)?;
            char_class(&args[0], |c| !c.is_alphabetic() || c.is_lowercase())
        }),
        Function::native("isUpperCase", &["str"], |_, args| {
            expect_arity("isUpperCase", args, 1)?;
            char_class(&args[0], |c| !c.is_alphabetic() || c.is_uppercase())
        }),
        Function::native("isNumeric", &["str"], |_, args| {
            expect_arity("isNumeric", args, 1)?;
            match &args[0] {
                Value::Null => Ok(Value::Bool(false)),
                Value::Str(s) => Ok(Value::Bool(s.trim().parse::<f64>().is_ok())),
                other => Err(Error::type_mismatch("String or Null", other)),
            }
        }),
        Function::native("isWhitespace", &["str"], |_, args| {
            expect_arity("isWhitespace", args, 1)?;
            char_class(&args[0], char::is_whitespace)
        }),
        Function::native("leftPad", &["str", "offset"], |_, args| {
            expect_arity("leftPad", args, 2)?;
            let s = as_str(&args[0])?;
            let size = as_int(&args[1])?.max(0) as usize;
            let len = s.chars().count();
            if len >= size {
                Ok(Value::Str(s))
            } else {
                Ok(Value::string(format!("{}{s}", " ".repeat(size - len))))
            }
        }),
        Function::native("rightPad", &["str", "offset"], |_, args| {
            expect_arity("rightPad", args, 2)?;
            let s = as_str(&args[0])?;
            let size = as_int(&args[1])?.max(0) as usize;
            let len = s.chars().count();
            if len >= size {
                Ok(Value::Str(s))
            } else {
                Ok(Value::string(format!("{s}{}", " ".repeat(size - len))))
            }
        }),
        Function::native("ordinalize", &["num"], |_, args| {
            expect_arity("ordinalize", args, 1)?;
            let n = as_int(&args[0])?;
            Ok(Value::string(ordinalize(n)))
        }),
        Function::native("pluralize", &["value"], |_, args| {
            expect_arity("pluralize", args, 1)?;
            let s = as_str(&args[0])?;
            Ok(Value::string(pluralize(&s)))
        }),
        Function::native("singularize", &["value"], |_, args| {
            expect_arity("singularize", args, 1)?;
            let s = as_str(&args[0])?;
            Ok(Value::string(singularize(&s)))
        }),
        Function::native("repeat", &["str", "times"], |_, args| {
            expect_arity("repeat", args, 2)?;
            let s = as_str(&args[0])?;
            let times = as_int(&args[1])?.max(0) as usize;
            Ok(Value::string(s.repeat(times)))
        }),
        Function::native("substringAfter", &["str", "separator"], |_, args| {
            expect_arity("substringAfter", args, 2)?;
            let s = as_str(&args[0])?;
            let sep = as_str(&args[1])?;
            if sep.is_empty() {
                // index-of-empty is zero; the +1 offset drops the first
                // character
                return Ok(Value::string(s.chars().skip(1).collect::<String>()));
            }
            match s.find(sep.as_ref()) {
                Some(at) => Ok(Value::string(&s[at + sep.len()..])),
                None => Ok(Value::string("")),
            }
        }),
        Function::native("substringAfterLast", &["str", "separator"], |_, args| {
            expect_arity("substringAfterLast", args, 2)?;
            let s = as_str(&args[0])?;
            let sep = as_str(&args[1])?;
            if sep.is_empty() {
                return Ok(Value::string(""));
            }
            match s.rfind(sep.as_ref()) {
                Some(at) => Ok(Value::string(&s[at + sep.len()..])),
                None => Ok(Value::string("")),
            }
        }),
        Function::native("substringBefore", &["str", "separator"], |_, args| {
            expect_arity("substringBefore", args, 2)?;
            let s = as_str(&args[0])?;
            let sep = as_str(&args[1])?;
            if sep.is_empty() {
                return Ok(Value::string(""));
            }
            match s.find(sep.as_ref()) {
                Some(at) => Ok(Value::string(&s[..at])),
                None => Ok(Value::Str(s)),
            }
        }),
        Function::native("substringBeforeLast", &["str", "separator"], |_, args| {
            expect_arity("substringBeforeLast", args, 2)?;
            let s = as_str(&args[0])?;
            let sep = as_str(&args[1])?;
            if sep.is_empty() {
                return Ok(Value::Str(s));
            }
            match s.rfind(sep.as_ref()) {
                Some(at) => Ok(Value::string(&s[..at])),
                None => Ok(Value::Str(s)),
            }
        }),
        Function::native("unwrap", &["str", "wrapper"], |_, args| {
            expect_arity("unwrap", args, 2)?;
            let s = as_str(&args[0])?;
            let wrapper = as_str(&args[1])?;
            if !wrapper.is_empty()
                && s.len() >= 2 * wrapper.len()
                && s.starts_with(wrapper.as_ref())
                && s.ends_with(wrapper.as_ref())
            {
                Ok(Value::string(&s[wrapper.len()..s.len() - wrapper.len()]))
            } else {
                Ok(Value::Str(s))
            }
        }),
        Function::native("withMaxSize", &["str", "size"], |_, args| {
            expect_arity("withMaxSize", args, 2)?;
            let s = as_str(&args[0])?;
            let size = as_int(&args[1])?.max(0) as usize;
            Ok(Value::string(s.chars().take(size).collect::<String>()))
        }),
        Function::native("wrapIfMissing", &["str", "wrapper"], |_, args| {
            expect_arity("wrapIfMissing", args, 2)?;
            let s = as_str(&args[0])?;
            let wrapper = as_str(&args[1])?;
            let mut out = String::new();
            if !s.starts_with(wrapper.as_ref()) {
                out.push_str(&wrapper);
            }
            out.push_str(&s);
            if !s.ends_with(wrapper.as_ref()) {
                out.push_str(&wrapper);
            }
            Ok(Value::string(out))
        }),
        Function::native("wrapWith", &["str", "wrapper"], |_, args| {
            expect_arity("wrapWith", args, 2)?;
            let s = as_str(&args[0])?;
            let wrapper = as_str(&args[1])?;
            Ok(Value::string(format!("{wrapper}{s}{wrapper}")))
        }),
    ]
}

/// Shared tokenization: split on runs of `[_\s-]+` and on
/// lowercase→uppercase transitions.
fn words(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in s.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev_lower = c.is_lowercase();
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn char_class(value: &Value, test: impl Fn(char) -> bool) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Bool(false)),
        Value::Str(s) => Ok(Value::Bool(!s.is_empty() && s.chars().all(test))),
        other => Err(Error::type_mismatch("String or Null", other)),
    }
}

fn ordinalize(n: i64) -> String {
    let suffix = match (n.abs() % 10, n.abs() % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn pluralize(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = s.chars().collect();
    let last = chars[chars.len() - 1];
    let before = chars.len().checked_sub(2).map(|i| chars[i]);
    match last {
        // consonant + y -> ies; vowel + y (weekdays included) stays
        // regular
        'y' | 'Y' if before.is_some_and(|c| !is_vowel(c)) => {
            let stem: String = chars[..chars.len() - 1].iter().collect();
            format!("{stem}ies")
        }
        'x' | 'X' => format!("{s}es"),
        _ => format!("{s}s"),
    }
}

fn singularize(s: &str) -> String {
    if let Some(stem) = s.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = s.strip_suffix("xes") {
        return format!("{stem}x");
    }
    s.strip_suffix('s').unwrap_or(s).to_string()
}
