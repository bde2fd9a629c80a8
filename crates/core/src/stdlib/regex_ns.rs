//! `ds.regex` — match objects, scanning, and replacement.

use regex::Regex;

use crate::error::{Error, Result};
use crate::eval::{apply, EvalContext};
use crate::value::{Function, ObjectBuilder, Value};

use super::{as_func, as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("regexFullMatch", &["expr", "str"], |_, args| {
            expect_arity("regexFullMatch", args, 2)?;
            let pattern = as_str(&args[0])?;
            let input = as_str(&args[1])?;
            let re = compile(&format!("^(?:{pattern})$"))?;
            Ok(match re.captures(&input) {
                Some(caps) => match_object(&re, &caps),
                None => Value::Null,
            })
        }),
        Function::native("regexPartialMatch", &["expr", "str"], |_, args| {
            expect_arity("regexPartialMatch", args, 2)?;
            let pattern = as_str(&args[0])?;
            let input = as_str(&args[1])?;
            let re = compile(&pattern)?;
            Ok(match re.captures(&input) {
                Some(caps) => match_object(&re, &caps),
                None => Value::Null,
            })
        }),
        Function::native("regexScan", &["expr", "str"], |_, args| {
            expect_arity("regexScan", args, 2)?;
            let pattern = as_str(&args[0])?;
            let input = as_str(&args[1])?;
            let re = compile(&pattern)?;
            Ok(Value::array_of(
                re.captures_iter(&input)
                    .map(|caps| match_object(&re, &caps))
                    .collect(),
            ))
        }),
        Function::native("regexQuoteMeta", &["str"], |_, args| {
            expect_arity("regexQuoteMeta", args, 1)?;
            Ok(Value::string(regex::escape(&as_str(&args[0])?)))
        }),
        Function::native("regexReplace", &["str", "pattern", "replace"], |_, args| {
            expect_arity("regexReplace", args, 3)?;
            let input = as_str(&args[0])?;
            let pattern = as_str(&args[1])?;
            let replacement = as_str(&args[2])?;
            let re = compile(&pattern)?;
            Ok(Value::string(
                re.replace(&input, replacement.as_ref()).into_owned(),
            ))
        }),
        Function::native(
            "regexGlobalReplace",
            &["str", "pattern", "replace"],
            |ctx, args| {
                expect_arity("regexGlobalReplace", args, 3)?;
                let input = as_str(&args[0])?;
                let pattern = as_str(&args[1])?;
                let re = compile(&pattern)?;
                match &args[2] {
                    Value::Str(replacement) => Ok(Value::string(
                        re.replace_all(&input, replacement.as_ref()).into_owned(),
                    )),
                    Value::Func(_) => {
                        let func = as_func(&args[2])?;
                        replace_all_with(ctx, &re, &input, &func)
                    }
                    other => Err(Error::type_mismatch("String or Function", other)),
                }
            },
        ),
    ]
}

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::Domain(format!("Invalid regular expression: {e}")))
}

/// `{string, captures, namedCaptures}` for one match.
fn match_object(re: &Regex, caps: &regex::Captures<'_>) -> Value {
    let mut builder = ObjectBuilder::new();
    builder.insert_value("string", Value::string(&caps[0]));

    let groups: Vec<Value> = caps
        .iter()
        .skip(1)
        .map(|group| match group {
            Some(m) => Value::string(m.as_str()),
            None => Value::Null,
        })
        .collect();
    builder.insert_value("captures", Value::array_of(groups));

    let mut named = ObjectBuilder::new();
    for name in re.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            named.insert_value(name, Value::string(m.as_str()));
        }
    }
    builder.insert_value("namedCaptures", Value::Obj(named.build()));
    Value::Obj(builder.build())
}

/// Callback-driven global replacement: the 1-arg function receives each
/// match object and returns the replacement text.
fn replace_all_with(
    ctx: &EvalContext,
    re: &Regex,
    input: &str,
    func: &Function,
) -> Result<Value> {
    let mut out = String::with_capacity(input.len());
    let mut last_end = 0;
    for caps in re.captures_iter(input) {
        let whole = caps.get(0).ok_or_else(|| {
            Error::Domain("Match without a whole-match group".to_string())
        })?;
        out.push_str(&input[last_end..whole.start()]);
        let replacement = apply(ctx, func, &[match_object(re, &caps)])?;
        out.push_str(&as_str(&replacement)?);
        last_end = whole.end();
    }
    out.push_str(&input[last_end..]);
    Ok(Value::string(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_context;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> Result<Value> {
        let ctx = test_context();
        let func = entries()
            .into_iter()
            .find(|f| f.name() == Some(name))
            .unwrap_or_else(|| panic!("missing {name}"));
        apply(&ctx, &func, args)
    }

    fn json(v: &Value) -> serde_json::Value {
        v.to_json().unwrap()
    }

    #[test]
    fn test_full_match_builds_match_object() {
        let out = call(
            "regexFullMatch",
            &[
                Value::string(r"(?P<user>[a-z]+)@(?P<host>[a-z.]+)"),
                Value::string("test@example.com"),
            ],
        )
        .unwrap();
        assert_eq!(
            json(&out),
            serde_json::json!({
                "string": "test@example.com",
                "captures": ["test", "example.com"],
                "namedCaptures": {"user": "test", "host": "example.com"}
            })
        );
    }

    #[test]
    fn test_full_match_requires_whole_string() {
        let out = call(
            "regexFullMatch",
            &[Value::string("[a-z]+"), Value::string("abc123")],
        )
        .unwrap();
        assert!(matches!(out, Value::Null));
        let out = call(
            "regexPartialMatch",
            &[Value::string("[a-z]+"), Value::string("abc123")],
        )
        .unwrap();
        assert!(matches!(out, Value::Obj(_)));
    }

    #[test]
    fn test_scan_finds_all() {
        let out = call(
            "regexScan",
            &[Value::string(r"(\d+)"), Value::string("a1 b22")],
        )
        .unwrap();
        let serde_json::Value::Array(matches) = json(&out) else {
            panic!("Expected array");
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1]["captures"], serde_json::json!(["22"]));
    }

    #[test]
    fn test_quote_meta() {
        let out = call("regexQuoteMeta", &[Value::string("1.5+2")]).unwrap();
        assert_eq!(json(&out), serde_json::json!(r"1\.5\+2"));
    }

    #[test]
    fn test_replace_first_vs_global() {
        let out = call(
            "regexReplace",
            &[Value::string("aaa"), Value::string("a"), Value::string("b")],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!("baa"));
        let out = call(
            "regexGlobalReplace",
            &[Value::string("aaa"), Value::string("a"), Value::string("b")],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!("bbb"));
    }

    #[test]
    fn test_global_replace_with_function() {
        use crate::ast::Expr;
        use crate::eval::Scope;
        // m => m.string + m.string
        let func = Value::Func(Function::closure(
            vec!["m".to_string()],
            std::rc::Rc::new(Expr::Binary {
                op: crate::ast::BinOp::Add,
                lhs: Box::new(Expr::field(Expr::Ident("m".into()), "string")),
                rhs: Box::new(Expr::field(Expr::Ident("m".into()), "string")),
            }),
            Scope::root(std::collections::HashMap::new()),
        ));
        let out = call(
            "regexGlobalReplace",
            &[Value::string("ab"), Value::string("[ab]"), func],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!("aabb"));
    }
}
