//! Golden corpus for the standard-library surface.
//!
//! Each case drives one built-in through a full transformation and
//! pins its serialized output bit-exactly. The goal is to catch
//! regressions in coercion, ordering, and rendering that unit tests of
//! the individual namespaces could miss.

use std::collections::HashMap;

use datamorph_core::{Engine, Expr, Header};

/// A golden test case: a `ds` function path, literal arguments as a
/// JSON array, and the expected JSON-serialized result.
struct GoldenCase {
    path: &'static str,
    args: &'static str,
    expected: &'static str,
    description: &'static str,
}

const fn case(
    path: &'static str,
    args: &'static str,
    expected: &'static str,
    description: &'static str,
) -> GoldenCase {
    GoldenCase {
        path,
        args,
        expected,
        description,
    }
}

const CASES: &[GoldenCase] = &[
    // core coercions
    case("combine", r#"[5, "10"]"#, r#""510""#, "int renders without fraction"),
    case("combine", r#"[5.5, " years"]"#, r#""5.5 years""#, "non-integer default rendering"),
    case("combine", r#"[[1,2],[3]]"#, "[1,2,3]", "array concatenation"),
    case("combine", r#"[{"a":1},{"b":2}]"#, r#"{"a":1,"b":2}"#, "object merge"),
    case("joinBy", r#"[[1,true,"x"], "|"]"#, r#""1|true|x""#, "scalar coercion"),
    case("toString", "[null]", r#""null""#, "null renders as the word"),
    case("sizeOf", "[null]", "0", "sizeOf null"),
    case("sizeOf", r#"["héllo"]"#, "5", "sizeOf counts characters"),
    case("flatten", "[[[1],null,[2]]]", "[1,null,2]", "lazy null pass-through"),
    case("reverse", r#"["abc"]"#, r#""cba""#, "string reverse"),
    case("reverse", r#"[{"a":1,"b":2}]"#, r#"{"b":2,"a":1}"#, "object key order reverse"),
    case("range", "[0,3]", "[0,1,2,3]", "inclusive range"),
    case("splitBy", r#"["a,b,c", ","]"#, r#"["a","b","c"]"#, "plain separator split"),
    case("endsWith", r#"["Hello World", "WORLD"]"#, "true", "case-insensitive endsWith"),
    case("startsWith", r#"["Hello", "he"]"#, "true", "case-insensitive startsWith"),
    case("upper", r#"["quiet"]"#, r#""QUIET""#, "upper"),
    case("typeOf", "[[]]", r#""array""#, "pretty name"),
    case("contains", r#"[[1,2,3], 2]"#, "true", "containment by structural equality"),
    case("max", "[[false,true]]", "true", "max over booleans"),
    case("min", "[[true,false,true]]", "false", "min over booleans"),
    case("parseHex", r#"["FF"]"#, "255", "parseHex"),
    // strings
    case("strings.ordinalize", "[112]", r#""112th""#, "teens take th"),
    case("strings.ordinalize", "[21]", r#""21st""#, "last digit picks st"),
    case("strings.camelize", r#"["customer_first_name"]"#, r#""customerFirstName""#, "camelize"),
    case("strings.underscore", r#"["customerFirstName"]"#, r#""customer_first_name""#, "underscore"),
    case("strings.dasherize", r#"["customer First_name"]"#, r#""customer-first-name""#, "dasherize"),
    case("strings.capitalize", r#"["customer_first_name"]"#, r#""Customer First Name""#, "capitalize"),
    case("strings.pluralize", r#"["Monday"]"#, r#""Mondays""#, "weekdays are regular"),
    case("strings.singularize", r#"["cities"]"#, r#""city""#, "ies collapses to y"),
    case("strings.substringAfter", r#"["hello", ""]"#, r#""ello""#, "empty separator drops first char"),
    case("strings.leftPad", r#"["7", 3]"#, r#""  7""#, "space padding"),
    // arrays
    case("arrays.indexOf", r#"[[1,2,3], 9]"#, "-1", "absent value"),
    case("arrays.duplicates", "[[1,2,1,3,2,1]]", "[1,2]", "first occurrence order"),
    case("arrays.divideBy", "[[1,2,3,4,5], 2]", "[[1,2],[3,4],[5]]", "chunking"),
    // numbers
    case("numbers.fromRadixNumber", r#"["1101000", 2]"#, "104", "radix parse"),
    case("numbers.toRadixNumber", "[104, 2]", r#""1101000""#, "radix render"),
    case("numbers.toBinary", "[-5]", r#""-101""#, "sign then magnitude"),
    case("numbers.toHex", "[255]", r#""ff""#, "lowercase hex"),
    // datetime / period
    case(
        "datetime.atBeginningOfWeek",
        r#"["2020-12-31T23:19:35Z"]"#,
        r#""2020-12-27T00:00:00Z""#,
        "Sunday-rollback week rule",
    ),
    case(
        "datetime.plus",
        r#"["2019-09-18T18:53:41Z", "P2D"]"#,
        r#""2019-09-20T18:53:41Z""#,
        "calendar period addition",
    ),
    case(
        "datetime.minus",
        r#"["2019-09-18T18:53:41Z", "PT2H"]"#,
        r#""2019-09-18T16:53:41Z""#,
        "duration subtraction",
    ),
    case(
        "datetime.compare",
        r#"["2020-01-01T00:00:00Z", "2020-01-02T00:00:00Z"]"#,
        "-1",
        "instant ordering",
    ),
    case(
        "period.between",
        r#"["2019-09-20T18:53:41Z", "2019-12-22T18:53:41Z"]"#,
        r#""P3M2D""#,
        "calendar period between",
    ),
    case("period.duration", r#"[{"days":1,"hours":1}]"#, r#""PT25H""#, "duration normalizes to hours"),
    // binaries / crypto / url
    case("binaries.toBase64", r#"["Hello World"]"#, r#""SGVsbG8gV29ybGQ=""#, "base64"),
    case("binaries.toHex", r#"["Hello"]"#, r#""48656C6C6F""#, "hex of bytes"),
    case(
        "crypto.hash",
        r#"["", "SHA-1"]"#,
        r#""da39a3ee5e6b4b0d3255bfef95601890afd80709""#,
        "empty-string SHA-1",
    ),
    case("url.encode", r#"["Hello World"]"#, r#""Hello+World""#, "form-style spaces"),
    case("url.decode", r#"["Hello+World%21"]"#, r#""Hello World!""#, "form-style decode"),
    // jsonpath
    case(
        "jsonpath.select",
        r#"[{"a":{"b":5}}, "$.a.b"]"#,
        "5",
        "definite path collapses",
    ),
];

/// Build an expression literal from parsed JSON.
fn literal(json: &serde_json::Value) -> Expr {
    match json {
        serde_json::Value::Null => Expr::Null,
        serde_json::Value::Bool(b) => Expr::Bool(*b),
        serde_json::Value::Number(n) => Expr::Num(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Expr::Str(s.clone()),
        serde_json::Value::Array(items) => Expr::Array(items.iter().map(literal).collect()),
        serde_json::Value::Object(map) => Expr::Object(
            map.iter()
                .map(|(k, v)| datamorph_core::ast::Field::new(k.clone(), literal(v)))
                .collect(),
        ),
    }
}

fn call_expr(path: &str, args: &str) -> Expr {
    let mut target = Expr::Ident("ds".to_string());
    for segment in path.split('.') {
        target = Expr::field(target, segment);
    }
    let args: Vec<serde_json::Value> =
        serde_json::from_str(args).expect("golden case args are a JSON array");
    Expr::call(target, args.iter().map(literal).collect())
}

#[test]
fn golden_corpus() {
    let engine = Engine::new();
    let mut failures = Vec::new();
    for case in CASES {
        let expr = call_expr(case.path, case.args);
        match engine.transform_expr(&Header::default(), &expr, &HashMap::new(), None) {
            Ok(document) if document.content == case.expected => {}
            Ok(document) => failures.push(format!(
                "{} ({}): expected {}, got {}",
                case.path, case.description, case.expected, document.content
            )),
            Err(e) => failures.push(format!(
                "{} ({}): errored with: {e}",
                case.path, case.description
            )),
        }
    }
    assert!(
        failures.is_empty(),
        "{} golden case(s) failed:\n{}",
        failures.len(),
        failures.join("\n")
    );
}

#[test]
fn golden_error_messages() {
    let engine = Engine::new();
    let cases: &[(&str, &str, &str)] = &[
        (
            "filter",
            r#"[5, 5]"#,
            "Expected Array, got: number",
        ),
        (
            "max",
            "[[]]",
            "Expected a non-empty array, got: 0 elements",
        ),
        (
            "numbers.fromBinary",
            "[12]",
            "Expected Binary, got: Number",
        ),
        (
            "isBlank",
            "[12]",
            "Expected String or Null, got: number",
        ),
    ];
    for (path, args, expected) in cases {
        let expr = call_expr(path, args);
        let err = engine
            .transform_expr(&Header::default(), &expr, &HashMap::new(), None)
            .expect_err(path);
        assert_eq!(&err.to_string(), expected, "{path}");
    }
}
