//! `ds.objects` — entry-wise predicates and merging.

use crate::error::Error;
use crate::value::{Function, ObjectBuilder, Value};

use super::{as_func, as_int, as_obj, call_object_cb, expect_arity, predicate};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("divideBy", &["obj", "num"], |_, args| {
            expect_arity("divideBy", args, 2)?;
            let obj = as_obj(&args[0])?;
            let size = as_int(&args[1])?;
            if size <= 0 {
                return Err(Error::Domain(format!(
                    "Expected a positive chunk size, got: {size}"
                )));
            }
            let entries: Vec<_> = obj.visible_entries().collect();
            let mut out = Vec::new();
            for chunk in entries.chunks(size as usize) {
                let mut builder = ObjectBuilder::new();
                for (key, cell) in chunk {
                    builder.insert(*key, crate::value::Member::normal((*cell).clone()));
                }
                out.push(Value::Obj(builder.build()));
            }
            Ok(Value::array_of(out))
        }),
        Function::native("everyEntry", &["obj", "function"], |ctx, args| {
            expect_arity("everyEntry", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Bool(true));
            }
            let obj = as_obj(&args[0])?;
            let func = as_func(&args[1])?;
            for (index, (key, cell)) in obj.visible_entries().enumerate() {
                if !predicate(call_object_cb(ctx, &func, cell.force()?, key, index)?)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }),
        Function::native("someEntry", &["obj", "function"], |ctx, args| {
            expect_arity("someEntry", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Bool(false));
            }
            let obj = as_obj(&args[0])?;
            let func = as_func(&args[1])?;
            for (index, (key, cell)) in obj.visible_entries().enumerate() {
                if predicate(call_object_cb(ctx, &func, cell.force()?, key, index)?)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }),
        Function::native("mergeWith", &["valueOne", "valueTwo"], |_, args| {
            expect_arity("mergeWith", args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
                (Value::Obj(first), Value::Obj(second)) => {
                    let mut builder = ObjectBuilder::new();
                    for (key, member) in first.all_entries().chain(second.all_entries()) {
                        builder.insert(key, member.clone());
                    }
                    Ok(Value::Obj(builder.build()))
                }
                (Value::Obj(_), other) | (other, _) => {
                    Err(Error::type_mismatch("Object or Null", other))
                }
            }
        }),
        Function::native("takeWhile", &["obj", "function"], |ctx, args| {
            expect_arity("takeWhile", args, 2)?;
            let obj = as_obj(&args[0])?;
            let func = as_func(&args[1])?;
            let mut builder = ObjectBuilder::new();
            for (index, (key, cell)) in obj.visible_entries().enumerate() {
                let value = cell.force()?;
                if !predicate(call_object_cb(ctx, &func, value.clone(), key, index)?)? {
                    break;
                }
                builder.insert_value(key, value);
            }
            Ok(Value::Obj(builder.build()))
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{apply, test_context};
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> crate::error::Result<Value> {
        let ctx = test_context();
        let func = entries()
            .into_iter()
            .find(|f| f.name() == Some(name))
            .unwrap_or_else(|| panic!("missing {name}"));
        apply(&ctx, &func, args)
    }

    fn from_json(s: &str) -> Value {
        Value::from_json(serde_json::from_str(s).unwrap())
    }

    fn json(v: &Value) -> serde_json::Value {
        v.to_json().unwrap()
    }

    fn value_is_num(param: &str, n: f64) -> Value {
        use crate::ast::{BinOp, Expr};
        use crate::eval::Scope;
        Value::Func(Function::closure(
            vec![param.to_string()],
            std::rc::Rc::new(Expr::Binary {
                op: BinOp::Lt,
                lhs: Box::new(Expr::Ident(param.to_string())),
                rhs: Box::new(Expr::Num(n)),
            }),
            Scope::root(std::collections::HashMap::new()),
        ))
    }

    #[test]
    fn test_divide_by_chunks_entries_in_order() {
        let out = call("divideBy", &[from_json(r#"{"a":1,"b":2,"c":3}"#), Value::Num(2.0)])
            .unwrap();
        assert_eq!(
            json(&out),
            serde_json::json!([{"a":1,"b":2},{"c":3}])
        );
    }

    #[test]
    fn test_merge_with_later_keys_win() {
        let out = call(
            "mergeWith",
            &[from_json(r#"{"a":1,"b":2}"#), from_json(r#"{"b":9,"c":3}"#)],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!({"a":1,"b":9,"c":3}));
        if let Value::Obj(obj) = &out {
            assert_eq!(obj.visible_keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_merge_with_null_passthrough() {
        let out = call("mergeWith", &[Value::Null, from_json(r#"{"a":1}"#)]).unwrap();
        assert_eq!(json(&out), serde_json::json!({"a":1}));
    }

    #[test]
    fn test_take_while_stops_at_first_failure() {
        let out = call(
            "takeWhile",
            &[from_json(r#"{"a":1,"b":2,"c":1}"#), value_is_num("v", 2.0)],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!({"a":1}));
    }

    #[test]
    fn test_every_entry_null_is_true() {
        let out = call("everyEntry", &[Value::Null, value_is_num("v", 0.0)]).unwrap();
        assert_eq!(json(&out), serde_json::json!(true));
    }
}
