//! `ds.arrays` — slicing, searching, and the join family.

use crate::error::{Error, Result};
use crate::eval::{apply, EvalContext};
use crate::value::{Function, Lazy, ObjectBuilder, Value};

use super::{
    as_arr, as_func, as_int, as_num, call_array_cb, expect_arity, key_string, predicate,
};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("countBy", &["arr", "function"], |ctx, args| {
            expect_arity("countBy", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut count = 0;
            for (index, cell) in items.iter().enumerate() {
                if predicate(call_array_cb(ctx, &func, cell.force()?, index)?)? {
                    count += 1;
                }
            }
            Ok(Value::Num(count as f64))
        }),
        Function::native("deepFlatten", &["arr"], |_, args| {
            expect_arity("deepFlatten", args, 1)?;
            let items = as_arr(&args[0])?;
            let mut out = Vec::new();
            deep_flatten(&items, &mut out)?;
            Ok(Value::array(out))
        }),
        Function::native("divideBy", &["items", "size"], |_, args| {
            expect_arity("divideBy", args, 2)?;
            let items = as_arr(&args[0])?;
            let size = as_int(&args[1])?;
            if size <= 0 {
                return Err(Error::Domain(format!(
                    "Expected a positive chunk size, got: {size}"
                )));
            }
            let chunks = items
                .chunks(size as usize)
                .map(|chunk| Value::array(chunk.to_vec()))
                .collect();
            Ok(Value::array_of(chunks))
        }),
        Function::native("drop", &["arr", "num"], |_, args| {
            expect_arity("drop", args, 2)?;
            let items = as_arr(&args[0])?;
            let n = as_int(&args[1])?.max(0) as usize;
            Ok(Value::array(items.iter().skip(n).cloned().collect()))
        }),
        Function::native("take", &["arr", "num"], |_, args| {
            expect_arity("take", args, 2)?;
            let items = as_arr(&args[0])?;
            let n = as_int(&args[1])?.max(0) as usize;
            Ok(Value::array(items.iter().take(n).cloned().collect()))
        }),
        Function::native("dropWhile", &["arr", "function"], |ctx, args| {
            expect_arity("dropWhile", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut out = Vec::new();
            let mut dropping = true;
            for (index, cell) in items.iter().enumerate() {
                if dropping {
                    let element = cell.force()?;
                    if predicate(call_array_cb(ctx, &func, element, index)?)? {
                        continue;
                    }
                    dropping = false;
                }
                out.push(cell.clone());
            }
            Ok(Value::array(out))
        }),
        Function::native("takeWhile", &["arr", "function"], |ctx, args| {
            expect_arity("takeWhile", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut out = Vec::new();
            for (index, cell) in items.iter().enumerate() {
                let element = cell.force()?;
                if !predicate(call_array_cb(ctx, &func, element, index)?)? {
                    break;
                }
                out.push(cell.clone());
            }
            Ok(Value::array(out))
        }),
        Function::native("duplicates", &["arr"], |_, args| {
            expect_arity("duplicates", args, 1)?;
            let items = as_arr(&args[0])?;
            let values = super::forced(&items)?;
            let mut out: Vec<Value> = Vec::new();
            for (index, value) in values.iter().enumerate() {
                let mut seen_before = false;
                for earlier in &values[..index] {
                    if earlier.structural_eq(value)? {
                        seen_before = true;
                        break;
                    }
                }
                if seen_before {
                    let mut reported = false;
                    for existing in &out {
                        if existing.structural_eq(value)? {
                            reported = true;
                            break;
                        }
                    }
                    if !reported {
                        out.push(value.clone());
                    }
                }
            }
            Ok(Value::array_of(out))
        }),
        Function::native("every", &["arr", "function"], |ctx, args| {
            expect_arity("every", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Bool(true));
            }
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            for (index, cell) in items.iter().enumerate() {
                if !predicate(call_array_cb(ctx, &func, cell.force()?, index)?)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }),
        Function::native("some", &["arr", "function"], |ctx, args| {
            expect_arity("some", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            for (index, cell) in items.iter().enumerate() {
                if predicate(call_array_cb(ctx, &func, cell.force()?, index)?)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }),
        Function::native("firstWith", &["arr", "function"], |ctx, args| {
            expect_arity("firstWith", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            for (index, cell) in items.iter().enumerate() {
                let element = cell.force()?;
                if predicate(call_array_cb(ctx, &func, element.clone(), index)?)? {
                    return Ok(element);
                }
            }
            Ok(Value::Null)
        }),
        Function::native("indexOf", &["container", "value"], |_, args| {
            expect_arity("indexOf", args, 2)?;
            let items = as_arr(&args[0])?;
            for (index, cell) in items.iter().enumerate() {
                if cell.force()?.structural_eq(&args[1])? {
                    return Ok(Value::Num(index as f64));
                }
            }
            Ok(Value::Num(-1.0))
        }),
        Function::native("indexWhere", &["arr", "function"], |ctx, args| {
            expect_arity("indexWhere", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            for (index, cell) in items.iter().enumerate() {
                if predicate(call_array_cb(ctx, &func, cell.force()?, index)?)? {
                    return Ok(Value::Num(index as f64));
                }
            }
            Ok(Value::Num(-1.0))
        }),
        Function::native("join", &["arrL", "arrR", "functL", "functR"], |ctx, args| {
            expect_arity("join", args, 4)?;
            let (lefts, rights) = keyed_sides(ctx, args)?;
            let mut out = Vec::new();
            for (l, lk) in &lefts {
                for (r, rk) in &rights {
                    if lk.structural_eq(rk)? {
                        out.push(pair(Some(l), Some(r)));
                    }
                }
            }
            Ok(Value::array_of(out))
        }),
        Function::native("leftJoin", &["arrL", "arrR", "functL", "functR"], |ctx, args| {
            expect_arity("leftJoin", args, 4)?;
            let (lefts, rights) = keyed_sides(ctx, args)?;
            let mut out = Vec::new();
            let mut unmatched = Vec::new();
            for (l, lk) in &lefts {
                let mut matched = false;
                for (r, rk) in &rights {
                    if lk.structural_eq(rk)? {
                        matched = true;
                        out.push(pair(Some(l), Some(r)));
                    }
                }
                if !matched {
                    unmatched.push(pair(Some(l), None));
                }
            }
            out.extend(unmatched);
            Ok(Value::array_of(out))
        }),
        Function::native("outerJoin", &["arrL", "arrR", "functL", "functR"], |ctx, args| {
            expect_arity("outerJoin", args, 4)?;
            let (lefts, rights) = keyed_sides(ctx, args)?;
            // The right side is consumed as it matches: a right element
            // pairs with at most one left element, while a left element
            // may pair with several rights.
            let mut residue = rights;
            let mut out = Vec::new();
            let mut unmatched_left = Vec::new();
            for (l, lk) in &lefts {
                let mut matched = false;
                let mut remaining = Vec::with_capacity(residue.len());
                for (r, rk) in residue {
                    if lk.structural_eq(&rk)? {
                        matched = true;
                        out.push(pair(Some(l), Some(&r)));
                    } else {
                        remaining.push((r, rk));
                    }
                }
                residue = remaining;
                if !matched {
                    unmatched_left.push(pair(Some(l), None));
                }
            }
            out.extend(unmatched_left);
            for (r, _) in &residue {
                out.push(pair(None, Some(r)));
            }
            Ok(Value::array_of(out))
        }),
        Function::native("occurrences", &["arr", "function"], |ctx, args| {
            expect_arity("occurrences", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut counts: indexmap::IndexMap<String, usize> = indexmap::IndexMap::new();
            for (index, cell) in items.iter().enumerate() {
                let key = key_string(&call_array_cb(ctx, &func, cell.force()?, index)?)?;
                *counts.entry(key).or_default() += 1;
            }
            let mut builder = ObjectBuilder::new();
            for (key, count) in counts {
                builder.insert_value(key, Value::Num(count as f64));
            }
            Ok(Value::Obj(builder.build()))
        }),
        Function::native("partition", &["arr", "function"], |ctx, args| {
            expect_arity("partition", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut success = Vec::new();
            let mut failure = Vec::new();
            for (index, cell) in items.iter().enumerate() {
                if predicate(call_array_cb(ctx, &func, cell.force()?, index)?)? {
                    success.push(cell.clone());
                } else {
                    failure.push(cell.clone());
                }
            }
            let mut builder = ObjectBuilder::new();
            builder.insert_value("success", Value::array(success));
            builder.insert_value("failure", Value::array(failure));
            Ok(Value::Obj(builder.build()))
        }),
        Function::native("slice", &["arr", "start", "end"], |_, args| {
            expect_arity("slice", args, 3)?;
            let items = as_arr(&args[0])?;
            let start = as_int(&args[1])?.max(0) as usize;
            let end = (as_int(&args[2])?.max(0) as usize).min(items.len());
            if start >= end {
                return Ok(Value::array(Vec::new()));
            }
            Ok(Value::array(items[start..end].to_vec()))
        }),
        Function::native("splitAt", &["arr", "index"], |_, args| {
            expect_arity("splitAt", args, 2)?;
            let items = as_arr(&args[0])?;
            let at = (as_int(&args[1])?.max(0) as usize).min(items.len());
            split_object(items[..at].to_vec(), items[at..].to_vec())
        }),
        Function::native("splitWhere", &["arr", "function"], |ctx, args| {
            expect_arity("splitWhere", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut at = items.len();
            for (index, cell) in items.iter().enumerate() {
                if predicate(call_array_cb(ctx, &func, cell.force()?, index)?)? {
                    at = index;
                    break;
                }
            }
            split_object(items[..at].to_vec(), items[at..].to_vec())
        }),
        Function::native("sumBy", &["arr", "function"], |ctx, args| {
            expect_arity("sumBy", args, 2)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut sum = 0.0;
            for cell in items.iter() {
                sum += as_num(&apply(ctx, &func, &[cell.force()?])?)?;
            }
            Ok(Value::Num(sum))
        }),
    ]
}

fn deep_flatten(items: &[Lazy], out: &mut Vec<Lazy>) -> Result<()> {
    for cell in items {
        match cell.force()? {
            Value::Arr(inner) => deep_flatten(&inner, out)?,
            Value::Null => out.push(Lazy::of(Value::Null)),
            _ => out.push(cell.clone()),
        }
    }
    Ok(())
}

/// Force both sides and compute their join keys up front.
#[allow(clippy::type_complexity)]
fn keyed_sides(
    ctx: &EvalContext,
    args: &[Value],
) -> Result<(Vec<(Value, Value)>, Vec<(Value, Value)>)> {
    let key_l = as_func(&args[2])?;
    let key_r = as_func(&args[3])?;
    let keyed = |side: &Value, func: &Function| -> Result<Vec<(Value, Value)>> {
        let items = as_arr(side)?;
        let mut out = Vec::with_capacity(items.len());
        for cell in items.iter() {
            let element = cell.force()?;
            let key = apply(ctx, func, &[element.clone()])?;
            out.push((element, key));
        }
        Ok(out)
    };
    Ok((keyed(&args[0], &key_l)?, keyed(&args[1], &key_r)?))
}

/// A join row: up to two keys, `l` then `r`.
fn pair(left: Option<&Value>, right: Option<&Value>) -> Value {
    let mut builder = ObjectBuilder::new();
    if let Some(left) = left {
        builder.insert_value("l", left.clone());
    }
    if let Some(right) = right {
        builder.insert_value("r", right.clone());
    }
    Value::Obj(builder.build())
}

fn split_object(left: Vec<Lazy>, right: Vec<Lazy>) -> Result<Value> {
    let mut builder = ObjectBuilder::new();
    builder.insert_value("l", Value::array(left));
    builder.insert_value("r", Value::array(right));
    Ok(Value::Obj(builder.build()))
}
