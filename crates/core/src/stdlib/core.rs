//! Root `ds` built-ins: the core array/object/string primitives plus
//! the codec-facing `read`/`write`/`readUrl` entries.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::eval::{apply, EvalContext};
use crate::media::MediaType;
use crate::value::{Function, Lazy, Member, Object, ObjectBuilder, Value};

use super::{
    as_arr, as_func, as_num, as_obj, as_str, call_array_cb, call_object_cb, expect_arity,
    expect_arity_range, forced, key_string, predicate, to_display_string,
};

pub(crate) fn install(root: &mut ObjectBuilder) {
    super::install_functions(root, entries());
}

fn entries() -> Vec<Function> {
    vec![
        Function::native("append", &["array", "value"], |_, args| {
            expect_arity("append", args, 2)?;
            let items = as_arr(&args[0])?;
            let mut out = items.as_ref().clone();
            out.push(Lazy::of(args[1].clone()));
            Ok(Value::array(out))
        }),
        Function::native("prepend", &["array", "value"], |_, args| {
            expect_arity("prepend", args, 2)?;
            let items = as_arr(&args[0])?;
            let mut out = Vec::with_capacity(items.len() + 1);
            out.push(Lazy::of(args[1].clone()));
            out.extend(items.iter().cloned());
            Ok(Value::array(out))
        }),
        Function::native("combine", &["first", "second"], |_, args| {
            expect_arity("combine", args, 2)?;
            combine(&args[0], &args[1])
        }),
        Function::native("contains", &["container", "value"], |_, args| {
            expect_arity("contains", args, 2)?;
            match &args[0] {
                Value::Arr(items) => {
                    for cell in items.iter() {
                        if cell.force()?.structural_eq(&args[1])? {
                            return Ok(Value::Bool(true));
                        }
                    }
                    Ok(Value::Bool(false))
                }
                Value::Str(s) => {
                    let needle = as_str(&args[1])?;
                    Ok(Value::Bool(s.contains(needle.as_ref())))
                }
                other => Err(Error::type_mismatch("Array or String", other)),
            }
        }),
        Function::native("distinctBy", &["container", "function"], |ctx, args| {
            expect_arity("distinctBy", args, 2)?;
            let func = as_func(&args[1])?;
            match &args[0] {
                Value::Arr(items) => {
                    let mut seen: Vec<Value> = Vec::new();
                    let mut out = Vec::new();
                    for (index, cell) in items.iter().enumerate() {
                        let element = cell.force()?;
                        let key = call_array_cb(ctx, &func, element.clone(), index)?;
                        if !contains_value(&seen, &key)? {
                            seen.push(key);
                            out.push(cell.clone());
                        }
                    }
                    Ok(Value::array(out))
                }
                Value::Obj(obj) => {
                    let mut seen: Vec<Value> = Vec::new();
                    let mut builder = ObjectBuilder::new();
                    for (index, (key, cell)) in obj.visible_entries().enumerate() {
                        let value = cell.force()?;
                        let discriminator =
                            call_object_cb(ctx, &func, value.clone(), key, index)?;
                        if !contains_value(&seen, &discriminator)? {
                            seen.push(discriminator);
                            builder.insert_value(key, value);
                        }
                    }
                    Ok(Value::Obj(builder.build()))
                }
                other => Err(Error::type_mismatch("Array or Object", other)),
            }
        }),
        Function::native("endsWith", &["main", "sub"], |_, args| {
            expect_arity("endsWith", args, 2)?;
            let main = as_str(&args[0])?.to_uppercase();
            let sub = as_str(&args[1])?.to_uppercase();
            Ok(Value::Bool(main.ends_with(&sub)))
        }),
        Function::native("startsWith", &["main", "sub"], |_, args| {
            expect_arity("startsWith", args, 2)?;
            let main = as_str(&args[0])?.to_uppercase();
            let sub = as_str(&args[1])?.to_uppercase();
            Ok(Value::Bool(main.starts_with(&sub)))
        }),
        Function::native("entriesOf", &["object"], |_, args| {
            expect_arity("entriesOf", args, 1)?;
            let obj = as_obj(&args[0])?;
            let mut out = Vec::new();
            for (key, cell) in obj.visible_entries() {
                let mut entry = ObjectBuilder::new();
                entry.insert_value("key", Value::string(key));
                entry.insert("value", Member::normal(cell.clone()));
                out.push(Value::Obj(entry.build()));
            }
            Ok(Value::array_of(out))
        }),
        Function::native("keysOf", &["object"], |_, args| {
            expect_arity("keysOf", args, 1)?;
            let obj = as_obj(&args[0])?;
            Ok(Value::array_of(
                obj.visible_keys().map(Value::string).collect(),
            ))
        }),
        Function::native("valuesOf", &["object"], |_, args| {
            expect_arity("valuesOf", args, 1)?;
            let obj = as_obj(&args[0])?;
            Ok(Value::array(
                obj.visible_entries().map(|(_, cell)| cell.clone()).collect(),
            ))
        }),
        Function::native("filter", &["array", "function"], |ctx, args| {
            expect_arity("filter", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut out = Vec::new();
            for (index, cell) in items.iter().enumerate() {
                let element = cell.force()?;
                if predicate(call_array_cb(ctx, &func, element, index)?)? {
                    out.push(cell.clone());
                }
            }
            Ok(Value::array(out))
        }),
        Function::native("filterObject", &["object", "function"], |ctx, args| {
            expect_arity("filterObject", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let obj = as_obj(&args[0])?;
            let func = as_func(&args[1])?;
            let mut builder = ObjectBuilder::new();
            for (index, (key, cell)) in obj.visible_entries().enumerate() {
                let value = cell.force()?;
                if predicate(call_object_cb(ctx, &func, value.clone(), key, index)?)? {
                    builder.insert_value(key, value);
                }
            }
            Ok(Value::Obj(builder.build()))
        }),
        Function::native("find", &["container", "value"], |_, args| {
            expect_arity("find", args, 2)?;
            find_indices(&args[0], &args[1])
        }),
        Function::native("indicesOf", &["container", "value"], |_, args| {
            expect_arity("indicesOf", args, 2)?;
            find_indices(&args[0], &args[1])
        }),
        Function::native("flatMap", &["array", "function"], |ctx, args| {
            expect_arity("flatMap", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut out = Vec::new();
            for (index, cell) in items.iter().enumerate() {
                let mapped = call_array_cb(ctx, &func, cell.force()?, index)?;
                let inner = as_arr(&mapped)?;
                out.extend(inner.iter().cloned());
            }
            Ok(Value::array(out))
        }),
        Function::native("flatten", &["array"], |_, args| {
            expect_arity("flatten", args, 1)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let items = as_arr(&args[0])?;
            let mut out = Vec::new();
            for cell in items.iter() {
                match cell.force()? {
                    Value::Arr(inner) => out.extend(inner.iter().cloned()),
                    Value::Null => out.push(Lazy::of(Value::Null)),
                    other => return Err(Error::type_mismatch("Array", &other)),
                }
            }
            Ok(Value::array(out))
        }),
        Function::native("foldLeft", &["array", "initial", "function"], |ctx, args| {
            expect_arity("foldLeft", args, 3)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[2])?;
            fold(ctx, &func, items.iter(), args[1].clone())
        }),
        Function::native("foldRight", &["array", "initial", "function"], |ctx, args| {
            expect_arity("foldRight", args, 3)?;
            let items = as_arr(&args[0])?;
            let func = as_func(&args[2])?;
            fold(ctx, &func, items.iter().rev(), args[1].clone())
        }),
        Function::native("groupBy", &["container", "function"], |ctx, args| {
            expect_arity("groupBy", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let func = as_func(&args[1])?;
            match &args[0] {
                Value::Arr(items) => {
                    let mut groups: indexmap::IndexMap<String, Vec<Lazy>> =
                        indexmap::IndexMap::new();
                    for (index, cell) in items.iter().enumerate() {
                        let element = cell.force()?;
                        let key =
                            key_string(&call_array_cb(ctx, &func, element, index)?)?;
                        groups.entry(key).or_default().push(cell.clone());
                    }
                    let mut builder = ObjectBuilder::new();
                    for (key, members) in groups {
                        builder.insert_value(key, Value::array(members));
                    }
                    Ok(Value::Obj(builder.build()))
                }
                Value::Obj(obj) => {
                    let mut groups: indexmap::IndexMap<String, ObjectBuilder> =
                        indexmap::IndexMap::new();
                    for (index, (key, cell)) in obj.visible_entries().enumerate() {
                        let value = cell.force()?;
                        let group =
                            key_string(&call_object_cb(ctx, &func, value.clone(), key, index)?)?;
                        groups.entry(group).or_default().insert_value(key, value);
                    }
                    let mut builder = ObjectBuilder::new();
                    for (key, group) in groups {
                        builder.insert_value(key, Value::Obj(group.build()));
                    }
                    Ok(Value::Obj(builder.build()))
                }
                other => Err(Error::type_mismatch("Array or Object", other)),
            }
        }),
        Function::native("orderBy", &["container", "function"], |ctx, args| {
            expect_arity("orderBy", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let func = as_func(&args[1])?;
            match &args[0] {
                Value::Arr(items) => {
                    let mut keyed = Vec::with_capacity(items.len());
                    for (index, cell) in items.iter().enumerate() {
                        let key = call_array_cb(ctx, &func, cell.force()?, index)?;
                        keyed.push((sort_key(&key)?, cell.clone()));
                    }
                    check_uniform(&keyed)?;
                    keyed.sort_by(|a, b| a.0.order(&b.0));
                    Ok(Value::array(keyed.into_iter().map(|(_, c)| c).collect()))
                }
                Value::Obj(obj) => {
                    let mut keyed = Vec::new();
                    for (index, (key, cell)) in obj.visible_entries().enumerate() {
                        let value = cell.force()?;
                        let by = call_object_cb(ctx, &func, value.clone(), key, index)?;
                        keyed.push((sort_key(&by)?, (key.to_string(), value)));
                    }
                    check_uniform(&keyed)?;
                    keyed.sort_by(|a, b| a.0.order(&b.0));
                    let mut builder = ObjectBuilder::new();
                    for (_, (key, value)) in keyed {
                        builder.insert_value(key, value);
                    }
                    Ok(Value::Obj(builder.build()))
                }
                other => Err(Error::type_mismatch("Array or Object", other)),
            }
        }),
        Function::native("map", &["array", "function"], |ctx, args| {
            expect_arity("map", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let items = as_arr(&args[0])?;
            let func = as_func(&args[1])?;
            let mut out = Vec::with_capacity(items.len());
            for (index, cell) in items.iter().enumerate() {
                out.push(call_array_cb(ctx, &func, cell.force()?, index)?);
            }
            Ok(Value::array_of(out))
        }),
        Function::native("mapObject", &["object", "function"], |ctx, args| {
            expect_arity("mapObject", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let obj = as_obj(&args[0])?;
            let func = as_func(&args[1])?;
            let mut builder = ObjectBuilder::new();
            for (index, (key, cell)) in obj.visible_entries().enumerate() {
                let contribution = match call_object_cb(ctx, &func, cell.force()?, key, index)? {
                    Value::Obj(contribution) => contribution,
                    other => return Err(Error::type_mismatch("Object", &other)),
                };
                for (name, member) in contribution.all_entries() {
                    builder.insert(name, member.clone());
                }
            }
            Ok(Value::Obj(builder.build()))
        }),
        Function::native("mapEntries", &["object", "function"], |ctx, args| {
            expect_arity("mapEntries", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let obj = as_obj(&args[0])?;
            let func = as_func(&args[1])?;
            let mut out = Vec::new();
            for (index, (key, cell)) in obj.visible_entries().enumerate() {
                out.push(call_object_cb(ctx, &func, cell.force()?, key, index)?);
            }
            Ok(Value::array_of(out))
        }),
        Function::native("match", &["string", "regex"], |_, args| {
            expect_arity("match", args, 2)?;
            let input = as_str(&args[0])?;
            let pattern = as_str(&args[1])?;
            let re = super::regex_ns::compile(&format!("^(?:{pattern})$"))?;
            match re.captures(&input) {
                Some(caps) => Ok(group_array(&caps)),
                None => Ok(Value::Null),
            }
        }),
        Function::native("matches", &["string", "regex"], |_, args| {
            expect_arity("matches", args, 2)?;
            let input = as_str(&args[0])?;
            let pattern = as_str(&args[1])?;
            let re = super::regex_ns::compile(&format!("^(?:{pattern})$"))?;
            Ok(Value::Bool(re.is_match(&input)))
        }),
        Function::native("scan", &["string", "regex"], |_, args| {
            expect_arity("scan", args, 2)?;
            let input = as_str(&args[0])?;
            let pattern = as_str(&args[1])?;
            let re = super::regex_ns::compile(&pattern)?;
            Ok(Value::array_of(
                re.captures_iter(&input).map(|caps| group_array(&caps)).collect(),
            ))
        }),
        Function::native("max", &["array"], |_, args| {
            expect_arity("max", args, 1)?;
            extremum(&args[0], std::cmp::Ordering::Greater)
        }),
        Function::native("min", &["array"], |_, args| {
            expect_arity("min", args, 1)?;
            extremum(&args[0], std::cmp::Ordering::Less)
        }),
        Function::native("maxBy", &["array", "function"], |ctx, args| {
            expect_arity("maxBy", args, 2)?;
            extremum_by(ctx, &args[0], &args[1], std::cmp::Ordering::Greater)
        }),
        Function::native("minBy", &["array", "function"], |ctx, args| {
            expect_arity("minBy", args, 2)?;
            extremum_by(ctx, &args[0], &args[1], std::cmp::Ordering::Less)
        }),
        Function::native("mod", &["dividend", "divisor"], |_, args| {
            expect_arity("mod", args, 2)?;
            Ok(Value::Num(as_num(&args[0])? % as_num(&args[1])?))
        }),
        Function::native("parseDouble", &["string"], |_, args| {
            expect_arity("parseDouble", args, 1)?;
            let s = as_str(&args[0])?;
            s.trim()
                .parse::<f64>()
                .map(Value::Num)
                .map_err(|_| Error::Domain(format!("Could not parse number: {s}")))
        }),
        Function::native("parseInt", &["string"], |_, args| {
            expect_arity("parseInt", args, 1)?;
            parse_radix(&as_str(&args[0])?, 10)
        }),
        Function::native("parseHex", &["string"], |_, args| {
            expect_arity("parseHex", args, 1)?;
            parse_radix(&as_str(&args[0])?, 16)
        }),
        Function::native("parseOctal", &["string"], |_, args| {
            expect_arity("parseOctal", args, 1)?;
            parse_radix(&as_str(&args[0])?, 8)
        }),
        Function::native("range", &["start", "end"], |_, args| {
            expect_arity("range", args, 2)?;
            let start = super::as_int(&args[0])?;
            let end = super::as_int(&args[1])?;
            Ok(Value::array_of(
                (start..=end).map(|n| Value::Num(n as f64)).collect(),
            ))
        }),
        Function::native("read", &["data", "mimeType", "params"], |ctx, args| {
            expect_arity_range("read", args, 2, 3)?;
            let data = as_str(&args[0])?;
            let media_type = media_type_arg(&args[1], args.get(2))?;
            ctx.registry().read(&data, &media_type)
        }),
        Function::native("write", &["value", "mimeType", "params"], |ctx, args| {
            expect_arity_range("write", args, 2, 3)?;
            let media_type = media_type_arg(&args[1], args.get(2))?;
            ctx.registry()
                .write(&args[0], &media_type)
                .map(Value::string)
        }),
        Function::native("readUrl", &["url"], |ctx, args| {
            expect_arity("readUrl", args, 1)?;
            let location = as_str(&args[0])?;
            let parsed = url::Url::parse(&location)
                .map_err(|e| Error::Codec(format!("Invalid URL '{location}': {e}")))?;
            let body = if parsed.scheme() == "classpath" {
                let resource = location.trim_start_matches("classpath://");
                match ctx.resources.get(resource) {
                    Some(content) => content.clone(),
                    None => {
                        tracing::warn!(resource, "classpath resource not found");
                        "null".to_string()
                    }
                }
            } else {
                ureq::get(&location)
                    .call()
                    .map_err(|e| Error::Codec(e.to_string()))?
                    .into_string()
                    .map_err(|e| Error::Codec(e.to_string()))?
            };
            let json: serde_json::Value =
                serde_json::from_str(&body).map_err(|e| Error::Codec(e.to_string()))?;
            Ok(Value::from_json(json))
        }),
        Function::native("remove", &["container", "value"], |_, args| {
            expect_arity("remove", args, 2)?;
            match &args[0] {
                Value::Arr(items) => {
                    let mut out = Vec::new();
                    for cell in items.iter() {
                        if !cell.force()?.structural_eq(&args[1])? {
                            out.push(cell.clone());
                        }
                    }
                    Ok(Value::array(out))
                }
                Value::Obj(obj) => {
                    let key = as_str(&args[1])?;
                    Ok(Value::Obj(without_keys(obj, &[key.to_string()])))
                }
                other => Err(Error::type_mismatch("Array or Object", other)),
            }
        }),
        Function::native("removeAll", &["container", "values"], |_, args| {
            expect_arity("removeAll", args, 2)?;
            let victims = as_arr(&args[1])?;
            match &args[0] {
                Value::Arr(items) => {
                    let victims = forced(&victims)?;
                    let mut out = Vec::new();
                    for cell in items.iter() {
                        let element = cell.force()?;
                        if !contains_value(&victims, &element)? {
                            out.push(cell.clone());
                        }
                    }
                    Ok(Value::array(out))
                }
                Value::Obj(obj) => {
                    let keys = forced(&victims)?
                        .iter()
                        .map(|v| as_str(v).map(|s| s.to_string()))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Obj(without_keys(obj, &keys)))
                }
                other => Err(Error::type_mismatch("Array or Object", other)),
            }
        }),
        Function::native("replace", &["string", "searchValue", "newValue"], |_, args| {
            expect_arity("replace", args, 3)?;
            let s = as_str(&args[0])?;
            let from = as_str(&args[1])?;
            let to = as_str(&args[2])?;
            Ok(Value::string(s.replace(from.as_ref(), &to)))
        }),
        Function::native("reverse", &["container"], |_, args| {
            expect_arity("reverse", args, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::string(s.chars().rev().collect::<String>())),
                Value::Arr(items) => {
                    Ok(Value::array(items.iter().rev().cloned().collect()))
                }
                Value::Obj(obj) => {
                    let mut builder = ObjectBuilder::new();
                    let entries: Vec<_> = obj.all_entries().collect();
                    for (key, member) in entries.into_iter().rev() {
                        builder.insert(key, member.clone());
                    }
                    Ok(Value::Obj(builder.build()))
                }
                other => Err(Error::type_mismatch("Array, Object, or String", other)),
            }
        }),
        Function::native("select", &["object", "path"], |_, args| {
            expect_arity("select", args, 2)?;
            if matches!(args[0], Value::Null) {
                return Ok(Value::Null);
            }
            let obj = as_obj(&args[0])?;
            let path = as_str(&args[1])?;
            let mut current = Value::Obj(obj);
            for segment in path.split('.') {
                let next = match &current {
                    Value::Obj(inner) => match inner.get(segment) {
                        Some(member) => member.value.force()?,
                        None => return Ok(Value::Null),
                    },
                    _ => return Ok(Value::Null),
                };
                current = next;
            }
            Ok(current)
        }),
        Function::native("sizeOf", &["value"], |_, args| {
            expect_arity("sizeOf", args, 1)?;
            let size = match &args[0] {
                Value::Null => 0,
                Value::Str(s) => s.chars().count(),
                Value::Arr(items) => items.len(),
                Value::Obj(obj) => obj.visible_len(),
                Value::Func(f) => f.param_count(),
                other => {
                    return Err(Error::type_mismatch(
                        "Array, String, Object, Null, or Function",
                        other,
                    ))
                }
            };
            Ok(Value::Num(size as f64))
        }),
        Function::native("splitBy", &["string", "separator"], |_, args| {
            expect_arity("splitBy", args, 2)?;
            let s = as_str(&args[0])?;
            let sep = as_str(&args[1])?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(sep.as_ref()).map(Value::string).collect()
            };
            Ok(Value::array_of(parts))
        }),
        Function::native("joinBy", &["array", "separator"], |_, args| {
            expect_arity("joinBy", args, 2)?;
            let items = as_arr(&args[0])?;
            let sep = as_str(&args[1])?;
            let mut parts = Vec::with_capacity(items.len());
            for cell in items.iter() {
                parts.push(to_display_string(&cell.force()?)?);
            }
            Ok(Value::string(parts.join(&sep)))
        }),
        Function::native("toString", &["value"], |_, args| {
            expect_arity("toString", args, 1)?;
            match &args[0] {
                Value::Null => Ok(Value::string("null")),
                other => Ok(Value::string(to_display_string(other)?)),
            }
        }),
        Function::native("trim", &["string"], |_, args| {
            expect_arity("trim", args, 1)?;
            Ok(Value::string(as_str(&args[0])?.trim()))
        }),
        Function::native("lower", &["string"], |_, args| {
            expect_arity("lower", args, 1)?;
            Ok(Value::string(as_str(&args[0])?.to_lowercase()))
        }),
        Function::native("upper", &["string"], |_, args| {
            expect_arity("upper", args, 1)?;
            Ok(Value::string(as_str(&args[0])?.to_uppercase()))
        }),
        Function::native("typeOf", &["value"], |_, args| {
            expect_arity("typeOf", args, 1)?;
            Ok(Value::string(args[0].pretty_name()))
        }),
        Function::native("isArray", &["value"], |_, args| {
            expect_arity("isArray", args, 1)?;
            Ok(Value::Bool(matches!(args[0], Value::Arr(_))))
        }),
        Function::native("isObject", &["value"], |_, args| {
            expect_arity("isObject", args, 1)?;
            Ok(Value::Bool(matches!(args[0], Value::Obj(_))))
        }),
        Function::native("isString", &["value"], |_, args| {
            expect_arity("isString", args, 1)?;
            Ok(Value::Bool(matches!(args[0], Value::Str(_))))
        }),
        Function::native("isNumber", &["value"], |_, args| {
            expect_arity("isNumber", args, 1)?;
            Ok(Value::Bool(matches!(args[0], Value::Num(_))))
        }),
        Function::native("isBoolean", &["value"], |_, args| {
            expect_arity("isBoolean", args, 1)?;
            Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
        }),
        Function::native("isFunction", &["value"], |_, args| {
            expect_arity("isFunction", args, 1)?;
            Ok(Value::Bool(matches!(args[0], Value::Func(_))))
        }),
        Function::native("isInteger", &["value"], |_, args| {
            expect_arity("isInteger", args, 1)?;
            Ok(Value::Bool(crate::value::is_integer(as_num(&args[0])?)))
        }),
        Function::native("isDecimal", &["value"], |_, args| {
            expect_arity("isDecimal", args, 1)?;
            Ok(Value::Bool(!crate::value::is_integer(as_num(&args[0])?)))
        }),
        Function::native("isEven", &["value"], |_, args| {
            expect_arity("isEven", args, 1)?;
            Ok(Value::Bool(as_num(&args[0])? % 2.0 == 0.0))
        }),
        Function::native("isOdd", &["value"], |_, args| {
            expect_arity("isOdd", args, 1)?;
            Ok(Value::Bool(as_num(&args[0])? % 2.0 != 0.0))
        }),
        Function::native("isBlank", &["value"], |_, args| {
            expect_arity("isBlank", args, 1)?;
            match &args[0] {
                Value::Null => Ok(Value::Bool(true)),
                Value::Str(s) => Ok(Value::Bool(s.trim().is_empty())),
                other => Err(Error::type_mismatch("String or Null", other)),
            }
        }),
        Function::native("isEmpty", &["value"], |_, args| {
            expect_arity("isEmpty", args, 1)?;
            match &args[0] {
                Value::Null => Ok(Value::Bool(true)),
                Value::Str(s) => Ok(Value::Bool(s.is_empty())),
                Value::Arr(items) => Ok(Value::Bool(items.is_empty())),
                Value::Obj(obj) => Ok(Value::Bool(obj.is_empty())),
                other => Err(Error::type_mismatch("Array, String, Object, or Null", other)),
            }
        }),
        Function::native("unzip", &["array"], |_, args| {
            expect_arity("unzip", args, 1)?;
            let rows = as_arr(&args[0])?;
            let mut inner = Vec::with_capacity(rows.len());
            for row in rows.iter() {
                inner.push(as_arr(&row.force()?)?);
            }
            let width = inner.iter().map(|r| r.len()).min().unwrap_or(0);
            let mut out = Vec::with_capacity(width);
            for column in 0..width {
                out.push(Value::array(
                    inner.iter().map(|row| row[column].clone()).collect(),
                ));
            }
            Ok(Value::array_of(out))
        }),
        Function::native("zip", &["array1", "array2"], |_, args| {
            expect_arity("zip", args, 2)?;
            let left = as_arr(&args[0])?;
            let right = as_arr(&args[1])?;
            Ok(Value::array_of(
                left.iter()
                    .zip(right.iter())
                    .map(|(a, b)| Value::array(vec![a.clone(), b.clone()]))
                    .collect(),
            ))
        }),
        Function::native("uuid", &[], |_, args| {
            expect_arity("uuid", args, 0)?;
            Ok(Value::string(uuid::Uuid::new_v4().to_string()))
        }),
    ]
}

// ---------------------------------------------------------------------
// Shared helpers

fn combine(first: &Value, second: &Value) -> Result<Value> {
    match (first, second) {
        (Value::Str(_) | Value::Num(_), Value::Str(_) | Value::Num(_)) => {
            Ok(Value::string(format!(
                "{}{}",
                to_display_string(first)?,
                to_display_string(second)?
            )))
        }
        (Value::Arr(a), Value::Arr(b)) => {
            let mut out = a.as_ref().clone();
            out.extend(b.iter().cloned());
            Ok(Value::array(out))
        }
        (Value::Obj(a), Value::Obj(b)) => {
            let mut builder = ObjectBuilder::new();
            for (key, member) in a.all_entries().chain(b.all_entries()) {
                builder.insert(key, member.clone());
            }
            Ok(Value::Obj(builder.build()))
        }
        _ => {
            // the operand that breaks the pairing names the error
            let offending = match first {
                Value::Null | Value::Bool(_) | Value::Func(_) => first,
                _ => second,
            };
            Err(Error::type_mismatch(
                "Array, Object, Number, or String",
                offending,
            ))
        }
    }
}

fn contains_value(haystack: &[Value], needle: &Value) -> Result<bool> {
    for candidate in haystack {
        if candidate.structural_eq(needle)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn find_indices(container: &Value, value: &Value) -> Result<Value> {
    match container {
        Value::Str(s) => {
            let needle = as_str(value)?;
            if needle.is_empty() {
                return Ok(Value::array_of(vec![]));
            }
            let mut out = Vec::new();
            for (byte_index, _) in s.match_indices(needle.as_ref()) {
                out.push(Value::Num(s[..byte_index].chars().count() as f64));
            }
            Ok(Value::array_of(out))
        }
        Value::Arr(items) => {
            let mut out = Vec::new();
            for (index, cell) in items.iter().enumerate() {
                if cell.force()?.structural_eq(value)? {
                    out.push(Value::Num(index as f64));
                }
            }
            Ok(Value::array_of(out))
        }
        other => Err(Error::type_mismatch("Array or String", other)),
    }
}

fn fold<'a>(
    ctx: &EvalContext,
    func: &Function,
    items: impl Iterator<Item = &'a Lazy>,
    initial: Value,
) -> Result<Value> {
    if func.param_count() != 2 {
        return Err(Error::arity("2", func.param_count()));
    }
    let mut accumulator = initial;
    for cell in items {
        accumulator = apply(ctx, func, &[cell.force()?, accumulator])?;
    }
    Ok(accumulator)
}

fn group_array(caps: &regex::Captures<'_>) -> Value {
    Value::array_of(
        caps.iter()
            .map(|group| match group {
                Some(m) => Value::string(m.as_str()),
                None => Value::Null,
            })
            .collect(),
    )
}

/// Comparable sort key; building one rejects non-orderable kinds with
/// the canonical message.
pub(crate) enum SortKey {
    Num(f64),
    Str(Rc<str>),
    Bool(bool),
}

pub(crate) fn sort_key(value: &Value) -> Result<SortKey> {
    match value {
        Value::Num(n) => Ok(SortKey::Num(*n)),
        Value::Str(s) => Ok(SortKey::Str(Rc::clone(s))),
        Value::Bool(b) => Ok(SortKey::Bool(*b)),
        other => Err(Error::type_mismatch_str(
            "Array of type String, Boolean, or Number",
            format!("Array of type {}", other.pretty_name()),
        )),
    }
}

impl SortKey {
    fn kind(&self) -> &'static str {
        match self {
            Self::Num(_) => "number",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
        }
    }

    pub(crate) fn order(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => {
                a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
            }
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            // Uniformity is checked before sorting.
            _ => std::cmp::Ordering::Equal,
        }
    }
}

/// All sort keys must share one kind; the first divergent key names the
/// error.
pub(crate) fn check_uniform<T>(keyed: &[(SortKey, T)]) -> Result<()> {
    let Some((first, _)) = keyed.first() else {
        return Ok(());
    };
    for (key, _) in keyed.iter().skip(1) {
        if key.kind() != first.kind() {
            return Err(Error::type_mismatch_str(
                "Array of type String, Boolean, or Number",
                format!("Array of type {}", key.kind()),
            ));
        }
    }
    Ok(())
}

fn extremum(value: &Value, keep: std::cmp::Ordering) -> Result<Value> {
    let items = as_arr(value)?;
    let values = forced(&items)?;
    let mut best = values
        .first()
        .cloned()
        .ok_or_else(|| Error::Domain("Expected a non-empty array, got: 0 elements".to_string()))?;
    for candidate in &values[1..] {
        if candidate.compare_in_array(&best)? == keep {
            best = candidate.clone();
        }
    }
    Ok(best)
}

fn extremum_by(
    ctx: &EvalContext,
    value: &Value,
    func: &Value,
    keep: std::cmp::Ordering,
) -> Result<Value> {
    let items = as_arr(value)?;
    let func = as_func(func)?;
    let mut iter = items.iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::Domain("Expected a non-empty array, got: 0 elements".to_string()))?;
    let mut best = first.force()?;
    let mut best_key = apply(ctx, &func, &[best.clone()])?;
    for cell in iter {
        let candidate = cell.force()?;
        let key = apply(ctx, &func, &[candidate.clone()])?;
        if key.compare_in_array(&best_key)? == keep {
            best = candidate;
            best_key = key;
        }
    }
    Ok(best)
}

fn parse_radix(s: &str, radix: u32) -> Result<Value> {
    let trimmed = s.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let magnitude = i64::from_str_radix(digits, radix)
        .map_err(|_| Error::Domain(format!("Could not parse number: {s}")))?;
    let n = if negative { -magnitude } else { magnitude };
    Ok(Value::Num(n as f64))
}

fn without_keys(obj: &Object, keys: &[String]) -> Object {
    let mut builder = ObjectBuilder::new();
    for (key, member) in obj.all_entries() {
        if !keys.iter().any(|k| k == key) {
            builder.insert(key, member.clone());
        }
    }
    builder.build()
}

fn media_type_arg(mime: &Value, params: Option<&Value>) -> Result<MediaType> {
    let mime = as_str(mime)?;
    let mut media_type =
        MediaType::parse(&mime).map_err(|e| Error::Codec(e.to_string()))?;
    if let Some(params) = params {
        let params = as_obj(params)?;
        for (key, cell) in params.visible_entries() {
            media_type
                .parameters
                .insert(key.to_string(), to_display_string(&cell.force()?)?);
        }
    }
    Ok(media_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::test_context;
    use pretty_assertions::assert_eq;

    fn ds_call(name: &str, args: &[Value]) -> Result<Value> {
        let ctx = test_context();
        let Value::Obj(ds) = crate::stdlib::install() else {
            panic!("ds must be an object");
        };
        let func = ds.get(name).expect("function exists").value.force()?;
        let Value::Func(func) = func else {
            panic!("{name} must be a function");
        };
        apply(&ctx, &func, args)
    }

    fn json(v: &Value) -> serde_json::Value {
        v.to_json().unwrap()
    }

    fn from_json(s: &str) -> Value {
        Value::from_json(serde_json::from_str(s).unwrap())
    }

    fn callback(params: &[&str], body: crate::ast::Expr) -> Value {
        use crate::eval::Scope;
        Value::Func(Function::closure(
            params.iter().map(|p| (*p).to_string()).collect(),
            Rc::new(body),
            Scope::root(std::collections::HashMap::new()),
        ))
    }

    fn ident(name: &str) -> crate::ast::Expr {
        crate::ast::Expr::Ident(name.to_string())
    }

    #[test]
    fn test_combine_number_string_coercion() {
        let out = ds_call("combine", &[Value::Num(5.0), Value::string("10")]).unwrap();
        assert_eq!(json(&out), serde_json::json!("510"));
        let out = ds_call("combine", &[Value::Num(5.5), Value::string(" years")]).unwrap();
        assert_eq!(json(&out), serde_json::json!("5.5 years"));
    }

    #[test]
    fn test_combine_rejects_mixed_aggregates() {
        let err = ds_call("combine", &[Value::Num(1.0), Value::array_of(vec![])])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected Array, Object, Number, or String, got: array"
        );
    }

    #[test]
    fn test_filter_on_null_returns_null() {
        let func = callback(&["x"], crate::ast::Expr::Bool(true));
        let out = ds_call("filter", &[Value::Null, func]).unwrap();
        assert!(matches!(out, Value::Null));
    }

    #[test]
    fn test_filter_two_arg_callback_receives_index() {
        // keep elements at even indices
        let body = crate::ast::Expr::Binary {
            op: crate::ast::BinOp::Eq,
            lhs: Box::new(crate::ast::Expr::Binary {
                op: crate::ast::BinOp::Mod,
                lhs: Box::new(ident("i")),
                rhs: Box::new(crate::ast::Expr::Num(2.0)),
            }),
            rhs: Box::new(crate::ast::Expr::Num(0.0)),
        };
        let func = callback(&["x", "i"], body);
        let out = ds_call("filter", &[from_json("[10,11,12,13]"), func]).unwrap();
        assert_eq!(json(&out), serde_json::json!([10, 12]));
    }

    #[test]
    fn test_filter_arity_error_message() {
        let func = callback(&["a", "b", "c"], crate::ast::Expr::Bool(true));
        let err = ds_call("filter", &[from_json("[1]"), func]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected embedded function to have 1 or 2 parameters, received: 3"
        );
    }

    #[test]
    fn test_group_by_preserves_insertion_order() {
        let data = from_json(r#"[{"k":"a","v":1},{"k":"b","v":2},{"k":"a","v":3}]"#);
        let func = callback(&["x"], crate::ast::Expr::field(ident("x"), "k"));
        let out = ds_call("groupBy", &[data, func]).unwrap();
        assert_eq!(
            json(&out),
            serde_json::json!({
                "a": [{"k":"a","v":1},{"k":"a","v":3}],
                "b": [{"k":"b","v":2}]
            })
        );
    }

    #[test]
    fn test_order_by_is_stable() {
        let data = from_json(r#"[{"k":1,"t":"x"},{"k":0,"t":"y"},{"k":1,"t":"z"}]"#);
        let func = callback(&["e"], crate::ast::Expr::field(ident("e"), "k"));
        let out = ds_call("orderBy", &[data, func]).unwrap();
        assert_eq!(
            json(&out),
            serde_json::json!([
                {"k":0,"t":"y"},
                {"k":1,"t":"x"},
                {"k":1,"t":"z"}
            ])
        );
    }

    #[test]
    fn test_order_by_rejects_mixed_kinds() {
        let data = from_json(r#"[1, "a"]"#);
        let func = callback(&["e"], ident("e"));
        let err = ds_call("orderBy", &[data, func]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected Array of type String, Boolean, or Number, got: Array of type string"
        );
    }

    #[test]
    fn test_map_object_merges_contributions() {
        let data = from_json(r#"{"a":1,"b":2}"#);
        // f(v, k) = { [k-ish constant keys]: v } — build {x: v} every time,
        // later contributions win.
        let body = crate::ast::Expr::Object(vec![crate::ast::Field::new("x", ident("v"))]);
        let func = callback(&["v", "k"], body);
        let out = ds_call("mapObject", &[data, func]).unwrap();
        assert_eq!(json(&out), serde_json::json!({"x": 2}));
    }

    #[test]
    fn test_fold_left_and_right_orders() {
        let concat = |name: &str| {
            let body = crate::ast::Expr::Binary {
                op: crate::ast::BinOp::Add,
                lhs: Box::new(ident("prev")),
                rhs: Box::new(ident("cur")),
            };
            let func = callback(&["cur", "prev"], body);
            ds_call(name, &[from_json(r#"["a","b","c"]"#), Value::string(""), func]).unwrap()
        };
        assert_eq!(json(&concat("foldLeft")), serde_json::json!("abc"));
        assert_eq!(json(&concat("foldRight")), serde_json::json!("cba"));
    }

    #[test]
    fn test_flatten_preserves_null_elements() {
        let out = ds_call("flatten", &[from_json("[[1],null,[2,3]]")]).unwrap();
        assert_eq!(json(&out), serde_json::json!([1, null, 2, 3]));
    }

    #[test]
    fn test_max_min_booleans() {
        let out = ds_call("max", &[from_json("[false,true,false]")]).unwrap();
        assert_eq!(json(&out), serde_json::json!(true));
        let out = ds_call("min", &[from_json("[true,false,true]")]).unwrap();
        assert_eq!(json(&out), serde_json::json!(false));
    }

    #[test]
    fn test_max_mixed_kinds_names_element_kind() {
        let err = ds_call("max", &[from_json(r#"[1, "a"]"#)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected Array of type String, Boolean, or Number, got: Array of type string"
        );
    }

    #[test]
    fn test_max_empty_array_is_domain_error() {
        let err = ds_call("max", &[from_json("[]")]).unwrap_err();
        assert_eq!(err.to_string(), "Expected a non-empty array, got: 0 elements");
    }

    #[test]
    fn test_ends_with_is_case_insensitive() {
        let out = ds_call(
            "endsWith",
            &[Value::string("Hello World"), Value::string("WORLD")],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!(true));
    }

    #[test]
    fn test_size_of_null_and_function() {
        assert_eq!(json(&ds_call("sizeOf", &[Value::Null]).unwrap()), 0);
        let func = callback(&["a", "b"], crate::ast::Expr::Null);
        assert_eq!(json(&ds_call("sizeOf", &[func]).unwrap()), 2);
    }

    #[test]
    fn test_select_missing_path_returns_null() {
        let data = from_json(r#"{"a":{"b":1}}"#);
        let out = ds_call("select", &[data.clone(), Value::string("a.b")]).unwrap();
        assert_eq!(json(&out), serde_json::json!(1));
        let out = ds_call("select", &[data, Value::string("a.z.q")]).unwrap();
        assert!(matches!(out, Value::Null));
    }

    #[test]
    fn test_reverse_object_reverses_key_order() {
        let out = ds_call("reverse", &[from_json(r#"{"a":1,"b":2}"#)]).unwrap();
        assert_eq!(
            json(&out),
            serde_json::from_str::<serde_json::Value>(r#"{"b":2,"a":1}"#).unwrap()
        );
        if let Value::Obj(obj) = &out {
            assert_eq!(obj.visible_keys().collect::<Vec<_>>(), vec!["b", "a"]);
        }
    }

    #[test]
    fn test_contains_uses_structural_equality() {
        let data = from_json(r#"[{"a":1},{"a":2}]"#);
        let out = ds_call("contains", &[data, from_json(r#"{"a":2}"#)]).unwrap();
        assert_eq!(json(&out), serde_json::json!(true));
    }

    #[test]
    fn test_range_is_inclusive() {
        let out = ds_call("range", &[Value::Num(0.0), Value::Num(3.0)]).unwrap();
        assert_eq!(json(&out), serde_json::json!([0, 1, 2, 3]));
    }

    #[test]
    fn test_zip_truncates_and_unzip_transposes() {
        let out = ds_call("zip", &[from_json("[1,2,3]"), from_json(r#"["a","b"]"#)]).unwrap();
        assert_eq!(json(&out), serde_json::json!([[1, "a"], [2, "b"]]));
        let out = ds_call("unzip", &[out]).unwrap();
        assert_eq!(json(&out), serde_json::json!([[1, 2], ["a", "b"]]));
    }

    #[test]
    fn test_join_by_coerces_scalars() {
        let out = ds_call(
            "joinBy",
            &[from_json(r#"[1, 2.5, true, "x"]"#), Value::string("-")],
        )
        .unwrap();
        assert_eq!(json(&out), serde_json::json!("1-2.5-true-x"));
    }

    #[test]
    fn test_join_by_rejects_aggregates() {
        let err = ds_call("joinBy", &[from_json("[[1]]"), Value::string(",")]).unwrap_err();
        assert_eq!(err.to_string(), "Expected String, Number, or Boolean, got: array");
    }

    #[test]
    fn test_parse_family() {
        assert_eq!(
            json(&ds_call("parseHex", &[Value::string("ff")]).unwrap()),
            serde_json::json!(255)
        );
        assert_eq!(
            json(&ds_call("parseOctal", &[Value::string("10")]).unwrap()),
            serde_json::json!(8)
        );
        assert_eq!(
            json(&ds_call("parseInt", &[Value::string("-42")]).unwrap()),
            serde_json::json!(-42)
        );
        assert_eq!(
            json(&ds_call("parseDouble", &[Value::string("2.5")]).unwrap()),
            serde_json::json!(2.5)
        );
    }

    #[test]
    fn test_scan_collects_groups() {
        let out = ds_call(
            "scan",
            &[
                Value::string("a1 b2"),
                Value::string(r"([a-z])(\d)"),
            ],
        )
        .unwrap();
        assert_eq!(
            json(&out),
            serde_json::json!([["a1", "a", "1"], ["b2", "b", "2"]])
        );
    }

    #[test]
    fn test_values_of_stays_lazy() {
        use crate::ast::Expr;
        use crate::eval::{eval, Scope};
        // one member diverges; valuesOf must not force it
        let ctx = test_context();
        let obj = eval(
            &ctx,
            &Expr::Object(vec![
                crate::ast::Field::new("bad", Expr::Ident("missing".into())),
                crate::ast::Field::new("good", Expr::Num(1.0)),
            ]),
            &Scope::root(std::collections::HashMap::new()),
        )
        .unwrap();
        let out = ds_call("valuesOf", &[obj]).unwrap();
        let Value::Arr(cells) = out else { panic!("Expected array") };
        assert!(matches!(cells[1].force().unwrap(), Value::Num(n) if n == 1.0));
        assert!(cells[0].force().is_err());
    }
}
