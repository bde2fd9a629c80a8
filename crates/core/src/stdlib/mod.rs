//! The built-in `ds` namespace.
//!
//! Every entry is a first-class [`Function`] value installed into the
//! root `ds` object or one of its nested modules. Dispatch is by the
//! runtime variant of the leading argument(s); helpers here implement
//! the shared argument checks and callback call shapes.

mod arrays;
mod binaries;
mod core;
mod crypto;
mod datetime;
mod jsonpath;
mod math;
mod numbers;
mod objects;
mod period;
mod regex_ns;
mod strings;
mod url_ns;
mod xml;

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::eval::{apply, EvalContext};
use crate::value::{Function, Lazy, Member, ObjectBuilder, Value};

/// Build the `ds` object bound into every evaluation scope.
#[must_use]
pub fn install() -> Value {
    let mut root = ObjectBuilder::new();
    core::install(&mut root);
    install_namespace(&mut root, "strings", strings::entries());
    install_namespace(&mut root, "arrays", arrays::entries());
    install_namespace(&mut root, "objects", objects::entries());
    install_namespace(&mut root, "numbers", numbers::entries());
    install_namespace(&mut root, "math", math::entries());
    install_namespace(&mut root, "datetime", datetime::entries());
    install_namespace(&mut root, "period", period::entries());
    install_namespace(&mut root, "binaries", binaries::entries());
    install_namespace(&mut root, "crypto", crypto::entries());
    install_namespace(&mut root, "url", url_ns::entries());
    install_namespace(&mut root, "jsonpath", jsonpath::entries());
    install_namespace(&mut root, "regex", regex_ns::entries());
    install_namespace(&mut root, "xml", xml::entries());
    Value::Obj(root.build())
}

fn install_namespace(root: &mut ObjectBuilder, name: &str, functions: Vec<Function>) {
    let mut builder = ObjectBuilder::new();
    install_functions(&mut builder, functions);
    root.insert_value(name, Value::Obj(builder.build()));
}

/// Install a list of built-ins into an object builder, keyed by their
/// declared names.
pub(crate) fn install_functions(builder: &mut ObjectBuilder, functions: Vec<Function>) {
    for function in functions {
        if let Some(name) = function.name() {
            builder.insert(name, Member::normal(Lazy::of(Value::Func(function))));
        }
    }
}

// ---------------------------------------------------------------------
// Argument checks

pub(crate) fn expect_arity(name: &str, args: &[Value], count: usize) -> Result<()> {
    if args.len() != count {
        return Err(Error::eval(format!(
            "Function {name} expected {count} argument(s), received {}",
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn expect_arity_range(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(Error::eval(format!(
            "Function {name} expected {min} to {max} argument(s), received {}",
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn as_str(value: &Value) -> Result<Rc<str>> {
    match value {
        Value::Str(s) => Ok(Rc::clone(s)),
        other => Err(Error::type_mismatch("String", other)),
    }
}

pub(crate) fn as_num(value: &Value) -> Result<f64> {
    match value {
        Value::Num(n) => Ok(*n),
        other => Err(Error::type_mismatch("Number", other)),
    }
}

pub(crate) fn as_int(value: &Value) -> Result<i64> {
    let n = as_num(value)?;
    if !crate::value::is_integer(n) {
        return Err(Error::Domain(format!("Expected a whole number, got: {n}")));
    }
    Ok(n as i64)
}

pub(crate) fn as_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(Error::type_mismatch("Boolean", other)),
    }
}

pub(crate) fn as_arr(value: &Value) -> Result<Rc<Vec<Lazy>>> {
    match value {
        Value::Arr(items) => Ok(Rc::clone(items)),
        other => Err(Error::type_mismatch("Array", other)),
    }
}

pub(crate) fn as_obj(value: &Value) -> Result<crate::value::Object> {
    match value {
        Value::Obj(obj) => Ok(obj.clone()),
        other => Err(Error::type_mismatch("Object", other)),
    }
}

pub(crate) fn as_func(value: &Value) -> Result<Function> {
    match value {
        Value::Func(f) => Ok(f.clone()),
        other => Err(Error::type_mismatch("Function", other)),
    }
}

// ---------------------------------------------------------------------
// Callback call shapes

/// Array combinator callback: 1-arg `f(element)` or 2-arg
/// `f(element, index)`.
pub(crate) fn call_array_cb(
    ctx: &EvalContext,
    func: &Function,
    element: Value,
    index: usize,
) -> Result<Value> {
    match func.param_count() {
        1 => apply(ctx, func, &[element]),
        2 => apply(ctx, func, &[element, Value::Num(index as f64)]),
        n => Err(Error::arity("1 or 2", n)),
    }
}

/// Object combinator callback: `f(value)`, `f(value, key)`, or
/// `f(value, key, index)` where index is the position in visible-key
/// iteration order.
pub(crate) fn call_object_cb(
    ctx: &EvalContext,
    func: &Function,
    value: Value,
    key: &str,
    index: usize,
) -> Result<Value> {
    match func.param_count() {
        1 => apply(ctx, func, &[value]),
        2 => apply(ctx, func, &[value, Value::string(key)]),
        3 => apply(
            ctx,
            func,
            &[value, Value::string(key), Value::Num(index as f64)],
        ),
        n => Err(Error::arity("1, 2, or 3", n)),
    }
}

/// A predicate callback's result must be a boolean.
pub(crate) fn predicate(result: Value) -> Result<bool> {
    as_bool(&result)
}

// ---------------------------------------------------------------------
// Coercion

/// Single-element coercion shared by `toString`, `joinBy`, and
/// `combine`: booleans render `true`/`false`, integers drop the
/// fraction, strings pass through. Aggregates are rejected.
pub(crate) fn to_display_string(value: &Value) -> Result<String> {
    match value {
        Value::Bool(b) => Ok(b.to_string()),
        Value::Num(n) => Ok(crate::value::number_to_string(*n)),
        Value::Str(s) => Ok(s.to_string()),
        other => Err(Error::type_mismatch("String, Number, or Boolean", other)),
    }
}

/// Discriminator coercion for `groupBy`/`occurrences` keys.
pub(crate) fn key_string(value: &Value) -> Result<String> {
    to_display_string(value)
}

/// Force every cell of an array.
pub(crate) fn forced(items: &[Lazy]) -> Result<Vec<Value>> {
    items.iter().map(Lazy::force).collect()
}
