//! `ds.math` — numeric helpers over f64.

use rand::Rng;

use crate::error::{Error, Result};
use crate::value::{Function, Value};

use super::{as_arr, as_num, expect_arity, forced};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        unary("abs", f64::abs),
        unary("ceil", f64::ceil),
        unary("floor", f64::floor),
        unary("round", f64::round),
        unary("sqrt", f64::sqrt),
        unary("exp", f64::exp),
        unary("log", f64::ln),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        unary("tan", f64::tan),
        unary("asin", f64::asin),
        unary("acos", f64::acos),
        unary("atan", f64::atan),
        Function::native("pow", &["num1", "num2"], |_, args| {
            expect_arity("pow", args, 2)?;
            Ok(Value::Num(as_num(&args[0])?.powf(as_num(&args[1])?)))
        }),
        Function::native("clamp", &["value", "min", "max"], |_, args| {
            expect_arity("clamp", args, 3)?;
            let value = as_num(&args[0])?;
            let min = as_num(&args[1])?;
            let max = as_num(&args[2])?;
            Ok(Value::Num(value.clamp(min, max)))
        }),
        Function::native("avg", &["array"], |_, args| {
            expect_arity("avg", args, 1)?;
            let numbers = numbers_of(&args[0])?;
            if numbers.is_empty() {
                return Err(Error::Domain(
                    "Expected a non-empty array, got: 0 elements".to_string(),
                ));
            }
            Ok(Value::Num(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }),
        Function::native("sum", &["array"], |_, args| {
            expect_arity("sum", args, 1)?;
            Ok(Value::Num(numbers_of(&args[0])?.iter().sum()))
        }),
        // num = mantissa * 2^exponent with mantissa in [0.5, 1)
        Function::native("exponent", &["num"], |_, args| {
            expect_arity("exponent", args, 1)?;
            let n = as_num(&args[0])?;
            Ok(Value::Num(exponent_of(n) as f64))
        }),
        Function::native("mantissa", &["num"], |_, args| {
            expect_arity("mantissa", args, 1)?;
            let n = as_num(&args[0])?;
            Ok(Value::Num(n / 2f64.powi(exponent_of(n))))
        }),
        Function::native("random", &[], |_, args| {
            expect_arity("random", args, 0)?;
            Ok(Value::Num(rand::thread_rng().gen::<f64>()))
        }),
        Function::native("randomInt", &["num"], |_, args| {
            expect_arity("randomInt", args, 1)?;
            let bound = super::as_int(&args[0])?;
            if bound <= 0 {
                return Err(Error::Domain(format!(
                    "Expected a positive bound, got: {bound}"
                )));
            }
            Ok(Value::Num(rand::thread_rng().gen_range(0..bound) as f64))
        }),
    ]
}

fn unary(name: &'static str, op: fn(f64) -> f64) -> Function {
    Function::native(name, &["num"], move |_, args| {
        expect_arity(name, args, 1)?;
        Ok(Value::Num(op(as_num(&args[0])?)))
    })
}

fn numbers_of(value: &Value) -> Result<Vec<f64>> {
    let items = as_arr(value)?;
    forced(&items)?.iter().map(as_num).collect()
}

fn exponent_of(n: f64) -> i32 {
    if n == 0.0 || !n.is_finite() {
        return 0;
    }
    n.abs().log2().floor() as i32 + 1
}
