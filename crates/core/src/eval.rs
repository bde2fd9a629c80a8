//! Tree-walking evaluator.
//!
//! Single-threaded, deterministic, and lazy: array elements and object
//! members become suspended cells that capture their lexical scope, and
//! are forced only when demanded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::codec::CodecRegistry;
use crate::error::{Error, Result};
use crate::value::{Bindings, Function, Lazy, Member, ObjectBuilder, Value};

struct Frame {
    bindings: RefCell<HashMap<String, Lazy>>,
    parent: Option<Scope>,
}

/// An immutable persistent scope frame plus a pointer to the enclosing
/// frame. Frames are shared freely; they are never mutated after the
/// expression that introduced them has been wired up.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl Scope {
    #[must_use]
    pub fn root(bindings: Bindings) -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(bindings),
            parent: None,
        }))
    }

    #[must_use]
    pub fn child(&self) -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Install a binding while a frame is being wired up.
    pub fn define(&self, name: impl Into<String>, cell: Lazy) {
        self.0.bindings.borrow_mut().insert(name.into(), cell);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Lazy> {
        if let Some(cell) = self.0.bindings.borrow().get(name) {
            return Some(cell.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.lookup(name))
    }
}

/// Shared evaluation context: the codec registry consulted by
/// `read`/`write` and the named resources `readUrl` resolves
/// `classpath://` against. Cheap to clone into thunks.
#[derive(Clone)]
pub struct EvalContext {
    pub(crate) registry: Rc<CodecRegistry>,
    pub(crate) resources: Rc<HashMap<String, String>>,
}

impl EvalContext {
    #[must_use]
    pub fn new(registry: Rc<CodecRegistry>, resources: Rc<HashMap<String, String>>) -> Self {
        Self {
            registry,
            resources,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }
}

/// Evaluate an expression under a scope.
pub fn eval(ctx: &EvalContext, expr: &Expr, scope: &Scope) -> Result<Value> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::string(s.clone())),
        Expr::Array(items) => {
            let cells = items
                .iter()
                .map(|item| {
                    let ctx = ctx.clone();
                    let item = item.clone();
                    let scope = scope.clone();
                    Lazy::suspend(move || eval(&ctx, &item, &scope))
                })
                .collect();
            Ok(Value::array(cells))
        }
        Expr::Object(fields) => {
            let mut builder = ObjectBuilder::new();
            for field in fields {
                let ctx = ctx.clone();
                let value = field.value.clone();
                let scope = scope.clone();
                let cell = Lazy::suspend(move || eval(&ctx, &value, &scope));
                builder.insert(field.name.clone(), Member::new(field.visibility, cell));
            }
            Ok(Value::Obj(builder.build()))
        }
        Expr::Ident(name) => scope
            .lookup(name)
            .ok_or_else(|| Error::eval(format!("Unknown variable: {name}")))?
            .force(),
        Expr::Local { bindings, body } => {
            let inner = scope.child();
            for (name, expr) in bindings {
                let ctx = ctx.clone();
                let expr = expr.clone();
                let capture = inner.clone();
                inner.define(
                    name.clone(),
                    Lazy::suspend(move || eval(&ctx, &expr, &capture)),
                );
            }
            eval(ctx, body, &inner)
        }
        Expr::Index { target, index } => {
            let target = eval(ctx, target, scope)?;
            let index = eval(ctx, index, scope)?;
            index_value(&target, &index)
        }
        Expr::Call { target, args } => {
            let func = match eval(ctx, target, scope)? {
                Value::Func(func) => func,
                other => return Err(Error::type_mismatch("Function", &other)),
            };
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(eval(ctx, arg, scope)?);
            }
            apply(ctx, &func, &evaluated)
        }
        Expr::Func { params, body } => Ok(Value::Func(Function::closure(
            params.clone(),
            Rc::clone(body),
            scope.clone(),
        ))),
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond = match eval(ctx, cond, scope)? {
                Value::Bool(cond) => cond,
                other => return Err(Error::type_mismatch("Boolean", &other)),
            };
            if cond {
                eval(ctx, then_branch, scope)
            } else if let Some(els) = else_branch {
                eval(ctx, els, scope)
            } else {
                Ok(Value::Null)
            }
        }
        Expr::Unary { op, expr } => {
            let value = eval(ctx, expr, scope)?;
            match (op, &value) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Not, _) => Err(Error::type_mismatch("Boolean", &value)),
                (UnaryOp::Neg, Value::Num(n)) => Ok(Value::Num(-n)),
                (UnaryOp::Neg, _) => Err(Error::type_mismatch("Number", &value)),
            }
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(ctx, *op, lhs, rhs, scope),
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value> {
    match (target, index) {
        (Value::Obj(obj), Value::Str(key)) => obj
            .get(key.as_ref())
            .ok_or_else(|| Error::eval(format!("Field does not exist: {key}")))?
            .value
            .force(),
        (Value::Arr(items), Value::Num(n)) => {
            // a negative float would saturate to 0 on the cast below
            if *n < 0.0 || n.fract() != 0.0 {
                return Err(Error::eval(format!(
                    "Array index out of bounds: {} of {}",
                    crate::value::number_to_string(*n),
                    items.len()
                )));
            }
            let idx = *n as usize;
            items
                .get(idx)
                .ok_or_else(|| {
                    Error::eval(format!("Array index out of bounds: {idx} of {}", items.len()))
                })?
                .force()
        }
        (Value::Str(s), Value::Num(n)) => {
            if *n < 0.0 || n.fract() != 0.0 {
                return Err(Error::eval(format!(
                    "String index out of bounds: {} of {}",
                    crate::value::number_to_string(*n),
                    s.chars().count()
                )));
            }
            let idx = *n as usize;
            s.chars()
                .nth(idx)
                .map(|c| Value::string(c.to_string()))
                .ok_or_else(|| {
                    Error::eval(format!(
                        "String index out of bounds: {idx} of {}",
                        s.chars().count()
                    ))
                })
        }
        (Value::Obj(_), other) | (Value::Arr(_), other) | (Value::Str(_), other) => {
            Err(Error::type_mismatch("String or Number index", other))
        }
        (other, _) => Err(Error::type_mismatch("Array, Object, or String", other)),
    }
}

fn eval_binary(ctx: &EvalContext, op: BinOp, lhs: &Expr, rhs: &Expr, scope: &Scope) -> Result<Value> {
    // Short-circuit forms first.
    if matches!(op, BinOp::And | BinOp::Or) {
        let left = match eval(ctx, lhs, scope)? {
            Value::Bool(left) => left,
            other => return Err(Error::type_mismatch("Boolean", &other)),
        };
        if (op == BinOp::And && !left) || (op == BinOp::Or && left) {
            return Ok(Value::Bool(left));
        }
        return match eval(ctx, rhs, scope)? {
            Value::Bool(right) => Ok(Value::Bool(right)),
            other => Err(Error::type_mismatch("Boolean", &other)),
        };
    }

    let left = eval(ctx, lhs, scope)?;
    let right = eval(ctx, rhs, scope)?;
    match op {
        BinOp::Add => add_values(&left, &right),
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let (Value::Num(a), Value::Num(b)) = (&left, &right) else {
                let offending = if matches!(left, Value::Num(_)) {
                    &right
                } else {
                    &left
                };
                return Err(Error::type_mismatch("Number", offending));
            };
            Ok(Value::Num(match op {
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Mod => a % b,
                _ => unreachable!(),
            }))
        }
        BinOp::Eq => Ok(Value::Bool(left.structural_eq(&right)?)),
        BinOp::Ne => Ok(Value::Bool(!left.structural_eq(&right)?)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = left.compare(&right)?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::Le => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                BinOp::Ge => ord.is_ge(),
                _ => unreachable!(),
            }))
        }
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn add_values(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Str(a), Value::Num(b)) => {
            Ok(Value::string(format!("{a}{}", crate::value::number_to_string(*b))))
        }
        (Value::Num(a), Value::Str(b)) => {
            Ok(Value::string(format!("{}{b}", crate::value::number_to_string(*a))))
        }
        (Value::Arr(a), Value::Arr(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            Ok(Value::array(items))
        }
        (Value::Obj(a), Value::Obj(b)) => {
            let mut builder = ObjectBuilder::new();
            for (key, member) in a.all_entries() {
                builder.insert(key, member.clone());
            }
            for (key, member) in b.all_entries() {
                builder.insert(key, member.clone());
            }
            Ok(Value::Obj(builder.build()))
        }
        _ => Err(Error::type_mismatch_str(
            "two addable values",
            format!("{} and {}", left.pretty_name(), right.pretty_name()),
        )),
    }
}

/// Invoke a user function with a positional argument tuple. Closure
/// parameter counts are exact; built-ins validate their own arity.
pub fn apply(ctx: &EvalContext, func: &Function, args: &[Value]) -> Result<Value> {
    match &*func.0 {
        crate::value::FuncImpl::Native { body, .. } => body(ctx, args),
        crate::value::FuncImpl::Closure { params, body, env } => {
            if params.len() != args.len() {
                return Err(Error::eval(format!(
                    "Function expected {} argument(s), received {}",
                    params.len(),
                    args.len()
                )));
            }
            let frame = env.child();
            for (name, value) in params.iter().zip(args.iter()) {
                frame.define(name.clone(), Lazy::of(value.clone()));
            }
            eval(ctx, body, &frame)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> EvalContext {
    EvalContext::new(
        Rc::new(CodecRegistry::with_defaults()),
        Rc::new(HashMap::new()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(expr: Expr) -> Result<Value> {
        let ctx = test_context();
        eval(&ctx, &expr, &Scope::root(HashMap::new()))
    }

    #[test]
    fn test_local_bindings_are_lazy() {
        // `boom` is never demanded, so its division by a missing
        // variable never runs.
        let expr = Expr::Local {
            bindings: vec![
                ("boom".into(), Expr::Ident("missing".into())),
                ("ok".into(), Expr::Num(7.0)),
            ],
            body: Box::new(Expr::Ident("ok".into())),
        };
        assert!(matches!(run(expr).unwrap(), Value::Num(n) if n == 7.0));
    }

    #[test]
    fn test_array_elements_not_forced_at_construction() {
        let expr = Expr::Array(vec![Expr::Ident("missing".into()), Expr::Num(1.0)]);
        let Value::Arr(items) = run(expr).unwrap() else {
            panic!("Expected array");
        };
        assert!(matches!(items[1].force().unwrap(), Value::Num(n) if n == 1.0));
        assert!(items[0].force().is_err());
    }

    #[test]
    fn test_closure_captures_scope() {
        let expr = Expr::Local {
            bindings: vec![("n".into(), Expr::Num(10.0))],
            body: Box::new(Expr::call(
                Expr::Func {
                    params: vec!["x".into()],
                    body: Rc::new(Expr::Binary {
                        op: BinOp::Add,
                        lhs: Box::new(Expr::Ident("x".into())),
                        rhs: Box::new(Expr::Ident("n".into())),
                    }),
                },
                vec![Expr::Num(5.0)],
            )),
        };
        assert!(matches!(run(expr).unwrap(), Value::Num(n) if n == 15.0));
    }

    #[test]
    fn test_string_plus_number_coerces() {
        let expr = Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Str("n=".into())),
            rhs: Box::new(Expr::Num(5.0)),
        };
        let Value::Str(s) = run(expr).unwrap() else {
            panic!("Expected string");
        };
        assert_eq!(s.as_ref(), "n=5");
    }

    #[test]
    fn test_cross_kind_comparison_is_general_mismatch() {
        let expr = Expr::Binary {
            op: BinOp::Lt,
            lhs: Box::new(Expr::Num(5.0)),
            rhs: Box::new(Expr::Str("a".into())),
        };
        assert_eq!(
            run(expr).unwrap_err().to_string(),
            "Expected Number, String, or Boolean, got: string"
        );
    }

    #[test]
    fn test_negative_and_fractional_indices_error() {
        let arr = Expr::Array(vec![Expr::Num(1.0), Expr::Num(2.0)]);
        let expr = Expr::Index {
            target: Box::new(arr.clone()),
            index: Box::new(Expr::Num(-1.0)),
        };
        assert_eq!(
            run(expr).unwrap_err().to_string(),
            "Array index out of bounds: -1 of 2"
        );
        let expr = Expr::Index {
            target: Box::new(arr),
            index: Box::new(Expr::Num(0.5)),
        };
        assert_eq!(
            run(expr).unwrap_err().to_string(),
            "Array index out of bounds: 0.5 of 2"
        );
        let expr = Expr::Index {
            target: Box::new(Expr::Str("ab".into())),
            index: Box::new(Expr::Num(-2.0)),
        };
        assert_eq!(
            run(expr).unwrap_err().to_string(),
            "String index out of bounds: -2 of 2"
        );
    }

    #[test]
    fn test_if_requires_boolean() {
        let expr = Expr::If {
            cond: Box::new(Expr::Num(1.0)),
            then_branch: Box::new(Expr::Null),
            else_branch: None,
        };
        assert_eq!(run(expr).unwrap_err().to_string(), "Expected Boolean, got: number");
    }

    #[test]
    fn test_object_member_forced_on_access() {
        let expr = Expr::Index {
            target: Box::new(Expr::Object(vec![
                crate::ast::Field::new("bad", Expr::Ident("missing".into())),
                crate::ast::Field::new("good", Expr::Num(2.0)),
            ])),
            index: Box::new(Expr::Str("good".into())),
        };
        assert!(matches!(run(expr).unwrap(), Value::Num(n) if n == 2.0));
    }
}
