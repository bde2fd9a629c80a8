//! Value model and lazy cells.
//!
//! Every user-visible operation accepts and returns [`Value`]s. Arrays and
//! object members hold [`Lazy`] cells so that computation a script never
//! consumes is never performed.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Expr;
use crate::error::{Error, Result};
use crate::eval::{EvalContext, Scope};

/// A script value. Cloning is cheap: aggregate variants share their
/// backing storage.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    Arr(Rc<Vec<Lazy>>),
    Obj(Object),
    Func(Function),
}

impl Value {
    /// Lowercase kind tag used in error messages and `typeOf`.
    #[must_use]
    pub fn pretty_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Num(_) => "number",
            Self::Str(_) => "string",
            Self::Arr(_) => "array",
            Self::Obj(_) => "object",
            Self::Func(_) => "function",
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::Str(Rc::from(s.into().into_boxed_str()))
    }

    pub fn array(items: Vec<Lazy>) -> Self {
        Self::Arr(Rc::new(items))
    }

    /// Eagerly-forced array, for results computed strictly.
    pub fn array_of(items: Vec<Value>) -> Self {
        Self::Arr(Rc::new(items.into_iter().map(Lazy::of).collect()))
    }

    /// Structural equality, forcing lazy cells as needed. Cross-variant
    /// comparisons are strictly unequal; functions compare by identity.
    pub fn structural_eq(&self, other: &Value) -> Result<bool> {
        match (self, other) {
            (Self::Null, Self::Null) => Ok(true),
            (Self::Bool(a), Self::Bool(b)) => Ok(a == b),
            (Self::Num(a), Self::Num(b)) => Ok(a == b),
            (Self::Str(a), Self::Str(b)) => Ok(a == b),
            (Self::Arr(a), Self::Arr(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.force()?.structural_eq(&y.force()?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Self::Obj(a), Self::Obj(b)) => {
                let keys_a: Vec<&str> = a.visible_keys().collect();
                let keys_b: Vec<&str> = b.visible_keys().collect();
                if keys_a.len() != keys_b.len() {
                    return Ok(false);
                }
                for key in keys_a {
                    let (Some(cell_a), Some(cell_b)) = (a.get_visible(key), b.get_visible(key))
                    else {
                        return Ok(false);
                    };
                    if !cell_a.force()?.structural_eq(&cell_b.force()?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Self::Func(a), Self::Func(b)) => Ok(Rc::ptr_eq(&a.0, &b.0)),
            _ => Ok(false),
        }
    }

    /// Total order within one of {number, string, boolean}; `None`
    /// when the kinds differ or either side is unordered.
    fn same_kind_ordering(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => Some(a.partial_cmp(b).unwrap_or(Ordering::Equal)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn is_orderable(&self) -> bool {
        matches!(self, Self::Num(_) | Self::Str(_) | Self::Bool(_))
    }

    /// Comparison for the script-level relational operators. A
    /// cross-kind comparison is the general type mismatch, naming the
    /// unorderable operand, or the right-hand side when the kinds
    /// merely differ.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        self.same_kind_ordering(other).ok_or_else(|| {
            let offender = if self.is_orderable() { other } else { self };
            Error::type_mismatch("Number, String, or Boolean", offender)
        })
    }

    /// Comparison keyed by the array combinators (`max`, `min`,
    /// `maxBy`, `minBy`); a cross-kind comparison names the array
    /// element kind. Callers put the newly scanned element on the left
    /// so a kind divergence is pinned on it.
    pub fn compare_in_array(&self, other: &Value) -> Result<Ordering> {
        self.same_kind_ordering(other).ok_or_else(|| {
            let offender = if other.is_orderable() { self } else { other };
            Error::type_mismatch_str(
                "Array of type String, Boolean, or Number",
                format!("Array of type {}", offender.pretty_name()),
            )
        })
    }

    /// Convert an eagerly-parsed JSON document into a value. Ordering of
    /// object keys is preserved.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Num(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::string(s),
            serde_json::Value::Array(items) => {
                Self::array_of(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut builder = ObjectBuilder::new();
                for (key, item) in map {
                    builder.insert(key, Member::normal(Lazy::of(Self::from_json(item))));
                }
                Self::Obj(builder.build())
            }
        }
    }

    /// Force the whole value into a JSON document. Functions are not
    /// serializable; hidden object members are skipped.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Self::Null => Ok(serde_json::Value::Null),
            Self::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Self::Num(n) => Ok(number_to_json(*n)),
            Self::Str(s) => Ok(serde_json::Value::String(s.to_string())),
            Self::Arr(items) => {
                let mut out = Vec::with_capacity(items.len());
                for cell in items.iter() {
                    out.push(cell.force()?.to_json()?);
                }
                Ok(serde_json::Value::Array(out))
            }
            Self::Obj(obj) => {
                let mut map = serde_json::Map::new();
                for (key, cell) in obj.visible_entries() {
                    map.insert(key.to_string(), cell.force()?.to_json()?);
                }
                Ok(serde_json::Value::Object(map))
            }
            Self::Func(_) => Err(Error::type_mismatch_str(
                "a serializable value",
                "function",
            )),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Arr(items) => write!(f, "<array[{}]>", items.len()),
            Self::Obj(obj) => write!(f, "<object[{}]>", obj.visible_len()),
            Self::Func(func) => write!(f, "<function/{}>", func.param_count()),
        }
    }
}

/// Render a number the way user-facing coercions do: integers drop the
/// fractional part (`5`, never `5.0`), everything else uses the default
/// double formatting.
#[must_use]
pub fn number_to_string(n: f64) -> String {
    if is_integer(n) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if is_integer(n) {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Integer predicate shared by `isInteger`, base conversions, and number
/// rendering: `ceil == floor` within the i64-safe range.
#[must_use]
pub fn is_integer(n: f64) -> bool {
    n.is_finite() && n.ceil() == n.floor() && n.abs() < 9_007_199_254_740_992.0
}

enum LazyState {
    Forced(Value),
    Thunk(Box<dyn FnOnce() -> Result<Value>>),
    /// A thunk was taken for forcing and has not produced a value; only
    /// observable if a failed evaluation is re-entered.
    Poisoned,
}

/// A single-assignment cell that delays evaluation until first demand,
/// then memoizes. Evaluation is single-threaded, so a plain `RefCell`
/// suffices.
#[derive(Clone)]
pub struct Lazy(Rc<RefCell<LazyState>>);

impl Lazy {
    /// An already-computed cell.
    #[must_use]
    pub fn of(value: Value) -> Self {
        Self(Rc::new(RefCell::new(LazyState::Forced(value))))
    }

    /// A suspended computation, run once on first force.
    pub fn suspend(thunk: impl FnOnce() -> Result<Value> + 'static) -> Self {
        Self(Rc::new(RefCell::new(LazyState::Thunk(Box::new(thunk)))))
    }

    /// Force the cell. Re-forcing returns the memoized value without
    /// re-execution.
    pub fn force(&self) -> Result<Value> {
        {
            let state = self.0.borrow();
            match &*state {
                LazyState::Forced(value) => return Ok(value.clone()),
                LazyState::Thunk(_) => {}
                LazyState::Poisoned => {
                    return Err(Error::eval("re-entered a failed lazy computation"))
                }
            }
        }
        let thunk = match std::mem::replace(&mut *self.0.borrow_mut(), LazyState::Poisoned) {
            LazyState::Thunk(thunk) => thunk,
            // Checked above; single-threaded.
            _ => unreachable!("lazy state changed between borrows"),
        };
        let value = thunk()?;
        *self.0.borrow_mut() = LazyState::Forced(value.clone());
        Ok(value)
    }
}

impl std::fmt::Debug for Lazy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.0.borrow() {
            LazyState::Forced(value) => write!(f, "Lazy({value:?})"),
            LazyState::Thunk(_) => write!(f, "Lazy(<thunk>)"),
            LazyState::Poisoned => write!(f, "Lazy(<poisoned>)"),
        }
    }
}

/// Member visibility. Iteration and serialization cover Normal and
/// Unconditional members; Hidden members are reachable only by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Normal,
    Hidden,
    Unconditional,
}

impl Visibility {
    #[must_use]
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// An object member: a visibility flag plus the thunk producing its
/// value under the captured lexical scope.
#[derive(Debug, Clone)]
pub struct Member {
    pub visibility: Visibility,
    pub value: Lazy,
}

impl Member {
    #[must_use]
    pub fn new(visibility: Visibility, value: Lazy) -> Self {
        Self { visibility, value }
    }

    #[must_use]
    pub fn normal(value: Lazy) -> Self {
        Self::new(Visibility::Normal, value)
    }
}

/// Ordered mapping from string keys to members. Visible-key iteration
/// preserves insertion order; the order is observable and stable across
/// every derived object.
#[derive(Debug, Clone)]
pub struct Object(Rc<IndexMap<String, Member>>);

impl Object {
    #[must_use]
    pub fn empty() -> Self {
        Self(Rc::new(IndexMap::new()))
    }

    /// Member lookup by key, hidden members included.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Member> {
        self.0.get(key)
    }

    /// Value cell for a visible member.
    #[must_use]
    pub fn get_visible(&self, key: &str) -> Option<&Lazy> {
        self.0
            .get(key)
            .filter(|m| m.visibility.is_visible())
            .map(|m| &m.value)
    }

    pub fn visible_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, m)| m.visibility.is_visible())
            .map(|(k, _)| k.as_str())
    }

    pub fn visible_entries(&self) -> impl Iterator<Item = (&str, &Lazy)> {
        self.0
            .iter()
            .filter(|(_, m)| m.visibility.is_visible())
            .map(|(k, m)| (k.as_str(), &m.value))
    }

    /// All members in insertion order, hidden included.
    pub fn all_entries(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.0.iter().map(|(k, m)| (k.as_str(), m))
    }

    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.visible_keys().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible_len() == 0
    }
}

/// Builder preserving insertion order; inserting an existing key keeps
/// its original position but replaces the member.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    members: IndexMap<String, Member>,
}

impl ObjectBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, member: Member) {
        self.members.insert(key.into(), member);
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.insert(key, Member::normal(Lazy::of(value)));
    }

    #[must_use]
    pub fn build(self) -> Object {
        Object(Rc::new(self.members))
    }
}

impl FromIterator<(String, Member)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Member)>>(iter: I) -> Self {
        let mut builder = ObjectBuilder::new();
        for (key, member) in iter {
            builder.insert(key, member);
        }
        builder.build()
    }
}

pub(crate) type NativeFn = dyn Fn(&EvalContext, &[Value]) -> Result<Value>;

pub(crate) enum FuncImpl {
    /// A built-in installed into the `ds` namespace.
    Native {
        name: &'static str,
        params: &'static [&'static str],
        body: Box<NativeFn>,
    },
    /// A script closure capturing its lexical scope.
    Closure {
        params: Rc<Vec<String>>,
        body: Rc<Expr>,
        env: Scope,
    },
}

/// A callable closure with an introspectable parameter list. Several
/// combinators branch on the parameter count of user callbacks.
#[derive(Clone)]
pub struct Function(pub(crate) Rc<FuncImpl>);

impl Function {
    pub fn native(
        name: &'static str,
        params: &'static [&'static str],
        body: impl Fn(&EvalContext, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self(Rc::new(FuncImpl::Native {
            name,
            params,
            body: Box::new(body),
        }))
    }

    #[must_use]
    pub fn closure(params: Vec<String>, body: Rc<Expr>, env: Scope) -> Self {
        Self(Rc::new(FuncImpl::Closure {
            params: Rc::new(params),
            body,
            env,
        }))
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        match &*self.0 {
            FuncImpl::Native { params, .. } => params.len(),
            FuncImpl::Closure { params, .. } => params.len(),
        }
    }

    #[must_use]
    pub fn param_names(&self) -> Vec<String> {
        match &*self.0 {
            FuncImpl::Native { params, .. } => params.iter().map(|p| (*p).to_string()).collect(),
            FuncImpl::Closure { params, .. } => params.as_ref().clone(),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        match &*self.0 {
            FuncImpl::Native { name, .. } => Some(name),
            FuncImpl::Closure { .. } => None,
        }
    }
}

/// Named values bound into the root scope of an evaluation.
pub type Bindings = HashMap<String, Lazy>;
