//! This module defines the core value type and helper functions for
//! representing programs and data in the interpreter. The main enum,
//! [`Value`], covers every Lisp data type: numbers, booleans, symbols,
//! strings, lists, builtin operators, user-defined lambdas, and the null
//! value produced by forms with no meaningful result. The reader emits
//! only the first five variants; callables arise during evaluation.
//! Ergonomic helpers such as [`val`], [`sym`], and `Value::nil` are
//! provided for convenient construction in code and tests, together with
//! conversion traits from common Rust types. Equality and display logic
//! are customized to match the dialect: lists compare structurally, and
//! the printed form renders the empty list and null as `NIL`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtinops::BuiltinOp;
use crate::evaluator::Env;

/// Core value type of the interpreter.
///
/// Lists carry a shared, interior-mutable sequence: `setf` mutates them in
/// place, and the mutation is visible through every alias. Fresh lists are
/// allocated by constructors like `list`, `append`, and `reverse`.
#[derive(Clone)]
pub enum Value {
    /// Numbers (host floating point; integer literals parse to this)
    Number(f64),
    /// Boolean values
    Bool(bool),
    /// Symbols (identifiers and operator names)
    Symbol(String),
    /// String literals, stored without their quotes
    Str(String),
    /// Lists; the empty list doubles as the dialect's nil
    List(Rc<RefCell<Vec<Value>>>),
    /// Builtin operators from the registry
    Builtin(&'static BuiltinOp),
    /// User-defined functions closing over their definition environment
    Lambda(Rc<Lambda>),
    /// The result of forms with no meaningful value; rendered as NIL
    Null,
}

/// A user-defined function: parameter names, body forms, and the
/// environment captured at definition time.
pub struct Lambda {
    pub(crate) params: Vec<String>,
    pub(crate) body: Vec<Value>,
    pub(crate) env: Env,
}

impl Value {
    /// Allocate a fresh list value.
    pub(crate) fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Allocate a fresh empty list (the dialect's nil).
    pub(crate) fn nil() -> Value {
        Value::list(Vec::new())
    }

    /// Check if a value is the empty list.
    pub(crate) fn is_nil(&self) -> bool {
        matches!(self, Value::List(items) if items.borrow().is_empty())
    }

    /// Truth test used by `if`, `cond`, and loop end tests: only `false`
    /// is falsy. The empty list is truthy.
    pub(crate) fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// Truth test used by `and`, `or`, and `not`: `false` and `Null` are
    /// falsy. The empty list is still truthy.
    pub(crate) fn is_logically_true(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null)
    }

    /// Identity comparison: scalars by value, lists and callables by
    /// pointer. This is the comparison behind `eq` and `member`.
    pub(crate) fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Str(s) => write!(f, "Str(\"{s}\")"),
            Value::List(items) => {
                write!(f, "List(")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                write!(f, ")")
            }
            Value::Builtin(op) => write!(f, "Builtin({})", op.name),
            Value::Lambda(lambda) => write!(f, "Lambda(params={:?})", lambda.params),
            Value::Null => write!(f, "Null"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($num_type:ty) => {
        impl From<$num_type> for Value {
            fn from(n: $num_type) -> Self {
                Value::Number(n as f64)
            }
        }
    };
}

// Generate From implementations for the numeric types tests reach for
impl_from_number!(i8);
impl_from_number!(i16);
impl_from_number!(i32);
impl_from_number!(i64);
impl_from_number!(u8);
impl_from_number!(u16);
impl_from_number!(u32);
impl_from_number!(f64); // Special case - no precision change

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(|x| x.into()).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values - accepts any convertible type
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

impl std::fmt::Display for Value {
    /// The printed form used by the output operators and error rendering.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                let items = items.borrow();
                if items.is_empty() {
                    return write!(f, "NIL");
                }
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Builtin(_) | Value::Lambda(_) => write!(f, "#<FUNCTION>"),
            Value::Null => write!(f, "NIL"),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality: scalars by value, lists element-wise,
    /// callables by identity. This is the comparison behind `equal`.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}
