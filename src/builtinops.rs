//! Built-in operations registry.
//!
//! Every builtin operator is described once in [`BUILTIN_OPS`] with its
//! name, arity, and implementation; the root environment is populated from
//! this table. Special forms (`if`, `let`, `do`, …) are syntax handled by
//! the evaluator and are not in this registry.
//!
//! ## Error Handling
//!
//! - **Arity checking**: argument counts are validated against the
//!   declared [`Arity`] before the implementation runs.
//! - **Type safety**: operations reject incorrect types with an
//!   operator-named diagnostic (e.g. `+: All arguments must be numbers`).
//! - **Wrapping**: anything raised while applying a builtin, arity
//!   failures included, surfaces as `Error in procedure <op>: <msg>`.
//!
//! ## Adding New Operations
//!
//! 1. Implement the function following the signature
//!    `fn(&mut Interpreter, &[Value]) -> Result<Value, Error>`
//! 2. Add it to `BUILTIN_OPS` with its name and arity
//! 3. Add test coverage for edge cases and error conditions

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::Value;
use crate::evaluator;
use crate::interpreter::Interpreter;

/// Canonical builtin signature. The session parameter gives the I/O
/// operators access to the output buffer and input provider, and lets
/// `funcall`/`mapcar` re-enter procedure application.
pub type BuiltinFn = fn(&mut Interpreter, &[Value]) -> Result<Value, Error>;

/// Expected number of arguments for a builtin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
    Any,
}

impl Arity {
    /// Check an argument count, rendering an operator-named diagnostic on
    /// mismatch.
    pub(crate) fn validate(self, name: &str, got: usize) -> Result<(), Error> {
        let expected = match self {
            Arity::Exact(n) if got != n => format!("exactly {n} {}", plural(n)),
            Arity::AtLeast(n) if got < n => format!("at least {n} {}", plural(n)),
            Arity::Range(lo, hi) if got < lo || got > hi => {
                format!("between {lo} and {hi} arguments")
            }
            _ => return Ok(()),
        };
        Err(Error::EvalError(format!(
            "{name}: Expected {expected}, got {got}"
        )))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "argument" } else { "arguments" }
}

/// Definition of a built-in operation.
pub struct BuiltinOp {
    /// The name this operation is bound to in the root environment
    pub name: &'static str,
    /// Expected number of arguments
    pub arity: Arity,
    func: BuiltinFn,
}

impl BuiltinOp {
    /// Validate arity and run the implementation, wrapping any failure
    /// with the operator name.
    pub(crate) fn invoke(&self, interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
        self.arity
            .validate(self.name, args.len())
            .and_then(|()| (self.func)(interp, args))
            .map_err(|err| Error::InProcedure {
                name: self.name.to_owned(),
                message: err.to_string(),
            })
    }
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinOp({})", self.name)
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Names uniquely identify operations in the registry
        self.name == other.name
    }
}

//
// Argument conversion helpers
//

fn as_numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, Error> {
    args.iter()
        .map(|arg| match arg {
            Value::Number(n) => Ok(*n),
            _ => Err(Error::EvalError(format!(
                "{name}: All arguments must be numbers"
            ))),
        })
        .collect()
}

fn as_number(name: &str, arg: &Value) -> Result<f64, Error> {
    match arg {
        Value::Number(n) => Ok(*n),
        _ => Err(Error::EvalError(format!("{name}: Expected a number"))),
    }
}

/// Snapshot the elements of a list argument.
fn as_list(name: &str, arg: &Value) -> Result<Vec<Value>, Error> {
    match arg {
        Value::List(items) => Ok(items.borrow().clone()),
        _ => Err(Error::EvalError(format!("{name}: Expected a list"))),
    }
}

/// Convert a float index to a checked usize position within `len`.
fn as_index(name: &str, index: f64, len: usize) -> Result<usize, Error> {
    if index.fract() != 0.0 || index < 0.0 || index >= len as f64 {
        return Err(Error::EvalError(format!("{name}: Index out of bounds")));
    }
    Ok(index as usize)
}

//
// Arithmetic
//

fn builtin_add(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("+", args)?;
    Ok(Value::Number(nums.into_iter().sum()))
}

fn builtin_mul(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("*", args)?;
    Ok(Value::Number(nums.into_iter().product()))
}

fn builtin_sub(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("-", args)?;
    if nums.len() == 1 {
        return Ok(Value::Number(-nums[0]));
    }
    Ok(Value::Number(nums[1..].iter().fold(nums[0], |acc, n| acc - n)))
}

fn builtin_div(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("/", args)?;
    if nums.len() == 1 {
        return Ok(Value::Number(1.0 / nums[0]));
    }
    Ok(Value::Number(nums[1..].iter().fold(nums[0], |acc, n| acc / n)))
}

fn builtin_mod(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("mod", args)?;
    Ok(Value::Number(nums[0] % nums[1]))
}

// Macro to generate the numeric comparison builtins
macro_rules! numeric_comparison {
    ($func:ident, $name:expr, $op:tt) => {
        fn $func(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
            let nums = as_numbers($name, args)?;
            Ok(Value::Bool(nums[0] $op nums[1]))
        }
    };
}

numeric_comparison!(builtin_gt, ">", >);
numeric_comparison!(builtin_lt, "<", <);
numeric_comparison!(builtin_ge, ">=", >=);
numeric_comparison!(builtin_le, "<=", <=);
numeric_comparison!(builtin_num_eq, "=", ==);

fn builtin_max(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("max", args)?;
    Ok(Value::Number(nums[1..].iter().fold(nums[0], |a, b| a.max(*b))))
}

fn builtin_min(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let nums = as_numbers("min", args)?;
    Ok(Value::Number(nums[1..].iter().fold(nums[0], |a, b| a.min(*b))))
}

fn builtin_abs(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Number(as_number("abs", &args[0])?.abs()))
}

fn builtin_sqrt(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let n = as_number("sqrt", &args[0])?;
    if n < 0.0 {
        return Err(Error::EvalError(
            "sqrt: Expected a non-negative number".to_owned(),
        ));
    }
    Ok(Value::Number(n.sqrt()))
}

//
// List operations
//

// car/first and cdr/rest are separate registry entries so their
// diagnostics carry the name the program actually used.
macro_rules! list_head {
    ($func:ident, $name:expr) => {
        fn $func(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
            let items = as_list($name, &args[0])?;
            items.into_iter().next().ok_or_else(|| {
                Error::EvalError(concat!($name, ": Expected a non-empty list").to_owned())
            })
        }
    };
}

macro_rules! list_tail {
    ($func:ident, $name:expr) => {
        fn $func(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
            let items = as_list($name, &args[0])?;
            if items.is_empty() {
                return Err(Error::EvalError(
                    concat!($name, ": Expected a non-empty list").to_owned(),
                ));
            }
            Ok(Value::list(items[1..].to_vec()))
        }
    };
}

list_head!(builtin_car, "car");
list_head!(builtin_first, "first");
list_tail!(builtin_cdr, "cdr");
list_tail!(builtin_rest, "rest");

// Positional accessors with length checks
macro_rules! positional_accessor {
    ($func:ident, $name:expr, $index:expr) => {
        fn $func(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
            let items = as_list($name, &args[0])?;
            items.into_iter().nth($index).ok_or_else(|| {
                Error::EvalError(format!(
                    concat!($name, ": Expected a list with at least {} elements"),
                    $index + 1
                ))
            })
        }
    };
}

positional_accessor!(builtin_second, "second", 1);
positional_accessor!(builtin_third, "third", 2);
positional_accessor!(builtin_fourth, "fourth", 3);
positional_accessor!(builtin_fifth, "fifth", 4);
positional_accessor!(builtin_cadr, "cadr", 1);
positional_accessor!(builtin_caddr, "caddr", 2);
positional_accessor!(builtin_cadddr, "cadddr", 3);

fn builtin_cons(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let Value::List(tail) = &args[1] else {
        return Err(Error::EvalError(
            "cons: Expected a list as second argument".to_owned(),
        ));
    };
    let mut items = vec![args[0].clone()];
    items.extend_from_slice(&tail.borrow());
    Ok(Value::list(items))
}

fn builtin_list(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::list(args.to_vec()))
}

fn builtin_append(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut items = Vec::new();
    for arg in args {
        let Value::List(part) = arg else {
            return Err(Error::EvalError(
                "append: All arguments must be lists".to_owned(),
            ));
        };
        items.extend_from_slice(&part.borrow());
    }
    Ok(Value::list(items))
}

fn builtin_reverse(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut items = as_list("reverse", &args[0])?;
    items.reverse();
    Ok(Value::list(items))
}

fn builtin_nth(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let index = as_number("nth", &args[0])?;
    let items = as_list("nth", &args[1])?;
    let index = as_index("nth", index, items.len())?;
    Ok(items[index].clone())
}

fn builtin_member(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let items = as_list("member", &args[1])?;
    // Identity comparison: structurally equal but distinct lists do not
    // match (preserved dialect behavior)
    for (i, item) in items.iter().enumerate() {
        if args[0].identical(item) {
            return Ok(Value::list(items[i..].to_vec()));
        }
    }
    Ok(Value::Bool(false))
}

fn builtin_subseq(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let items = as_list("subseq", &args[0])?;
    let start = as_number("subseq", &args[1])?;
    let end = match args.get(2) {
        Some(arg) => as_number("subseq", arg)?,
        None => items.len() as f64,
    };
    if start.fract() != 0.0
        || end.fract() != 0.0
        || start < 0.0
        || end < start
        || end > items.len() as f64
    {
        return Err(Error::EvalError("subseq: Index out of bounds".to_owned()));
    }
    Ok(Value::list(items[start as usize..end as usize].to_vec()))
}

//
// Application operators
//

/// Resolve the function argument of `funcall`/`mapcar`: a callable value
/// passes through, a symbol is looked up in the root environment.
fn resolve_callable(interp: &mut Interpreter, value: &Value) -> Result<Value, Error> {
    match value {
        Value::Builtin(_) | Value::Lambda(_) => Ok(value.clone()),
        Value::Symbol(name) => interp
            .globals()
            .lookup(name)
            .ok_or_else(|| Error::UnknownSymbol(name.clone())),
        other => Err(Error::NotAProcedure(other.to_string())),
    }
}

fn builtin_funcall(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let func = resolve_callable(interp, &args[0])?;
    evaluator::apply(interp, &func, args[1..].to_vec())
}

fn builtin_mapcar(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let func = resolve_callable(interp, &args[0])?;
    let lists = args[1..]
        .iter()
        .map(|arg| as_list("mapcar", arg))
        .collect::<Result<Vec<_>, Error>>()?;
    // Element-wise application stops at the shortest list
    let shortest = lists.iter().map(Vec::len).min().unwrap_or(0);
    let mut results = Vec::with_capacity(shortest);
    for i in 0..shortest {
        let call_args: Vec<Value> = lists.iter().map(|list| list[i].clone()).collect();
        results.push(evaluator::apply(interp, &func, call_args)?);
    }
    Ok(Value::list(results))
}

//
// Predicates
//

fn builtin_listp(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::List(_))))
}

fn builtin_atom(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(!matches!(args[0], Value::List(_))))
}

fn builtin_null(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].is_nil()))
}

fn builtin_numberp(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::Number(_))))
}

fn builtin_symbolp(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
}

fn builtin_zerop(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(as_number("zerop", &args[0])? == 0.0))
}

fn builtin_plusp(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(as_number("plusp", &args[0])? > 0.0))
}

fn builtin_minusp(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(as_number("minusp", &args[0])? < 0.0))
}

fn builtin_eq(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].identical(&args[1])))
}

fn builtin_equal(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0] == args[1]))
}

fn builtin_not(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(!args[0].is_logically_true()))
}

//
// I/O operators
//

fn builtin_print(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    interp.emit(line);
    Ok(args.last().cloned().unwrap_or(Value::Null))
}

fn builtin_prin1(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    interp.emit(args[0].to_string());
    Ok(args[0].clone())
}

/// Substitute each `%s`/`%d` with the next argument's printed form.
/// Directives beyond the argument list are left untouched.
fn substitute_directives(template: &str, args: &[Value]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut next_arg = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '%'
            && matches!(chars.peek(), Some(&('s' | 'd')))
            && let Some(arg) = next_arg.next()
        {
            chars.next();
            result.push_str(&arg.to_string());
        } else {
            result.push(ch);
        }
    }
    result
}

fn builtin_format(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let Value::Str(template) = &args[1] else {
        return Err(Error::EvalError(
            "format: Expected a format string".to_owned(),
        ));
    };
    let rendered = substitute_directives(template, &args[2..]);
    // A `t` stream writes one buffer entry, anything else is discarded
    if matches!(args[0], Value::Bool(true)) {
        interp.emit(rendered.clone());
        Ok(Value::Str(rendered))
    } else {
        Ok(Value::Null)
    }
}

fn builtin_read_line(interp: &mut Interpreter, _: &[Value]) -> Result<Value, Error> {
    interp.next_input_line().map(Value::Str)
}

fn builtin_exit(interp: &mut Interpreter, _: &[Value]) -> Result<Value, Error> {
    // Prints a farewell but does not halt evaluation
    interp.emit("Exiting Lisp interpreter".to_owned());
    Ok(Value::Str("exit".to_owned()))
}

/// Global registry of all built-in operations. The root environment is
/// populated from this table; `nil` and `t` are added alongside it.
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Arithmetic
    BuiltinOp { name: "+", arity: Arity::Any, func: builtin_add },
    BuiltinOp { name: "-", arity: Arity::AtLeast(1), func: builtin_sub },
    BuiltinOp { name: "*", arity: Arity::Any, func: builtin_mul },
    BuiltinOp { name: "/", arity: Arity::AtLeast(1), func: builtin_div },
    BuiltinOp { name: "mod", arity: Arity::Exact(2), func: builtin_mod },
    // Comparisons
    BuiltinOp { name: ">", arity: Arity::Exact(2), func: builtin_gt },
    BuiltinOp { name: "<", arity: Arity::Exact(2), func: builtin_lt },
    BuiltinOp { name: ">=", arity: Arity::Exact(2), func: builtin_ge },
    BuiltinOp { name: "<=", arity: Arity::Exact(2), func: builtin_le },
    BuiltinOp { name: "=", arity: Arity::Exact(2), func: builtin_num_eq },
    // Math
    BuiltinOp { name: "max", arity: Arity::AtLeast(1), func: builtin_max },
    BuiltinOp { name: "min", arity: Arity::AtLeast(1), func: builtin_min },
    BuiltinOp { name: "abs", arity: Arity::Exact(1), func: builtin_abs },
    BuiltinOp { name: "sqrt", arity: Arity::Exact(1), func: builtin_sqrt },
    // List operations
    BuiltinOp { name: "car", arity: Arity::Exact(1), func: builtin_car },
    BuiltinOp { name: "first", arity: Arity::Exact(1), func: builtin_first },
    BuiltinOp { name: "cdr", arity: Arity::Exact(1), func: builtin_cdr },
    BuiltinOp { name: "rest", arity: Arity::Exact(1), func: builtin_rest },
    BuiltinOp { name: "cons", arity: Arity::Exact(2), func: builtin_cons },
    BuiltinOp { name: "list", arity: Arity::Any, func: builtin_list },
    BuiltinOp { name: "append", arity: Arity::Any, func: builtin_append },
    BuiltinOp { name: "reverse", arity: Arity::Exact(1), func: builtin_reverse },
    BuiltinOp { name: "nth", arity: Arity::Exact(2), func: builtin_nth },
    BuiltinOp { name: "second", arity: Arity::Exact(1), func: builtin_second },
    BuiltinOp { name: "third", arity: Arity::Exact(1), func: builtin_third },
    BuiltinOp { name: "fourth", arity: Arity::Exact(1), func: builtin_fourth },
    BuiltinOp { name: "fifth", arity: Arity::Exact(1), func: builtin_fifth },
    BuiltinOp { name: "cadr", arity: Arity::Exact(1), func: builtin_cadr },
    BuiltinOp { name: "caddr", arity: Arity::Exact(1), func: builtin_caddr },
    BuiltinOp { name: "cadddr", arity: Arity::Exact(1), func: builtin_cadddr },
    BuiltinOp { name: "member", arity: Arity::Exact(2), func: builtin_member },
    BuiltinOp { name: "subseq", arity: Arity::Range(2, 3), func: builtin_subseq },
    // Application
    BuiltinOp { name: "funcall", arity: Arity::AtLeast(1), func: builtin_funcall },
    BuiltinOp { name: "mapcar", arity: Arity::AtLeast(2), func: builtin_mapcar },
    // Predicates
    BuiltinOp { name: "listp", arity: Arity::Exact(1), func: builtin_listp },
    BuiltinOp { name: "list?", arity: Arity::Exact(1), func: builtin_listp },
    BuiltinOp { name: "atom", arity: Arity::Exact(1), func: builtin_atom },
    BuiltinOp { name: "null", arity: Arity::Exact(1), func: builtin_null },
    BuiltinOp { name: "null?", arity: Arity::Exact(1), func: builtin_null },
    BuiltinOp { name: "numberp", arity: Arity::Exact(1), func: builtin_numberp },
    BuiltinOp { name: "number?", arity: Arity::Exact(1), func: builtin_numberp },
    BuiltinOp { name: "zerop", arity: Arity::Exact(1), func: builtin_zerop },
    BuiltinOp { name: "plusp", arity: Arity::Exact(1), func: builtin_plusp },
    BuiltinOp { name: "minusp", arity: Arity::Exact(1), func: builtin_minusp },
    BuiltinOp { name: "symbol?", arity: Arity::Exact(1), func: builtin_symbolp },
    BuiltinOp { name: "eq", arity: Arity::Exact(2), func: builtin_eq },
    BuiltinOp { name: "equal", arity: Arity::Exact(2), func: builtin_equal },
    BuiltinOp { name: "not", arity: Arity::Exact(1), func: builtin_not },
    // I/O
    BuiltinOp { name: "print", arity: Arity::Any, func: builtin_print },
    BuiltinOp { name: "prin1", arity: Arity::Exact(1), func: builtin_prin1 },
    BuiltinOp { name: "format", arity: Arity::AtLeast(2), func: builtin_format },
    BuiltinOp { name: "read-line", arity: Arity::Exact(0), func: builtin_read_line },
    BuiltinOp { name: "exit", arity: Arity::Any, func: builtin_exit },
    BuiltinOp { name: "bye", arity: Arity::Any, func: builtin_exit },
];

/// Lazy map from operator name to its registry entry
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.name, op)).collect());

/// All builtin operations (used to populate the root environment)
pub(crate) fn all_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by name
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn find_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(name).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{sym, val};

    /// Invoke a builtin through the registry, arity validation and error
    /// wrapping included, against a throwaway session.
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = find_op(name).expect("builtin not found");
        let mut interp = Interpreter::new();
        op.invoke(&mut interp, args)
    }

    /// Micro-helper for success cases
    fn success<T: Into<Value>>(value: T) -> Option<Value> {
        Some(value.into())
    }

    /// Macro to create test cases, invoking builtins via the registry.
    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_builtin($name, $args), $expected)
        };
    }

    #[test]
    fn test_builtin_ops_registry() {
        let add_op = find_op("+").unwrap();
        assert_eq!(add_op.arity, Arity::Any);

        let car_op = find_op("car").unwrap();
        assert_eq!(car_op.arity, Arity::Exact(1));

        // Aliases resolve to distinct entries with their own names
        let first_op = find_op("first").unwrap();
        assert_ne!(car_op.name, first_op.name);

        // Every registry entry is indexed
        for op in all_ops() {
            assert!(std::ptr::eq(find_op(op.name).unwrap(), op));
        }

        // Unknown operations return None
        assert!(find_op("unknown").is_none());
        // Special forms are evaluator syntax, not registry entries
        assert!(find_op("if").is_none());
        assert!(find_op("let").is_none());
        assert!(find_op("quote").is_none());
    }

    #[test]
    fn test_arity_validation() {
        use Arity::*;

        Exact(2).validate("f", 2).unwrap();
        Exact(2).validate("f", 1).unwrap_err();
        Exact(2).validate("f", 3).unwrap_err();

        AtLeast(1).validate("f", 1).unwrap();
        AtLeast(1).validate("f", 5).unwrap();
        AtLeast(1).validate("f", 0).unwrap_err();

        Range(2, 3).validate("f", 2).unwrap();
        Range(2, 3).validate("f", 3).unwrap();
        Range(2, 3).validate("f", 1).unwrap_err();
        Range(2, 3).validate("f", 4).unwrap_err();

        Any.validate("f", 0).unwrap();
        Any.validate("f", 100).unwrap();

        // Messages carry the operator name and the expectation
        let err = Exact(1).validate("car", 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "car: Expected exactly 1 argument, got 2"
        );
        let err = AtLeast(2).validate("mapcar", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "mapcar: Expected at least 2 arguments, got 1"
        );
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Result<Value, Error>, Option<Value>);

        // Shared list data for aliasing-sensitive cases
        let shared = val([1, 2]);
        let nested = val(vec![val([1]), val(2)]);

        let test_cases: Vec<TestCase> = vec![
            // === ARITHMETIC ===
            test!("+", &[], success(0)),
            test!("+", &[val(5)], success(5)),
            test!("+", &[val(1), val(2), val(3), val(4)], success(10)),
            test!("+", &[val(1.5), val(2.25)], success(3.75)),
            test!("+", &[val(1), val("a")], None), // Type error
            test!("-", &[val(5)], success(-5)),
            test!("-", &[val(10), val(5)], success(5)),
            test!("-", &[val(10), val(3), val(2)], success(5)),
            test!("-", &[], None), // Arity error
            test!("*", &[], success(1)),
            test!("*", &[val(2), val(3), val(4)], success(24)),
            test!("/", &[val(10), val(2)], success(5)),
            test!("/", &[val(2)], success(0.5)),
            test!("/", &[val(24), val(2), val(3)], success(4)),
            test!("mod", &[val(7), val(3)], success(1)),
            test!("mod", &[val(-7), val(3)], success(-1)), // Host remainder keeps the sign
            test!("mod", &[val(7)], None),                 // Arity error
            // === COMPARISONS ===
            test!(">", &[val(7), val(3)], success(true)),
            test!(">", &[val(3), val(7)], success(false)),
            test!(">", &[val(1), val(2), val(3)], None), // Exactly 2 args
            test!("<", &[val(2), val(9)], success(true)),
            test!(">=", &[val(4), val(4)], success(true)),
            test!("<=", &[val(5), val(4)], success(false)),
            test!("=", &[val(5), val(5)], success(true)),
            test!("=", &[val(5), val(6)], success(false)),
            test!("=", &[val("a"), val("a")], None), // Numbers only
            // === MATH ===
            test!("max", &[val(5)], success(5)),
            test!("max", &[val(1), val(9), val(4)], success(9)),
            test!("min", &[val(3), val(1), val(2)], success(1)),
            test!("max", &[], None),
            test!("abs", &[val(-4)], success(4)),
            test!("abs", &[val(4)], success(4)),
            test!("sqrt", &[val(9)], success(3)),
            test!("sqrt", &[val(-1)], None),
            test!("sqrt", &[val("x")], None),
            // === LIST OPERATIONS ===
            test!("car", &[val([1, 2, 3])], success(1)),
            test!("car", &[Value::nil()], None),
            test!("car", &[val(42)], None),
            test!("first", &[val(["a", "b"])], success("a")),
            test!("cdr", &[val([1, 2, 3])], success([2, 3])),
            test!("cdr", &[val([1])], Some(Value::nil())),
            test!("cdr", &[Value::nil()], None),
            test!("rest", &[val([1, 2])], success([2])),
            test!("cons", &[val(0), val([1, 2])], success([0, 1, 2])),
            test!("cons", &[val("x"), Value::nil()], success(["x"])),
            test!("cons", &[val(1), val(2)], None), // Second arg not a list
            test!("list", &[], Some(Value::nil())),
            test!(
                "list",
                &[val(1), val("two"), val(true)],
                success(vec![val(1), val("two"), val(true)])
            ),
            test!(
                "append",
                &[val([1, 2]), val([3]), Value::nil()],
                success([1, 2, 3])
            ),
            test!("append", &[], Some(Value::nil())),
            test!("append", &[val([1]), val(2)], None),
            test!("reverse", &[val([1, 2, 3])], success([3, 2, 1])),
            test!("reverse", &[Value::nil()], Some(Value::nil())),
            test!("nth", &[val(0), val([1, 2])], success(1)),
            test!("nth", &[val(1), val([1, 2])], success(2)),
            test!("nth", &[val(2), val([1, 2])], None), // Out of bounds
            test!("nth", &[val(-1), val([1, 2])], None),
            test!("nth", &[val(0.5), val([1, 2])], None), // Non-integral index
            test!("second", &[val([1, 2, 3])], success(2)),
            test!("second", &[val([1])], None),
            test!("third", &[val([1, 2, 3])], success(3)),
            test!("fourth", &[val([1, 2, 3, 4])], success(4)),
            test!("fifth", &[val([1, 2, 3, 4, 5])], success(5)),
            test!("cadr", &[val([1, 2, 3])], success(2)),
            test!("caddr", &[val([1, 2, 3])], success(3)),
            test!("cadddr", &[val([1, 2, 3, 4])], success(4)),
            test!("cadddr", &[val([1, 2, 3])], None),
            test!("member", &[val(2), val([1, 2, 3])], success([2, 3])),
            test!("member", &[val(9), val([1, 2, 3])], success(false)),
            // Identity comparison: a structurally equal list is no match
            test!(
                "member",
                &[val([1]), val(vec![val([1])])],
                success(false)
            ),
            test!("subseq", &[val([1, 2, 3, 4]), val(1)], success([2, 3, 4])),
            test!(
                "subseq",
                &[val([1, 2, 3, 4]), val(1), val(3)],
                success([2, 3])
            ),
            test!(
                "subseq",
                &[val([1, 2]), val(0), val(0)],
                Some(Value::nil())
            ),
            test!("subseq", &[val([1, 2]), val(1), val(5)], None),
            test!("subseq", &[val([1, 2]), val(2), val(1)], None),
            // === PREDICATES ===
            test!("listp", &[val([1])], success(true)),
            test!("listp", &[Value::nil()], success(true)),
            test!("listp", &[val(1)], success(false)),
            test!("list?", &[val([1])], success(true)),
            test!("atom", &[val(1)], success(true)),
            test!("atom", &[sym("x")], success(true)),
            test!("atom", &[val([1])], success(false)),
            test!("null", &[Value::nil()], success(true)),
            test!("null", &[val([1])], success(false)),
            test!("null", &[val(false)], success(false)),
            test!("null?", &[Value::nil()], success(true)),
            test!("numberp", &[val(1)], success(true)),
            test!("numberp", &[val("1")], success(false)),
            test!("number?", &[val(2.5)], success(true)),
            test!("zerop", &[val(0)], success(true)),
            test!("zerop", &[val(1)], success(false)),
            test!("zerop", &[val("x")], None),
            test!("plusp", &[val(3)], success(true)),
            test!("plusp", &[val(-3)], success(false)),
            test!("minusp", &[val(-3)], success(true)),
            test!("minusp", &[val(0)], success(false)),
            test!("symbol?", &[sym("x")], success(true)),
            test!("symbol?", &[val("x")], success(false)),
            // eq: scalars by value, lists by pointer
            test!("eq", &[val(5), val(5)], success(true)),
            test!("eq", &[val("a"), val("a")], success(true)),
            test!("eq", &[shared.clone(), shared.clone()], success(true)),
            test!("eq", &[val([1, 2]), val([1, 2])], success(false)),
            // equal: structural
            test!("equal", &[val([1, 2]), val([1, 2])], success(true)),
            test!("equal", &[nested.clone(), nested.clone()], success(true)),
            test!("equal", &[val([1]), val([2])], success(false)),
            test!("equal", &[val(1), val("1")], success(false)),
            // not uses the and/or truth test: the empty list is truthy
            test!("not", &[val(false)], success(true)),
            test!("not", &[val(true)], success(false)),
            test!("not", &[Value::nil()], success(false)),
            test!("not", &[Value::Null], success(true)),
            test!("not", &[val(0)], success(false)),
        ];

        for (test_expr, result, expected) in test_cases {
            match (result, expected) {
                (Ok(actual), Some(expected_val)) => {
                    assert_eq!(actual, expected_val, "Failed for test case: {test_expr}");
                }
                (Err(_), None) => {} // Expected error
                (actual, expected) => panic!(
                    "Unexpected result for test case: {}\nGot result: {:?}, Expected: {:?}",
                    test_expr,
                    actual.is_ok(),
                    expected.is_some()
                ),
            }
        }
    }

    #[test]
    fn test_builtin_errors_are_wrapped_with_the_operator_name() {
        let err = call_builtin("car", &[Value::nil()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error in procedure car: car: Expected a non-empty list"
        );

        let err = call_builtin("+", &[val(1), val("a")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error in procedure +: +: All arguments must be numbers"
        );

        // Arity failures are wrapped the same way
        let err = call_builtin("prin1", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error in procedure prin1: prin1: Expected exactly 1 argument, got 0"
        );
    }

    #[test]
    fn test_format_directive_substitution() {
        let test_cases = vec![
            ("x=%s y=%d", vec![val(1), val(2)], "x=1 y=2"),
            ("no directives", vec![], "no directives"),
            ("%s", vec![val([1, 2])], "(1 2)"),
            ("%s and %s", vec![val("a"), sym("b")], "a and b"),
            // Percent without s/d passes through
            ("100%", vec![val(1)], "100%"),
            // Directives beyond the argument list stay untouched
            ("%s %s", vec![val(1)], "1 %s"),
        ];
        for (template, args, expected) in test_cases {
            assert_eq!(
                substitute_directives(template, &args),
                expected,
                "template {template:?}"
            );
        }
    }
}
