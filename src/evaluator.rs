use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Error;
use crate::MAX_EVAL_DEPTH;
use crate::ast::{Lambda, Value};
use crate::builtinops;
use crate::interpreter::Interpreter;

/// Environment for variable bindings: a chain of shared, interior-mutable
/// frames. Lambdas hold a clone of their definition frame, so bindings
/// written later are visible through previously captured closures.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

impl Env {
    pub(crate) fn new() -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// Create an empty child frame chained to this one.
    pub(crate) fn child(&self) -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Bind a name in this frame, shadowing any ancestor binding.
    pub(crate) fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Look a name up, walking outward through ancestor frames.
    pub(crate) fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.0.parent.as_ref().and_then(|parent| parent.lookup(name))
    }
}

impl PartialEq for Env {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Frames can reach themselves through captured lambdas, so print
        // shallowly instead of walking the bindings.
        write!(f, "Env({} bindings)", self.0.bindings.borrow().len())
    }
}

/// Create the root environment: a frame holding every builtin operator
/// and the `nil`/`t` constants, with a fresh user-global frame on top.
/// `defun`, `setq`, and `setf` mirror bindings into the user frame.
pub(crate) fn create_global_env() -> Env {
    let builtins = Env::new();
    for op in builtinops::all_ops() {
        builtins.define(op.name, Value::Builtin(op));
    }
    builtins.define("nil", Value::nil());
    builtins.define("t", Value::Bool(true));
    builtins.child()
}

/// Evaluate a form in an environment.
pub(crate) fn eval(interp: &mut Interpreter, form: &Value, env: &Env) -> Result<Value, Error> {
    eval_at_depth(interp, form, env, 0)
}

/// Apply a callable to already-evaluated arguments (entry point for
/// `funcall` and `mapcar`).
pub(crate) fn apply(interp: &mut Interpreter, func: &Value, args: Vec<Value>) -> Result<Value, Error> {
    apply_at_depth(interp, func, args, 0)
}

fn eval_at_depth(
    interp: &mut Interpreter,
    form: &Value,
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match form {
        // Self-evaluating forms
        Value::Number(_)
        | Value::Bool(_)
        | Value::Str(_)
        | Value::Builtin(_)
        | Value::Lambda(_)
        | Value::Null => Ok(form.clone()),

        // Variable lookup
        Value::Symbol(name) => env
            .lookup(name)
            .ok_or_else(|| Error::UnknownSymbol(name.clone())),

        // Special forms and procedure application. The list is snapshotted
        // so a `setf` running inside the form cannot invalidate the walk.
        Value::List(items) => {
            let items: Vec<Value> = items.borrow().clone();
            let Some((head, args)) = items.split_first() else {
                // The empty list evaluates to itself
                return Ok(form.clone());
            };

            if let Value::Symbol(name) = head {
                match name.as_str() {
                    "quote" => return eval_quote(args),
                    "defun" => return eval_defun(interp, args, env),
                    "lambda" => return eval_lambda(args, env),
                    "setq" => return eval_setq(interp, args, env, depth),
                    "setf" => return eval_setf(interp, args, env, depth),
                    "if" => return eval_if(interp, args, env, depth),
                    "cond" => return eval_cond(interp, args, env, depth),
                    "case" => return eval_case(interp, args, env, depth),
                    "let" => return eval_let(interp, args, env, depth),
                    "begin" | "progn" => return eval_body(interp, args, env, depth),
                    "do" => return eval_do(interp, args, env, depth),
                    "dolist" => return eval_dolist(interp, args, env, depth),
                    "dotimes" => return eval_dotimes(interp, args, env, depth),
                    "eval" => return eval_eval(interp, args, env, depth),
                    "and" => return eval_and(interp, args, env, depth),
                    "or" => return eval_or(interp, args, env, depth),
                    _ => {}
                }
            }

            // Procedure application: operator first, then arguments
            // strictly left to right.
            let func = eval_at_depth(interp, head, env, depth + 1)?;
            let mut call_args = Vec::with_capacity(args.len());
            for arg in args {
                call_args.push(eval_at_depth(interp, arg, env, depth + 1)?);
            }
            apply_at_depth(interp, &func, call_args, depth + 1)
        }
    }
}

fn apply_at_depth(
    interp: &mut Interpreter,
    func: &Value,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, Error> {
    match func {
        Value::Builtin(op) => op.invoke(interp, &args),
        Value::Lambda(lambda) => {
            if args.len() != lambda.params.len() {
                return Err(Error::EvalError(format!(
                    "Expected {} arguments, got {}",
                    lambda.params.len(),
                    args.len()
                )));
            }
            let frame = lambda.env.child();
            for (param, arg) in lambda.params.iter().zip(args) {
                frame.define(param.clone(), arg);
            }
            eval_body(interp, &lambda.body, &frame, depth)
        }
        other => Err(Error::NotAProcedure(other.to_string())),
    }
}

/// Evaluate forms left to right, returning the last value (Null if none).
fn eval_body(
    interp: &mut Interpreter,
    forms: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let mut result = Value::Null;
    for form in forms {
        result = eval_at_depth(interp, form, env, depth + 1)?;
    }
    Ok(result)
}

fn eval_quote(args: &[Value]) -> Result<Value, Error> {
    match args {
        [form] => Ok(form.clone()),
        _ => Err(Error::EvalError(format!(
            "quote: Expected exactly 1 argument, got {}",
            args.len()
        ))),
    }
}

/// Collect parameter names from a `(a b c)` parameter list.
fn param_names(op: &str, params: &Value) -> Result<Vec<String>, Error> {
    let Value::List(items) = params else {
        return Err(Error::EvalError(format!("{op}: Expected a parameter list")));
    };
    items
        .borrow()
        .iter()
        .map(|param| match param {
            Value::Symbol(name) => Ok(name.clone()),
            _ => Err(Error::EvalError(format!("{op}: Parameters must be symbols"))),
        })
        .collect()
}

fn eval_defun(interp: &mut Interpreter, args: &[Value], env: &Env) -> Result<Value, Error> {
    let [name, params, body @ ..] = args else {
        return Err(Error::EvalError(
            "defun: Expected a name, a parameter list, and a body".to_owned(),
        ));
    };
    let Value::Symbol(name) = name else {
        return Err(Error::EvalError(
            "defun: Expected a symbol as function name".to_owned(),
        ));
    };
    let lambda = Value::Lambda(Rc::new(Lambda {
        params: param_names("defun", params)?,
        body: body.to_vec(),
        env: env.clone(),
    }));
    env.define(name.clone(), lambda.clone());
    interp.globals().define(name.clone(), lambda);
    Ok(Value::Symbol(name.clone()))
}

fn eval_lambda(args: &[Value], env: &Env) -> Result<Value, Error> {
    let [params, body @ ..] = args else {
        return Err(Error::EvalError(
            "lambda: Expected a parameter list".to_owned(),
        ));
    };
    Ok(Value::Lambda(Rc::new(Lambda {
        params: param_names("lambda", params)?,
        body: body.to_vec(),
        env: env.clone(),
    })))
}

fn eval_setq(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::EvalError(
            "setq: Expected an even number of arguments".to_owned(),
        ));
    }
    let globals = interp.globals().clone();
    let mut result = Value::Null;
    for pair in args.chunks_exact(2) {
        let Value::Symbol(name) = &pair[0] else {
            return Err(Error::EvalError("setq: Expected a symbol".to_owned()));
        };
        let value = eval_at_depth(interp, &pair[1], env, depth + 1)?;
        env.define(name.clone(), value.clone());
        globals.define(name.clone(), value.clone());
        result = value;
    }
    Ok(result)
}

fn eval_setf(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::EvalError(
            "setf: Expected an even number of arguments".to_owned(),
        ));
    }
    let globals = interp.globals().clone();
    let mut result = Value::Null;
    for pair in args.chunks_exact(2) {
        let value = eval_at_depth(interp, &pair[1], env, depth + 1)?;
        match &pair[0] {
            // A symbol place behaves like setq
            Value::Symbol(name) => {
                env.define(name.clone(), value.clone());
                globals.define(name.clone(), value.clone());
            }
            Value::List(place) => {
                let place: Vec<Value> = place.borrow().clone();
                set_place(interp, &place, value.clone(), env, depth)?;
            }
            _ => {
                return Err(Error::EvalError(
                    "setf: Expected a symbol or an accessor form".to_owned(),
                ));
            }
        }
        result = value;
    }
    Ok(result)
}

/// Mutate the live list named by a `(car L)` or `(nth i L)` place.
fn set_place(
    interp: &mut Interpreter,
    place: &[Value],
    value: Value,
    env: &Env,
    depth: usize,
) -> Result<(), Error> {
    match place {
        [Value::Symbol(accessor), list_expr] if accessor == "car" => {
            let target = eval_at_depth(interp, list_expr, env, depth + 1)?;
            let Value::List(items) = target else {
                return Err(Error::EvalError("setf: Expected a list".to_owned()));
            };
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(Error::EvalError(
                    "setf: Cannot set car of an empty list".to_owned(),
                ));
            }
            items[0] = value;
            Ok(())
        }
        [Value::Symbol(accessor), index_expr, list_expr] if accessor == "nth" => {
            let index = eval_at_depth(interp, index_expr, env, depth + 1)?;
            let target = eval_at_depth(interp, list_expr, env, depth + 1)?;
            let Value::List(items) = target else {
                return Err(Error::EvalError("setf: Expected a list".to_owned()));
            };
            let mut items = items.borrow_mut();
            let Value::Number(index) = index else {
                return Err(Error::EvalError("setf: Expected a numeric index".to_owned()));
            };
            if index.fract() != 0.0 || index < 0.0 || index >= items.len() as f64 {
                return Err(Error::EvalError("setf: Index out of bounds".to_owned()));
            }
            items[index as usize] = value;
            Ok(())
        }
        _ => Err(Error::EvalError("setf: Unsupported place".to_owned())),
    }
}

fn eval_if(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let (condition, then_form, else_form) = match args {
        [condition, then_form] => (condition, then_form, None),
        [condition, then_form, else_form] => (condition, then_form, Some(else_form)),
        _ => {
            return Err(Error::EvalError(format!(
                "if: Expected 2 or 3 arguments, got {}",
                args.len()
            )));
        }
    };
    if eval_at_depth(interp, condition, env, depth + 1)?.is_truthy() {
        eval_at_depth(interp, then_form, env, depth + 1)
    } else {
        match else_form {
            Some(form) => eval_at_depth(interp, form, env, depth + 1),
            None => Ok(Value::Null),
        }
    }
}

fn eval_cond(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    for clause in args {
        let Value::List(clause) = clause else {
            return Err(Error::EvalError("cond: Expected a clause list".to_owned()));
        };
        let clause: Vec<Value> = clause.borrow().clone();
        let Some((test, body)) = clause.split_first() else {
            return Err(Error::EvalError(
                "cond: Expected a non-empty clause".to_owned(),
            ));
        };
        let test_value = eval_at_depth(interp, test, env, depth + 1)?;
        if test_value.is_truthy() {
            // A bodyless clause yields the test value itself
            return if body.is_empty() {
                Ok(test_value)
            } else {
                eval_body(interp, body, env, depth)
            };
        }
    }
    Ok(Value::Null)
}

fn eval_case(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let [key_expr, clauses @ ..] = args else {
        return Err(Error::EvalError(
            "case: Expected a key expression".to_owned(),
        ));
    };
    let key = eval_at_depth(interp, key_expr, env, depth + 1)?;
    for clause in clauses {
        let Value::List(clause) = clause else {
            return Err(Error::EvalError("case: Expected a clause list".to_owned()));
        };
        let clause: Vec<Value> = clause.borrow().clone();
        let Some((head, body)) = clause.split_first() else {
            return Err(Error::EvalError(
                "case: Expected a non-empty clause".to_owned(),
            ));
        };
        let matches = match head {
            Value::Symbol(name) if name == "otherwise" || name == "t" => true,
            // The reader turns a literal `t` into Bool(true)
            Value::Bool(true) => true,
            Value::List(keys) => keys.borrow().iter().any(|candidate| *candidate == key),
            _ => false,
        };
        if matches {
            return eval_body(interp, body, env, depth);
        }
    }
    Ok(Value::Null)
}

fn eval_let(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let [bindings, body @ ..] = args else {
        return Err(Error::EvalError("let: Expected a binding list".to_owned()));
    };
    let Value::List(bindings) = bindings else {
        return Err(Error::EvalError("let: Expected a binding list".to_owned()));
    };
    let bindings: Vec<Value> = bindings.borrow().clone();

    let frame = env.child();
    for binding in &bindings {
        let Value::List(pair) = binding else {
            return Err(Error::EvalError(
                "let: Expected (symbol expression) bindings".to_owned(),
            ));
        };
        let pair: Vec<Value> = pair.borrow().clone();
        let [Value::Symbol(name), expr] = pair.as_slice() else {
            return Err(Error::EvalError(
                "let: Expected (symbol expression) bindings".to_owned(),
            ));
        };
        // Binding expressions run in the emerging frame, so later
        // bindings see earlier ones.
        let value = eval_at_depth(interp, expr, &frame, depth + 1)?;
        frame.define(name.clone(), value);
    }
    eval_body(interp, body, &frame, depth)
}

fn eval_do(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let [binding_list, end_clause, body @ ..] = args else {
        return Err(Error::EvalError(
            "do: Expected a binding list and an end clause".to_owned(),
        ));
    };
    let Value::List(binding_list) = binding_list else {
        return Err(Error::EvalError("do: Expected a binding list".to_owned()));
    };
    let binding_list: Vec<Value> = binding_list.borrow().clone();

    // Parse (var init [step]); the step defaults to the variable itself.
    let mut vars: Vec<(String, Value)> = Vec::with_capacity(binding_list.len());
    let mut inits: Vec<(String, Value)> = Vec::with_capacity(binding_list.len());
    for binding in &binding_list {
        let Value::List(binding) = binding else {
            return Err(Error::EvalError(
                "do: Expected (var init [step]) bindings".to_owned(),
            ));
        };
        let binding: Vec<Value> = binding.borrow().clone();
        let (name, init, step) = match binding.as_slice() {
            [Value::Symbol(name), init] => (name, init, Value::Symbol(name.clone())),
            [Value::Symbol(name), init, step] => (name, init, step.clone()),
            _ => {
                return Err(Error::EvalError(
                    "do: Expected (var init [step]) bindings".to_owned(),
                ));
            }
        };
        // Inits are evaluated in the surrounding environment
        inits.push((name.clone(), eval_at_depth(interp, init, env, depth + 1)?));
        vars.push((name.clone(), step));
    }

    let frame = env.child();
    for (name, value) in inits {
        frame.define(name, value);
    }

    let Value::List(end_clause) = end_clause else {
        return Err(Error::EvalError("do: Expected an end clause".to_owned()));
    };
    let end_clause: Vec<Value> = end_clause.borrow().clone();
    let Some((end_test, result_forms)) = end_clause.split_first() else {
        return Err(Error::EvalError("do: Expected an end test".to_owned()));
    };

    loop {
        if eval_at_depth(interp, end_test, &frame, depth + 1)?.is_truthy() {
            return eval_body(interp, result_forms, &frame, depth);
        }
        for form in body {
            eval_at_depth(interp, form, &frame, depth + 1)?;
        }
        // Parallel step: every step expression reads the pre-update
        // frame, then all assignments land at once.
        let mut updates = Vec::with_capacity(vars.len());
        for (name, step) in &vars {
            updates.push((name.clone(), eval_at_depth(interp, step, &frame, depth + 1)?));
        }
        for (name, value) in updates {
            frame.define(name, value);
        }
    }
}

fn eval_dolist(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let [spec, body @ ..] = args else {
        return Err(Error::EvalError(
            "dolist: Expected a loop specification".to_owned(),
        ));
    };
    let Value::List(spec) = spec else {
        return Err(Error::EvalError(
            "dolist: Expected (var list [result])".to_owned(),
        ));
    };
    let spec: Vec<Value> = spec.borrow().clone();
    let (var, list_expr, result_expr) = match spec.as_slice() {
        [Value::Symbol(var), list_expr] => (var, list_expr, None),
        [Value::Symbol(var), list_expr, result_expr] => (var, list_expr, Some(result_expr)),
        _ => {
            return Err(Error::EvalError(
                "dolist: Expected (var list [result])".to_owned(),
            ));
        }
    };

    let list_value = eval_at_depth(interp, list_expr, env, depth + 1)?;
    let Value::List(items) = &list_value else {
        return Err(Error::EvalError("dolist: Expected a list".to_owned()));
    };
    let items: Vec<Value> = items.borrow().clone();

    let frame = env.child();
    for item in items {
        frame.define(var.clone(), item);
        for form in body {
            eval_at_depth(interp, form, &frame, depth + 1)?;
        }
    }
    frame.define(var.clone(), Value::nil());
    match result_expr {
        Some(result_expr) => eval_at_depth(interp, result_expr, &frame, depth + 1),
        None => Ok(Value::nil()),
    }
}

fn eval_dotimes(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let [spec, body @ ..] = args else {
        return Err(Error::EvalError(
            "dotimes: Expected a loop specification".to_owned(),
        ));
    };
    let Value::List(spec) = spec else {
        return Err(Error::EvalError(
            "dotimes: Expected (var count [result])".to_owned(),
        ));
    };
    let spec: Vec<Value> = spec.borrow().clone();
    let (var, count_expr, result_expr) = match spec.as_slice() {
        [Value::Symbol(var), count_expr] => (var, count_expr, None),
        [Value::Symbol(var), count_expr, result_expr] => (var, count_expr, Some(result_expr)),
        _ => {
            return Err(Error::EvalError(
                "dotimes: Expected (var count [result])".to_owned(),
            ));
        }
    };

    let count = match eval_at_depth(interp, count_expr, env, depth + 1)? {
        Value::Number(n) if n >= 0.0 => n,
        _ => {
            return Err(Error::EvalError(
                "dotimes: Expected a non-negative number".to_owned(),
            ));
        }
    };

    let frame = env.child();
    let mut i = 0.0;
    while i < count {
        frame.define(var.clone(), Value::Number(i));
        for form in body {
            eval_at_depth(interp, form, &frame, depth + 1)?;
        }
        i += 1.0;
    }
    frame.define(var.clone(), Value::Number(count));
    match result_expr {
        Some(result_expr) => eval_at_depth(interp, result_expr, &frame, depth + 1),
        None => Ok(Value::nil()),
    }
}

fn eval_eval(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    let [form] = args else {
        return Err(Error::EvalError(format!(
            "eval: Expected exactly 1 argument, got {}",
            args.len()
        )));
    };
    let value = eval_at_depth(interp, form, env, depth + 1)?;
    eval_at_depth(interp, &value, env, depth + 1)
}

fn eval_and(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    for form in args {
        if !eval_at_depth(interp, form, env, depth + 1)?.is_logically_true() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn eval_or(
    interp: &mut Interpreter,
    args: &[Value],
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    for form in args {
        let value = eval_at_depth(interp, form, env, depth + 1)?;
        if value.is_logically_true() {
            return Ok(value);
        }
    }
    Ok(Value::Bool(false))
}
