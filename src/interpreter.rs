//! The evaluation session and top-level driver.
//!
//! An [`Interpreter`] owns everything one program run mutates: the root
//! environment (builtins plus a fresh user-global frame), the output
//! buffer, and an optional line-input callback backing `read-line`.
//! Evaluation is single-threaded and synchronous; the first error aborts
//! the run and discards any buffered output.

use tracing::{debug, trace};

use crate::Error;
use crate::evaluator::{self, Env};
use crate::lexer;
use crate::reader::Reader;

/// An evaluation session.
///
/// ```
/// use lisplet::Interpreter;
///
/// let mut interp = Interpreter::new();
/// let output = interp.run("(print (* 6 7))").unwrap();
/// assert_eq!(output, "42");
/// ```
///
/// Globals persist across `run` calls on the same session; the free
/// functions [`evaluate`] and [`evaluate_with_input`] wrap a fresh
/// session per program.
pub struct Interpreter {
    globals: Env,
    output: Vec<String>,
    input: Option<Box<dyn FnMut() -> String>>,
}

impl Interpreter {
    /// Create a session with no input provider; `read-line` will error.
    pub fn new() -> Self {
        Interpreter {
            globals: evaluator::create_global_env(),
            output: Vec::new(),
            input: None,
        }
    }

    /// Create a session whose `read-line` calls `provider` once per line.
    pub fn with_input(provider: impl FnMut() -> String + 'static) -> Self {
        Interpreter {
            globals: evaluator::create_global_env(),
            output: Vec::new(),
            input: Some(Box::new(provider)),
        }
    }

    /// Run a program: lex it once, then read and evaluate one top-level
    /// form at a time in the root frame. Returns the output lines joined
    /// by newlines; an empty program returns the empty string.
    pub fn run(&mut self, source: &str) -> Result<String, Error> {
        let tokens = lexer::lex(source)?;
        if tokens.is_empty() {
            return Ok(String::new());
        }
        self.output.clear();
        trace!(tokens = tokens.len(), "starting evaluation");

        let globals = self.globals.clone();
        let mut reader = Reader::new(&tokens);
        while !reader.at_end() {
            let form = reader.read_form()?;
            evaluator::eval(self, &form, &globals).map_err(|err| {
                debug!(%err, "evaluation aborted");
                err
            })?;
        }
        Ok(self.output.join("\n"))
    }

    /// The root (user-global) frame, target of `setq`/`defun` mirroring.
    pub(crate) fn globals(&self) -> &Env {
        &self.globals
    }

    /// Append one line to the output buffer.
    pub(crate) fn emit(&mut self, line: String) {
        self.output.push(line);
    }

    /// Pull the next line from the input provider.
    pub(crate) fn next_input_line(&mut self) -> Result<String, Error> {
        match self.input.as_mut() {
            Some(provider) => Ok(provider()),
            None => Err(Error::EvalError(
                "read-line: No input provider configured".to_owned(),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate a program in a fresh session and return its output.
pub fn evaluate(program: &str) -> Result<String, Error> {
    Interpreter::new().run(program)
}

/// Evaluate a program in a fresh session wired to a line-input callback.
pub fn evaluate_with_input(
    program: &str,
    input: impl FnMut() -> String + 'static,
) -> Result<String, Error> {
    Interpreter::with_input(input).run(program)
}
