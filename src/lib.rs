//! lisplet - an interpreter for a small Lisp dialect
//!
//! This crate implements a tree-walking interpreter for a compact Lisp
//! (a Common Lisp subset with a few Scheme-isms). A program is plain text;
//! evaluating it produces a stream of output lines, or a single error if
//! evaluation cannot continue.
//!
//! ```lisp
//! ;; Recursive functions, conditionals, lists
//! (defun factorial (n)
//!   (if (= n 0) 1 (* n (factorial (- n 1)))))
//! (print (factorial 5))
//! ```
//!
//! The pipeline runs bottom-up through four stages that share one value
//! type: the lexer turns source text into tokens, the reader turns tokens
//! into [`Value`] forms, and the evaluator walks each form against a
//! chained environment of builtins and user globals. Output produced by
//! `print`, `prin1`, and `format` accumulates in a per-session buffer and
//! is returned joined by newlines.
//!
//! ```
//! let output = lisplet::evaluate("(print (+ 1 2 3 4))").unwrap();
//! assert_eq!(output, "10");
//! ```
//!
//! Interactive programs can read lines through a host-supplied callback:
//!
//! ```
//! let output = lisplet::evaluate_with_input(
//!     "(print (read-line))",
//!     || "hello".to_string(),
//! ).unwrap();
//! assert_eq!(output, "hello");
//! ```
//!
//! ## Modules
//!
//! - `lexer`: source text to tokens
//! - `reader`: tokens to `Value` forms
//! - `ast`: the `Value` alphabet shared by reader and evaluator
//! - `evaluator`: environments, special forms, procedure application
//! - `builtinops`: the builtin operator registry
//! - `interpreter`: the evaluation session and driver loop
//! - `catalog`: named example programs for embedding front-ends

use std::fmt;

/// Maximum evaluation depth. Recursion past this bound becomes an
/// [`Error`] instead of a stack overflow; iterative loop forms are not
/// affected.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Error type for the interpreter.
///
/// Evaluation stops at the first error; the caller receives the rendered
/// message and none of the output buffered before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A string literal ran to end of input without a closing quote.
    UnterminatedString,
    /// A list form ran to end of input without a closing parenthesis.
    MissingClosingParen,
    /// A closing parenthesis appeared where a form was expected.
    UnexpectedClosingParen,
    /// The reader was asked for a form with no tokens left.
    UnexpectedEof,
    /// A symbol had no binding in the environment chain.
    UnknownSymbol(String),
    /// Application of a value that is neither a builtin nor a lambda.
    NotAProcedure(String),
    /// An error raised while applying a builtin, tagged with its name.
    InProcedure { name: String, message: String },
    /// Any other evaluation failure, carrying the full diagnostic.
    EvalError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnterminatedString => write!(f, "Unterminated string literal"),
            Error::MissingClosingParen => write!(f, "Missing closing parenthesis"),
            Error::UnexpectedClosingParen => write!(f, "Unexpected closing parenthesis"),
            Error::UnexpectedEof => write!(f, "Unexpected EOF"),
            Error::UnknownSymbol(name) => write!(f, "Unknown symbol: {name}"),
            Error::NotAProcedure(form) => write!(f, "Not a procedure: {form}"),
            Error::InProcedure { name, message } => {
                write!(f, "Error in procedure {name}: {message}")
            }
            Error::EvalError(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}

pub mod ast;
pub mod builtinops;
pub mod catalog;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod reader;

pub use ast::Value;
pub use interpreter::{Interpreter, evaluate, evaluate_with_input};
