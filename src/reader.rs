//! The reader: token stream to forms.
//!
//! Each call to [`Reader::read_form`] consumes the tokens of exactly one
//! form and produces a [`Value`] in the same alphabet the evaluator walks.
//! The quote token expands structurally to `(quote form)`. Atoms classify
//! as `nil` (the empty list), `t` (true), numbers, or symbols.

use crate::Error;
use crate::ast::Value;
use crate::lexer::Token;

/// Consumes tokens front-to-back, producing one form per call.
pub struct Reader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Reader { tokens, pos: 0 }
    }

    /// True once every token has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Read the next form.
    pub fn read_form(&mut self) -> Result<Value, Error> {
        match self.advance() {
            None => Err(Error::UnexpectedEof),
            Some(Token::Quote) => {
                let quoted = self.read_form()?;
                Ok(Value::list(vec![Value::Symbol("quote".to_owned()), quoted]))
            }
            Some(Token::LParen) => self.read_list(),
            Some(Token::RParen) => Err(Error::UnexpectedClosingParen),
            Some(Token::Str(content)) => Ok(Value::Str(content.clone())),
            Some(Token::Atom(lexeme)) => Ok(classify_atom(lexeme)),
        }
    }

    fn read_list(&mut self) -> Result<Value, Error> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(Error::MissingClosingParen),
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(Value::list(items));
                }
                Some(_) => items.push(self.read_form()?),
            }
        }
    }
}

/// Classify an atom lexeme: `nil`, `t`, number, or symbol.
fn classify_atom(lexeme: &str) -> Value {
    match lexeme {
        "nil" => return Value::nil(),
        "t" => return Value::Bool(true),
        _ => {}
    }
    if looks_numeric(lexeme)
        && let Ok(number) = lexeme.parse::<f64>()
    {
        return Value::Number(number);
    }
    Value::Symbol(lexeme.to_owned())
}

/// Restrict numeric parsing to lexemes built from the numeric alphabet,
/// so symbols like `inf` or `nan` never parse as numbers.
fn looks_numeric(lexeme: &str) -> bool {
    lexeme.chars().any(|c| c.is_ascii_digit())
        && lexeme
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{sym, val};
    use crate::lexer::lex;

    #[expect(clippy::unwrap_used)] // test code OK
    fn read_one(source: &str) -> Result<Value, Error> {
        let tokens = lex(source).unwrap();
        Reader::new(&tokens).read_form()
    }

    #[test]
    fn test_reader_comprehensive() {
        let test_cases: Vec<(&str, Value)> = vec![
            // Atom classification
            ("42", val(42)),
            ("-5", val(-5)),
            ("2.5", val(2.5)),
            (".5", val(0.5)),
            ("1e3", val(1000)),
            ("t", val(true)),
            ("nil", Value::nil()),
            ("foo", sym("foo")),
            ("+", sym("+")),
            ("-", sym("-")),
            ("1+", sym("1+")),
            ("123abc", sym("123abc")),
            // Would parse as f64 but are symbols in this dialect
            ("inf", sym("inf")),
            ("nan", sym("nan")),
            // Strings
            ("\"hello\"", val("hello")),
            ("\"\"", val("")),
            // Lists
            ("()", Value::nil()),
            ("(1 2 3)", val([1, 2, 3])),
            (
                "(+ 1 (* 2 3))",
                val(vec![
                    sym("+"),
                    val(1),
                    val(vec![sym("*"), val(2), val(3)]),
                ]),
            ),
            // nil and t inside lists
            ("(nil t)", val(vec![Value::nil(), val(true)])),
            // Quote shorthand expands structurally
            ("'foo", val(vec![sym("quote"), sym("foo")])),
            (
                "'(1 2)",
                val(vec![sym("quote"), val([1, 2])]),
            ),
            (
                "''x",
                val(vec![
                    sym("quote"),
                    val(vec![sym("quote"), sym("x")]),
                ]),
            ),
            // Mixed content
            (
                "(print \"hi\" 1)",
                val(vec![sym("print"), val("hi"), val(1)]),
            ),
        ];

        for (input, expected) in test_cases {
            let form = read_one(input);
            assert_eq!(form, Ok(expected), "form for {input:?}");
        }
    }

    #[test]
    #[expect(clippy::unwrap_used)] // test code OK
    fn test_reads_multiple_top_level_forms() {
        let tokens = lex("1 2 (3)").unwrap();
        let mut reader = Reader::new(&tokens);
        assert_eq!(reader.read_form(), Ok(val(1)));
        assert!(!reader.at_end());
        assert_eq!(reader.read_form(), Ok(val(2)));
        assert_eq!(reader.read_form(), Ok(val([3])));
        assert!(reader.at_end());
        assert_eq!(reader.read_form(), Err(Error::UnexpectedEof));
    }

    #[test]
    fn test_reader_errors() {
        let test_cases = vec![
            ("(1 2", Error::MissingClosingParen),
            ("((1)", Error::MissingClosingParen),
            (")", Error::UnexpectedClosingParen),
            ("'", Error::UnexpectedEof),
            ("", Error::UnexpectedEof),
        ];

        for (input, expected) in test_cases {
            assert_eq!(read_one(input), Err(expected), "error for {input:?}");
        }
    }
}
