//! Lexical analysis: source text to a flat token stream.
//!
//! Whitespace separates tokens and is never emitted; `;` starts a comment
//! running to end of line. Parentheses and the quote character are
//! single-character tokens, string literals keep their content with the
//! surrounding quotes stripped, and any other maximal run of characters is
//! an atom. The only way the lexer can fail is an unterminated string
//! literal.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, take_while1},
    character::complete::char,
    combinator::{map, opt, value},
    multi::many0,
    sequence::{pair, preceded},
};

use crate::Error;

/// Raw tokens produced by [`lex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LParen,
    RParen,
    Quote,
    /// A string literal, quotes stripped and escapes resolved
    Str(String),
    /// Any other run of non-delimiter characters
    Atom(String),
}

/// Characters that terminate an atom.
fn is_atom_char(c: char) -> bool {
    !c.is_ascii_whitespace() && !"()'\";".contains(c)
}

/// Skip whitespace runs and `;` comments. Never fails and may match empty.
fn ignored(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), take_while1(|c: char| c.is_ascii_whitespace())),
            value((), pair(char(';'), opt(is_not("\n")))),
        ))),
    )
    .parse(input)
}

/// Lex a string literal. A backslash escapes the following character: the
/// backslash is dropped and the next character is taken verbatim.
fn string_token(input: &str) -> IResult<&str, Token> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut content = String::new();

    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            Some('"') => return Ok((chars.as_str(), Token::Str(content))),
            Some('\\') => match chars.next() {
                Some(escaped) => {
                    content.push(escaped);
                    remaining = chars.as_str();
                }
                // Backslash at end of input: the string cannot terminate
                None => {
                    return Err(nom::Err::Error(nom::error::Error::new(
                        remaining,
                        nom::error::ErrorKind::Char,
                    )));
                }
            },
            Some(ch) => {
                content.push(ch);
                remaining = chars.as_str();
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

fn atom_token(input: &str) -> IResult<&str, Token> {
    map(take_while1(is_atom_char), |lexeme: &str| {
        Token::Atom(lexeme.to_owned())
    })
    .parse(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::Quote, char('\'')),
        string_token,
        atom_token,
    ))
    .parse(input)
}

/// Lex an entire program into tokens.
pub fn lex(source: &str) -> Result<Vec<Token>, Error> {
    let Ok((rest, tokens)) = many0(preceded(ignored, token)).parse(source) else {
        return Err(Error::UnterminatedString);
    };
    let Ok((rest, ())) = ignored(rest) else {
        return Err(Error::UnterminatedString);
    };
    // Every character except an unclosed `"` is consumable by some token
    // rule, so leftover input means a string literal never terminated.
    if rest.is_empty() {
        Ok(tokens)
    } else {
        Err(Error::UnterminatedString)
    }
}
