//! Tokenization for the embedded language.

use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, take_while},
    character::complete::{char, digit1, multispace0, none_of, one_of, satisfy},
    combinator::{map, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    /// `_` - the pipeline value
    Pipe,
    True,
    False,
    And,
    Or,
    Not,
    Fn,
    Return,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
}

#[derive(Error, Debug)]
pub enum LexError {
    #[error("unexpected character: {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string")]
    UnterminatedString,
}

/// Number literal. No sign: unary minus belongs to the parser, so `3-4`
/// lexes as three tokens.
fn number(input: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(digit1, opt(preceded(char('.'), digit1)))),
        |s: &str| Token::Num(s.parse().unwrap_or(0.0)),
    )(input)
}

fn double_quoted(input: &str) -> IResult<&str, Token> {
    let (input, content) = delimited(
        char('"'),
        map(
            opt(escaped(none_of("\"\\"), '\\', one_of("\"\\nrt"))),
            |o| o.unwrap_or(""),
        ),
        char('"'),
    )(input)?;
    Ok((input, Token::Str(unescape(content))))
}

fn single_quoted(input: &str) -> IResult<&str, Token> {
    let (input, content) = delimited(
        char('\''),
        map(opt(take_while(|c| c != '\'')), |o: Option<&str>| {
            o.unwrap_or("")
        }),
        char('\''),
    )(input)?;
    Ok((input, Token::Str(content.to_string())))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn word(input: &str) -> IResult<&str, Token> {
    let (input, s) = recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)?;
    let tok = match s {
        "_" => Token::Pipe,
        "true" => Token::True,
        "false" => Token::False,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "fn" => Token::Fn,
        "return" => Token::Return,
        _ => Token::Ident(s.to_string()),
    };
    Ok((input, tok))
}

fn operator(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::EqEq, tag("==")),
        value(Token::Ne, tag("!=")),
        value(Token::Le, tag("<=")),
        value(Token::Ge, tag(">=")),
        value(Token::Assign, char('=')),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::LBracket, char('[')),
        value(Token::RBracket, char(']')),
        value(Token::LBrace, char('{')),
        value(Token::RBrace, char('}')),
        value(Token::Comma, char(',')),
    ))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    preceded(
        multispace0,
        alt((number, double_quoted, single_quoted, word, operator)),
    )(input)
}

/// Tokenize a complete input string.
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let (remaining, tokens) = many0(token)(input).map_err(|_| {
        // many0 cannot itself fail; keep the type checker happy.
        LexError::UnexpectedChar('\0')
    })?;

    let rest = remaining.trim_start();
    if !rest.is_empty() {
        let c = rest.chars().next().unwrap_or('\0');
        if c == '"' || c == '\'' {
            return Err(LexError::UnterminatedString);
        }
        return Err(LexError::UnexpectedChar(c));
    }

    Ok(tokens)
}
