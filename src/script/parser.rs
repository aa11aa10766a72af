//! Recursive-descent parser for the embedded language.
//!
//! Expressions are one-liners. Statements are either a single-line
//! assignment or a multi-line `fn` definition whose body carries one
//! statement per line. Anything else is not ours and should fall through
//! to the external shell.

use super::lexer::{lex, LexError, Token};
use super::{BinOp, Completeness, Expr, Stmt, UnaryOp};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected token: {0:?}")]
    UnexpectedToken(Token),
    #[error("trailing input after expression")]
    TrailingInput,
    #[error("not a statement")]
    NotAStatement,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token) -> Result<(), ParseError> {
        match self.advance()? {
            t if t == tok => Ok(()),
            t => Err(ParseError::UnexpectedToken(t)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(ParseError::TrailingInput)
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::And) {
            let rhs = self.equality()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.comparison()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.comparison()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.term()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.term()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let rhs = self.unary()?;
        Ok(Expr::Unary {
            op,
            rhs: Box::new(rhs),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.eat(&Token::LBracket) {
            let index = self.expression()?;
            self.expect(Token::RBracket)?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance()? {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Pipe => Ok(Expr::Pipe),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(Token::RBracket)?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if self.eat(&Token::Comma) {
                                continue;
                            }
                            self.expect(Token::RParen)?;
                            break;
                        }
                    }
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            tok => Err(ParseError::UnexpectedToken(tok)),
        }
    }
}

/// Parse `text` as a self-contained expression. The whole input must be
/// consumed; leftovers mean this was never an expression of ours.
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let tokens = lex(text)?;
    if tokens.is_empty() {
        return Err(ParseError::UnexpectedEnd);
    }
    let mut p = Parser::new(tokens);
    let expr = p.expression()?;
    p.finish()?;
    Ok(expr)
}

/// Parse `text` as a top-level statement: an assignment or a `fn`
/// definition.
pub fn parse_statement(text: &str) -> Result<Stmt, ParseError> {
    let mut lines = Vec::new();
    for line in text.lines() {
        let tokens = lex(line)?;
        if !tokens.is_empty() {
            lines.push(tokens);
        }
    }
    let first = lines.first().ok_or(ParseError::UnexpectedEnd)?;

    if first.first() == Some(&Token::Fn) {
        return parse_fn_def(lines);
    }

    if lines.len() > 1 {
        return Err(ParseError::NotAStatement);
    }
    match parse_body_stmt(lines.remove(0))? {
        stmt @ Stmt::Assign { .. } => Ok(stmt),
        _ => Err(ParseError::NotAStatement),
    }
}

/// `fn name(params) {` header, one body statement per line, `}` to close.
/// A one-liner with the body between the braces also works.
fn parse_fn_def(lines: Vec<Vec<Token>>) -> Result<Stmt, ParseError> {
    let mut lines = lines.into_iter();
    let mut header = Parser::new(lines.next().ok_or(ParseError::UnexpectedEnd)?);
    header.expect(Token::Fn)?;
    let name = match header.advance()? {
        Token::Ident(name) => name,
        tok => return Err(ParseError::UnexpectedToken(tok)),
    };
    header.expect(Token::LParen)?;
    let mut params = Vec::new();
    if !header.eat(&Token::RParen) {
        loop {
            match header.advance()? {
                Token::Ident(p) => params.push(p),
                tok => return Err(ParseError::UnexpectedToken(tok)),
            }
            if header.eat(&Token::Comma) {
                continue;
            }
            header.expect(Token::RParen)?;
            break;
        }
    }
    header.expect(Token::LBrace)?;

    let mut body_lines: Vec<Vec<Token>> = Vec::new();
    let inline = header.tokens.split_off(header.pos);
    if !inline.is_empty() {
        body_lines.push(inline);
    }
    body_lines.extend(lines);

    let mut body = Vec::new();
    let mut closed = false;
    for (i, mut tokens) in body_lines.iter().cloned().enumerate() {
        if closed {
            return Err(ParseError::TrailingInput);
        }
        if tokens == [Token::RBrace] {
            closed = true;
            continue;
        }
        if tokens.last() == Some(&Token::RBrace) && i == body_lines.len() - 1 {
            tokens.pop();
            closed = true;
        }
        body.push(parse_body_stmt(tokens)?);
    }
    if !closed {
        return Err(ParseError::UnexpectedEnd);
    }

    Ok(Stmt::FnDef { name, params, body })
}

/// One statement inside a function body: `return expr`, an assignment, or
/// a bare expression run for side effects.
fn parse_body_stmt(tokens: Vec<Token>) -> Result<Stmt, ParseError> {
    let mut p = Parser::new(tokens);
    if p.eat(&Token::Return) {
        let expr = p.expression()?;
        p.finish()?;
        return Ok(Stmt::Return(expr));
    }
    if let (Some(Token::Ident(_)), Some(Token::Assign)) =
        (p.tokens.first(), p.tokens.get(1))
    {
        let name = match p.advance()? {
            Token::Ident(name) => name,
            tok => return Err(ParseError::UnexpectedToken(tok)),
        };
        p.expect(Token::Assign)?;
        let value = p.expression()?;
        p.finish()?;
        return Ok(Stmt::Assign { name, value });
    }
    let expr = p.expression()?;
    p.finish()?;
    Ok(Stmt::Expr(expr))
}

/// Brace balance for multi-line accumulation. Positive depth means keep
/// reading lines; a close without an open can never become valid.
pub fn check_complete(text: &str) -> Completeness {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' && q == '"' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Completeness::Invalid("unbalanced braces".to_string());
                    }
                }
                _ => {}
            },
        }
    }
    if quote.is_some() {
        return Completeness::Invalid("unterminated string".to_string());
    }
    if depth > 0 {
        Completeness::Incomplete
    } else {
        Completeness::Complete
    }
}
