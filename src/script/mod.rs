//! The embedded expression/statement language.
//!
//! The dispatcher consumes the evaluator through the [`ScriptEngine`] trait,
//! so the language itself is an injected capability, not something the
//! pipeline core depends on concretely. The default engine ([`RillEngine`])
//! is a deliberately narrow language: expressions over the pipeline value,
//! assignments, and multi-line `fn` definitions.

pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{chdir, EvalError, RillEngine};
pub use lexer::{lex, LexError, Token};
pub use parser::{check_complete, parse_expression, parse_statement, ParseError};

use crate::namespace::Namespace;
use crate::state::PipelineState;
use crate::value::Value;

/// An expression of the embedded language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    List(Vec<Expr>),
    /// `_` - the current pipeline value
    Pipe,
    Ident(String),
    Unary {
        op: UnaryOp,
        rhs: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

/// A statement of the embedded language.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { name: String, value: Expr },
    FnDef {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    /// Only valid inside a function body.
    Return(Expr),
    /// A bare expression inside a function body, run for side effects.
    Expr(Expr),
}

/// Completeness verdict for a (possibly partial) statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Completeness {
    Complete,
    /// Syntactically open (unclosed block); keep accumulating lines.
    Incomplete,
    Invalid(String),
}

/// Result of an expression attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    /// The expression produced a value; it becomes the new pipeline value.
    Value(Value),
    /// The expression was a value-preserving operation (`cd`, `undo`, ...);
    /// the pipeline value must not be touched.
    Keep,
}

/// Everything a classifier stage may touch, threaded by reference.
pub struct Ctx<'a> {
    pub ns: &'a mut Namespace,
    pub state: &'a mut PipelineState,
}

/// The injected evaluator/executor boundary.
pub trait ScriptEngine {
    /// Evaluate `text` as a self-contained expression.
    fn evaluate(&mut self, text: &str, ctx: &mut Ctx) -> Result<Evaluated, EvalError>;

    /// Execute `text` as a statement, for side effects on the namespace.
    fn execute(&mut self, text: &str, ctx: &mut Ctx) -> Result<(), EvalError>;

    /// Whether `text` is a complete unit, still open, or hopeless.
    fn check_complete(&self, text: &str) -> Completeness;
}
