//! Evaluator for the embedded language.
//!
//! Expressions produce values; statements mutate the namespace. Session
//! builtins (`cd`, `undo`, `debug`, `tracebacks`, `shell`) are
//! value-preserving: run for a whole segment they yield [`Evaluated::Keep`]
//! so the pipeline value survives them.

use super::parser::{check_complete, parse_expression, parse_statement, ParseError};
use super::{BinOp, Completeness, Ctx, Evaluated, Expr, ScriptEngine, Stmt, UnaryOp};
use crate::namespace::FnDef;
use crate::runner::{self, RunnerError};
use crate::value::Value;
use log::trace;
use std::cmp::Ordering;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("undefined name: {0}")]
    Undefined(String),
    #[error("undefined function: {0}")]
    UndefinedFn(String),
    #[error("cannot {action} a {ty}")]
    BadType {
        action: &'static str,
        ty: &'static str,
    },
    #[error("{op} not supported between {lhs} and {rhs}")]
    BadOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("division by zero")]
    DivideByZero,
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("{0}")]
    Builtin(String),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn arity(name: &str, expected: &str, got: usize) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected: expected.to_string(),
        got,
    }
}

/// Control flow inside a function body.
enum Flow {
    Normal,
    Return(Value),
}

const SESSION_BUILTINS: &[&str] = &["cd", "undo", "debug", "tracebacks", "shell"];

fn is_value_preserving(name: &str) -> bool {
    SESSION_BUILTINS.contains(&name)
}

/// The default engine: the deliberately narrow expression/statement language.
#[derive(Debug, Default)]
pub struct RillEngine;

impl RillEngine {
    pub fn new() -> Self {
        RillEngine
    }
}

impl ScriptEngine for RillEngine {
    fn evaluate(&mut self, text: &str, ctx: &mut Ctx) -> Result<Evaluated, EvalError> {
        let expr = parse_expression(text)?;
        trace!("expression parsed: {:?}", expr);
        if let Expr::Call { name, args } = &expr {
            if is_value_preserving(name) {
                self.session_call(name, args, ctx)?;
                return Ok(Evaluated::Keep);
            }
        }
        let value = self.eval_expr(&expr, ctx)?;
        Ok(Evaluated::Value(value))
    }

    fn execute(&mut self, text: &str, ctx: &mut Ctx) -> Result<(), EvalError> {
        let stmt = parse_statement(text)?;
        trace!("statement parsed: {:?}", stmt);
        self.exec_stmt(&stmt, ctx)?;
        Ok(())
    }

    fn check_complete(&self, text: &str) -> Completeness {
        check_complete(text)
    }
}

impl RillEngine {
    fn eval_expr(&mut self, expr: &Expr, ctx: &mut Ctx) -> Result<Value, EvalError> {
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, ctx)?);
                }
                Ok(Value::List(values))
            }
            Expr::Pipe => Ok(ctx.state.current.clone()),
            Expr::Ident(name) => ctx
                .ns
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::Undefined(name.clone())),
            Expr::Unary { op, rhs } => {
                let value = self.eval_expr(rhs, ctx)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Num(n) => Ok(Value::Num(-n)),
                        other => Err(EvalError::BadType {
                            action: "negate",
                            ty: other.type_name(),
                        }),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                }
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, ctx),
            Expr::Index { target, index } => {
                let target = self.eval_expr(target, ctx)?;
                let index = self.eval_expr(index, ctx)?;
                index_value(&target, &index)
            }
            Expr::Call { name, args } => {
                if is_value_preserving(name) {
                    self.session_call(name, args, ctx)?;
                    return Ok(Value::Unset);
                }
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, ctx)?);
                }
                self.call(name, values, ctx)
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        ctx: &mut Ctx,
    ) -> Result<Value, EvalError> {
        // and/or short-circuit; everything else is strict.
        match op {
            BinOp::And => {
                let l = self.eval_expr(lhs, ctx)?;
                if !l.truthy() {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval_expr(rhs, ctx)?;
                return Ok(Value::Bool(r.truthy()));
            }
            BinOp::Or => {
                let l = self.eval_expr(lhs, ctx)?;
                if l.truthy() {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval_expr(rhs, ctx)?;
                return Ok(Value::Bool(r.truthy()));
            }
            _ => {}
        }

        let l = self.eval_expr(lhs, ctx)?;
        let r = self.eval_expr(rhs, ctx)?;
        match op {
            BinOp::Add => match (&l, &r) {
                (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
                (Value::List(a), Value::List(b)) => {
                    let mut items = a.clone();
                    items.extend(b.iter().cloned());
                    Ok(Value::List(items))
                }
                (Value::Lines(a), Value::Lines(b)) => {
                    let mut lines = a.clone();
                    lines.extend(b.iter().cloned());
                    Ok(Value::Lines(lines))
                }
                _ => Err(bad_operands("+", &l, &r)),
            },
            BinOp::Sub => numeric(op, &l, &r, |a, b| Ok(a - b)),
            BinOp::Mul => numeric(op, &l, &r, |a, b| Ok(a * b)),
            BinOp::Div => numeric(op, &l, &r, |a, b| {
                if b == 0.0 {
                    Err(EvalError::DivideByZero)
                } else {
                    Ok(a / b)
                }
            }),
            BinOp::Rem => numeric(op, &l, &r, |a, b| {
                if b == 0.0 {
                    Err(EvalError::DivideByZero)
                } else {
                    Ok(a % b)
                }
            }),
            BinOp::Eq => Ok(Value::Bool(l == r)),
            BinOp::Ne => Ok(Value::Bool(l != r)),
            BinOp::Lt => compare(op, &l, &r, |o| o == Ordering::Less),
            BinOp::Gt => compare(op, &l, &r, |o| o == Ordering::Greater),
            BinOp::Le => compare(op, &l, &r, |o| o != Ordering::Greater),
            BinOp::Ge => compare(op, &l, &r, |o| o != Ordering::Less),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    /// User-defined function or pure builtin, arguments already evaluated.
    fn call(&mut self, name: &str, args: Vec<Value>, ctx: &mut Ctx) -> Result<Value, EvalError> {
        if let Some(def) = ctx.ns.func(name).cloned() {
            return self.call_user_fn(name, &def, args, ctx);
        }
        self.builtin(name, args, ctx)
    }

    fn call_user_fn(
        &mut self,
        name: &str,
        def: &FnDef,
        args: Vec<Value>,
        ctx: &mut Ctx,
    ) -> Result<Value, EvalError> {
        if args.len() != def.params.len() {
            return Err(arity(name, &def.params.len().to_string(), args.len()));
        }

        // Parameters shadow session variables for the duration of the call.
        let mut shadowed = Vec::with_capacity(def.params.len());
        for (param, value) in def.params.iter().zip(args) {
            shadowed.push((param.clone(), ctx.ns.remove(param)));
            ctx.ns.set(param, value);
        }

        let mut outcome = Ok(Value::Unset);
        for stmt in &def.body {
            match self.exec_stmt(stmt, ctx) {
                Ok(Flow::Normal) => {}
                Ok(Flow::Return(value)) => {
                    outcome = Ok(value);
                    break;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        for (param, previous) in shadowed.into_iter().rev() {
            match previous {
                Some(value) => ctx.ns.set(&param, value),
                None => {
                    ctx.ns.remove(&param);
                }
            }
        }
        outcome
    }

    fn exec_stmt(&mut self, stmt: &Stmt, ctx: &mut Ctx) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Assign { name, value } => {
                let value = self.eval_expr(value, ctx)?;
                ctx.ns.set(name, value);
                Ok(Flow::Normal)
            }
            Stmt::FnDef { name, params, body } => {
                ctx.ns.define(
                    name,
                    FnDef {
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = self.eval_expr(expr, ctx)?;
                Ok(Flow::Return(value))
            }
            Stmt::Expr(expr) => {
                self.eval_expr(expr, ctx)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Value-preserving session operations.
    fn session_call(&mut self, name: &str, args: &[Expr], ctx: &mut Ctx) -> Result<(), EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg, ctx)?);
        }
        match name {
            "cd" => match values.as_slice() {
                [] => chdir(None)?,
                [Value::Str(s)] => chdir(Some(s))?,
                [other] => {
                    return Err(EvalError::BadType {
                        action: "cd to",
                        ty: other.type_name(),
                    })
                }
                _ => return Err(arity("cd", "0 or 1", values.len())),
            },
            "undo" => {
                if !values.is_empty() {
                    return Err(arity("undo", "0", values.len()));
                }
                ctx.state.undo();
            }
            "debug" => {
                if !values.is_empty() {
                    return Err(arity("debug", "0", values.len()));
                }
                ctx.state.toggle_debug();
            }
            "tracebacks" => {
                if !values.is_empty() {
                    return Err(arity("tracebacks", "0", values.len()));
                }
                ctx.state.toggle_tracebacks();
            }
            "shell" => match values.as_slice() {
                [Value::Str(template)] => ctx.state.set_shell(template),
                [other] => {
                    return Err(EvalError::BadType {
                        action: "use as a shell template",
                        ty: other.type_name(),
                    })
                }
                _ => return Err(arity("shell", "1", values.len())),
            },
            _ => return Err(EvalError::UndefinedFn(name.to_string())),
        }
        Ok(())
    }

    fn builtin(&mut self, name: &str, args: Vec<Value>, ctx: &mut Ctx) -> Result<Value, EvalError> {
        match name {
            "abs" => match args.as_slice() {
                [Value::Num(n)] => Ok(Value::Num(n.abs())),
                [other] => Err(EvalError::BadType {
                    action: "take the absolute value of",
                    ty: other.type_name(),
                }),
                _ => Err(arity("abs", "1", args.len())),
            },
            "len" => match args.as_slice() {
                [Value::Str(s)] => Ok(Value::Num(s.chars().count() as f64)),
                [Value::Lines(lines)] => Ok(Value::Num(lines.len() as f64)),
                [Value::List(items)] => Ok(Value::Num(items.len() as f64)),
                [other] => Err(EvalError::BadType {
                    action: "take the length of",
                    ty: other.type_name(),
                }),
                _ => Err(arity("len", "1", args.len())),
            },
            "num" => match args.as_slice() {
                [v] => to_num(v),
                _ => Err(arity("num", "1", args.len())),
            },
            "text" => match args.as_slice() {
                [v] => Ok(Value::Str(v.render())),
                _ => Err(arity("text", "1", args.len())),
            },
            "sum" => match args.as_slice() {
                [v] => {
                    let mut total = 0.0;
                    for item in elements_of(v)? {
                        match to_num(&item)? {
                            Value::Num(n) => total += n,
                            _ => unreachable!("to_num yields Num"),
                        }
                    }
                    Ok(Value::Num(total))
                }
                _ => Err(arity("sum", "1", args.len())),
            },
            "min" => fold_extreme("min", args, Ordering::Less),
            "max" => fold_extreme("max", args, Ordering::Greater),
            "head" => match args.as_slice() {
                [Value::Lines(lines)] => lines
                    .first()
                    .map(|l| Value::Str(l.clone()))
                    .ok_or_else(|| EvalError::Builtin("head: empty lines".to_string())),
                [Value::List(items)] => items
                    .first()
                    .cloned()
                    .ok_or_else(|| EvalError::Builtin("head: empty list".to_string())),
                [Value::Str(s)] => s
                    .chars()
                    .next()
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(|| EvalError::Builtin("head: empty string".to_string())),
                [other] => Err(EvalError::BadType {
                    action: "take the head of",
                    ty: other.type_name(),
                }),
                _ => Err(arity("head", "1", args.len())),
            },
            "join" => match args.as_slice() {
                [v, Value::Str(sep)] => {
                    let parts: Vec<String> =
                        elements_of(v)?.iter().map(|e| e.render()).collect();
                    Ok(Value::Str(parts.join(sep)))
                }
                [_, other] => Err(EvalError::BadType {
                    action: "join with",
                    ty: other.type_name(),
                }),
                _ => Err(arity("join", "2", args.len())),
            },
            "split" => match args.as_slice() {
                [Value::Str(s)] => Ok(Value::List(
                    s.split_whitespace()
                        .map(|p| Value::Str(p.to_string()))
                        .collect(),
                )),
                [Value::Str(s), Value::Str(sep)] => Ok(Value::List(
                    s.split(sep.as_str())
                        .map(|p| Value::Str(p.to_string()))
                        .collect(),
                )),
                [other, ..] => Err(EvalError::BadType {
                    action: "split",
                    ty: other.type_name(),
                }),
                _ => Err(arity("split", "1 or 2", args.len())),
            },
            "trim" => match args.as_slice() {
                [Value::Str(s)] => Ok(Value::Str(s.trim().to_string())),
                [other] => Err(EvalError::BadType {
                    action: "trim",
                    ty: other.type_name(),
                }),
                _ => Err(arity("trim", "1", args.len())),
            },
            "sh" => match args.as_slice() {
                [Value::Str(cmd)] => {
                    let input = ctx.state.current.as_stdin();
                    let result =
                        runner::run(&ctx.state.shell_argv, cmd, input.as_deref())?;
                    ctx.state.last_status = result.status;
                    Ok(Value::Lines(result.lines))
                }
                [other] => Err(EvalError::BadType {
                    action: "run as a command",
                    ty: other.type_name(),
                }),
                _ => Err(arity("sh", "1", args.len())),
            },
            _ => Err(EvalError::UndefinedFn(name.to_string())),
        }
    }
}

fn bad_operands(op: &'static str, l: &Value, r: &Value) -> EvalError {
    EvalError::BadOperands {
        op,
        lhs: l.type_name(),
        rhs: r.type_name(),
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
        BinOp::And => "and",
        BinOp::Or => "or",
    }
}

fn numeric(
    op: BinOp,
    l: &Value,
    r: &Value,
    f: impl Fn(f64, f64) -> Result<f64, EvalError>,
) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(f(*a, *b)?)),
        _ => Err(bad_operands(op_symbol(op), l, r)),
    }
}

fn compare(
    op: BinOp,
    l: &Value,
    r: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    let ordering = match (l, r) {
        (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(o) => Ok(Value::Bool(accept(o))),
        None => Err(bad_operands(op_symbol(op), l, r)),
    }
}

fn to_num(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Num(n) => Ok(Value::Num(*n)),
        Value::Bool(b) => Ok(Value::Num(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Num)
            .map_err(|_| EvalError::Builtin(format!("num: not a number: {:?}", s))),
        Value::Lines(lines) if lines.len() == 1 => to_num(&Value::Str(lines[0].clone())),
        other => Err(EvalError::BadType {
            action: "convert to a number",
            ty: other.type_name(),
        }),
    }
}

/// The elements of a sequence value, for `sum`/`join` and friends.
fn elements_of(v: &Value) -> Result<Vec<Value>, EvalError> {
    match v {
        Value::List(items) => Ok(items.clone()),
        Value::Lines(lines) => Ok(lines.iter().map(|l| Value::Str(l.clone())).collect()),
        other => Err(EvalError::BadType {
            action: "iterate over",
            ty: other.type_name(),
        }),
    }
}

/// `min`/`max` over either one sequence argument or several scalar ones.
fn fold_extreme(name: &str, args: Vec<Value>, keep: Ordering) -> Result<Value, EvalError> {
    let candidates = match args.as_slice() {
        [] => return Err(arity(name, "at least 1", 0)),
        [v @ (Value::List(_) | Value::Lines(_))] => elements_of(v)?,
        _ => args,
    };
    let mut best: Option<f64> = None;
    for candidate in &candidates {
        let n = match to_num(candidate)? {
            Value::Num(n) => n,
            _ => unreachable!("to_num yields Num"),
        };
        best = Some(match best {
            None => n,
            Some(b) => {
                if n.partial_cmp(&b) == Some(keep) {
                    n
                } else {
                    b
                }
            }
        });
    }
    best.map(Value::Num)
        .ok_or_else(|| EvalError::Builtin(format!("{}: empty sequence", name)))
}

fn index_value(target: &Value, index: &Value) -> Result<Value, EvalError> {
    let raw = match index {
        Value::Num(n) if n.fract() == 0.0 => *n as i64,
        other => {
            return Err(EvalError::BadType {
                action: "index with",
                ty: other.type_name(),
            })
        }
    };
    let len = match target {
        Value::Lines(lines) => lines.len(),
        Value::List(items) => items.len(),
        Value::Str(s) => s.chars().count(),
        other => {
            return Err(EvalError::BadType {
                action: "index",
                ty: other.type_name(),
            })
        }
    };
    // Negative indices count from the end.
    let effective = if raw < 0 { raw + len as i64 } else { raw };
    if effective < 0 || effective as usize >= len {
        return Err(EvalError::IndexOutOfRange { index: raw, len });
    }
    let i = effective as usize;
    Ok(match target {
        Value::Lines(lines) => Value::Str(lines[i].clone()),
        Value::List(items) => items[i].clone(),
        Value::Str(s) => Value::Str(s.chars().nth(i).map(String::from).unwrap_or_default()),
        _ => unreachable!("checked above"),
    })
}

/// Change the process working directory, expanding a leading tilde; no
/// argument means home. Shared by the `cd()` binding and the `%cd`
/// directive.
pub fn chdir(path: Option<&str>) -> std::io::Result<()> {
    let target = match path {
        Some(p) => expand_tilde(p),
        None => home_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "cannot determine home directory",
            )
        })?,
    };
    std::env::set_current_dir(target)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~") {
        if rest.is_empty() || rest.starts_with('/') {
            if let Some(home) = home_dir() {
                return home.join(rest.trim_start_matches('/'));
            }
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;
    use crate::state::PipelineState;

    fn eval(text: &str, ns: &mut Namespace, state: &mut PipelineState) -> Evaluated {
        let mut engine = RillEngine::new();
        engine
            .evaluate(text, &mut Ctx { ns, state })
            .unwrap_or_else(|e| panic!("{:?} failed: {}", text, e))
    }

    fn eval_value(text: &str) -> Value {
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        match eval(text, &mut ns, &mut state) {
            Evaluated::Value(v) => v,
            Evaluated::Keep => panic!("{:?} was value-preserving", text),
        }
    }

    #[test]
    fn arithmetic_with_precedence() {
        assert_eq!(eval_value("1 + 2 * 3"), Value::Num(7.0));
        assert_eq!(eval_value("(1 + 2) * 3"), Value::Num(9.0));
        assert_eq!(eval_value("-6"), Value::Num(-6.0));
        assert_eq!(eval_value("7 % 4"), Value::Num(3.0));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval_value("1 < 2"), Value::Bool(true));
        assert_eq!(eval_value("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval_value("1 == 2 or 3 == 3"), Value::Bool(true));
        assert_eq!(eval_value("true and not false"), Value::Bool(true));
    }

    #[test]
    fn pipe_reads_the_current_value() {
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        state.commit(Value::Num(-6.0));
        assert_eq!(
            eval("abs(_)", &mut ns, &mut state),
            Evaluated::Value(Value::Num(6.0))
        );
        state.commit(Value::Num(6.0));
        assert_eq!(
            eval("_ * 6", &mut ns, &mut state),
            Evaluated::Value(Value::Num(36.0))
        );
    }

    #[test]
    fn string_concat_and_builtins() {
        assert_eq!(eval_value("'a' + 'b'"), Value::Str("ab".into()));
        assert_eq!(eval_value("len('abc')"), Value::Num(3.0));
        assert_eq!(eval_value("num('42')"), Value::Num(42.0));
        assert_eq!(eval_value("text(36)"), Value::Str("36".into()));
        assert_eq!(eval_value("trim('  x ')"), Value::Str("x".into()));
        assert_eq!(eval_value("sum([1, 2, 3])"), Value::Num(6.0));
        assert_eq!(eval_value("min(3, 1, 2)"), Value::Num(1.0));
        assert_eq!(eval_value("max([3, 1, 2])"), Value::Num(3.0));
        assert_eq!(
            eval_value("join(['a', 'b'], '-')"),
            Value::Str("a-b".into())
        );
        assert_eq!(
            eval_value("split('a b  c')"),
            Value::List(vec![
                Value::Str("a".into()),
                Value::Str("b".into()),
                Value::Str("c".into())
            ])
        );
    }

    #[test]
    fn indexing_lines_and_negatives() {
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        state.commit(Value::Lines(vec!["one".into(), "two".into()]));
        assert_eq!(
            eval("_[0]", &mut ns, &mut state),
            Evaluated::Value(Value::Str("one".into()))
        );
        assert_eq!(
            eval("_[-1]", &mut ns, &mut state),
            Evaluated::Value(Value::Str("two".into()))
        );
    }

    #[test]
    fn index_out_of_range_is_an_error() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        state.commit(Value::Lines(vec!["one".into()]));
        let err = engine
            .evaluate("_[3]", &mut Ctx { ns: &mut ns, state: &mut state })
            .unwrap_err();
        assert!(matches!(err, EvalError::IndexOutOfRange { index: 3, len: 1 }));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        let err = engine
            .evaluate("1 / 0", &mut Ctx { ns: &mut ns, state: &mut state })
            .unwrap_err();
        assert!(matches!(err, EvalError::DivideByZero));
    }

    #[test]
    fn undefined_names_fail() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        let err = engine
            .evaluate("nope + 1", &mut Ctx { ns: &mut ns, state: &mut state })
            .unwrap_err();
        assert!(matches!(err, EvalError::Undefined(name) if name == "nope"));
    }

    #[test]
    fn assignment_statement_binds() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        engine
            .execute("x = 5", &mut Ctx { ns: &mut ns, state: &mut state })
            .unwrap();
        assert_eq!(
            eval("x * 2", &mut ns, &mut state),
            Evaluated::Value(Value::Num(10.0))
        );
    }

    #[test]
    fn user_functions_define_and_call() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        engine
            .execute(
                "fn triple(n) {\n  return n * 3\n}",
                &mut Ctx { ns: &mut ns, state: &mut state },
            )
            .unwrap();
        assert_eq!(
            eval("triple(3)", &mut ns, &mut state),
            Evaluated::Value(Value::Num(9.0))
        );
    }

    #[test]
    fn fn_params_shadow_then_restore() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        let mut ctx = Ctx { ns: &mut ns, state: &mut state };
        engine.execute("n = 100", &mut ctx).unwrap();
        engine
            .execute("fn bump(n) { return n + 1 }", &mut ctx)
            .unwrap();
        assert_eq!(
            engine.evaluate("bump(1)", &mut ctx).unwrap(),
            Evaluated::Value(Value::Num(2.0))
        );
        assert_eq!(
            engine.evaluate("n", &mut ctx).unwrap(),
            Evaluated::Value(Value::Num(100.0))
        );
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        let mut ctx = Ctx { ns: &mut ns, state: &mut state };
        engine.execute("fn id(x) { return x }", &mut ctx).unwrap();
        assert!(matches!(
            engine.evaluate("id(1, 2)", &mut ctx).unwrap_err(),
            EvalError::Arity { .. }
        ));
    }

    #[test]
    fn undo_is_value_preserving_and_swaps() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        state.commit(Value::Num(1.0));
        state.commit(Value::Num(2.0));
        let result = engine
            .evaluate("undo()", &mut Ctx { ns: &mut ns, state: &mut state })
            .unwrap();
        assert_eq!(result, Evaluated::Keep);
        assert_eq!(state.current, Value::Num(1.0));
    }

    #[test]
    fn debug_and_tracebacks_toggle() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        state.debug = false;
        state.tracebacks = false;
        let mut ctx = Ctx { ns: &mut ns, state: &mut state };
        assert_eq!(engine.evaluate("debug()", &mut ctx).unwrap(), Evaluated::Keep);
        assert!(ctx.state.debug);
        assert_eq!(
            engine.evaluate("tracebacks()", &mut ctx).unwrap(),
            Evaluated::Keep
        );
        assert!(ctx.state.tracebacks);
    }

    #[test]
    fn shell_reconfigures_the_template() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        let result = engine
            .evaluate(
                "shell('/bin/bash -c')",
                &mut Ctx { ns: &mut ns, state: &mut state },
            )
            .unwrap();
        assert_eq!(result, Evaluated::Keep);
        assert_eq!(state.shell_argv, vec!["/bin/bash", "-c"]);
    }

    #[cfg(unix)]
    #[test]
    fn sh_yields_lines_and_feeds_the_value() {
        let mut engine = RillEngine::new();
        let mut ns = Namespace::new();
        let mut state = PipelineState::new();
        state.commit(Value::Str("hello".into()));
        let result = engine
            .evaluate("sh('cat')", &mut Ctx { ns: &mut ns, state: &mut state })
            .unwrap();
        assert_eq!(result, Evaluated::Value(Value::Lines(vec!["hello".into()])));
        assert_eq!(state.last_status, 0);
    }
}
