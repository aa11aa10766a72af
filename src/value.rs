//! The pipeline value threaded between command segments.
//!
//! Every segment of a pipeline consumes the current value and may replace
//! it. External commands always produce `Lines`; the embedded language can
//! produce any variant. A fresh session holds `Unset`, never an absent value.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit "nothing yet" sentinel
    Unset,
    Num(f64),
    Bool(bool),
    Str(String),
    /// Ordered sequence of text lines - the canonical external-command result
    Lines(Vec<String>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Serialize for a child process's standard input.
    ///
    /// Only line-like values are fed to children; everything else means the
    /// child gets no input at all.
    pub fn as_stdin(&self) -> Option<String> {
        match self {
            Value::Str(s) => {
                if s.ends_with('\n') {
                    Some(s.clone())
                } else {
                    Some(format!("{}\n", s))
                }
            }
            Value::Lines(lines) => {
                if lines.is_empty() {
                    Some(String::new())
                } else {
                    Some(format!("{}\n", lines.join("\n")))
                }
            }
            _ => None,
        }
    }

    /// Truthiness for `and`/`or` in the embedded language.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Unset => false,
            Value::Num(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Lines(lines) => !lines.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unset => "unset",
            Value::Num(_) => "number",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Lines(_) => "lines",
            Value::List(_) => "list",
        }
    }

    /// The display form used when the REPL prints the pipeline value.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

fn render_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => Ok(()),
            Value::Num(n) => write!(f, "{}", render_num(*n)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Lines(lines) => write!(f, "{}", lines.join("\n")),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "'{}'", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_for_lines_joins_with_trailing_newline() {
        let v = Value::Lines(vec!["a".into(), "b".into()]);
        assert_eq!(v.as_stdin(), Some("a\nb\n".to_string()));
    }

    #[test]
    fn stdin_for_empty_lines_is_empty_not_none() {
        let v = Value::Lines(vec![]);
        assert_eq!(v.as_stdin(), Some(String::new()));
    }

    #[test]
    fn stdin_for_non_line_values_is_none() {
        assert_eq!(Value::Num(4.0).as_stdin(), None);
        assert_eq!(Value::Unset.as_stdin(), None);
        assert_eq!(Value::Bool(true).as_stdin(), None);
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Value::Num(36.0).render(), "36");
        assert_eq!(Value::Num(2.5).render(), "2.5");
        assert_eq!(Value::Num(-6.0).render(), "-6");
    }

    #[test]
    fn lists_render_with_quoted_strings() {
        let v = Value::List(vec![Value::Num(1.0), Value::Str("x".into())]);
        assert_eq!(v.render(), "[1, 'x']");
    }
}
