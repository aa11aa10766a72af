//! Splitting one input line into pipe-delimited command segments.
//!
//! A `|` splits unless it is inside single or double quotes or escaped with a
//! backslash (`\|` becomes a literal `|` in the segment text). Empty segments
//! are kept because their position carries meaning: a leading empty segment
//! continues the previous line's pipeline, a trailing one keeps the pipeline
//! open for the next line, and an interior one terminates an in-progress
//! compound statement.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SegmentError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
}

/// One pipeline stage: its raw text and position within the line.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub index: usize,
}

impl Segment {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Whitespace-only segments count as empty.
    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }

    /// Comment segments are no-ops that neither consume nor replace the
    /// pipeline value.
    pub fn is_comment(&self) -> bool {
        self.trimmed().starts_with('#')
    }
}

/// Split a line on unquoted, unescaped `|`.
pub fn split_line(line: &str) -> Result<Vec<Segment>, SegmentError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '\\' if chars.peek() == Some(&'|') => {
                    chars.next();
                    current.push('|');
                }
                '|' => {
                    segments.push(Segment {
                        text: std::mem::take(&mut current),
                        index: segments.len(),
                    });
                }
                _ => current.push(c),
            },
        }
    }

    if let Some(q) = quote {
        return Err(SegmentError::UnterminatedQuote(q));
    }

    segments.push(Segment {
        text: current,
        index: segments.len(),
    });

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        split_line(line)
            .unwrap()
            .iter()
            .map(|s| s.trimmed().to_string())
            .collect()
    }

    #[test]
    fn splits_on_pipes() {
        assert_eq!(texts("a | b | c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn double_pipe_yields_explicit_empty_segment() {
        assert_eq!(texts("a || b"), vec!["a", "", "b"]);
    }

    #[test]
    fn no_pipe_yields_single_segment() {
        assert_eq!(texts("hello"), vec!["hello"]);
    }

    #[test]
    fn empty_line_yields_single_empty_segment() {
        assert_eq!(texts(""), vec![""]);
    }

    #[test]
    fn trailing_pipe_yields_trailing_empty_segment() {
        assert_eq!(texts("a |"), vec!["a", ""]);
        let segs = split_line("a |   ").unwrap();
        assert!(segs.last().unwrap().is_empty());
    }

    #[test]
    fn leading_pipe_yields_leading_empty_segment() {
        assert_eq!(texts("| b"), vec!["", "b"]);
    }

    #[test]
    fn escaped_pipe_is_literal() {
        assert_eq!(texts(r"echo hi \| wc -c"), vec!["echo hi | wc -c"]);
    }

    #[test]
    fn quoted_pipe_does_not_split() {
        assert_eq!(texts("echo 'a|b'"), vec!["echo 'a|b'"]);
        assert_eq!(texts("echo \"a | b\" | cat"), vec!["echo \"a | b\"", "cat"]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(
            split_line("echo 'oops"),
            Err(SegmentError::UnterminatedQuote('\''))
        );
    }

    #[test]
    fn comment_segments_are_recognized() {
        let segs = split_line("  # just a note").unwrap();
        assert!(segs[0].is_comment());
    }

    #[test]
    fn indices_are_in_order() {
        let segs = split_line("a | b | c").unwrap();
        assert_eq!(
            segs.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }
}
