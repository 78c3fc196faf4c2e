use std::fmt;

use thiserror::Error;

/// A single diagnostic produced while parsing one `${{ ... }}` span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Character column inside the span, starting at 0.
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        Self { column, message: message.into() }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line 1:{} {}", self.column, self.message)
    }
}

/// Every failure the language can report. Syntax diagnostics come only from the
/// front-end; all other variants are raised while evaluating a parsed tree.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{}", join_lines(.0))]
    Syntax(Vec<SyntaxError>),

    #[error("unknown context {0}")]
    UnknownScope(String),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("{0}")]
    Arity(String),

    #[error("function {0} does not exist")]
    UnknownFunction(String),

    #[error("{0}")]
    IndexOutOfRange(String),

    #[error("{0}")]
    InvalidData(String),
}

/// Fieldless discriminant of [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UnknownScope,
    TypeMismatch,
    Arity,
    UnknownFunction,
    IndexOutOfRange,
    InvalidData,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax(_) => ErrorKind::Syntax,
            EvalError::UnknownScope(_) => ErrorKind::UnknownScope,
            EvalError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            EvalError::Arity(_) => ErrorKind::Arity,
            EvalError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            EvalError::IndexOutOfRange(_) => ErrorKind::IndexOutOfRange,
            EvalError::InvalidData(_) => ErrorKind::InvalidData,
        }
    }

    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        EvalError::TypeMismatch(msg.into())
    }

    pub(crate) fn arity(msg: impl Into<String>) -> Self {
        EvalError::Arity(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EvalError::InvalidData(msg.into())
    }
}

fn join_lines(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn syntax_errors_are_newline_joined() {
        let err = EvalError::Syntax(vec![
            SyntaxError::new(4, "unexpected '$'"),
            SyntaxError::new(9, "expected '}}'"),
        ]);
        assert_eq!(err.to_string(), "line 1:4 unexpected '$'\nline 1:9 expected '}}'");
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn unknown_scope_message() {
        let err = EvalError::UnknownScope("job".into());
        assert_eq!(err.to_string(), "unknown context job");
        assert_eq!(err.kind(), ErrorKind::UnknownScope);
    }
}
