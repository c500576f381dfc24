use std::rc::Rc;
use thiserror::Error;

use crate::syntax::ast::Span;

/// Error codes prefixed by phase: L = lexer, P = parser, S = scope builder,
/// W = non-fatal builder warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // character cannot start a token
    L002, // unterminated string literal

    // Parser
    P001, // unexpected token
    P002, // unbalanced open parenthesis at end of input

    // Scope builder
    S001, // duplicate definition in the same frame
    S002, // cannot override a built-in or reserved name
    S003, // malformed parameter list
    S004, // malformed special form

    // Warnings
    W001, // shadows a binding from an enclosing frame
}

impl ErrorCode {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::W001)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::S001 => "S001",
            Self::S002 => "S002",
            Self::S003 => "S003",
            Self::S004 => "S004",
            Self::W001 => "W001",
        }
    }
}

/// A build-time diagnostic: lexing, parsing, or scope construction.
/// Warnings (`is_error() == false`) never abort the build.
#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(
        code: ErrorCode,
        file: Rc<str>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self { code, file, line, column, message: message.into() }
    }

    pub fn at(code: ErrorCode, span: &Span, message: impl Into<String>) -> Self {
        Self::new(code, span.file.clone(), span.line, span.column, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}:{}:{} — {}",
            self.code.as_str(),
            self.file,
            self.line,
            self.column,
            self.message
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// What went wrong during evaluation. Every kind is terminal for the
/// current top-level run; nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalErrorKind {
    #[error("symbol `{0}` is not defined")]
    SymbolNotDefined(String),

    #[error("variable `{0}` used before initialization")]
    VariableNotSet(String),

    #[error("`{0}` is not a function")]
    NotAFunction(String),

    #[error("`{name}` expects {expected} for argument {index}, got {actual}")]
    WrongType { name: String, index: usize, expected: String, actual: &'static str },

    #[error("`{name}` expects {expected} arguments, got {actual}")]
    WrongArgCount { name: String, expected: String, actual: usize },

    #[error("`{name}` does not accept keyword `:{keyword}`")]
    UnknownKeyword { name: String, keyword: String },

    #[error("expected `t` or `nil`, got {actual}")]
    BooleanExpected { actual: &'static str },

    #[error("group `{0}` already exists")]
    GroupExists(String),

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("module `{0}` not found on the search path")]
    ModuleNotFound(String),

    #[error("module `{module}` failed to load: {message}")]
    ModuleLoad { module: String, message: String },

    #[error("`{0}` already imported from a different module")]
    ImportConflict(String),

    #[error("cannot set `{0}`")]
    CannotSet(String),

    #[error("division by zero")]
    DivideByZero,

    #[error("call depth limit exceeded")]
    RecursionLimit,
}

/// One line of the call-chain breadcrumb trail, most recent call first.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub function: Rc<str>,
    pub file: Rc<str>,
    pub line: usize,
}

impl std::fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "in function {} at line {} in file {}", self.function, self.line, self.file)
    }
}

/// A runtime failure, annotated with the source position where it was
/// raised and one trace frame per function call it unwound through.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub trace: Vec<TraceFrame>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, span: &Span) -> Self {
        Self {
            kind,
            file: span.file.clone(),
            line: span.line,
            column: span.column,
            trace: Vec::new(),
        }
    }

    /// Append one breadcrumb as the error crosses a call boundary.
    pub fn push_frame(mut self, function: Rc<str>, span: &Span) -> Self {
        self.trace.push(TraceFrame { function, file: span.file.clone(), line: span.line });
        self
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{} — {}", self.file, self.line, self.column, self.kind)?;
        for frame in &self.trace {
            write!(f, "\n  {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}
