//! Error kinds for every subsystem, matching `fs::types::FsError`'s style:
//! one variant per failure class, a `Display` impl a caller can show
//! verbatim, derived via `thiserror`.

use crate::ast::Position;
use crate::fs::FsError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn at(pos: Position, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: pos.line,
            column: pos.column,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ExpansionError {
    #[error("{name}: parameter null or not set")]
    UnsetVariable { name: String },
    #[error("{message}")]
    BadSubstitution { message: String },
    #[error("arithmetic: {message}")]
    Arithmetic { message: String },
    #[error("{message}")]
    Other { message: String },
}

#[derive(Error, Debug, Clone)]
#[error("{name}: command not found")]
pub struct CommandNotFound {
    pub name: String,
}

#[derive(Error, Debug, Clone)]
pub enum RedirectionError {
    #[error("{target}: ambiguous redirect")]
    Ambiguous { target: String },
    #[error("{fd}: bad file descriptor")]
    BadFd { fd: i32 },
    #[error("{0}")]
    Fs(#[from] FsError),
}

/// Top-level error type threaded through expansion and execution.
#[derive(Error, Debug, Clone)]
pub enum ShellError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    CommandNotFound(#[from] CommandNotFound),
    #[error(transparent)]
    FileSystem(#[from] FsError),
    #[error(transparent)]
    Redirection(#[from] RedirectionError),
    #[error("cancelled")]
    Cancelled,
}

impl ShellError {
    /// Exit code a caller should surface for this error per the documented
    /// propagation rules (parse errors are handled separately at 2).
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::Syntax(_) => 2,
            ShellError::Expansion(ExpansionError::UnsetVariable { .. }) => 2,
            ShellError::Expansion(_) => 1,
            ShellError::CommandNotFound(_) => 127,
            ShellError::FileSystem(_) => 1,
            ShellError::Redirection(_) => 1,
            ShellError::Cancelled => 130,
        }
    }
}
