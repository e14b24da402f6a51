use thiserror::Error;

use super::token::Token;

/// Errors raised while compiling a schema. The first one aborts the compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Grammar or cross-reference violation at a source position
    #[error("Syntax Error:{line}:{column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    /// The AST cannot be rendered for the configured dialect
    #[error("Error: {0}")]
    Generation(String),
}

impl CompileError {
    pub fn at(token: &Token, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        CompileError::Generation(message.into())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
