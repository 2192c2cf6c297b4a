//! Error types for the Zircon language
//!
//! Parse failures carry the cursor location and the rest of the offending
//! line; runtime failures carry only their kind.

use crate::cursor::{Cursor, Location};
use std::fmt;
use thiserror::Error;

/// Error kinds in Zircon
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Parser errors
    #[error("expected {0}")]
    Expected(String),

    #[error("unterminated string, expected closing {0}")]
    UnterminatedString(char),

    #[error("expected newline")]
    ExpectedSeparator,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    // Runtime errors
    #[error("type mismatch: expected {0}, got {1}")]
    TypeMismatch(String, String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("non-terminating decimal expansion; no exact representable decimal result")]
    NonTerminatingDecimal,

    #[error("invalid exponent {0}, expected an integer between -999999999 and 999999999")]
    InvalidExponent(String),

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("expected {0} arguments, got {1}")]
    WrongArity(usize, usize),

    #[error("stack overflow")]
    StackOverflow,

    #[error("{name}: {message}")]
    Host { name: String, message: String },
}

impl ErrorKind {
    /// True for errors raised while parsing
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            ErrorKind::Expected(_)
                | ErrorKind::UnterminatedString(_)
                | ErrorKind::ExpectedSeparator
                | ErrorKind::InvalidNumber(_)
                | ErrorKind::TooDeep(_)
        )
    }
}

/// A Zircon error with optional location information
#[derive(Debug, Clone, PartialEq)]
pub struct ZirconError {
    pub kind: ErrorKind,
    pub location: Option<Location>,
    /// Source text from the failure point to the end of its line
    pub near: Option<String>,
}

impl ZirconError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
            near: None,
        }
    }

    /// An error located at the cursor's current position
    pub fn at(kind: ErrorKind, cursor: &Cursor) -> Self {
        Self {
            kind,
            location: Some(cursor.location()),
            near: Some(cursor.rest_of_line()),
        }
    }

    pub fn is_parse(&self) -> bool {
        self.kind.is_parse()
    }
}

impl From<ErrorKind> for ZirconError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for ZirconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[line {}] Error: {}", location, self.kind)?,
            None => write!(f, "Error: {}", self.kind)?,
        }
        if let Some(near) = &self.near {
            write!(f, "\n  | {}", near)?;
        }
        Ok(())
    }
}

impl std::error::Error for ZirconError {}

/// Result type for Zircon operations
pub type Result<T> = std::result::Result<T, ZirconError>;
