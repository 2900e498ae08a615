use std::fmt;
use thiserror::Error;

/// Which kind of literal a stray brace was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Template,
    Comment,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralKind::String => write!(f, "string literal"),
            LiteralKind::Template => write!(f, "template literal"),
            LiteralKind::Comment => write!(f, "comment"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("no opening brace at or after byte {from}")]
    NoOpeningBrace { from: usize },

    #[error("unbalanced braces: block opened at byte {open} still has depth {depth} at end of document")]
    UnbalancedBraces { open: usize, depth: usize },

    #[error("brace inside {kind} at byte {offset}")]
    BraceInLiteral { offset: usize, kind: LiteralKind },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("signature grammar has no capture group '{group}'")]
    MissingCapture { group: &'static str },
}

impl ScanError {
    /// Structural errors mean the document cannot be trusted; pattern
    /// errors mean the rule itself is wrong.
    pub fn is_malformed_structure(&self) -> bool {
        matches!(
            self,
            ScanError::NoOpeningBrace { .. }
                | ScanError::UnbalancedBraces { .. }
                | ScanError::BraceInLiteral { .. }
        )
    }
}

impl From<(&str, regex::Error)> for ScanError {
    fn from((pattern, err): (&str, regex::Error)) -> Self {
        ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}
