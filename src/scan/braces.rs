//! Balanced-brace scanning over raw source bytes.
//!
//! Braces are ASCII, so scanning bytes never splits a UTF-8 sequence and
//! every offset returned here is a valid `str` boundary.

use crate::scan::errors::{LiteralKind, ScanError};
use serde::Deserialize;

/// How braces inside string, template and comment literals are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiteralPolicy {
    /// Count every brace. Minified output rarely has literal braces near
    /// function bodies, and this is the cheapest scan.
    #[default]
    Ignore,
    /// Track literals and fail on the first brace found inside one.
    ///
    /// Regex literals are not recognised: `/` is only treated as the start
    /// of a comment when followed by `/` or `*`.
    Reject,
}

/// Byte span of a balanced `{ ... }` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceSpan {
    /// Offset of the opening `{`
    pub open: usize,
    /// Offset one past the matching `}`
    pub end: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BraceMatcher {
    policy: LiteralPolicy,
}

impl BraceMatcher {
    pub fn new(policy: LiteralPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LiteralPolicy {
        self.policy
    }

    /// Seek the first `{` at or after `start` and return the span up to and
    /// including its matching `}`.
    pub fn match_brace(&self, source: &str, start: usize) -> Result<BraceSpan, ScanError> {
        let bytes = source.as_bytes();
        let open = bytes
            .get(start..)
            .and_then(|rest| rest.iter().position(|&b| b == b'{'))
            .map(|pos| start + pos)
            .ok_or(ScanError::NoOpeningBrace { from: start })?;

        let end = match self.policy {
            LiteralPolicy::Ignore => scan_counting(bytes, open)?,
            LiteralPolicy::Reject => scan_rejecting_literals(bytes, open)?,
        };

        Ok(BraceSpan { open, end })
    }
}

/// Return the offset one past the brace that closes the block opened at or
/// after `start`.
pub fn match_brace(source: &str, start: usize) -> Result<usize, ScanError> {
    BraceMatcher::default()
        .match_brace(source, start)
        .map(|span| span.end)
}

fn scan_counting(bytes: &[u8], open: usize) -> Result<usize, ScanError> {
    let mut depth = 0usize;
    for (pos, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
            }
            _ => {}
        }
    }
    Err(ScanError::UnbalancedBraces { open, depth })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    Quoted(u8),
    Template,
    LineComment,
    BlockComment,
}

fn scan_rejecting_literals(bytes: &[u8], open: usize) -> Result<usize, ScanError> {
    let mut depth = 0usize;
    let mut state = Lexeme::Code;
    let mut pos = open;

    while pos < bytes.len() {
        let b = bytes[pos];
        let next = bytes.get(pos + 1).copied();

        match state {
            Lexeme::Code => match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(pos + 1);
                    }
                }
                b'\'' | b'"' => state = Lexeme::Quoted(b),
                b'`' => state = Lexeme::Template,
                b'/' if next == Some(b'/') => {
                    state = Lexeme::LineComment;
                    pos += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lexeme::BlockComment;
                    pos += 1;
                }
                _ => {}
            },
            Lexeme::Quoted(quote) => match b {
                b'\\' => pos += 1,
                b'{' | b'}' => {
                    return Err(ScanError::BraceInLiteral {
                        offset: pos,
                        kind: LiteralKind::String,
                    })
                }
                _ if b == quote => state = Lexeme::Code,
                _ => {}
            },
            Lexeme::Template => match b {
                b'\\' => pos += 1,
                b'{' | b'}' => {
                    return Err(ScanError::BraceInLiteral {
                        offset: pos,
                        kind: LiteralKind::Template,
                    })
                }
                b'`' => state = Lexeme::Code,
                _ => {}
            },
            Lexeme::LineComment => match b {
                b'\n' => state = Lexeme::Code,
                b'{' | b'}' => {
                    return Err(ScanError::BraceInLiteral {
                        offset: pos,
                        kind: LiteralKind::Comment,
                    })
                }
                _ => {}
            },
            Lexeme::BlockComment => match b {
                b'*' if next == Some(b'/') => {
                    state = Lexeme::Code;
                    pos += 1;
                }
                b'{' | b'}' => {
                    return Err(ScanError::BraceInLiteral {
                        offset: pos,
                        kind: LiteralKind::Comment,
                    })
                }
                _ => {}
            },
        }

        pos += 1;
    }

    Err(ScanError::UnbalancedBraces { open, depth })
}
