//! Rewrite rules: locate a target in one snapshot and plan verified edits.
//!
//! A rule never touches the document itself. It inspects a snapshot and
//! returns a [`Plan`]; the session applies the edits and hands the next
//! snapshot to the following rule.

pub mod hoist;
pub mod memoize;

pub use hoist::{HoistRule, SharedConstant};
pub use memoize::{memoize_wrapper, MemoizeRule};

use crate::document::Document;
use crate::edit::Edit;
use crate::scan::locator::is_identifier_byte;
use crate::scan::ScanError;
use thiserror::Error;

/// What a rule wants done to the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Splice these edits; all offsets refer to the snapshot passed to `plan`.
    Edits { edits: Vec<Edit>, summary: String },
    /// Target absent or unsupported; the rule is skipped.
    NotFound { reason: String },
}

impl Plan {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Plan::NotFound {
            reason: reason.into(),
        }
    }
}

/// Hard failures that abort the whole session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl RuleError {
    pub fn is_malformed_structure(&self) -> bool {
        match self {
            RuleError::Scan(e) => e.is_malformed_structure(),
        }
    }
}

pub trait RewriteRule {
    /// Stable identifier used in reports.
    fn id(&self) -> &str;

    /// Identifier whose presence means this rule has already been applied.
    fn marker(&self) -> &str;

    fn plan(&self, doc: &Document) -> Result<Plan, RuleError>;

    fn is_applied(&self, doc: &Document) -> bool {
        contains_identifier(doc.as_str(), self.marker())
    }
}

/// `name` occurs as a whole identifier: `_M` is found in `_M.k` and
/// `var _M=`, not in `_MAX` or `a_M`.
pub fn contains_identifier(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = text.as_bytes();
    text.match_indices(name).any(|(start, _)| {
        let end = start + name.len();
        let before = start.checked_sub(1).map(|i| bytes[i]);
        !before.is_some_and(is_identifier_byte)
            && !bytes.get(end).copied().is_some_and(is_identifier_byte)
    })
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
}
