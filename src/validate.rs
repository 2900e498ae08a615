//! Post-rewrite syntax validation.
//!
//! Minified bundles occasionally contain constructs the grammar does not
//! recognise, so a clean parse is not required. What is required is that a
//! rewrite never adds ERROR nodes: if the patched document has more than
//! the original, the session result is refused before anything is written.

use crate::document::Document;
use crate::sg::lang::javascript;
use ast_grep_core::AstGrep;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rewrite introduced parse errors: {before} ERROR node(s) before, {after} after (first at byte {first_offset})")]
    ParseErrorIntroduced {
        before: usize,
        after: usize,
        first_offset: usize,
    },
}

/// Byte offsets of every ERROR node in `source`.
pub fn error_offsets(source: &str) -> Vec<usize> {
    let sg = AstGrep::new(source, javascript());
    let root = sg.root();
    root.dfs()
        .filter(|node| node.kind() == "ERROR")
        .map(|node| node.range().start)
        .collect()
}

/// Check that `edited` does not contain more parse errors than `original`.
pub fn validate_edit(original: &Document, edited: &Document) -> Result<(), ValidationError> {
    let before = error_offsets(original.as_str()).len();
    let after_offsets = error_offsets(edited.as_str());

    if after_offsets.len() > before {
        return Err(ValidationError::ParseErrorIntroduced {
            before,
            after: after_offsets.len(),
            first_offset: after_offsets.first().copied().unwrap_or_default(),
        });
    }

    log::debug!(
        "syntax check passed ({} pre-existing ERROR node(s))",
        before
    );
    Ok(())
}
