//! JavaScript language support via ast-grep-language.
//!
//! Bundles are plain JavaScript; the built-in `SupportLang::JavaScript`
//! grammar is enough for locating declarations and spotting syntax errors.

pub use ast_grep_language::SupportLang;

/// Get the JavaScript language for ast-grep operations.
pub fn javascript() -> SupportLang {
    SupportLang::JavaScript
}
