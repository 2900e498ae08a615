//! ast-grep integration for grammar-aware JavaScript queries.
//!
//! Provides the syntax-tree locator strategy and the parse used by
//! post-rewrite validation.

pub mod lang;
pub mod locator;

pub use lang::{javascript, SupportLang};
pub use locator::SyntaxTreeLocator;
