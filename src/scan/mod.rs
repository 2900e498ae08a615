//! Text-level location of functions in minified source.
//!
//! Source is treated as an opaque brace-delimited stream: an anchor pattern
//! seeds a backward search for the nearest function header, and the brace
//! matcher resolves the body. See [`crate::sg`] for a grammar-aware
//! alternative behind the same [`FunctionLocator`] seam.

pub mod anchor;
pub mod braces;
pub mod errors;
pub mod locator;

pub use anchor::{Anchor, AnchorPattern};
pub use braces::{match_brace, BraceMatcher, BraceSpan, LiteralPolicy};
pub use errors::{LiteralKind, ScanError};
pub use locator::{
    locate, BackwardScan, FunctionLocator, FunctionSite, Located, DEFAULT_SIGNATURE,
    DEFAULT_WINDOW,
};
