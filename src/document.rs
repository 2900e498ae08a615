//! Immutable document snapshots.
//!
//! A [`Document`] is never edited in place. Every splice produces a new
//! snapshot, so offsets computed against one snapshot can never be applied
//! to another by accident: rules receive `&Document` and hand back edits,
//! and the session swaps in the successor.

use std::fmt;
use std::sync::Arc;

/// Full source text of one target file.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    text: Arc<str>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Byte offset just past a leading interpreter directive (`#!...\n`).
    ///
    /// Returns 0 when the document has no directive. A directive without a
    /// trailing newline also yields 0, matching a file that is nothing but
    /// the directive line.
    pub fn prologue_end(&self) -> usize {
        if !self.text.starts_with("#!") {
            return 0;
        }
        match self.text.find('\n') {
            Some(pos) => pos + 1,
            None => 0,
        }
    }

    /// Round an offset down to the nearest UTF-8 character boundary.
    pub fn floor_char_boundary(&self, mut offset: usize) -> usize {
        if offset >= self.text.len() {
            return self.text.len();
        }
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Round an offset up to the nearest UTF-8 character boundary.
    pub fn ceil_char_boundary(&self, mut offset: usize) -> usize {
        if offset >= self.text.len() {
            return self.text.len();
        }
        while !self.text.is_char_boundary(offset) {
            offset += 1;
        }
        offset
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// Bundles run to megabytes; keep Debug output readable.
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 64;
        let end = self.floor_char_boundary(PREVIEW.min(self.len()));
        f.debug_struct("Document")
            .field("len", &self.len())
            .field("head", &&self.text[..end])
            .finish()
    }
}
