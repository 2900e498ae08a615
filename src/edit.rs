use crate::document::Document;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Every rewrite rule compiles down to one or more of these. Intelligence
/// lives in span acquisition (anchors, signatures, brace matching), not in
/// application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied to a Document"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (cheaper for whole function bodies)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in document of length {doc_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        doc_len: usize,
    },

    #[error("byte offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },

    #[error("edits overlap: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    /// Edit was spliced in
    Applied { bytes_changed: usize },
    /// Span already held the new text
    AlreadyApplied,
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// Pure insertion at `offset`.
    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::new(offset, offset, new_text, "")
    }

    /// Validate the edit against the current document.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    fn validate<'a>(&self, doc: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > doc.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                doc_len: doc.len(),
            });
        }

        for offset in [self.byte_start, self.byte_end] {
            if !doc.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }

        let current = &doc[self.byte_start..self.byte_end];

        // Idempotency: already holds the replacement
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this edit to a snapshot, producing the next snapshot.
    pub fn apply_to(&self, doc: &Document) -> Result<(Document, EditResult), EditError> {
        let current = self.validate(doc.as_str())?;

        if current == self.new_text {
            return Ok((doc.clone(), EditResult::AlreadyApplied));
        }

        let text = doc.as_str();
        let mut next = String::with_capacity(
            text.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        next.push_str(&text[..self.byte_start]);
        next.push_str(&self.new_text);
        next.push_str(&text[self.byte_end..]);

        Ok((
            Document::new(next),
            EditResult::Applied {
                bytes_changed: self.new_text.len(),
            },
        ))
    }

    /// Apply multiple edits against the same snapshot in one pass.
    ///
    /// All edits are validated against `doc` first; nothing is spliced if
    /// any of them fails. Edits are applied bottom-to-top so earlier offsets
    /// stay valid. Results are returned in the caller's order.
    pub fn apply_batch(
        doc: &Document,
        edits: &[Edit],
    ) -> Result<(Document, Vec<EditResult>), EditError> {
        if edits.is_empty() {
            return Ok((doc.clone(), Vec::new()));
        }

        let text = doc.as_str();
        for edit in edits {
            edit.validate(text)?;
        }

        // Descending by start; on ties the wider span goes first so an
        // insertion at the same offset lands in front of it.
        let mut order: Vec<usize> = (0..edits.len()).collect();
        order.sort_by(|&a, &b| {
            edits[b]
                .byte_start
                .cmp(&edits[a].byte_start)
                .then(edits[b].byte_end.cmp(&edits[a].byte_end))
        });

        for pair in order.windows(2) {
            let (later, earlier) = (&edits[pair[0]], &edits[pair[1]]);
            if earlier.byte_end > later.byte_start {
                return Err(EditError::Overlap {
                    first_start: earlier.byte_start,
                    first_end: earlier.byte_end,
                    second_start: later.byte_start,
                    second_end: later.byte_end,
                });
            }
        }

        let mut next = text.to_string();
        let mut results = vec![EditResult::AlreadyApplied; edits.len()];

        for idx in order {
            let edit = &edits[idx];
            if &next[edit.byte_start..edit.byte_end] == edit.new_text {
                continue;
            }
            next.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
            results[idx] = EditResult::Applied {
                bytes_changed: edit.new_text.len(),
            };
        }

        Ok((Document::new(next), results))
    }
}
