use crate::cache;
use crate::document::Document;
use crate::scan::errors::ScanError;

/// Byte range where a contextual signature was found.
///
/// Only seeds the backward search; never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub start: usize,
    pub end: usize,
}

/// Ordered marker tokens that must appear, in order, on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorPattern {
    tokens: Vec<String>,
}

impl AnchorPattern {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Single combined pattern: escaped tokens joined by lazy gaps.
    ///
    /// `.` does not cross newlines, so all tokens must share a line. For
    /// minified bundles that is rarely a restriction.
    pub fn to_regex(&self) -> String {
        self.tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join(".*?")
    }

    /// First occurrence of the token sequence.
    pub fn find(&self, doc: &Document) -> Result<Option<Anchor>, ScanError> {
        if self.tokens.is_empty() || self.tokens.iter().any(|t| t.is_empty()) {
            return Err(ScanError::InvalidPattern {
                pattern: self.tokens.join(" "),
                message: "anchor needs at least one non-empty token".to_string(),
            });
        }

        let pattern = self.to_regex();
        let re = cache::get_or_compile_pattern(&pattern).map_err(|e| (pattern.as_str(), e))?;

        Ok(re.find(doc.as_str()).map(|m| Anchor {
            start: m.start(),
            end: m.end(),
        }))
    }
}
