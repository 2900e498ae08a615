use crate::document::Document;
use crate::edit::Edit;
use crate::rewrite::{Plan, RewriteRule, RuleError};

/// A field initialised to a fresh literal, shared through one constant.
///
/// Sharing is only sound when nothing mutates the value in place; that is
/// the caller's precondition and is not checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedConstant {
    pub field: String,
    pub value: String,
    pub constant: String,
}

impl SharedConstant {
    /// `field:value` as it appears in the source.
    pub fn pattern(&self) -> String {
        format!("{}:{}", self.field, self.value)
    }

    pub fn replacement(&self) -> String {
        format!("{}:{}", self.field, self.constant)
    }

    pub fn declaration(&self) -> String {
        format!("var {}={};", self.constant, self.value)
    }

    /// Edits declaring the constant after the prologue and rewriting every
    /// occurrence. `None` when the pattern does not occur.
    pub fn edits(&self, doc: &Document) -> Option<Vec<Edit>> {
        let pattern = self.pattern();
        let replacement = self.replacement();

        let mut edits: Vec<Edit> = doc
            .as_str()
            .match_indices(pattern.as_str())
            .map(|(start, found)| Edit::new(start, start + found.len(), replacement.clone(), found))
            .collect();

        if edits.is_empty() {
            return None;
        }

        edits.insert(0, Edit::insert(doc.prologue_end(), self.declaration()));
        Some(edits)
    }
}

pub struct HoistRule {
    id: String,
    shared: SharedConstant,
}

impl HoistRule {
    pub fn new(id: impl Into<String>, shared: SharedConstant) -> Self {
        Self {
            id: id.into(),
            shared,
        }
    }
}

impl RewriteRule for HoistRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn marker(&self) -> &str {
        &self.shared.constant
    }

    fn plan(&self, doc: &Document) -> Result<Plan, RuleError> {
        let Some(edits) = self.shared.edits(doc) else {
            return Ok(Plan::not_found(format!(
                "no occurrences of {}",
                self.shared.pattern()
            )));
        };

        let occurrences = edits.len() - 1;
        Ok(Plan::Edits {
            edits,
            summary: format!("patched {occurrences} occurrence(s) of {}", self.shared.pattern()),
        })
    }
}
