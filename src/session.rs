//! Patch session - runs rewrite rules in order over document snapshots.
//!
//! Each rule:
//! - is skipped when its idempotency marker is already present
//! - plans edits against the snapshot left by the previous rule
//! - has its edits verified and spliced, producing the next snapshot
//!
//! Any hard rule failure aborts the session; the caller never sees a
//! partially rewritten document.

use crate::document::Document;
use crate::edit::{Edit, EditError};
use crate::rewrite::{Plan, RewriteRule, RuleError};
use std::fmt;
use thiserror::Error;

/// What happened to one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Edits were spliced into the document
    Applied { summary: String },
    /// Marker already present; nothing to do
    AlreadyApplied,
    /// Target not found; rule skipped
    NotFound { reason: String },
}

/// Result of one rule within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for applied/skipped"]
pub struct PatchResult {
    pub rule: String,
    pub outcome: RuleOutcome,
    /// Document length before the rule ran
    pub before_size: usize,
    /// Document length after the rule ran
    pub after_size: usize,
}

impl PatchResult {
    pub fn applied(&self) -> bool {
        matches!(self.outcome, RuleOutcome::Applied { .. })
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RuleOutcome::Applied { summary } => write!(
                f,
                "{}: {} ({} -> {} bytes)",
                self.rule, summary, self.before_size, self.after_size
            ),
            RuleOutcome::AlreadyApplied => write!(f, "{}: already patched", self.rule),
            RuleOutcome::NotFound { reason } => write!(f, "{}: skipped ({})", self.rule, reason),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("rule '{rule}' failed: {source}")]
    Rule {
        rule: String,
        #[source]
        source: RuleError,
    },

    #[error("rule '{rule}' planned an invalid edit: {source}")]
    Edit {
        rule: String,
        #[source]
        source: EditError,
    },
}

impl SessionError {
    pub fn rule(&self) -> &str {
        match self {
            SessionError::Rule { rule, .. } | SessionError::Edit { rule, .. } => rule,
        }
    }
}

/// Final state of a session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub original: Document,
    pub document: Document,
    pub results: Vec<PatchResult>,
}

impl SessionReport {
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|r| r.applied()).count()
    }

    pub fn changed(&self) -> bool {
        self.applied_count() > 0
    }
}

/// Ordered list of rules applied to one document.
#[derive(Default)]
pub struct PatchSession {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl PatchSession {
    pub fn new(rules: Vec<Box<dyn RewriteRule>>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: Box<dyn RewriteRule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Box<dyn RewriteRule>] {
        &self.rules
    }

    /// Marker presence per rule, without planning anything.
    pub fn status(&self, doc: &Document) -> Vec<(String, bool)> {
        self.rules
            .iter()
            .map(|rule| (rule.id().to_string(), rule.is_applied(doc)))
            .collect()
    }

    /// True when every rule's marker is present.
    pub fn all_applied(&self, doc: &Document) -> bool {
        !self.rules.is_empty() && self.rules.iter().all(|rule| rule.is_applied(doc))
    }

    /// Run every rule in order. Each rule sees the snapshot produced by the
    /// rule before it.
    pub fn run(&self, original: Document) -> Result<SessionReport, SessionError> {
        let mut current = original.clone();
        let mut results = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let before_size = current.len();

            if rule.is_applied(&current) {
                log::info!("{}: marker '{}' present, skipping", rule.id(), rule.marker());
                results.push(PatchResult {
                    rule: rule.id().to_string(),
                    outcome: RuleOutcome::AlreadyApplied,
                    before_size,
                    after_size: before_size,
                });
                continue;
            }

            let plan = rule.plan(&current).map_err(|source| SessionError::Rule {
                rule: rule.id().to_string(),
                source,
            })?;

            let outcome = match plan {
                Plan::NotFound { reason } => {
                    log::warn!("{}: {}", rule.id(), reason);
                    RuleOutcome::NotFound { reason }
                }
                Plan::Edits { edits, summary } => {
                    let (next, _) =
                        Edit::apply_batch(&current, &edits).map_err(|source| {
                            SessionError::Edit {
                                rule: rule.id().to_string(),
                                source,
                            }
                        })?;
                    log::info!("{}: {}", rule.id(), summary);
                    current = next;
                    RuleOutcome::Applied { summary }
                }
            };

            results.push(PatchResult {
                rule: rule.id().to_string(),
                outcome,
                before_size,
                after_size: current.len(),
            });
        }

        Ok(SessionReport {
            original,
            document: current,
            results,
        })
    }
}
