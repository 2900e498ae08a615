use crate::rewrite::is_identifier;
use crate::scan::{LiteralPolicy, DEFAULT_WINDOW};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        if self.scan.window == 0 {
            issues.push(ValidationIssue::InvalidValue {
                rule_id: None,
                message: "scan.window must be greater than zero".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let rule_id = || Some(rule.id.clone());

            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }

            match &rule.rewrite {
                Rewrite::Memoize {
                    anchor,
                    cache,
                    signature,
                    ..
                } => {
                    if anchor.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id(),
                            field: "rewrite.anchor",
                        });
                    } else if anchor.iter().any(|token| token.is_empty()) {
                        issues.push(ValidationIssue::InvalidValue {
                            rule_id: rule_id(),
                            message: "anchor tokens must be non-empty".to_string(),
                        });
                    }
                    if !is_identifier(cache) {
                        issues.push(ValidationIssue::InvalidValue {
                            rule_id: rule_id(),
                            message: format!("cache name '{cache}' is not an identifier"),
                        });
                    }
                    if let Some(signature) = signature {
                        if let Err(message) = check_signature(signature) {
                            issues.push(ValidationIssue::InvalidValue {
                                rule_id: rule_id(),
                                message,
                            });
                        }
                    }
                }
                Rewrite::Hoist {
                    field,
                    value,
                    constant,
                } => {
                    if field.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id(),
                            field: "rewrite.field",
                        });
                    }
                    if value.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule_id: rule_id(),
                            field: "rewrite.value",
                        });
                    }
                    if !is_identifier(constant) {
                        issues.push(ValidationIssue::InvalidValue {
                            rule_id: rule_id(),
                            message: format!("constant name '{constant}' is not an identifier"),
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn check_signature(signature: &str) -> Result<(), String> {
    let re = regex::Regex::new(signature)
        .map_err(|e| format!("signature does not compile: {e}"))?;
    for group in ["name", "params"] {
        if !re.capture_names().flatten().any(|name| name == group) {
            return Err(format!("signature has no '{group}' capture group"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version_range: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanSettings {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default)]
    pub literals: LiteralPolicy,
    #[serde(default)]
    pub validate_syntax: bool,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            literals: LiteralPolicy::default(),
            validate_syntax: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    pub rewrite: Rewrite,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Rewrite {
    /// Wrap the function owning `anchor` in a single-entry cache
    Memoize {
        anchor: Vec<String>,
        cache: String,
        #[serde(default)]
        signature: Option<String>,
        #[serde(default)]
        locator: LocatorKind,
    },
    /// Share one constant for every `field:value`
    Hoist {
        field: String,
        value: String,
        constant: String,
    },
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorKind {
    #[default]
    BackwardScan,
    SyntaxTree,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidValue {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidValue { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}
