//! Turns a validated rule set into a runnable session for one target.
//!
//! - Checks the rule set's version range against the installed package
//! - Builds each rule with the locator and scan settings it asks for

use crate::config::schema::{LocatorKind, Rewrite, RuleConfig, RuleDefinition, ScanSettings};
use crate::config::version::{
    matches_requirement, read_package_version, VersionError, FALLBACK_VERSION,
};
use crate::rewrite::{HoistRule, MemoizeRule, RewriteRule, SharedConstant};
use crate::scan::{
    AnchorPattern, BackwardScan, BraceMatcher, FunctionLocator, DEFAULT_SIGNATURE,
};
use crate::session::PatchSession;
use crate::sg::SyntaxTreeLocator;
use std::fmt;
use std::fs;
use std::path::Path;

/// Result of matching a rule set against the installed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionGate {
    /// No `version_range` in the rule set
    Unconstrained,
    Matched { version: String },
    /// Every rule is skipped
    Mismatch { version: String, requirement: String },
}

impl VersionGate {
    pub fn allows(&self) -> bool {
        !matches!(self, VersionGate::Mismatch { .. })
    }
}

impl fmt::Display for VersionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionGate::Unconstrained => write!(f, "no version constraint"),
            VersionGate::Matched { version } => write!(f, "version {version} in range"),
            VersionGate::Mismatch {
                version,
                requirement,
            } => write!(f, "version {version} does not match {requirement}"),
        }
    }
}

/// Match `config.meta.version_range` against the package owning `target`.
///
/// An unreadable or non-semver version is treated as [`FALLBACK_VERSION`];
/// only a malformed requirement is an error.
pub fn check_version(config: &RuleConfig, target: &Path) -> Result<VersionGate, VersionError> {
    let Some(requirement) = config
        .meta
        .version_range
        .as_deref()
        .filter(|r| !r.trim().is_empty())
    else {
        return Ok(VersionGate::Unconstrained);
    };

    // The manifest belongs to the package a symlinked entry point resolves into.
    let resolved = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
    let version = match read_package_version(&resolved) {
        Some(version) if semver::Version::parse(&version).is_ok() => version,
        Some(version) => {
            log::warn!(
                "package version '{}' for {} is not semver, using {}",
                version,
                target.display(),
                FALLBACK_VERSION
            );
            FALLBACK_VERSION.to_string()
        }
        None => {
            log::warn!(
                "could not read package version for {}, using {}",
                target.display(),
                FALLBACK_VERSION
            );
            FALLBACK_VERSION.to_string()
        }
    };

    if matches_requirement(&version, Some(requirement))? {
        Ok(VersionGate::Matched { version })
    } else {
        Ok(VersionGate::Mismatch {
            version,
            requirement: requirement.to_string(),
        })
    }
}

/// Build the session for a validated rule set, preserving rule order.
pub fn build_session(config: &RuleConfig) -> PatchSession {
    PatchSession::new(
        config
            .rules
            .iter()
            .map(|rule| build_rule(rule, &config.scan))
            .collect(),
    )
}

fn build_rule(rule: &RuleDefinition, scan: &ScanSettings) -> Box<dyn RewriteRule> {
    match &rule.rewrite {
        Rewrite::Memoize {
            anchor,
            cache,
            signature,
            locator,
        } => {
            let locator: Box<dyn FunctionLocator> = match locator {
                LocatorKind::BackwardScan => Box::new(BackwardScan::new(
                    scan.window,
                    signature.as_deref().unwrap_or(DEFAULT_SIGNATURE),
                    BraceMatcher::new(scan.literals),
                )),
                LocatorKind::SyntaxTree => Box::new(SyntaxTreeLocator),
            };
            Box::new(MemoizeRule::new(
                rule.id.clone(),
                AnchorPattern::new(anchor.iter().cloned()),
                cache.clone(),
                locator,
            ))
        }
        Rewrite::Hoist {
            field,
            value,
            constant,
        } => Box::new(HoistRule::new(
            rule.id.clone(),
            SharedConstant {
                field: field.clone(),
                value: value.clone(),
                constant: constant.clone(),
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::{builtin, load_from_str};
    use crate::document::Document;

    #[test]
    fn builtin_session_has_rules_in_order() {
        let session = build_session(&builtin().unwrap());
        let ids: Vec<&str> = session.rules().iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["slash-command-cache", "shared-empty-suggestions"]);
        let markers: Vec<&str> = session.rules().iter().map(|r| r.marker()).collect();
        assert_eq!(markers, ["_NU0C", "_$ES"]);
    }

    #[test]
    fn syntax_tree_locator_is_selectable() {
        let config = load_from_str(
            r#"
[[rules]]
id = "m"
[rules.rewrite]
type = "memoize"
anchor = ["needle"]
cache = "_M"
locator = "syntax-tree"
"#,
        )
        .unwrap();

        let doc = Document::from(r#"const f=function(){};function g(a){return "needle"+a}"#);
        let report = build_session(&config).run(doc).unwrap();
        assert_eq!(report.applied_count(), 1);
        assert!(report.document.contains("var _M=_M||{k:\"\",v:null};function g(a){"));
    }

    #[test]
    fn custom_signature_is_used() {
        let config = load_from_str(
            r#"
[[rules]]
id = "m"
[rules.rewrite]
type = "memoize"
anchor = ["needle"]
cache = "_M"
signature = 'function (?P<name>[a-z]+) \((?P<params>[a-z,]*)\) \{'
"#,
        )
        .unwrap();

        let doc = Document::from(r#"function spaced (a) {return "needle"}"#);
        let report = build_session(&config).run(doc).unwrap();
        assert_eq!(report.applied_count(), 1);
        assert!(report.document.contains("function spaced(a){_M||(_M={k:\"\",v:null});var _M_k=a;"));
    }

    #[test]
    fn version_gate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version":"1.0.24"}"#).unwrap();
        let target = dir.path().join("cli.js");

        let mut config = builtin().unwrap();
        assert_eq!(check_version(&config, &target).unwrap(), VersionGate::Unconstrained);

        config.meta.version_range = Some(">=1.0.0, <2.0.0".to_string());
        assert!(check_version(&config, &target).unwrap().allows());

        config.meta.version_range = Some(">=2.0.0".to_string());
        let gate = check_version(&config, &target).unwrap();
        assert!(!gate.allows());
        assert_eq!(gate.to_string(), "version 1.0.24 does not match >=2.0.0");
    }

    #[test]
    fn missing_manifest_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = builtin().unwrap();
        config.meta.version_range = Some(">=1.0.0".to_string());

        let gate = check_version(&config, &dir.path().join("cli.js")).unwrap();
        assert_eq!(
            gate,
            VersionGate::Mismatch {
                version: FALLBACK_VERSION.to_string(),
                requirement: ">=1.0.0".to_string(),
            }
        );
    }

    #[test]
    fn non_semver_package_version_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version":"latest"}"#).unwrap();
        let target = dir.path().join("cli.js");

        let mut config = builtin().unwrap();
        config.meta.version_range = Some(">=1.0.0".to_string());
        let gate = check_version(&config, &target).unwrap();
        assert_eq!(
            gate,
            VersionGate::Mismatch {
                version: FALLBACK_VERSION.to_string(),
                requirement: ">=1.0.0".to_string(),
            }
        );

        config.meta.version_range = Some(">=0.0.0".to_string());
        assert!(check_version(&config, &target).unwrap().allows());

        config.meta.version_range = Some(">=banana".to_string());
        assert!(matches!(
            check_version(&config, &target),
            Err(VersionError::InvalidRequirement { .. })
        ));
    }
}
