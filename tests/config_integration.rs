//! Integration tests for rule set loading and session building

use bundle_patcher::config::{
    build_session, check_version, load_from_path, load_from_str, ConfigError, LocatorKind,
    Rewrite, ValidationIssue, VersionGate,
};
use bundle_patcher::{Document, GuardOptions, LiteralPolicy, PersistenceGuard, RunOutcome};
use std::fs;
use tempfile::TempDir;

const RULES: &str = r#"
[meta]
name = "custom"
description = "Two hoists and a strict memoize"
version_range = ">=1.0.0, <2.0.0"

[scan]
window = 512
literals = "reject"
validate_syntax = true

[[rules]]
id = "cache-lookup"
[rules.rewrite]
type = "memoize"
anchor = ["lookupTable", "resolve"]
cache = "_LKC"

[[rules]]
id = "shared-empty-items"
[rules.rewrite]
type = "hoist"
field = "items"
value = "[]"
constant = "_EI"

[[rules]]
id = "shared-empty-props"
[rules.rewrite]
type = "hoist"
field = "props"
value = "{}"
constant = "_EP"
"#;

#[test]
fn test_load_full_rule_set() {
    let config = load_from_str(RULES).unwrap();

    assert_eq!(config.meta.name, "custom");
    assert_eq!(config.meta.version_range.as_deref(), Some(">=1.0.0, <2.0.0"));
    assert_eq!(config.scan.window, 512);
    assert_eq!(config.scan.literals, LiteralPolicy::Reject);
    assert!(config.scan.validate_syntax);
    assert_eq!(config.rules.len(), 3);

    let Rewrite::Memoize { locator, .. } = &config.rules[0].rewrite else {
        panic!("expected memoize rule");
    };
    assert_eq!(*locator, LocatorKind::BackwardScan);
}

#[test]
fn test_session_from_custom_rules() {
    let config = load_from_str(RULES).unwrap();
    let session = build_session(&config);

    let doc = Document::from(
        r#"function look(k){return lookupTable[k].resolve({items:[]})}var a={props:{}},b={props:{},items:[]};"#,
    );
    let report = session.run(doc).unwrap();

    assert_eq!(report.applied_count(), 3);
    let text = report.document.as_str();
    assert!(text.starts_with("var _EP={};var _EI=[];var _LKC=_LKC||{k:\"\",v:null};function look(k){"));
    assert!(text.contains("{items:_EI}"));
    assert!(text.ends_with("var a={props:_EP},b={props:_EP,items:_EI};"));
}

#[test]
fn test_reject_policy_is_applied() {
    let config = load_from_str(RULES).unwrap();
    let session = build_session(&config);

    // A closing brace inside a string would end the body early when counted.
    let doc = Document::from(r#"function look(k){var s="}";return lookupTable[k].resolve(s)}"#);
    let err = session.run(doc).unwrap_err();
    assert_eq!(err.rule(), "cache-lookup");
}

#[test]
fn test_version_gate_from_package_json() {
    let dir = TempDir::new().unwrap();
    let pkg = dir.path().join("lib");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(dir.path().join("package.json"), r#"{"name":"tool","version":"1.2.3"}"#).unwrap();

    let config = load_from_str(RULES).unwrap();
    let gate = check_version(&config, &pkg.join("cli.js")).unwrap();
    assert_eq!(
        gate,
        VersionGate::Matched {
            version: "1.2.3".to_string()
        }
    );

    fs::write(dir.path().join("package.json"), r#"{"version":"2.0.0"}"#).unwrap();
    assert!(!check_version(&config, &pkg.join("cli.js")).unwrap().allows());
}

#[test]
fn test_invalid_version_range_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), r#"{"version":"1.0.0"}"#).unwrap();

    let config = load_from_str(&RULES.replace(">=1.0.0, <2.0.0", ">=banana")).unwrap();
    assert!(check_version(&config, &dir.path().join("cli.js")).is_err());
}

#[test]
fn test_validation_collects_issues() {
    let err = load_from_str(
        r#"
[[rules]]
id = ""
[rules.rewrite]
type = "hoist"
field = ""
value = "[]"
constant = "1bad"

[[rules]]
id = "m"
[rules.rewrite]
type = "memoize"
anchor = ["a", ""]
cache = "_C"
signature = "function ("
"#,
    )
    .unwrap_err();

    let ConfigError::Validation { source, .. } = err else {
        panic!("expected validation error");
    };
    assert_eq!(
        source.issues[0],
        ValidationIssue::MissingField {
            rule_id: None,
            field: "id"
        }
    );
    assert_eq!(source.issues.len(), 5);
    let rendered = source.to_string();
    assert!(rendered.contains("'1bad' is not an identifier"));
    assert!(rendered.contains("signature does not compile"));
}

#[test]
fn test_rules_file_drives_guarded_run() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.toml");
    fs::write(
        &rules,
        r#"
[[rules]]
id = "shared-empty-items"
[rules.rewrite]
type = "hoist"
field = "items"
value = "[]"
constant = "_EI"
"#,
    )
    .unwrap();
    let target = dir.path().join("bundle.js");
    fs::write(&target, "f({items:[]});g({items:[]});").unwrap();

    let config = load_from_path(&rules).unwrap();
    let outcome = PersistenceGuard::new(&target)
        .run(&build_session(&config), &GuardOptions::default())
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Committed { .. }));
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "var _EI=[];f({items:_EI});g({items:_EI});"
    );
}
