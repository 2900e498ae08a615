//! Bundle Patcher: idempotent rewrites of minified JavaScript bundles
//!
//! Patches a single large bundle (typically a CLI's `cli.js`) in place by
//! wrapping hot functions in a single-entry cache and hoisting repeated
//! literals into shared constants.
//!
//! # Architecture
//!
//! All rewrites compile down to a single primitive: [`Edit`], a verified
//! byte-span replacement over an immutable [`Document`] snapshot. Rules
//! ([`rewrite`]) only locate and plan; a [`PatchSession`] applies them in
//! order, and a [`PersistenceGuard`] owns the backup and the write.
//!
//! Locating relies on text, not a parse: an [`AnchorPattern`] finds a
//! distinctive token sequence, a [`BackwardScan`] picks the nearest
//! function header before it, and the brace matcher resolves the body.
//! [`SyntaxTreeLocator`] is a grammar-aware alternative behind the same
//! [`FunctionLocator`] trait.
//!
//! # Safety
//!
//! - All edits verify expected before-text before applying
//! - The backup is durable before the target is replaced
//! - Atomic file writes (tempfile + fsync + rename)
//! - Idempotent: each rule leaves a marker and is skipped when it is present
//!
//! # Example
//!
//! ```no_run
//! use bundle_patcher::{config, GuardOptions, PersistenceGuard};
//!
//! let rules = config::builtin()?;
//! let session = config::build_session(&rules);
//! let guard = PersistenceGuard::new("node_modules/tool/cli.js");
//!
//! let outcome = guard.run(&session, &GuardOptions::default())?;
//! if let Some(report) = outcome.report() {
//!     for result in &report.results {
//!         println!("{result}");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod edit;
pub mod persist;
pub mod rewrite;
pub mod scan;
pub mod session;
pub mod sg;
pub mod validate;

// Re-exports
pub use config::{
    build_session, builtin, check_version, load_from_path, load_from_str, matches_requirement,
    ConfigError, RuleConfig, VersionError, VersionGate,
};
pub use document::Document;
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use persist::{backup_path, GuardOptions, PersistError, PersistenceGuard, RunOutcome};
pub use rewrite::{HoistRule, MemoizeRule, Plan, RewriteRule, RuleError, SharedConstant};
pub use scan::{
    match_brace, AnchorPattern, BackwardScan, BraceMatcher, FunctionLocator, FunctionSite,
    LiteralPolicy, Located, ScanError,
};
pub use session::{PatchResult, PatchSession, RuleOutcome, SessionError, SessionReport};
pub use sg::SyntaxTreeLocator;
pub use validate::{validate_edit, ValidationError};
