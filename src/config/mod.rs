pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{build_session, check_version, VersionGate};
pub use loader::{builtin, load_from_path, load_from_str, ConfigError};
pub use schema::{
    LocatorKind, Metadata, Rewrite, RuleConfig, RuleDefinition, ScanSettings, ValidationError,
    ValidationIssue,
};
pub use version::{matches_requirement, read_package_version, VersionError, FALLBACK_VERSION};
