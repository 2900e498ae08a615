//! Version gating for rule sets.
//!
//! A rule set may carry a semver requirement such as ">=1.0.0, <2.0.0".
//! The installed version comes from the nearest `package.json` above the
//! target bundle.

use semver::{Version, VersionReq};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Version assumed when no `package.json` can be read.
pub const FALLBACK_VERSION: &str = "0.0.0";

#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check if a version matches a requirement string
///
/// # Examples
///
/// ```
/// use bundle_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("1.0.24", Some(">=1.0.0, <2.0.0")).unwrap());
/// assert!(!matches_requirement("0.9.0", Some(">=1.0.0")).unwrap());
///
/// // None requirement means "apply to all versions"
/// assert!(matches_requirement("1.0.0", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    let version = Version::parse(version).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

#[derive(Deserialize)]
struct PackageManifest {
    version: Option<String>,
}

/// Nearest `package.json` in the target's directory or any ancestor.
pub fn find_package_manifest(target: &Path) -> Option<PathBuf> {
    target
        .parent()?
        .ancestors()
        .map(|dir| dir.join("package.json"))
        .find(|candidate| candidate.is_file())
}

/// Version field of the nearest `package.json`, if one can be read.
pub fn read_package_version(target: &Path) -> Option<String> {
    let manifest = find_package_manifest(target)?;
    let contents = fs::read_to_string(&manifest).ok()?;
    match serde_json::from_str::<PackageManifest>(&contents) {
        Ok(package) => package.version,
        Err(e) => {
            log::debug!("{}: {}", manifest.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_requirement_matches_everything() {
        assert!(matches_requirement("1.0.0", None).unwrap());
        assert!(matches_requirement("0.0.0", Some("")).unwrap());
        assert!(matches_requirement("2.3.4", Some("   ")).unwrap());
    }

    #[test]
    fn range_requirement() {
        let req = ">=1.0.0, <1.1.0";
        assert!(matches_requirement("1.0.0", Some(req)).unwrap());
        assert!(matches_requirement("1.0.99", Some(req)).unwrap());
        assert!(!matches_requirement("1.1.0", Some(req)).unwrap());
        assert!(!matches_requirement("0.2.125", Some(req)).unwrap());
    }

    #[test]
    fn caret_requirement() {
        assert!(matches_requirement("1.4.2", Some("^1.0")).unwrap());
        assert!(!matches_requirement("2.0.0", Some("^1.0")).unwrap());
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            matches_requirement("not-a-version", Some(">=1.0.0")),
            Err(VersionError::InvalidVersion { .. })
        ));
        assert!(matches!(
            matches_requirement("1.0.0", Some(">=bad-version")),
            Err(VersionError::InvalidRequirement { .. })
        ));
    }

    #[test]
    fn fallback_version_fails_lower_bounds() {
        assert!(!matches_requirement(FALLBACK_VERSION, Some(">=1.0.0")).unwrap());
    }

    #[test]
    fn reads_nearest_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/tool");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version":"9.9.9"}"#).unwrap();
        fs::write(pkg.join("package.json"), r#"{"name":"tool","version":"1.0.24"}"#).unwrap();

        let target = pkg.join("cli.js");
        assert_eq!(read_package_version(&target).as_deref(), Some("1.0.24"));
    }

    #[test]
    fn walks_up_to_ancestor_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("dist/bin");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version":"2.0.1"}"#).unwrap();

        assert_eq!(
            read_package_version(&nested.join("cli.js")).as_deref(),
            Some("2.0.1")
        );
    }

    #[test]
    fn unreadable_manifest_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{not json").unwrap();
        assert_eq!(read_package_version(&dir.path().join("cli.js")), None);

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"x"}"#).unwrap();
        assert_eq!(read_package_version(&dir.path().join("cli.js")), None);
    }
}
