//! Persistence guard: backup, run, commit.
//!
//! - Nothing is touched when every rule is already applied, so a good
//!   backup is never replaced by a patched copy.
//! - The backup is fsynced before the session runs.
//! - The target is rewritten only when at least one rule applied, via
//!   tempfile + fsync + rename, keeping the original permissions.
//! - A symlinked target is resolved first: the file it points to is
//!   rewritten and backed up next to itself, and the link is left intact.
//!
//! Concurrent runs against the same target are not coordinated.

use crate::document::Document;
use crate::session::{PatchSession, SessionError, SessionReport};
use crate::validate::{validate_edit, ValidationError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("{0} not found")]
    InputNotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Default)]
pub struct GuardOptions {
    /// Run the session and report, but never back up or write.
    pub dry_run: bool,
    /// Refuse to commit a document with new parse errors.
    pub validate_syntax: bool,
}

/// How a guarded run ended.
#[derive(Debug, Clone)]
#[must_use = "RunOutcome reports whether the target was written"]
pub enum RunOutcome {
    /// Every marker present; backup and target untouched
    AlreadyPatched,
    /// Backup refreshed, no rule applied, target untouched
    NothingApplied {
        backup: PathBuf,
        report: SessionReport,
    },
    /// Session ran without side effects
    DryRun { report: SessionReport },
    /// Target rewritten
    Committed {
        backup: PathBuf,
        report: SessionReport,
    },
}

impl RunOutcome {
    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            RunOutcome::AlreadyPatched => None,
            RunOutcome::NothingApplied { report, .. }
            | RunOutcome::DryRun { report }
            | RunOutcome::Committed { report, .. } => Some(report),
        }
    }
}

/// `<stem>.js.bak` next to the target.
pub fn backup_path(target: &Path) -> PathBuf {
    target.with_extension("js.bak")
}

pub struct PersistenceGuard {
    target: PathBuf,
}

impl PersistenceGuard {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Path as given by the caller, possibly a symlink.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The regular file behind the target, with every symlink resolved.
    pub fn resolve(&self) -> Result<PathBuf, PersistError> {
        if !self.target.is_file() {
            return Err(PersistError::InputNotFound(self.target.clone()));
        }
        fs::canonicalize(&self.target).map_err(|source| PersistError::Io {
            path: self.target.clone(),
            source,
        })
    }

    /// Backup location for the resolved target.
    pub fn backup(&self) -> PathBuf {
        match fs::canonicalize(&self.target) {
            Ok(resolved) => backup_path(&resolved),
            Err(_) => backup_path(&self.target),
        }
    }

    pub fn load(&self) -> Result<Document, PersistError> {
        let resolved = self.resolve()?;
        read_document(&resolved)
    }

    pub fn run(
        &self,
        session: &PatchSession,
        options: &GuardOptions,
    ) -> Result<RunOutcome, PersistError> {
        let target = self.resolve()?;
        if target != self.target {
            log::debug!("{} resolves to {}", self.target.display(), target.display());
        }
        let backup = backup_path(&target);
        let original = read_document(&target)?;

        if session.all_applied(&original) {
            log::info!("{}: every marker present", target.display());
            return Ok(RunOutcome::AlreadyPatched);
        }

        if !options.dry_run {
            atomic_write(&backup, original.as_str().as_bytes(), &target)?;
            log::info!("backup written to {}", backup.display());
        }

        let report = session.run(original)?;

        if !report.changed() {
            if options.dry_run {
                return Ok(RunOutcome::DryRun { report });
            }
            return Ok(RunOutcome::NothingApplied { backup, report });
        }

        if options.validate_syntax {
            validate_edit(&report.original, &report.document)?;
        }

        if options.dry_run {
            return Ok(RunOutcome::DryRun { report });
        }

        atomic_write(&target, report.document.as_str().as_bytes(), &target)?;
        log::info!(
            "{} rewritten ({} -> {} bytes)",
            target.display(),
            report.original.len(),
            report.document.len()
        );

        Ok(RunOutcome::Committed { backup, report })
    }
}

fn read_document(path: &Path) -> Result<Document, PersistError> {
    fs::read_to_string(path)
        .map(Document::new)
        .map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The new file takes the permissions of `permissions_from`; tempfiles are
/// created private, which would drop the executable bit of a CLI entry point.
fn atomic_write(path: &Path, content: &[u8], permissions_from: &Path) -> Result<(), PersistError> {
    let io_err = |source: std::io::Error| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;

    if let Ok(meta) = fs::metadata(permissions_from) {
        temp.as_file()
            .set_permissions(meta.permissions())
            .map_err(io_err)?;
    }

    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
