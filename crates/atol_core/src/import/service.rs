//! Import orchestration: preview, confirmation gating and apply.
//!
//! # Responsibility
//! - Sequence tokenize → validate → snapshot → diff → deletions into
//!   one preview, and gate the apply call on its outcome.
//!
//! # Invariants
//! - Tokenizer and header errors abort before validation; business
//!   rule errors never abort the preview.
//! - Apply is refused while the plan carries blocking errors, and
//!   while deletions are pending without explicit confirmation.
//! - A failed apply leaves the plan untouched so the caller can retry
//!   without re-reading the file.

use crate::import::csv::{parse_import_csv, ParseError, ParsedRow};
use crate::import::diff::{diff_rows, find_absent_tasks, ImportChanges, TaskToDelete};
use crate::import::validate::{partition_issues, validate_rows, ImportIssue};
use crate::repo::system_repo::{ApplySummary, RepoError, SystemRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure surfaced by the import pipeline.
#[derive(Debug)]
pub enum ImportError {
    /// Structural CSV failure; nothing else was evaluated.
    Parse(ParseError),
    /// The plan carries blocking validation errors.
    BlockedByErrors { count: usize },
    /// Deletions are implied but not confirmed.
    DeletionsNotConfirmed { count: usize },
    /// The storage layer rejected the snapshot read or the apply.
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::BlockedByErrors { count } => {
                write!(f, "import blocked by {count} validation error(s)")
            }
            Self::DeletionsNotConfirmed { count } => write!(
                f,
                "import would delete {count} task(s); deletion must be confirmed explicitly"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::BlockedByErrors { .. } | Self::DeletionsNotConfirmed { .. } => None,
        }
    }
}

impl From<ParseError> for ImportError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Fully evaluated import preview, ready for display and apply.
#[derive(Debug)]
pub struct ImportPlan {
    pub rows: Vec<ParsedRow>,
    /// Blocking issues; apply is refused while any exist.
    pub errors: Vec<ImportIssue>,
    /// Informational issues; never block apply.
    pub warnings: Vec<ImportIssue>,
    pub changes: ImportChanges,
    pub deletions: Vec<TaskToDelete>,
}

impl ImportPlan {
    /// Returns whether apply is currently permitted (modulo deletion
    /// confirmation).
    pub fn is_applicable(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Use-case service sequencing the import pipeline over an injected
/// repository.
pub struct ImportService<R: SystemRepository> {
    repo: R,
}

impl<R: SystemRepository> ImportService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Parses and evaluates `text` into a full preview.
    ///
    /// # Errors
    /// - [`ImportError::Parse`] on structural CSV failures.
    /// - [`ImportError::Repo`] when the snapshot read fails.
    pub fn preview(&self, text: &str) -> Result<ImportPlan, ImportError> {
        let rows = parse_import_csv(text)?;
        let (errors, warnings) = partition_issues(validate_rows(&rows));

        let snapshot = self.repo.snapshot()?;
        let changes = diff_rows(&rows, &snapshot);
        let deletions = find_absent_tasks(&rows, &snapshot);

        info!(
            "event=import_preview module=import status=ok rows={} errors={} warnings={} creates={} updates={} deletions={}",
            rows.len(),
            errors.len(),
            warnings.len(),
            changes.total_creates(),
            changes.total_updates(),
            deletions.len()
        );

        Ok(ImportPlan {
            rows,
            errors,
            warnings,
            changes,
            deletions,
        })
    }

    /// Applies a previewed plan through the repository.
    ///
    /// `confirm_deletions` is the explicit user confirmation; it is
    /// forwarded to the repository as the honor-deletions flag.
    ///
    /// # Errors
    /// - [`ImportError::BlockedByErrors`] while the plan has errors.
    /// - [`ImportError::DeletionsNotConfirmed`] when deletions are
    ///   pending and `confirm_deletions` is false.
    /// - [`ImportError::Repo`] when the bulk apply fails; the plan
    ///   stays valid for retry.
    pub fn apply(
        &self,
        plan: &ImportPlan,
        confirm_deletions: bool,
    ) -> Result<ApplySummary, ImportError> {
        if !plan.errors.is_empty() {
            warn!(
                "event=import_apply module=import status=blocked errors={}",
                plan.errors.len()
            );
            return Err(ImportError::BlockedByErrors {
                count: plan.errors.len(),
            });
        }
        if !plan.deletions.is_empty() && !confirm_deletions {
            warn!(
                "event=import_apply module=import status=unconfirmed deletions={}",
                plan.deletions.len()
            );
            return Err(ImportError::DeletionsNotConfirmed {
                count: plan.deletions.len(),
            });
        }

        let summary = self.repo.bulk_apply(&plan.rows, confirm_deletions)?;
        info!(
            "event=import_apply module=import status=ok created={} updated={} deleted={}",
            summary.created, summary.updated, summary.deleted_tasks
        );

        Ok(summary)
    }
}
