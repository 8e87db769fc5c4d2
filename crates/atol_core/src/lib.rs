//! Core domain logic for ATOL.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use import::csv::{parse_import_csv, IntField, ParseError, ParsedRow};
pub use import::diff::{diff_rows, find_absent_tasks, ChangeCounts, ImportChanges, TaskToDelete};
pub use import::export::export_csv;
pub use import::service::{ImportError, ImportPlan, ImportService};
pub use import::validate::{partition_issues, validate_rows, ImportIssue, Severity};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::snapshot::SystemSnapshot;
pub use model::task::{
    derive_base_code, is_valid_base_code, TaskId, TaskRecord, TaskStatus, TaskValidationError,
};
pub use model::taxonomy::{Family, Group, Phylum, Universe};
pub use repo::system_repo::{
    ApplySummary, NewTaskRequest, RepoError, RepoResult, SqliteSystemRepository, SystemRepository,
    TaskListQuery,
};
pub use service::task_service::{TaskService, TaskServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
