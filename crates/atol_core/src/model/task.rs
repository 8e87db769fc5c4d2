//! Task record, status codes and base-code derivation.
//!
//! # Responsibility
//! - Define the task read-model record and its lifecycle states.
//! - Derive and check the canonical `base_code` form.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `base_code` always matches `^[A-Z]{2,3}-\d{2}\.\d{2}$` and is the
//!   uppercase concatenation of the task's taxonomy position.
//! - Status round-trips losslessly through its one-letter wire code.

use crate::model::taxonomy::is_code_number;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Lowest allowed task priority.
pub const PRIORITY_MIN: i64 = 1;
/// Highest allowed task priority.
pub const PRIORITY_MAX: i64 = 5;

static BASE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}-\d{2}\.\d{2}$").expect("valid base code regex"));

/// Task lifecycle state.
///
/// Persisted and exchanged as a one-letter code: `R`, `P`, `D`, `F`,
/// `C`, `X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started, available to pick up.
    Ready,
    /// Actively being worked.
    InProgress,
    /// Finished.
    Done,
    /// Finished and filed away from the active boards.
    Filed,
    /// Abandoned deliberately.
    Cancelled,
    /// Removed without completion.
    Dropped,
}

impl TaskStatus {
    /// All states in display order.
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Ready,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Filed,
        TaskStatus::Cancelled,
        TaskStatus::Dropped,
    ];

    /// Returns the one-letter wire/storage code.
    pub fn code(self) -> char {
        match self {
            TaskStatus::Ready => 'R',
            TaskStatus::InProgress => 'P',
            TaskStatus::Done => 'D',
            TaskStatus::Filed => 'F',
            TaskStatus::Cancelled => 'C',
            TaskStatus::Dropped => 'X',
        }
    }

    /// Parses a one-letter code, rejecting anything outside the fixed set.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "R" => Some(TaskStatus::Ready),
            "P" => Some(TaskStatus::InProgress),
            "D" => Some(TaskStatus::Done),
            "F" => Some(TaskStatus::Filed),
            "C" => Some(TaskStatus::Cancelled),
            "X" => Some(TaskStatus::Dropped),
            _ => None,
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Canonical task read-model record.
///
/// Parent names are denormalized for display surfaces; the taxonomy
/// tables remain the source of truth for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub universe_code: String,
    pub universe_name: String,
    pub phylum_code: String,
    pub phylum_name: String,
    pub family_code: Option<String>,
    pub family_name: Option<String>,
    pub group_num: i64,
    pub group_name: String,
    pub task_num: i64,
    pub base_code: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub display_order: i64,
}

/// Field-level validation failure for task writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    PriorityOutOfRange(i64),
    CodeNumberOutOfRange(i64),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::PriorityOutOfRange(value) => write!(
                f,
                "task priority {value} is outside {PRIORITY_MIN}..={PRIORITY_MAX}"
            ),
            Self::CodeNumberOutOfRange(value) => {
                write!(f, "code number {value} is outside 1..=99")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Checks the constraints shared by every task write path.
///
/// `group_num` is the caller-chosen target group; task numbers are
/// allocated by the repository and never validated here.
pub fn validate_task_fields(
    title: &str,
    priority: i64,
    group_num: i64,
) -> Result<(), TaskValidationError> {
    if title.trim().is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        return Err(TaskValidationError::PriorityOutOfRange(priority));
    }
    if !is_code_number(group_num) {
        return Err(TaskValidationError::CodeNumberOutOfRange(group_num));
    }
    Ok(())
}

/// Derives the canonical base code for a taxonomy position.
///
/// Format: `{universe}{phylum}{family?}-{group:02}.{task:02}`, uppercased.
/// The family segment is omitted for phylum-level groups, which is why
/// the letter prefix is two or three characters wide.
pub fn derive_base_code(
    universe_code: &str,
    phylum_code: &str,
    family_code: Option<&str>,
    group_num: i64,
    task_num: i64,
) -> String {
    format!(
        "{}{}{}-{:02}.{:02}",
        universe_code,
        phylum_code,
        family_code.unwrap_or(""),
        group_num,
        task_num
    )
    .to_uppercase()
}

/// Returns whether `code` matches the canonical base-code format.
pub fn is_valid_base_code(code: &str) -> bool {
    BASE_CODE_RE.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::{derive_base_code, is_valid_base_code, validate_task_fields, TaskStatus};

    #[test]
    fn derive_base_code_with_and_without_family() {
        assert_eq!(derive_base_code("W", "R", Some("K"), 1, 1), "WRK-01.01");
        assert_eq!(derive_base_code("w", "r", None, 7, 23), "WR-07.23");
    }

    #[test]
    fn base_code_format_check() {
        assert!(is_valid_base_code("WRK-01.01"));
        assert!(is_valid_base_code("WR-99.99"));
        assert!(!is_valid_base_code("wrk-1.1"));
        assert!(!is_valid_base_code("WRK01.01"));
        assert!(!is_valid_base_code("WRKX-01.01"));
    }

    #[test]
    fn status_codes_round_trip() {
        for status in TaskStatus::ALL {
            let code = status.code().to_string();
            assert_eq!(TaskStatus::from_code(&code), Some(status));
        }
        assert_eq!(TaskStatus::from_code("Q"), None);
        assert_eq!(TaskStatus::from_code("r"), None);
    }

    #[test]
    fn task_field_validation_bounds() {
        assert!(validate_task_fields("write summary", 3, 1).is_ok());
        assert!(validate_task_fields("  ", 3, 1).is_err());
        assert!(validate_task_fields("x", 0, 1).is_err());
        assert!(validate_task_fields("x", 6, 1).is_err());
        assert!(validate_task_fields("x", 3, 100).is_err());
    }
}
