//! Business rule validation over parsed import rows.
//!
//! # Responsibility
//! - Enforce per-kind field constraints and cross-kind references.
//! - Collect every violation; callers decide what blocks apply.
//!
//! # Invariants
//! - Validation is a pure function of the row slice; input is never
//!   mutated and no storage is touched.
//! - Passes run in fixed order (universes, phyla, families, groups,
//!   tasks); each pass only references identifier sets accumulated by
//!   earlier passes, so row order within the file never matters.

use crate::import::csv::{IntField, ParsedRow};
use crate::model::task::{
    derive_base_code, is_valid_base_code, TaskStatus, PRIORITY_MAX, PRIORITY_MIN,
};
use crate::model::taxonomy::{is_code_number, is_level_code, CODE_NUMBER_MAX, CODE_NUMBER_MIN};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Whether an issue blocks the apply action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks apply until the import file is fixed.
    Error,
    /// Informational only; never blocks apply.
    Warning,
}

/// One detected rule violation, tagged with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportIssue {
    pub severity: Severity,
    pub message: String,
    /// 1-based file line of the offending row, when row-scoped.
    pub line: Option<usize>,
    /// Column the violation is about, when field-scoped.
    pub field: Option<&'static str>,
}

impl ImportIssue {
    fn error(line: usize, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            line: Some(line),
            field: Some(field),
        }
    }

    fn warning(line: usize, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            line: Some(line),
            field: Some(field),
        }
    }
}

impl Display for ImportIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Validates all rows and returns every detected issue.
///
/// Never short-circuits: the full issue list is produced in one pass
/// so the preview can show all problems at once.
pub fn validate_rows(rows: &[ParsedRow]) -> Vec<ImportIssue> {
    let mut issues = Vec::new();

    let universe_codes = validate_universes(rows, &mut issues);
    let phylum_keys = validate_phyla(rows, &universe_codes, &mut issues);
    validate_families(rows, &phylum_keys, &mut issues);
    validate_groups(rows, &mut issues);
    validate_tasks(rows, &mut issues);

    for row in rows {
        check_display_order(row, &mut issues);
    }

    issues
}

/// Splits issues into blocking errors and informational warnings.
pub fn partition_issues(issues: Vec<ImportIssue>) -> (Vec<ImportIssue>, Vec<ImportIssue>) {
    issues
        .into_iter()
        .partition(|issue| issue.severity == Severity::Error)
}

fn validate_universes(rows: &[ParsedRow], issues: &mut Vec<ImportIssue>) -> HashSet<String> {
    let mut codes = HashSet::new();

    for row in rows {
        let ParsedRow::Universe(universe) = row else {
            continue;
        };

        if !is_level_code(&universe.code) {
            issues.push(ImportIssue::error(
                universe.line,
                "universe_code",
                "Universe code must be single character",
            ));
        }
        if !codes.insert(universe.code.clone()) {
            issues.push(ImportIssue::error(
                universe.line,
                "universe_code",
                format!("Duplicate universe code `{}`", universe.code),
            ));
        }
        if universe.name.trim().is_empty() {
            issues.push(ImportIssue::error(
                universe.line,
                "universe_name",
                "Universe name must not be empty",
            ));
        }
    }

    codes
}

fn validate_phyla(
    rows: &[ParsedRow],
    universe_codes: &HashSet<String>,
    issues: &mut Vec<ImportIssue>,
) -> HashSet<(String, String)> {
    let mut keys = HashSet::new();

    for row in rows {
        let ParsedRow::Phylum(phylum) = row else {
            continue;
        };

        if !is_level_code(&phylum.code) {
            issues.push(ImportIssue::error(
                phylum.line,
                "phylum_code",
                "Phylum code must be single character",
            ));
        }
        if !universe_codes.contains(&phylum.universe_code) {
            issues.push(ImportIssue::error(
                phylum.line,
                "universe_code",
                format!(
                    "Phylum references unknown universe `{}`",
                    phylum.universe_code
                ),
            ));
        }
        if !keys.insert((phylum.universe_code.clone(), phylum.code.clone())) {
            issues.push(ImportIssue::error(
                phylum.line,
                "phylum_code",
                format!(
                    "Duplicate phylum code `{}` in universe `{}`",
                    phylum.code, phylum.universe_code
                ),
            ));
        }
        if phylum.name.trim().is_empty() {
            issues.push(ImportIssue::error(
                phylum.line,
                "phylum_name",
                "Phylum name must not be empty",
            ));
        }
    }

    keys
}

fn validate_families(
    rows: &[ParsedRow],
    phylum_keys: &HashSet<(String, String)>,
    issues: &mut Vec<ImportIssue>,
) {
    let mut keys = HashSet::new();

    for row in rows {
        let ParsedRow::Family(family) = row else {
            continue;
        };

        if !is_level_code(&family.code) {
            issues.push(ImportIssue::error(
                family.line,
                "family_code",
                "Family code must be single character",
            ));
        }
        let parent = (family.universe_code.clone(), family.phylum_code.clone());
        if !phylum_keys.contains(&parent) {
            issues.push(ImportIssue::error(
                family.line,
                "phylum_code",
                format!(
                    "Family references unknown phylum `{}/{}`",
                    family.universe_code, family.phylum_code
                ),
            ));
        }
        if !keys.insert((
            family.universe_code.clone(),
            family.phylum_code.clone(),
            family.code.clone(),
        )) {
            issues.push(ImportIssue::error(
                family.line,
                "family_code",
                format!(
                    "Duplicate family code `{}` in phylum `{}/{}`",
                    family.code, family.universe_code, family.phylum_code
                ),
            ));
        }
        if family.name.trim().is_empty() {
            issues.push(ImportIssue::error(
                family.line,
                "family_name",
                "Family name must not be empty",
            ));
        }
    }
}

fn validate_groups(rows: &[ParsedRow], issues: &mut Vec<ImportIssue>) {
    let mut keys = HashSet::new();

    for row in rows {
        let ParsedRow::Group(group) = row else {
            continue;
        };

        match group.group_num.value {
            Some(value) if is_code_number(value) => {
                let key = (
                    group.universe_code.clone(),
                    group.phylum_code.clone(),
                    group.family_code.clone(),
                    value,
                );
                if !keys.insert(key) {
                    issues.push(ImportIssue::error(
                        group.line,
                        "group_num",
                        format!("Duplicate group number {value} in the same parent"),
                    ));
                }
            }
            _ => issues.push(ImportIssue::error(
                group.line,
                "group_num",
                format!(
                    "Group number `{}` must be an integer between {CODE_NUMBER_MIN} and {CODE_NUMBER_MAX}",
                    group.group_num.raw
                ),
            )),
        }
        if group.name.trim().is_empty() {
            issues.push(ImportIssue::error(
                group.line,
                "group_name",
                "Group name must not be empty",
            ));
        }
    }
}

fn validate_tasks(rows: &[ParsedRow], issues: &mut Vec<ImportIssue>) {
    let mut base_codes = HashSet::new();

    for row in rows {
        let ParsedRow::Task(task) = row else {
            continue;
        };

        match task.task_num.value {
            Some(value) if is_code_number(value) => {}
            _ => issues.push(ImportIssue::error(
                task.line,
                "task_num",
                format!(
                    "Task number `{}` must be an integer between {CODE_NUMBER_MIN} and {CODE_NUMBER_MAX}",
                    task.task_num.raw
                ),
            )),
        }
        if task.title.trim().is_empty() {
            issues.push(ImportIssue::error(
                task.line,
                "task_title",
                "Task title must not be empty",
            ));
        }
        if TaskStatus::from_code(&task.status).is_none() {
            issues.push(ImportIssue::error(
                task.line,
                "task_status",
                format!(
                    "Task status `{}` must be one of R, P, D, F, C, X",
                    task.status
                ),
            ));
        }
        match task.priority.value {
            Some(value) if (PRIORITY_MIN..=PRIORITY_MAX).contains(&value) => {}
            _ => issues.push(ImportIssue::error(
                task.line,
                "task_priority",
                format!(
                    "Task priority `{}` must be an integer between {PRIORITY_MIN} and {PRIORITY_MAX}",
                    task.priority.raw
                ),
            )),
        }
        if !is_valid_base_code(&task.base_code) {
            issues.push(ImportIssue::error(
                task.line,
                "base_code",
                format!(
                    "Task base_code `{}` does not match required format (e.g. WRK-01.01)",
                    task.base_code
                ),
            ));
        } else if let (Some(group_num), Some(task_num)) =
            (task.group_num.value, task.task_num.value)
        {
            let derived = derive_base_code(
                &task.universe_code,
                &task.phylum_code,
                task.family_code.as_deref(),
                group_num,
                task_num,
            );
            if derived != task.base_code {
                issues.push(ImportIssue::warning(
                    task.line,
                    "base_code",
                    format!(
                        "Task base_code `{}` differs from code `{derived}` derived from its components; the derived code is used on apply",
                        task.base_code
                    ),
                ));
            }
        }
        if !base_codes.insert(task.base_code.clone()) {
            issues.push(ImportIssue::error(
                task.line,
                "base_code",
                format!("Duplicate task base_code `{}`", task.base_code),
            ));
        }
    }
}

fn check_display_order(row: &ParsedRow, issues: &mut Vec<ImportIssue>) {
    let (line, display_order) = match row {
        ParsedRow::Universe(universe) => (universe.line, &universe.display_order),
        ParsedRow::Phylum(phylum) => (phylum.line, &phylum.display_order),
        ParsedRow::Family(family) => (family.line, &family.display_order),
        ParsedRow::Group(group) => (group.line, &group.display_order),
        ParsedRow::Task(task) => (task.line, &task.display_order),
    };
    if unparsable(display_order) {
        issues.push(ImportIssue::warning(
            line,
            "display_order",
            format!(
                "display_order `{}` is not an integer; 0 is used on apply",
                display_order.raw
            ),
        ));
    }
}

fn unparsable(field: &IntField) -> bool {
    !field.is_blank() && field.value.is_none()
}
