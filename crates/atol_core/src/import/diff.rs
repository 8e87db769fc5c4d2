//! Diff engine and deletion finder for import previews.
//!
//! # Responsibility
//! - Classify each import row as create, update or no-op against a
//!   snapshot of existing records.
//! - Find existing tasks absent from the import set.
//!
//! # Invariants
//! - Matching is purely key-based: universe by code, phylum by
//!   (universe, code), family by (universe, phylum, code), group by
//!   (universe, phylum, family, number), task by `base_code`.
//! - Only tracked fields count as updates: `name` for taxonomy levels,
//!   title/status/priority for tasks. Everything else is a no-op.
//! - Import files are complete snapshots; an existing task whose
//!   `base_code` is missing from the file is a deletion candidate.

use crate::import::csv::ParsedRow;
use crate::model::snapshot::SystemSnapshot;
use crate::model::task::{TaskId, TaskStatus};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

/// Create/update tally for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub creates: usize,
    pub updates: usize,
}

impl ChangeCounts {
    fn create(&mut self) {
        self.creates += 1;
    }

    fn update_if(&mut self, changed: bool) {
        if changed {
            self.updates += 1;
        }
    }
}

/// Per-kind change tallies for one import preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportChanges {
    pub universes: ChangeCounts,
    pub phyla: ChangeCounts,
    pub families: ChangeCounts,
    pub groups: ChangeCounts,
    pub tasks: ChangeCounts,
}

impl ImportChanges {
    /// Total creates across all kinds.
    pub fn total_creates(&self) -> usize {
        self.universes.creates
            + self.phyla.creates
            + self.families.creates
            + self.groups.creates
            + self.tasks.creates
    }

    /// Total updates across all kinds.
    pub fn total_updates(&self) -> usize {
        self.universes.updates
            + self.phyla.updates
            + self.families.updates
            + self.groups.updates
            + self.tasks.updates
    }

    /// Returns whether the import would change nothing.
    pub fn is_noop(&self) -> bool {
        self.total_creates() == 0 && self.total_updates() == 0
    }
}

/// Existing task whose `base_code` is absent from the import set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskToDelete {
    pub id: TaskId,
    pub base_code: String,
    pub title: String,
    pub status: TaskStatus,
    pub universe_name: String,
}

impl Display for TaskToDelete {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.base_code, self.status, self.title, self.universe_name
        )
    }
}

/// Computes per-kind create/update counts for an import.
///
/// Existing records are indexed by key up front, so each row is a
/// single lookup regardless of snapshot size.
pub fn diff_rows(rows: &[ParsedRow], snapshot: &SystemSnapshot) -> ImportChanges {
    let universes: HashMap<&str, &str> = snapshot
        .universes
        .iter()
        .map(|record| (record.code.as_str(), record.name.as_str()))
        .collect();
    let phyla: HashMap<(&str, &str), &str> = snapshot
        .phyla
        .iter()
        .map(|record| {
            (
                (record.universe_code.as_str(), record.code.as_str()),
                record.name.as_str(),
            )
        })
        .collect();
    let families: HashMap<(&str, &str, &str), &str> = snapshot
        .families
        .iter()
        .map(|record| {
            (
                (
                    record.universe_code.as_str(),
                    record.phylum_code.as_str(),
                    record.code.as_str(),
                ),
                record.name.as_str(),
            )
        })
        .collect();
    let groups: HashMap<(&str, &str, Option<&str>, i64), &str> = snapshot
        .groups
        .iter()
        .map(|record| {
            (
                (
                    record.universe_code.as_str(),
                    record.phylum_code.as_str(),
                    record.family_code.as_deref(),
                    record.group_num,
                ),
                record.name.as_str(),
            )
        })
        .collect();
    let tasks: HashMap<&str, (&str, TaskStatus, i64)> = snapshot
        .tasks
        .iter()
        .map(|record| {
            (
                record.base_code.as_str(),
                (record.title.as_str(), record.status, record.priority),
            )
        })
        .collect();

    let mut changes = ImportChanges::default();
    for row in rows {
        match row {
            ParsedRow::Universe(universe) => {
                match universes.get(universe.code.as_str()) {
                    Some(name) => changes.universes.update_if(*name != universe.name),
                    None => changes.universes.create(),
                }
            }
            ParsedRow::Phylum(phylum) => {
                let key = (phylum.universe_code.as_str(), phylum.code.as_str());
                match phyla.get(&key) {
                    Some(name) => changes.phyla.update_if(*name != phylum.name),
                    None => changes.phyla.create(),
                }
            }
            ParsedRow::Family(family) => {
                let key = (
                    family.universe_code.as_str(),
                    family.phylum_code.as_str(),
                    family.code.as_str(),
                );
                match families.get(&key) {
                    Some(name) => changes.families.update_if(*name != family.name),
                    None => changes.families.create(),
                }
            }
            ParsedRow::Group(group) => {
                let key = (
                    group.universe_code.as_str(),
                    group.phylum_code.as_str(),
                    group.family_code.as_deref(),
                    group.group_num.value.unwrap_or(0),
                );
                match groups.get(&key) {
                    Some(name) => changes.groups.update_if(*name != group.name),
                    None => changes.groups.create(),
                }
            }
            ParsedRow::Task(task) => match tasks.get(task.base_code.as_str()) {
                Some((title, status, priority)) => {
                    let status_differs = task.status != status.code().to_string();
                    let priority_differs =
                        task.priority.value.is_some_and(|value| value != *priority);
                    changes.tasks.update_if(
                        *title != task.title || status_differs || priority_differs,
                    );
                }
                None => changes.tasks.create(),
            },
        }
    }

    changes
}

/// Returns existing tasks missing from the import's task rows, sorted
/// by base code for stable display.
pub fn find_absent_tasks(rows: &[ParsedRow], snapshot: &SystemSnapshot) -> Vec<TaskToDelete> {
    let imported: HashSet<&str> = rows
        .iter()
        .filter_map(|row| match row {
            ParsedRow::Task(task) => Some(task.base_code.as_str()),
            _ => None,
        })
        .collect();

    let mut absent: Vec<TaskToDelete> = snapshot
        .tasks
        .iter()
        .filter(|record| !imported.contains(record.base_code.as_str()))
        .map(|record| TaskToDelete {
            id: record.id,
            base_code: record.base_code.clone(),
            title: record.title.clone(),
            status: record.status,
            universe_name: record.universe_name.clone(),
        })
        .collect();
    absent.sort_by(|a, b| a.base_code.cmp(&b.base_code));

    absent
}
