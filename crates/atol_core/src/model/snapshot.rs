//! Point-in-time read model of the whole system.
//!
//! # Responsibility
//! - Bundle the current taxonomy and task records for read-only
//!   consumers: the diff engine, the deletion finder and the exporter.
//!
//! # Invariants
//! - A snapshot is immutable once produced; importers never mutate it.
//! - Record ordering is deterministic (display order, then codes).

use crate::model::task::TaskRecord;
use crate::model::taxonomy::{Family, Group, Phylum, Universe};
use serde::{Deserialize, Serialize};

/// All current records, with parent names denormalized onto children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub universes: Vec<Universe>,
    pub phyla: Vec<Phylum>,
    pub families: Vec<Family>,
    pub groups: Vec<Group>,
    pub tasks: Vec<TaskRecord>,
}

impl SystemSnapshot {
    /// Returns whether the snapshot contains no records at all.
    pub fn is_empty(&self) -> bool {
        self.universes.is_empty()
            && self.phyla.is_empty()
            && self.families.is_empty()
            && self.groups.is_empty()
            && self.tasks.is_empty()
    }
}
