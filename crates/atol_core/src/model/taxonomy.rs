//! Taxonomy level records: Universe, Phylum, Family, Group.
//!
//! # Responsibility
//! - Define the read-model records for the four container levels.
//! - Provide the shared code/number shape checks used by validation
//!   and by repository writes.
//!
//! # Invariants
//! - Level codes are exactly one character.
//! - Group numbers fall in `CODE_NUMBER_MIN..=CODE_NUMBER_MAX`.
//! - Parent names carried on child records are denormalized copies;
//!   the parent's own record is the source of truth.

use serde::{Deserialize, Serialize};

/// Lower bound for group and task numbers inside a code.
pub const CODE_NUMBER_MIN: i64 = 1;
/// Upper bound for group and task numbers inside a code.
pub const CODE_NUMBER_MAX: i64 = 99;

/// Returns whether `code` has the single-character shape required for
/// universe, phylum and family codes.
pub fn is_level_code(code: &str) -> bool {
    code.chars().count() == 1
}

/// Returns whether `value` is a legal group/task number.
pub fn is_code_number(value: i64) -> bool {
    (CODE_NUMBER_MIN..=CODE_NUMBER_MAX).contains(&value)
}

/// Top taxonomy level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub code: String,
    pub name: String,
    pub display_order: i64,
}

/// Second taxonomy level, owned by a universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phylum {
    pub universe_code: String,
    /// Denormalized owner name for display surfaces.
    pub universe_name: String,
    pub code: String,
    pub name: String,
    pub display_order: i64,
}

/// Third taxonomy level, owned by a phylum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub universe_code: String,
    pub universe_name: String,
    pub phylum_code: String,
    pub phylum_name: String,
    pub code: String,
    pub name: String,
    pub display_order: i64,
}

/// Numbered container for tasks, owned by a phylum and optionally
/// scoped to a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub universe_code: String,
    pub phylum_code: String,
    /// `None` for phylum-level groups with no family scope.
    pub family_code: Option<String>,
    pub group_num: i64,
    pub name: String,
    pub display_order: i64,
    /// Count of tasks currently filed under this group.
    pub task_count: i64,
}

#[cfg(test)]
mod tests {
    use super::{is_code_number, is_level_code};

    #[test]
    fn level_code_requires_exactly_one_character() {
        assert!(is_level_code("W"));
        assert!(is_level_code("ß"));
        assert!(!is_level_code(""));
        assert!(!is_level_code("AB"));
    }

    #[test]
    fn code_number_bounds_are_inclusive() {
        assert!(!is_code_number(0));
        assert!(is_code_number(1));
        assert!(is_code_number(99));
        assert!(!is_code_number(100));
    }
}
