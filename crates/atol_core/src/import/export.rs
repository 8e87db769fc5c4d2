//! CSV exporter for system snapshots.
//!
//! # Responsibility
//! - Serialize a snapshot to the canonical 16-column CSV form.
//!
//! # Invariants
//! - Parents are written before children (universes, phyla, families,
//!   groups, tasks), so the exported file re-imports without
//!   reference errors.
//! - Any field containing a comma or a double quote is quoted, with
//!   embedded quotes doubled; re-importing an export of an unchanged
//!   system yields zero creates, updates and deletions.
//! - The format is line-based; field values must not contain line
//!   breaks.

use crate::import::csv::REQUIRED_COLUMNS;
use crate::model::snapshot::SystemSnapshot;

/// Serializes the snapshot as import-compatible CSV text.
pub fn export_csv(snapshot: &SystemSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&REQUIRED_COLUMNS.join(","));
    out.push('\n');

    for universe in &snapshot.universes {
        push_row(
            &mut out,
            Row {
                kind: "universe",
                universe_code: &universe.code,
                universe_name: &universe.name,
                display_order: universe.display_order,
                ..Row::default()
            },
        );
    }
    for phylum in &snapshot.phyla {
        push_row(
            &mut out,
            Row {
                kind: "phylum",
                universe_code: &phylum.universe_code,
                phylum_code: &phylum.code,
                phylum_name: &phylum.name,
                display_order: phylum.display_order,
                ..Row::default()
            },
        );
    }
    for family in &snapshot.families {
        push_row(
            &mut out,
            Row {
                kind: "family",
                universe_code: &family.universe_code,
                phylum_code: &family.phylum_code,
                family_code: &family.code,
                family_name: &family.name,
                display_order: family.display_order,
                ..Row::default()
            },
        );
    }
    for group in &snapshot.groups {
        push_row(
            &mut out,
            Row {
                kind: "group",
                universe_code: &group.universe_code,
                phylum_code: &group.phylum_code,
                family_code: group.family_code.as_deref().unwrap_or(""),
                group_num: Some(group.group_num),
                group_name: &group.name,
                display_order: group.display_order,
                ..Row::default()
            },
        );
    }
    for task in &snapshot.tasks {
        push_row(
            &mut out,
            Row {
                kind: "task",
                universe_code: &task.universe_code,
                phylum_code: &task.phylum_code,
                family_code: task.family_code.as_deref().unwrap_or(""),
                group_num: Some(task.group_num),
                task_num: Some(task.task_num),
                task_title: &task.title,
                task_status: &task.status.code().to_string(),
                task_priority: Some(task.priority),
                base_code: &task.base_code,
                id: &task.id.to_string(),
                display_order: task.display_order,
                ..Row::default()
            },
        );
    }

    out
}

/// Flat cell view of one export row; unused cells stay empty strings.
#[derive(Default)]
struct Row<'a> {
    kind: &'a str,
    universe_code: &'a str,
    universe_name: &'a str,
    phylum_code: &'a str,
    phylum_name: &'a str,
    family_code: &'a str,
    family_name: &'a str,
    group_num: Option<i64>,
    group_name: &'a str,
    task_num: Option<i64>,
    task_title: &'a str,
    task_status: &'a str,
    task_priority: Option<i64>,
    base_code: &'a str,
    id: &'a str,
    display_order: i64,
}

fn push_row(out: &mut String, row: Row<'_>) {
    let number = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
    let cells = [
        row.kind.to_string(),
        row.universe_code.to_string(),
        row.universe_name.to_string(),
        row.phylum_code.to_string(),
        row.phylum_name.to_string(),
        row.family_code.to_string(),
        row.family_name.to_string(),
        number(row.group_num),
        row.group_name.to_string(),
        number(row.task_num),
        row.task_title.to_string(),
        row.task_status.to_string(),
        number(row.task_priority),
        row.base_code.to_string(),
        row.id.to_string(),
        row.display_order.to_string(),
    ];

    let line = cells
        .iter()
        .map(|cell| escape_field(cell))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
