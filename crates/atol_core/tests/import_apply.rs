use atol_core::db::open_db_in_memory;
use atol_core::import::csv::REQUIRED_COLUMNS;
use atol_core::{
    export_csv, ImportError, ImportService, SqliteSystemRepository, SystemRepository,
};
use rusqlite::Connection;

fn csv_of(rows: &[String]) -> String {
    let mut text = REQUIRED_COLUMNS.join(",");
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text
}

fn universe_row(code: &str, name: &str) -> String {
    [
        "universe", code, name, "", "", "", "", "", "", "", "", "", "", "", "", "0",
    ]
    .join(",")
}

fn phylum_row(universe: &str, code: &str, name: &str) -> String {
    [
        "phylum", universe, "", code, name, "", "", "", "", "", "", "", "", "", "", "0",
    ]
    .join(",")
}

fn group_row(universe: &str, phylum: &str, num: &str, name: &str) -> String {
    [
        "group", universe, "", phylum, "", "", "", num, name, "", "", "", "", "", "", "0",
    ]
    .join(",")
}

fn task_row(num: &str, title: &str, status: &str, priority: &str, base_code: &str) -> String {
    [
        "task", "W", "", "R", "", "", "", "1", "", num, title, status, priority, base_code, "",
        "0",
    ]
    .join(",")
}

/// One universe/phylum/group plus two tasks.
fn seed_csv() -> String {
    csv_of(&[
        universe_row("W", "Work"),
        phylum_row("W", "R", "Research"),
        group_row("W", "R", "1", "Inbox"),
        task_row("1", "Read paper", "R", "3", "WR-01.01"),
        task_row("2", "Write summary", "P", "2", "WR-01.02"),
    ])
}

fn seed(conn: &Connection) {
    let service = ImportService::new(SqliteSystemRepository::new(conn));
    let plan = service.preview(&seed_csv()).unwrap();
    assert!(plan.errors.is_empty(), "seed errors: {:?}", plan.errors);
    service.apply(&plan, false).unwrap();
}

#[test]
fn apply_persists_creates() {
    let conn = open_db_in_memory().unwrap();
    let service = ImportService::new(SqliteSystemRepository::new(&conn));

    let plan = service.preview(&seed_csv()).unwrap();
    assert_eq!(plan.changes.total_creates(), 5);
    assert_eq!(plan.changes.total_updates(), 0);
    assert!(plan.deletions.is_empty());

    let summary = service.apply(&plan, false).unwrap();
    assert_eq!(summary.created, 5);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.deleted_tasks, 0);

    let repo = SqliteSystemRepository::new(&conn);
    let snapshot = repo.snapshot().unwrap();
    assert_eq!(snapshot.universes.len(), 1);
    assert_eq!(snapshot.tasks.len(), 2);
    assert_eq!(snapshot.tasks[0].base_code, "WR-01.01");
    assert_eq!(snapshot.tasks[0].universe_name, "Work");
    assert_eq!(snapshot.tasks[0].group_name, "Inbox");
}

#[test]
fn export_then_import_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let repo = SqliteSystemRepository::new(&conn);
    let exported = export_csv(&repo.snapshot().unwrap());

    let service = ImportService::new(SqliteSystemRepository::new(&conn));
    let plan = service.preview(&exported).unwrap();

    assert!(plan.errors.is_empty(), "round-trip errors: {:?}", plan.errors);
    assert!(
        plan.warnings.is_empty(),
        "round-trip warnings: {:?}",
        plan.warnings
    );
    assert!(plan.changes.is_noop(), "round-trip diff: {:?}", plan.changes);
    assert!(plan.deletions.is_empty());
}

#[test]
fn validation_errors_block_apply_and_leave_state_untouched() {
    let conn = open_db_in_memory().unwrap();
    let service = ImportService::new(SqliteSystemRepository::new(&conn));

    let text = csv_of(&[
        universe_row("W", "Work"),
        phylum_row("W", "R", "Research"),
        group_row("W", "R", "1", "Inbox"),
        task_row("1", "Overdone", "R", "6", "WR-01.01"),
    ]);
    let plan = service.preview(&text).unwrap();
    assert!(!plan.is_applicable());

    let err = service.apply(&plan, false).unwrap_err();
    assert!(matches!(err, ImportError::BlockedByErrors { count: 1 }));

    let repo = SqliteSystemRepository::new(&conn);
    assert!(repo.snapshot().unwrap().is_empty());
}

#[test]
fn deletions_require_explicit_confirmation() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    // Complete snapshot minus WR-01.02: its absence implies deletion.
    let text = csv_of(&[
        universe_row("W", "Work"),
        phylum_row("W", "R", "Research"),
        group_row("W", "R", "1", "Inbox"),
        task_row("1", "Read paper", "R", "3", "WR-01.01"),
    ]);
    let service = ImportService::new(SqliteSystemRepository::new(&conn));
    let plan = service.preview(&text).unwrap();
    assert_eq!(plan.deletions.len(), 1);
    assert_eq!(plan.deletions[0].base_code, "WR-01.02");

    let err = service.apply(&plan, false).unwrap_err();
    assert!(matches!(err, ImportError::DeletionsNotConfirmed { count: 1 }));

    let repo = SqliteSystemRepository::new(&conn);
    assert!(repo.get_task("WR-01.02").unwrap().is_some());

    let summary = service.apply(&plan, true).unwrap();
    assert_eq!(summary.deleted_tasks, 1);
    assert!(repo.get_task("WR-01.02").unwrap().is_none());
    assert!(repo.get_task("WR-01.01").unwrap().is_some());
}

#[test]
fn updates_are_persisted_and_counted() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let text = csv_of(&[
        universe_row("W", "Work"),
        phylum_row("W", "R", "Research"),
        group_row("W", "R", "1", "Inbox"),
        task_row("1", "Read paper twice", "D", "3", "WR-01.01"),
        task_row("2", "Write summary", "P", "2", "WR-01.02"),
    ]);
    let service = ImportService::new(SqliteSystemRepository::new(&conn));
    let plan = service.preview(&text).unwrap();
    assert_eq!(plan.changes.tasks.updates, 1);
    assert_eq!(plan.changes.total_creates(), 0);

    let summary = service.apply(&plan, false).unwrap();
    assert_eq!(summary.updated, 1);

    let repo = SqliteSystemRepository::new(&conn);
    let task = repo.get_task("WR-01.01").unwrap().unwrap();
    assert_eq!(task.title, "Read paper twice");
    assert_eq!(task.status, atol_core::TaskStatus::Done);
}

#[test]
fn declared_base_code_loses_to_the_derived_one_on_apply() {
    let conn = open_db_in_memory().unwrap();
    let service = ImportService::new(SqliteSystemRepository::new(&conn));

    // Components derive WR-01.01; the declared code disagrees.
    let text = csv_of(&[
        universe_row("W", "Work"),
        phylum_row("W", "R", "Research"),
        group_row("W", "R", "1", "Inbox"),
        task_row("1", "Misfiled", "R", "3", "WR-01.09"),
    ]);
    let plan = service.preview(&text).unwrap();
    assert_eq!(plan.warnings.len(), 1);
    assert!(plan.is_applicable());

    service.apply(&plan, false).unwrap();

    let repo = SqliteSystemRepository::new(&conn);
    assert!(repo.get_task("WR-01.01").unwrap().is_some());
    assert!(repo.get_task("WR-01.09").unwrap().is_none());
}

#[test]
fn failed_apply_rolls_back_the_whole_transaction() {
    let conn = open_db_in_memory().unwrap();
    let service = ImportService::new(SqliteSystemRepository::new(&conn));

    // The task references a group the file never defines and the
    // database does not contain; the insert fails on the foreign key
    // after the universe/phylum rows were already applied.
    let text = csv_of(&[
        universe_row("W", "Work"),
        phylum_row("W", "R", "Research"),
        task_row("1", "Orphan", "R", "3", "WR-01.01"),
    ]);
    let plan = service.preview(&text).unwrap();
    assert!(plan.is_applicable());

    let err = service.apply(&plan, false).unwrap_err();
    assert!(matches!(err, ImportError::Repo(_)));

    let repo = SqliteSystemRepository::new(&conn);
    assert!(
        repo.snapshot().unwrap().is_empty(),
        "partial apply must not survive"
    );
}
