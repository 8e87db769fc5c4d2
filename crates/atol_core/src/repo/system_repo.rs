//! System repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the snapshot read and transactional bulk apply consumed
//!   by the import pipeline.
//! - Provide task CRUD entry points for interactive callers.
//!
//! # Invariants
//! - `bulk_apply` runs in one transaction; either every row lands or
//!   none do.
//! - Taxonomy rows are applied parents-first regardless of file order.
//! - Stored task `base_code` is always the derivation from the task's
//!   components, never a literal import value that disagrees with it.
//! - `family_code` is stored as `''` (never NULL) for "no family".

use crate::db::DbError;
use crate::import::csv::{
    FamilyRow, GroupRow, IntField, ParsedRow, PhylumRow, TaskRow, UniverseRow,
};
use crate::model::snapshot::SystemSnapshot;
use crate::model::task::{
    derive_base_code, validate_task_fields, TaskRecord, TaskStatus, TaskValidationError,
};
use crate::model::taxonomy::{Family, Group, Phylum, Universe, CODE_NUMBER_MAX, CODE_NUMBER_MIN};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for system persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    /// A referenced record does not exist; payload describes the key.
    NotFound(String),
    /// A domain constraint blocks the write (e.g. a full group).
    Constraint(String),
    /// Persisted state failed to decode.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(key) => write!(f, "not found: {key}"),
            Self::Constraint(message) => write!(f, "{message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Constraint(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome counts of one bulk apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub deleted_tasks: usize,
}

/// Request model for creating one task in an existing group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskRequest {
    pub universe_code: String,
    pub phylum_code: String,
    pub family_code: Option<String>,
    pub group_num: i64,
    pub title: String,
    pub priority: i64,
}

/// Filter options for task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub universe_code: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Injected data-access interface for the whole system.
///
/// The import pipeline consumes only `snapshot` and `bulk_apply`;
/// interactive callers use the task entry points.
pub trait SystemRepository {
    /// Reads every current record with parent names denormalized.
    fn snapshot(&self) -> RepoResult<SystemSnapshot>;

    /// Applies validated import rows transactionally.
    ///
    /// When `honor_deletions` is set, existing tasks absent from the
    /// row set are deleted in the same transaction.
    fn bulk_apply(&self, rows: &[ParsedRow], honor_deletions: bool) -> RepoResult<ApplySummary>;

    /// Creates a task, allocating the lowest free task number in the
    /// target group.
    fn create_task(&self, request: &NewTaskRequest) -> RepoResult<TaskRecord>;

    /// Gets one task by its base code.
    fn get_task(&self, base_code: &str) -> RepoResult<Option<TaskRecord>>;

    /// Sets the status of an existing task.
    fn set_task_status(&self, base_code: &str, status: TaskStatus) -> RepoResult<()>;

    /// Lists tasks ordered by base code.
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<TaskRecord>>;
}

const TASK_SELECT_SQL: &str = "SELECT
    t.id,
    t.universe_code,
    u.name AS universe_name,
    t.phylum_code,
    p.name AS phylum_name,
    t.family_code,
    f.name AS family_name,
    t.group_num,
    g.name AS group_name,
    t.task_num,
    t.base_code,
    t.title,
    t.status,
    t.priority,
    t.display_order
FROM tasks t
JOIN universes u ON u.code = t.universe_code
JOIN phyla p ON p.universe_code = t.universe_code AND p.code = t.phylum_code
LEFT JOIN families f
    ON f.universe_code = t.universe_code
    AND f.phylum_code = t.phylum_code
    AND f.code = t.family_code
JOIN task_groups g
    ON g.universe_code = t.universe_code
    AND g.phylum_code = t.phylum_code
    AND g.family_code = t.family_code
    AND g.group_num = t.group_num";

/// SQLite-backed system repository.
pub struct SqliteSystemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSystemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SystemRepository for SqliteSystemRepository<'_> {
    fn snapshot(&self) -> RepoResult<SystemSnapshot> {
        Ok(SystemSnapshot {
            universes: self.read_universes()?,
            phyla: self.read_phyla()?,
            families: self.read_families()?,
            groups: self.read_groups()?,
            tasks: self.list_tasks(&TaskListQuery::default())?,
        })
    }

    fn bulk_apply(&self, rows: &[ParsedRow], honor_deletions: bool) -> RepoResult<ApplySummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = ApplySummary::default();

        // Parents before children: file order is free within a kind,
        // but a phylum row may precede its universe row in the file.
        for row in rows {
            if let ParsedRow::Universe(universe) = row {
                apply_universe(&tx, universe, &mut summary)?;
            }
        }
        for row in rows {
            if let ParsedRow::Phylum(phylum) = row {
                apply_phylum(&tx, phylum, &mut summary)?;
            }
        }
        for row in rows {
            if let ParsedRow::Family(family) = row {
                apply_family(&tx, family, &mut summary)?;
            }
        }
        for row in rows {
            if let ParsedRow::Group(group) = row {
                apply_group(&tx, group, &mut summary)?;
            }
        }
        for row in rows {
            if let ParsedRow::Task(task) = row {
                apply_task(&tx, task, &mut summary)?;
            }
        }

        if honor_deletions {
            summary.deleted_tasks = delete_absent_tasks(&tx, rows)?;
        }

        tx.commit()?;
        Ok(summary)
    }

    fn create_task(&self, request: &NewTaskRequest) -> RepoResult<TaskRecord> {
        validate_task_fields(&request.title, request.priority, request.group_num)?;

        let family = family_to_db(request.family_code.as_deref());
        let group_label = format!(
            "group {}{}{}-{:02}",
            request.universe_code,
            request.phylum_code,
            family,
            request.group_num
        );
        let group_exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM task_groups
                 WHERE universe_code = ?1 AND phylum_code = ?2
                   AND family_code = ?3 AND group_num = ?4",
                params![
                    request.universe_code,
                    request.phylum_code,
                    family,
                    request.group_num
                ],
                |row| row.get(0),
            )
            .optional()?;
        if group_exists.is_none() {
            return Err(RepoError::NotFound(group_label));
        }

        let task_num = self.allocate_task_num(request, family, &group_label)?;
        let base_code = derive_base_code(
            &request.universe_code,
            &request.phylum_code,
            request.family_code.as_deref(),
            request.group_num,
            task_num,
        );

        self.conn.execute(
            "INSERT INTO tasks (
                id, universe_code, phylum_code, family_code, group_num,
                task_num, base_code, title, status, priority, display_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)",
            params![
                Uuid::new_v4().to_string(),
                request.universe_code,
                request.phylum_code,
                family,
                request.group_num,
                task_num,
                base_code,
                request.title,
                TaskStatus::Ready.code().to_string(),
                request.priority,
            ],
        )?;

        self.get_task(&base_code)?
            .ok_or_else(|| RepoError::InvalidData("created task not found in read-back".into()))
    }

    fn get_task(&self, base_code: &str) -> RepoResult<Option<TaskRecord>> {
        let sql = format!("{TASK_SELECT_SQL} WHERE t.base_code = ?1");
        let record = self
            .conn
            .query_row(&sql, params![base_code], decode_task)
            .optional()?;
        record.transpose()
    }

    fn set_task_status(&self, base_code: &str, status: TaskStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE base_code = ?2",
            params![status.code().to_string(), base_code],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("task {base_code}")));
        }
        Ok(())
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<TaskRecord>> {
        let mut sql = String::from(TASK_SELECT_SQL);
        let mut clauses = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(universe_code) = &query.universe_code {
            bind_values.push(Value::Text(universe_code.clone()));
            clauses.push(format!("t.universe_code = ?{}", bind_values.len()));
        }
        if let Some(status) = query.status {
            bind_values.push(Value::Text(status.code().to_string()));
            clauses.push(format!("t.status = ?{}", bind_values.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY t.base_code");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(decode_task(row)??);
        }
        Ok(tasks)
    }
}

impl SqliteSystemRepository<'_> {
    fn read_universes(&self) -> RepoResult<Vec<Universe>> {
        let mut stmt = self.conn.prepare(
            "SELECT code, name, display_order FROM universes ORDER BY display_order, code",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(Universe {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    display_order: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn read_phyla(&self) -> RepoResult<Vec<Phylum>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.universe_code, u.name, p.code, p.name, p.display_order
             FROM phyla p
             JOIN universes u ON u.code = p.universe_code
             ORDER BY p.universe_code, p.display_order, p.code",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(Phylum {
                    universe_code: row.get(0)?,
                    universe_name: row.get(1)?,
                    code: row.get(2)?,
                    name: row.get(3)?,
                    display_order: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn read_families(&self) -> RepoResult<Vec<Family>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.universe_code, u.name, f.phylum_code, p.name, f.code, f.name,
                    f.display_order
             FROM families f
             JOIN universes u ON u.code = f.universe_code
             JOIN phyla p ON p.universe_code = f.universe_code AND p.code = f.phylum_code
             ORDER BY f.universe_code, f.phylum_code, f.display_order, f.code",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(Family {
                    universe_code: row.get(0)?,
                    universe_name: row.get(1)?,
                    phylum_code: row.get(2)?,
                    phylum_name: row.get(3)?,
                    code: row.get(4)?,
                    name: row.get(5)?,
                    display_order: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn read_groups(&self) -> RepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.universe_code, g.phylum_code, g.family_code, g.group_num, g.name,
                    g.display_order,
                    (SELECT COUNT(*) FROM tasks t
                     WHERE t.universe_code = g.universe_code
                       AND t.phylum_code = g.phylum_code
                       AND t.family_code = g.family_code
                       AND t.group_num = g.group_num) AS task_count
             FROM task_groups g
             ORDER BY g.universe_code, g.phylum_code, g.family_code, g.group_num",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(Group {
                    universe_code: row.get(0)?,
                    phylum_code: row.get(1)?,
                    family_code: family_from_db(row.get(2)?),
                    group_num: row.get(3)?,
                    name: row.get(4)?,
                    display_order: row.get(5)?,
                    task_count: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn allocate_task_num(
        &self,
        request: &NewTaskRequest,
        family: &str,
        group_label: &str,
    ) -> RepoResult<i64> {
        let mut stmt = self.conn.prepare(
            "SELECT task_num FROM tasks
             WHERE universe_code = ?1 AND phylum_code = ?2
               AND family_code = ?3 AND group_num = ?4
             ORDER BY task_num",
        )?;
        let taken = stmt
            .query_map(
                params![
                    request.universe_code,
                    request.phylum_code,
                    family,
                    request.group_num
                ],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut next = CODE_NUMBER_MIN;
        for num in taken {
            if num == next {
                next += 1;
            } else if num > next {
                break;
            }
        }
        if next > CODE_NUMBER_MAX {
            return Err(RepoError::Constraint(format!(
                "{group_label} already holds {CODE_NUMBER_MAX} tasks"
            )));
        }
        Ok(next)
    }
}

fn apply_universe(
    conn: &Connection,
    row: &UniverseRow,
    summary: &mut ApplySummary,
) -> RepoResult<()> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, name FROM universes WHERE code = ?1",
            params![row.code],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match existing {
        None => {
            conn.execute(
                "INSERT INTO universes (code, name, display_order) VALUES (?1, ?2, ?3)",
                params![row.code, row.name, display_order(&row.display_order)],
            )?;
            summary.created += 1;
        }
        Some((id, name)) => {
            conn.execute(
                "UPDATE universes SET name = ?1, display_order = ?2 WHERE id = ?3",
                params![row.name, display_order(&row.display_order), id],
            )?;
            if name != row.name {
                summary.updated += 1;
            }
        }
    }
    Ok(())
}

fn apply_phylum(
    conn: &Connection,
    row: &PhylumRow,
    summary: &mut ApplySummary,
) -> RepoResult<()> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, name FROM phyla WHERE universe_code = ?1 AND code = ?2",
            params![row.universe_code, row.code],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match existing {
        None => {
            conn.execute(
                "INSERT INTO phyla (universe_code, code, name, display_order)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    row.universe_code,
                    row.code,
                    row.name,
                    display_order(&row.display_order)
                ],
            )?;
            summary.created += 1;
        }
        Some((id, name)) => {
            conn.execute(
                "UPDATE phyla SET name = ?1, display_order = ?2 WHERE id = ?3",
                params![row.name, display_order(&row.display_order), id],
            )?;
            if name != row.name {
                summary.updated += 1;
            }
        }
    }
    Ok(())
}

fn apply_family(
    conn: &Connection,
    row: &FamilyRow,
    summary: &mut ApplySummary,
) -> RepoResult<()> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, name FROM families
             WHERE universe_code = ?1 AND phylum_code = ?2 AND code = ?3",
            params![row.universe_code, row.phylum_code, row.code],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match existing {
        None => {
            conn.execute(
                "INSERT INTO families (universe_code, phylum_code, code, name, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.universe_code,
                    row.phylum_code,
                    row.code,
                    row.name,
                    display_order(&row.display_order)
                ],
            )?;
            summary.created += 1;
        }
        Some((id, name)) => {
            conn.execute(
                "UPDATE families SET name = ?1, display_order = ?2 WHERE id = ?3",
                params![row.name, display_order(&row.display_order), id],
            )?;
            if name != row.name {
                summary.updated += 1;
            }
        }
    }
    Ok(())
}

fn apply_group(
    conn: &Connection,
    row: &GroupRow,
    summary: &mut ApplySummary,
) -> RepoResult<()> {
    let group_num = row.group_num.value.ok_or_else(|| {
        RepoError::InvalidData(format!("line {}: group row without group_num", row.line))
    })?;
    let family = family_to_db(row.family_code.as_deref());

    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, name FROM task_groups
             WHERE universe_code = ?1 AND phylum_code = ?2
               AND family_code = ?3 AND group_num = ?4",
            params![row.universe_code, row.phylum_code, family, group_num],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match existing {
        None => {
            conn.execute(
                "INSERT INTO task_groups (
                    universe_code, phylum_code, family_code, group_num, name, display_order
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.universe_code,
                    row.phylum_code,
                    family,
                    group_num,
                    row.name,
                    display_order(&row.display_order)
                ],
            )?;
            summary.created += 1;
        }
        Some((id, name)) => {
            conn.execute(
                "UPDATE task_groups SET name = ?1, display_order = ?2 WHERE id = ?3",
                params![row.name, display_order(&row.display_order), id],
            )?;
            if name != row.name {
                summary.updated += 1;
            }
        }
    }
    Ok(())
}

fn apply_task(conn: &Connection, row: &TaskRow, summary: &mut ApplySummary) -> RepoResult<()> {
    let base_code = applied_base_code(row)?;
    let status = TaskStatus::from_code(&row.status).ok_or_else(|| {
        RepoError::InvalidData(format!("line {}: unvalidated task status", row.line))
    })?;
    let priority = row.priority.value.ok_or_else(|| {
        RepoError::InvalidData(format!("line {}: unvalidated task priority", row.line))
    })?;
    let family = family_to_db(row.family_code.as_deref());

    let existing: Option<(String, String, String, i64)> = conn
        .query_row(
            "SELECT id, title, status, priority FROM tasks WHERE base_code = ?1",
            params![base_code],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;

    match existing {
        None => {
            let id = Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::new_v4());
            conn.execute(
                "INSERT INTO tasks (
                    id, universe_code, phylum_code, family_code, group_num,
                    task_num, base_code, title, status, priority, display_order
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id.to_string(),
                    row.universe_code,
                    row.phylum_code,
                    family,
                    row.group_num.value,
                    row.task_num.value,
                    base_code,
                    row.title,
                    status.code().to_string(),
                    priority,
                    display_order(&row.display_order),
                ],
            )?;
            summary.created += 1;
        }
        Some((id, title, old_status, old_priority)) => {
            conn.execute(
                "UPDATE tasks
                 SET title = ?1, status = ?2, priority = ?3, display_order = ?4
                 WHERE id = ?5",
                params![
                    row.title,
                    status.code().to_string(),
                    priority,
                    display_order(&row.display_order),
                    id,
                ],
            )?;
            if title != row.title
                || old_status != status.code().to_string()
                || old_priority != priority
            {
                summary.updated += 1;
            }
        }
    }
    Ok(())
}

fn delete_absent_tasks(conn: &Connection, rows: &[ParsedRow]) -> RepoResult<usize> {
    let mut keep: Vec<Value> = Vec::new();
    for row in rows {
        if let ParsedRow::Task(task) = row {
            keep.push(Value::Text(applied_base_code(task)?));
        }
    }

    if keep.is_empty() {
        return Ok(conn.execute("DELETE FROM tasks", [])?);
    }

    let placeholders = (1..=keep.len())
        .map(|position| format!("?{position}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("DELETE FROM tasks WHERE base_code NOT IN ({placeholders})");
    Ok(conn.execute(&sql, params_from_iter(keep))?)
}

/// Base code a task row is stored under: always the derivation from
/// its components. Rows whose numeric components never parsed cannot
/// be applied and must have been rejected by validation already.
fn applied_base_code(row: &TaskRow) -> RepoResult<String> {
    match (row.group_num.value, row.task_num.value) {
        (Some(group_num), Some(task_num)) => Ok(derive_base_code(
            &row.universe_code,
            &row.phylum_code,
            row.family_code.as_deref(),
            group_num,
            task_num,
        )),
        _ => Err(RepoError::InvalidData(format!(
            "line {}: task row without numeric group/task numbers",
            row.line
        ))),
    }
}

fn display_order(field: &IntField) -> i64 {
    field.value.unwrap_or(0)
}

fn family_to_db(family: Option<&str>) -> &str {
    family.unwrap_or("")
}

fn family_from_db(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn decode_task(row: &Row<'_>) -> rusqlite::Result<RepoResult<TaskRecord>> {
    let id_text: String = row.get("id")?;
    let status_text: String = row.get("status")?;
    let family_code: String = row.get("family_code")?;

    let id = match Uuid::parse_str(&id_text) {
        Ok(id) => id,
        Err(_) => {
            return Ok(Err(RepoError::InvalidData(format!(
                "invalid task id `{id_text}`"
            ))))
        }
    };
    let Some(status) = TaskStatus::from_code(&status_text) else {
        return Ok(Err(RepoError::InvalidData(format!(
            "invalid task status `{status_text}`"
        ))));
    };

    Ok(Ok(TaskRecord {
        id,
        universe_code: row.get("universe_code")?,
        universe_name: row.get("universe_name")?,
        phylum_code: row.get("phylum_code")?,
        phylum_name: row.get("phylum_name")?,
        family_code: family_from_db(family_code),
        family_name: row.get("family_name")?,
        group_num: row.get("group_num")?,
        group_name: row.get("group_name")?,
        task_num: row.get("task_num")?,
        base_code: row.get("base_code")?,
        title: row.get("title")?,
        status,
        priority: row.get("priority")?,
        display_order: row.get("display_order")?,
    }))
}
