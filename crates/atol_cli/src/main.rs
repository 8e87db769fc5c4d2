//! ATOL command-line interface.
//!
//! # Responsibility
//! - Surface the import/export pipeline and basic task CRUD over the
//!   core crate.
//! - Render import previews and gate destructive apply on explicit
//!   flags.

use anyhow::{bail, Context, Result};
use atol_core::db::open_db;
use atol_core::{
    export_csv, ImportPlan, ImportService, NewTaskRequest, SqliteSystemRepository,
    SystemRepository, TaskListQuery, TaskRecord, TaskService, TaskStatus,
};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line arguments for atol.
#[derive(Parser, Debug)]
#[command(name = "atol")]
#[command(about = "Taxonomy-organized task list: import, export and task CRUD")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "atol.db", env = "ATOL_DB")]
    db: PathBuf,

    /// Absolute directory for rolling log files; logging is disabled
    /// when omitted
    #[arg(long, env = "ATOL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preview a snapshot CSV import, or apply it with --apply
    Import {
        /// CSV file exported from this or another ATOL instance
        file: PathBuf,
        /// Apply the previewed changes instead of only printing them
        #[arg(long)]
        apply: bool,
        /// Confirm deletion of existing tasks absent from the file
        #[arg(long)]
        confirm_deletions: bool,
    },
    /// Export the full system as snapshot CSV
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a task in an existing group
    AddTask {
        /// Universe code (one character)
        #[arg(long)]
        universe: String,
        /// Phylum code (one character)
        #[arg(long)]
        phylum: String,
        /// Family code (one character); omit for phylum-level groups
        #[arg(long)]
        family: Option<String>,
        /// Group number (1-99)
        #[arg(long)]
        group: i64,
        /// Task title
        title: String,
        /// Priority (1-5)
        #[arg(long, default_value_t = 3)]
        priority: i64,
    },
    /// Set a task's status by base code
    SetStatus {
        /// Task base code, e.g. WRK-01.01
        base_code: String,
        /// Status letter: R, P, D, F, C or X
        status: String,
    },
    /// List tasks, optionally filtered
    List {
        /// Restrict to one universe code
        #[arg(long)]
        universe: Option<String>,
        /// Restrict to one status letter
        #[arg(long)]
        status: Option<String>,
        /// Print records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = &cli.log_dir {
        let log_dir = log_dir.to_string_lossy();
        atol_core::init_logging(atol_core::default_log_level(), &log_dir)
            .map_err(|message| anyhow::anyhow!(message))?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let repo = SqliteSystemRepository::new(&conn);

    match cli.command {
        Command::Import {
            file,
            apply,
            confirm_deletions,
        } => run_import(repo, &file, apply, confirm_deletions),
        Command::Export { output } => run_export(repo, output.as_deref()),
        Command::AddTask {
            universe,
            phylum,
            family,
            group,
            title,
            priority,
        } => {
            let service = TaskService::new(repo);
            let record = service.create_task(&NewTaskRequest {
                universe_code: universe,
                phylum_code: phylum,
                family_code: family,
                group_num: group,
                title,
                priority,
            })?;
            println!("created {} {}", record.base_code, record.title);
            Ok(())
        }
        Command::SetStatus { base_code, status } => {
            let service = TaskService::new(repo);
            let status = service.set_status_code(&base_code, &status)?;
            println!("{base_code} -> {status}");
            Ok(())
        }
        Command::List {
            universe,
            status,
            json,
        } => run_list(repo, universe, status, json),
    }
}

fn run_import(
    repo: SqliteSystemRepository<'_>,
    file: &std::path::Path,
    apply: bool,
    confirm_deletions: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read `{}`", file.display()))?;
    info!(
        "event=cli_import module=cli status=start file={} apply={apply}",
        file.display()
    );

    let service = ImportService::new(repo);
    let plan = service.preview(&text)?;
    print_plan(&plan);

    if !apply {
        if !plan.errors.is_empty() {
            bail!("import file has {} validation error(s)", plan.errors.len());
        }
        println!("preview only; pass --apply to execute");
        return Ok(());
    }

    let summary = service.apply(&plan, confirm_deletions)?;
    println!(
        "applied: {} created, {} updated, {} task(s) deleted",
        summary.created, summary.updated, summary.deleted_tasks
    );
    Ok(())
}

fn print_plan(plan: &ImportPlan) {
    let counts = [
        ("universes", plan.changes.universes),
        ("phyla", plan.changes.phyla),
        ("families", plan.changes.families),
        ("groups", plan.changes.groups),
        ("tasks", plan.changes.tasks),
    ];
    println!("{} row(s) parsed", plan.rows.len());
    for (kind, count) in counts {
        println!("  {kind:<10} +{} ~{}", count.creates, count.updates);
    }

    if !plan.errors.is_empty() {
        println!("errors:");
        for issue in &plan.errors {
            println!("  {issue}");
        }
    }
    if !plan.warnings.is_empty() {
        println!("warnings:");
        for issue in &plan.warnings {
            println!("  {issue}");
        }
    }
    if !plan.deletions.is_empty() {
        println!(
            "tasks to delete ({}), requires --confirm-deletions:",
            plan.deletions.len()
        );
        for deletion in &plan.deletions {
            println!("  {deletion}");
        }
    }
}

fn run_export(repo: SqliteSystemRepository<'_>, output: Option<&std::path::Path>) -> Result<()> {
    let snapshot = repo.snapshot()?;
    let csv = export_csv(&snapshot);
    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            println!(
                "exported {} task(s) to {}",
                snapshot.tasks.len(),
                path.display()
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn run_list(
    repo: SqliteSystemRepository<'_>,
    universe: Option<String>,
    status: Option<String>,
    json: bool,
) -> Result<()> {
    let status = match status.as_deref() {
        Some(code) => Some(
            TaskStatus::from_code(code)
                .with_context(|| format!("unknown status code `{code}`"))?,
        ),
        None => None,
    };
    let query = TaskListQuery {
        universe_code: universe,
        status,
    };
    let tasks = TaskService::new(repo).list_tasks(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    for task in &tasks {
        print_task_line(task);
    }
    println!("{} task(s)", tasks.len());
    Ok(())
}

fn print_task_line(task: &TaskRecord) {
    println!(
        "{} [{}] p{} {} ({})",
        task.base_code, task.status, task.priority, task.title, task.universe_name
    );
}
