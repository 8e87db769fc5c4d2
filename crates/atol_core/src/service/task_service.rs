//! Task use-case service.
//!
//! # Responsibility
//! - Provide create/status/list entry points for interactive callers.
//! - Translate user-facing status codes into typed statuses.
//!
//! # Invariants
//! - New tasks start as `Ready` unless the caller chooses otherwise.
//! - Service APIs never bypass repository validation or allocation.

use crate::model::task::{TaskRecord, TaskStatus};
use crate::repo::system_repo::{NewTaskRequest, RepoError, SystemRepository, TaskListQuery};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Status letter outside the fixed `R P D F C X` set.
    UnknownStatus(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStatus(value) => write!(
                f,
                "unknown status code `{value}`; expected one of R, P, D, F, C, X"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::UnknownStatus(_) => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Use-case facade for task CRUD over a repository implementation.
pub struct TaskService<R: SystemRepository> {
    repo: R,
}

impl<R: SystemRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a task in an existing group; the task number is
    /// allocated by the repository.
    pub fn create_task(&self, request: &NewTaskRequest) -> Result<TaskRecord, TaskServiceError> {
        Ok(self.repo.create_task(request)?)
    }

    /// Sets a task's status from its one-letter code.
    pub fn set_status_code(
        &self,
        base_code: &str,
        status_code: &str,
    ) -> Result<TaskStatus, TaskServiceError> {
        let status = TaskStatus::from_code(status_code)
            .ok_or_else(|| TaskServiceError::UnknownStatus(status_code.to_string()))?;
        self.repo.set_task_status(base_code, status)?;
        Ok(status)
    }

    /// Lists tasks with optional universe/status filters.
    pub fn list_tasks(&self, query: &TaskListQuery) -> Result<Vec<TaskRecord>, TaskServiceError> {
        Ok(self.repo.list_tasks(query)?)
    }
}
