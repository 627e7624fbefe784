use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the task assigned to an executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

/// Lifecycle state of a task as reported to the driver.
///
/// The reported sequence for one task is always a prefix of
/// `Starting -> Running -> <terminal>`, where `Running` may be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
}

impl TaskState {
    /// `true` for `Finished`, `Failed`, `Killed` and `Lost`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Starting | TaskState::Running)
    }

    /// Position in the lifecycle; terminal states share the last rank.
    pub(crate) fn rank(self) -> u8 {
        match self {
            TaskState::Starting => 0,
            TaskState::Running => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Starting => "STARTING",
            TaskState::Running => "RUNNING",
            TaskState::Finished => "FINISHED",
            TaskState::Failed => "FAILED",
            TaskState::Killed => "KILLED",
            TaskState::Lost => "LOST",
        };
        f.write_str(s)
    }
}

/// What a task runner observes about its process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Still running (or not yet started).
    Running,
    /// Exited cleanly.
    Finished,
    /// Exited with an error, or the runner itself failed.
    Failed,
    /// Terminated by a kill this runner delivered.
    Killed,
    /// Disappeared without a clean exit we can account for.
    Lost,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        self != RunnerState::Running
    }
}

impl From<RunnerState> for TaskState {
    fn from(state: RunnerState) -> Self {
        match state {
            RunnerState::Running => TaskState::Running,
            RunnerState::Finished => TaskState::Finished,
            RunnerState::Failed => TaskState::Failed,
            RunnerState::Killed => TaskState::Killed,
            RunnerState::Lost => TaskState::Lost,
        }
    }
}

/// A single driver-visible status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub task_id: TaskId,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
