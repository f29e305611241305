//! Schedulable per-source tasks and their status lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CounterError, Result};

/// Identifier of a task, e.g. `camera_entrance` or `video_lobby`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
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
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Live stream; a missing frame is a transient drop
    Camera,
    /// Finite recording; a missing frame is end of stream
    File,
}

impl SourceType {
    /// Default scheduling priority. Lower values are dequeued first.
    pub fn default_priority(self) -> u8 {
        match self {
            SourceType::Camera => 1,
            SourceType::File => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Pending and processing tasks hold their source URI.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-task settings carried alongside the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Human-readable name
    pub alias: Option<String>,
    pub location: Option<String>,
    /// Occupancy at or above which results are flagged
    pub threshold: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub source_type: SourceType,
    pub source_uri: String,
    pub config: TaskConfig,
    pub priority: u8,
    status: TaskStatus,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, source_type: SourceType, source_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_type,
            source_uri: source_uri.into(),
            config: TaskConfig::default(),
            priority: source_type.default_priority(),
            status: TaskStatus::Pending,
        }
    }

    pub fn camera(id: impl Into<TaskId>, source_uri: impl Into<String>) -> Self {
        Self::new(id, SourceType::Camera, source_uri)
    }

    pub fn file(id: impl Into<TaskId>, source_uri: impl Into<String>) -> Self {
        Self::new(id, SourceType::File, source_uri)
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Move the task forward in its lifecycle.
    pub fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CounterError::InvalidTransition {
                task_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Alias if configured, otherwise the task id.
    pub fn display_name(&self) -> &str {
        self.config.alias.as_deref().unwrap_or(self.id.as_str())
    }
}
