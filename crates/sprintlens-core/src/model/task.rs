//! Work items and their dual-scope effort metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::{self, HiddenDetail};

/// Kind of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Bug,
    #[default]
    Task,
    Story,
    Other,
}

impl TaskType {
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::Bug => "Bug",
            TaskType::Task => "Task",
            TaskType::Story => "Story",
            TaskType::Other => "Other",
        }
    }
}

/// Effort accumulated over the whole life of a task, across every iteration
/// it was carried through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeMetrics {
    /// Original estimate in hours
    #[serde(default)]
    pub estimate_hours: f64,
    /// Time spent in hours as reported by the tracker
    #[serde(default)]
    pub spent_hours: f64,
    /// Cumulative time spent across all iterations, when the import has it
    #[serde(default)]
    pub total_spent_hours: Option<f64>,
}

/// Effort scoped to the iteration the task is currently assigned to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentIterationMetrics {
    /// Remaining estimate for this iteration
    #[serde(default)]
    pub remaining_estimate_hours: Option<f64>,
    /// Hours spent during this iteration
    #[serde(default)]
    pub spent_hours: Option<f64>,
}

/// A unit of work as imported from the tracker.
///
/// Tasks are never mutated by the engine; every report recomputes from the
/// snapshot it was handed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub lifetime: LifetimeMetrics,
    #[serde(default)]
    pub current_iteration: Option<CurrentIterationMetrics>,
    /// Iteration label; empty or placeholder values mean "backlog"
    #[serde(default)]
    pub sprint: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Free-text hidden-detail tags ("hidden question", "meeting", ...)
    #[serde(default)]
    pub hidden_details: Vec<String>,
    /// Complexity level 1-5
    #[serde(default)]
    pub complexity: Option<u8>,
    #[serde(default)]
    pub created: Option<NaiveDate>,
    #[serde(default)]
    pub resolved: Option<NaiveDate>,
}

impl Task {
    /// Create a task with the given id and code; everything else defaults.
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    /// Iteration label, or `None` when the task sits in the backlog.
    pub fn sprint_label(&self) -> Option<&str> {
        self.sprint
            .as_deref()
            .map(str::trim)
            .filter(|label| !classify::is_backlog_label(label))
    }

    pub fn is_backlog(&self) -> bool {
        self.sprint_label().is_none()
    }

    /// Parsed hidden-detail tags; unrecognized tags are dropped.
    pub fn hidden(&self) -> Vec<HiddenDetail> {
        classify::parse_hidden_details(&self.hidden_details)
    }

    /// True when `key` matches this task's id or code.
    pub fn matches_key(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty() && (self.id == key || self.code == key)
    }

    /// Human-facing reference: the code when present, otherwise the id.
    pub fn display_key(&self) -> &str {
        if self.code.is_empty() {
            &self.id
        } else {
            &self.code
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_sprint(mut self, sprint: impl Into<String>) -> Self {
        self.sprint = Some(sprint.into());
        self
    }

    pub fn with_responsible(mut self, developer: impl Into<String>) -> Self {
        self.responsible = Some(developer.into());
        self
    }

    pub fn with_lifetime(mut self, estimate_hours: f64, spent_hours: f64) -> Self {
        self.lifetime.estimate_hours = estimate_hours;
        self.lifetime.spent_hours = spent_hours;
        self
    }

    pub fn with_current_iteration(
        mut self,
        remaining_estimate_hours: Option<f64>,
        spent_hours: Option<f64>,
    ) -> Self {
        self.current_iteration = Some(CurrentIterationMetrics {
            remaining_estimate_hours,
            spent_hours,
        });
        self
    }

    pub fn with_created(mut self, date: NaiveDate) -> Self {
        self.created = Some(date);
        self
    }

    pub fn with_resolved(mut self, date: NaiveDate) -> Self {
        self.resolved = Some(date);
        self
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn with_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clients = clients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hidden_details<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_details = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_sprint_is_backlog() {
        let task = Task::new("1", "PRJ-1").with_sprint("  No Sprint ");
        assert!(task.is_backlog());
        assert_eq!(task.sprint_label(), None);

        let task = Task::new("2", "PRJ-2").with_sprint("Sprint 12");
        assert_eq!(task.sprint_label(), Some("Sprint 12"));
    }

    #[test]
    fn matches_key_accepts_id_or_code() {
        let task = Task::new("10042", "PRJ-7");
        assert!(task.matches_key("10042"));
        assert!(task.matches_key(" PRJ-7 "));
        assert!(!task.matches_key(""));
        assert!(!task.matches_key("PRJ-8"));
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let json = r#"{"id":"1","task_type":"bug","sprint":"S1","created":"2024-01-05"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.task_type, TaskType::Bug);
        assert_eq!(task.created, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(task.current_iteration.is_none());
        assert_eq!(task.lifetime.estimate_hours, 0.0);
    }
}
