use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One time-tracking line. The developer who logged it may differ from the
/// task's responsible developer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorklogEntry {
    /// Task id or task code
    pub task_ref: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl WorklogEntry {
    pub fn new(task_ref: impl Into<String>, date: NaiveDate, hours: f64) -> Self {
        Self {
            task_ref: task_ref.into(),
            date,
            hours,
            developer: None,
            description: None,
        }
    }

    pub fn by(mut self, developer: impl Into<String>) -> Self {
        self.developer = Some(developer.into());
        self
    }

    /// Logging developer, ignoring blank names.
    pub fn developer_name(&self) -> Option<&str> {
        self.developer
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
