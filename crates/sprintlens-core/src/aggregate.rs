//! Group tasks by a dimension into count/hours totals.
//!
//! Multi-valued dimensions (features, clients) fan a task out: a task tagged
//! with two clients counts fully toward both. Tasks without a value land in
//! the [`NONE_LABEL`] bucket.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::CoreError;
use crate::metrics::{reconcile, MetricScope};
use crate::model::Task;

/// Bucket label for tasks missing a dimension value.
pub const NONE_LABEL: &str = "(none)";

/// Field a task collection can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Type,
    Feature,
    Module,
    Client,
    Responsible,
    Status,
    Complexity,
}

impl Dimension {
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Type => "type",
            Dimension::Feature => "feature",
            Dimension::Module => "module",
            Dimension::Client => "client",
            Dimension::Responsible => "responsible",
            Dimension::Status => "status",
            Dimension::Complexity => "complexity",
        }
    }

    /// Group labels for one task under this dimension.
    pub fn labels(&self, task: &Task) -> Vec<String> {
        let labels: Vec<String> = match self {
            Dimension::Type => vec![task.task_type.label().to_string()],
            Dimension::Feature => task.features.clone(),
            Dimension::Client => task.clients.clone(),
            Dimension::Module => task.module.iter().cloned().collect(),
            Dimension::Responsible => task.responsible.iter().cloned().collect(),
            Dimension::Status => vec![task.status.clone()],
            Dimension::Complexity => task
                .complexity
                .filter(|level| (1..=5).contains(level))
                .map(|level| level.to_string())
                .into_iter()
                .collect(),
        };

        let mut cleaned: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.trim();
            if !label.is_empty() && !cleaned.iter().any(|l| l == label) {
                cleaned.push(label.to_string());
            }
        }
        if cleaned.is_empty() {
            cleaned.push(NONE_LABEL.to_string());
        }
        cleaned
    }
}

impl FromStr for Dimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "type" => Ok(Dimension::Type),
            "feature" | "features" => Ok(Dimension::Feature),
            "module" => Ok(Dimension::Module),
            "client" | "clients" => Ok(Dimension::Client),
            "responsible" | "developer" => Ok(Dimension::Responsible),
            "status" => Ok(Dimension::Status),
            "complexity" => Ok(Dimension::Complexity),
            _ => Err(CoreError::InvalidDimension(s.to_string())),
        }
    }
}

/// Output ordering for aggregate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Hours spent, descending
    #[default]
    HoursDesc,
    /// Label, ascending
    Alphabetical,
    /// Task count, descending
    Rank,
}

/// Options for [`aggregate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub scope: MetricScope,
    pub order: SortOrder,
}

impl AggregateOptions {
    /// Lifetime scope, for backlog and lifetime reports.
    pub fn lifetime() -> Self {
        Self {
            scope: MetricScope::Lifetime,
            order: SortOrder::HoursDesc,
        }
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Totals for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub label: String,
    pub count: usize,
    pub hours: f64,
    pub estimated_hours: f64,
}

/// Group `tasks` by `dimension`.
pub fn aggregate<'a, I>(tasks: I, dimension: Dimension, options: AggregateOptions) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut rows: HashMap<String, AggregateRow> = HashMap::new();

    for task in tasks {
        let metrics = reconcile(task, options.scope);
        for label in dimension.labels(task) {
            let row = rows.entry(label.clone()).or_insert_with(|| AggregateRow {
                label,
                count: 0,
                hours: 0.0,
                estimated_hours: 0.0,
            });
            row.count += 1;
            row.hours += metrics.hours_spent;
            row.estimated_hours += metrics.hours_estimated;
        }
    }

    let mut rows: Vec<AggregateRow> = rows.into_values().collect();
    sort_rows(&mut rows, options.order);
    rows
}

/// Parse `dimension` and group; unknown keys are a caller error.
pub fn aggregate_by_key<'a, I>(tasks: I, dimension: &str, options: AggregateOptions) -> Result<Vec<AggregateRow>, CoreError>
where
    I: IntoIterator<Item = &'a Task>,
{
    let dimension: Dimension = dimension.parse()?;
    Ok(aggregate(tasks, dimension, options))
}

fn sort_rows(rows: &mut [AggregateRow], order: SortOrder) {
    match order {
        SortOrder::HoursDesc => rows.sort_by(|a, b| {
            b.hours
                .total_cmp(&a.hours)
                .then_with(|| a.label.cmp(&b.label))
        }),
        SortOrder::Alphabetical => rows.sort_by(|a, b| {
            a.label
                .to_lowercase()
                .cmp(&b.label.to_lowercase())
                .then_with(|| a.label.cmp(&b.label))
        }),
        SortOrder::Rank => rows.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.hours.total_cmp(&a.hours))
                .then_with(|| a.label.cmp(&b.label))
        }),
    }
}
