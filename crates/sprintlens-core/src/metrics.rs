//! Hybrid metrics: the iteration-scoped vs lifetime view of a task's effort.
//!
//! A task carried across several iterations has two honest answers to "how
//! big is it and how much was spent": the remaining work and the hours of the
//! current iteration, or the original estimate and the cumulative hours.
//! Capacity questions want the first, estimation-accuracy questions want the
//! second. [`reconcile`] is the only place where that choice is made; every
//! report asks it instead of reading the raw fields.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify;
use crate::model::Task;

/// Which view of a task's effort to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricScope {
    /// Remaining estimate and hours spent in the current iteration
    #[default]
    CurrentIteration,
    /// Original estimate and cumulative hours
    Lifetime,
}

/// Estimate and spent hours for one task under one scope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HybridMetrics {
    pub hours_estimated: f64,
    pub hours_spent: f64,
}

impl HybridMetrics {
    /// See [`estimation_accuracy`].
    pub fn accuracy(&self) -> Option<f64> {
        estimation_accuracy(self.hours_estimated, self.hours_spent)
    }
}

/// Clamp a raw hours value: negative, NaN and infinite become zero.
pub fn sanitize_hours(hours: f64) -> f64 {
    if hours.is_finite() && hours >= 0.0 {
        hours
    } else {
        debug!(hours, "clamping malformed hours value to zero");
        0.0
    }
}

/// Resolve a task's estimate and spent hours for `scope`.
pub fn reconcile(task: &Task, scope: MetricScope) -> HybridMetrics {
    let lifetime = &task.lifetime;
    match scope {
        MetricScope::CurrentIteration => {
            let current = task.current_iteration.as_ref();
            let estimate = current
                .and_then(|c| c.remaining_estimate_hours)
                .unwrap_or(lifetime.estimate_hours);
            let spent = current
                .and_then(|c| c.spent_hours)
                .unwrap_or(lifetime.spent_hours);
            HybridMetrics {
                hours_estimated: sanitize_hours(estimate),
                hours_spent: sanitize_hours(spent),
            }
        }
        MetricScope::Lifetime => HybridMetrics {
            hours_estimated: sanitize_hours(lifetime.estimate_hours),
            hours_spent: sanitize_hours(lifetime.total_spent_hours.unwrap_or(lifetime.spent_hours)),
        },
    }
}

/// Percentage deviation of spent hours from the estimate.
///
/// Positive means the task finished under its estimate (overestimated),
/// negative means it ran over (underestimated). `None` when there is no
/// positive estimate to compare against.
pub fn estimation_accuracy(hours_estimated: f64, hours_spent: f64) -> Option<f64> {
    if !(hours_estimated > 0.0) || !hours_spent.is_finite() {
        return None;
    }
    Some(100.0 * (hours_estimated - hours_spent) / hours_estimated)
}

/// Direction of an estimation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateVerdict {
    Overestimated,
    OnTarget,
    Underestimated,
}

impl EstimateVerdict {
    /// Classify an accuracy percentage; within `tolerance_pct` is on target.
    pub fn from_accuracy(accuracy: f64, tolerance_pct: f64) -> Self {
        if accuracy.abs() <= tolerance_pct {
            EstimateVerdict::OnTarget
        } else if accuracy > 0.0 {
            EstimateVerdict::Overestimated
        } else {
            EstimateVerdict::Underestimated
        }
    }
}

/// Estimation accuracy over a set of delivered tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    /// Tasks with a usable estimate
    pub sample_count: usize,
    /// Mean accuracy percentage (0 when there are no samples)
    pub mean_accuracy: f64,
    /// Accuracy of the summed estimate against the summed hours
    pub aggregate_accuracy: Option<f64>,
    pub overestimated: usize,
    pub on_target: usize,
    pub underestimated: usize,
    /// Delivered tasks skipped for lacking an estimate
    pub without_estimate: usize,
}

impl AccuracySummary {
    /// Summarize lifetime-scope accuracy for the developer-delivered tasks in
    /// `tasks`. Neutral tasks (meetings, training) are ignored.
    pub fn from_tasks<'a, I>(tasks: I, tolerance_pct: f64) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut summary = AccuracySummary::default();
        let mut accuracy_sum = 0.0;
        let mut total_estimated = 0.0;
        let mut total_spent = 0.0;

        for task in tasks {
            if !classify::is_completed(&task.status) || classify::is_neutral(&task.hidden_details) {
                continue;
            }
            let metrics = reconcile(task, MetricScope::Lifetime);
            let Some(accuracy) = metrics.accuracy() else {
                summary.without_estimate += 1;
                continue;
            };
            summary.sample_count += 1;
            accuracy_sum += accuracy;
            total_estimated += metrics.hours_estimated;
            total_spent += metrics.hours_spent;
            match EstimateVerdict::from_accuracy(accuracy, tolerance_pct) {
                EstimateVerdict::Overestimated => summary.overestimated += 1,
                EstimateVerdict::OnTarget => summary.on_target += 1,
                EstimateVerdict::Underestimated => summary.underestimated += 1,
            }
        }

        if summary.sample_count > 0 {
            summary.mean_accuracy = accuracy_sum / summary.sample_count as f64;
        }
        summary.aggregate_accuracy = estimation_accuracy(total_estimated, total_spent);
        summary
    }
}
