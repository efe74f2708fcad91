//! Staffing forecast from historical throughput.
//!
//! For every completed iteration in which at least one selected developer
//! closed a task, throughput per developer is
//! `closed tasks / distinct developers who closed them`. The low percentile
//! of that series (P50 by default) gives the conservative forecast, the high
//! one (P80) the optimistic forecast. Developers needed to absorb the average
//! inflow is `ceil(avg_inflow / throughput)`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::backlog::{counts_toward_flow, outflow_iteration, FlowAverages};
use super::percentile::{percentile, PercentileMethod};
use crate::config::EngineConfig;
use crate::model::{sorted_by_start, SprintMetadata, Task};
use crate::worklogs::WorklogIndex;

/// Throughput observed in one completed iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub sprint: String,
    pub closed_tasks: usize,
    pub developers: usize,
    pub throughput_per_dev: f64,
}

/// Staffing need under one throughput assumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingScenario {
    pub percentile: f64,
    pub throughput_per_dev: f64,
    pub total_devs_needed: u32,
    /// `max(0, total_devs_needed - avg_current_dev_count)`
    pub suggested_devs: f64,
}

impl StaffingScenario {
    fn new(percentile: f64, throughput_per_dev: f64, avg_inflow: f64, avg_current_dev_count: f64) -> Self {
        let total_devs_needed = if throughput_per_dev > 0.0 && avg_inflow > 0.0 {
            (avg_inflow / throughput_per_dev).ceil() as u32
        } else {
            0
        };
        Self {
            percentile,
            throughput_per_dev,
            total_devs_needed,
            suggested_devs: (total_devs_needed as f64 - avg_current_dev_count).max(0.0),
        }
    }
}

/// Staffing recommendation built from at least one throughput sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecommendation {
    /// Developers the forecast was restricted to; empty means everyone
    pub developers: Vec<String>,
    pub samples: Vec<ThroughputSample>,
    pub avg_inflow: f64,
    pub avg_current_dev_count: f64,
    pub method: PercentileMethod,
    /// Lower throughput assumption
    pub conservative: StaffingScenario,
    /// Higher throughput assumption
    pub optimistic: StaffingScenario,
}

/// Result of a capacity forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CapacityForecast {
    /// No completed iteration had a selected developer closing work
    InsufficientData { completed_iterations: usize },
    Forecast(CapacityRecommendation),
}

impl CapacityForecast {
    pub fn recommendation(&self) -> Option<&CapacityRecommendation> {
        match self {
            CapacityForecast::Forecast(rec) => Some(rec),
            CapacityForecast::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, CapacityForecast::InsufficientData { .. })
    }
}

/// Builds [`CapacityForecast`]s.
#[derive(Debug, Clone)]
pub struct CapacityPlanner {
    pub method: PercentileMethod,
    pub low_percentile: f64,
    pub high_percentile: f64,
}

impl Default for CapacityPlanner {
    fn default() -> Self {
        Self {
            method: PercentileMethod::Linear,
            low_percentile: 50.0,
            high_percentile: 80.0,
        }
    }
}

impl CapacityPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            method: config.percentile_method,
            low_percentile: config.low_percentile,
            high_percentile: config.high_percentile,
        }
    }

    /// Throughput series over completed iterations, in calendar order.
    pub fn throughput_samples(
        &self,
        tasks: &[Task],
        worklogs: &WorklogIndex<'_>,
        sprints: &[SprintMetadata],
        developers: &[String],
        today: NaiveDate,
    ) -> Vec<ThroughputSample> {
        let sorted = sorted_by_start(sprints);
        let selection: BTreeSet<String> = developers
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();

        let mut closed = vec![0usize; sorted.len()];
        let mut closers: Vec<BTreeSet<String>> = vec![BTreeSet::new(); sorted.len()];

        for (position, task) in tasks.iter().enumerate() {
            if !counts_toward_flow(task) {
                continue;
            }
            let Some(developer) = task
                .responsible
                .as_deref()
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
            else {
                continue;
            };
            if !selection.is_empty() && !selection.contains(&developer) {
                continue;
            }
            let Some(i) = outflow_iteration(task, position, &sorted, worklogs) else {
                continue;
            };
            if !sorted[i].is_completed(today) {
                continue;
            }
            closed[i] += 1;
            closers[i].insert(developer);
        }

        sorted
            .iter()
            .zip(closed)
            .zip(closers)
            .filter(|((_, count), _)| *count > 0)
            .map(|((sprint, count), devs)| ThroughputSample {
                sprint: sprint.name.clone(),
                closed_tasks: count,
                developers: devs.len(),
                throughput_per_dev: count as f64 / devs.len() as f64,
            })
            .collect()
    }

    /// Forecast staffing for `developers` (empty selects everyone) against
    /// the average inflow in `averages`.
    pub fn forecast(
        &self,
        tasks: &[Task],
        worklogs: &WorklogIndex<'_>,
        sprints: &[SprintMetadata],
        averages: &FlowAverages,
        developers: &[String],
        today: NaiveDate,
    ) -> CapacityForecast {
        let samples = self.throughput_samples(tasks, worklogs, sprints, developers, today);
        let series: Vec<f64> = samples.iter().map(|s| s.throughput_per_dev).collect();

        let (Some(low), Some(high)) = (
            percentile(&series, self.low_percentile, self.method),
            percentile(&series, self.high_percentile, self.method),
        ) else {
            return CapacityForecast::InsufficientData {
                completed_iterations: averages.completed_iterations,
            };
        };

        let avg_current_dev_count =
            samples.iter().map(|s| s.developers as f64).sum::<f64>() / samples.len() as f64;
        let avg_inflow = averages.avg_inflow;

        CapacityForecast::Forecast(CapacityRecommendation {
            developers: developers.to_vec(),
            avg_inflow,
            avg_current_dev_count,
            method: self.method,
            conservative: StaffingScenario::new(self.low_percentile, low, avg_inflow, avg_current_dev_count),
            optimistic: StaffingScenario::new(self.high_percentile, high, avg_inflow, avg_current_dev_count),
            samples,
        })
    }
}
