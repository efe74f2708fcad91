//! Snapshot container with full recomputation on every load.
//!
//! [`AnalyticsStore`] holds one immutable [`Snapshot`] of the source data and
//! the [`Reports`] computed from it. Loading data (all of it, or any single
//! collection) swaps the snapshot and recomputes every report before
//! returning, so a reader holding an `Arc<Reports>` always sees figures that
//! belong to one snapshot. There is no incremental update and nothing is
//! cached across loads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregate::{aggregate, AggregateOptions, AggregateRow, Dimension};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::cost::{CostAggregator, CostReport};
use crate::deadline::{DeadlineClassifier, DeadlineReport};
use crate::error::Result;
use crate::flow::{BacklogFlowAnalyzer, BacklogFlowReport, CapacityForecast, CapacityPlanner};
use crate::model::{HourlyRates, SprintMetadata, Task, WorklogEntry};
use crate::summary::{SprintSummarizer, SprintSummary};
use crate::worklogs::{WorklogAudit, WorklogIndex};

/// Immutable source data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub worklogs: Vec<WorklogEntry>,
    #[serde(default)]
    pub sprints: Vec<SprintMetadata>,
    #[serde(default)]
    pub rates: HourlyRates,
}

impl Snapshot {
    /// Parse a snapshot handed over by the host as JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Every report derived from one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reports {
    /// Increments with every recomputation
    pub generation: u64,
    pub today: NaiveDate,
    pub sprint_summaries: Vec<SprintSummary>,
    pub backlog_flow: BacklogFlowReport,
    /// Forecast over all developers
    pub capacity: CapacityForecast,
    pub deadlines: DeadlineReport,
    /// Cost over all completed iterations
    pub cost: CostReport,
    pub worklog_audit: WorklogAudit,
}

impl Reports {
    /// Compute every report for `snapshot` as of `today`.
    pub fn compute(snapshot: &Snapshot, config: &EngineConfig, today: NaiveDate, generation: u64) -> Self {
        let index = WorklogIndex::build(&snapshot.tasks, &snapshot.worklogs);

        let sprint_summaries = SprintSummarizer::new(today)
            .with_tolerance(config.accuracy_tolerance_pct)
            .summarize(&snapshot.tasks, &index, &snapshot.sprints);
        let backlog_flow = BacklogFlowAnalyzer::new(today).analyze(&snapshot.tasks, &index, &snapshot.sprints);
        let capacity = CapacityPlanner::from_config(config).forecast(
            &snapshot.tasks,
            &index,
            &snapshot.sprints,
            &backlog_flow.averages,
            &[],
            today,
        );
        let deadlines = DeadlineClassifier::from_config(today, config).classify(&snapshot.tasks, &snapshot.sprints);
        let cost = CostAggregator::new(today).aggregate(
            &snapshot.tasks,
            &index,
            &snapshot.sprints,
            &snapshot.rates,
            None,
        );

        Self {
            generation,
            today,
            sprint_summaries,
            backlog_flow,
            capacity,
            deadlines,
            cost,
            worklog_audit: index.audit().clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Host-owned state container for the analytics engine.
pub struct AnalyticsStore<C: Clock = SystemClock> {
    config: EngineConfig,
    clock: C,
    snapshot: Arc<Snapshot>,
    reports: Arc<Reports>,
}

impl AnalyticsStore<SystemClock> {
    /// Empty store on the local wall clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AnalyticsStore<C> {
    /// Empty store; reports for the empty snapshot are computed immediately.
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        let snapshot = Arc::new(Snapshot::default());
        let reports = Arc::new(Reports::compute(&snapshot, &config, clock.today(), 0));
        Self {
            config,
            clock,
            snapshot,
            reports,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn reports(&self) -> Arc<Reports> {
        Arc::clone(&self.reports)
    }

    /// Replace every collection at once.
    pub fn load(
        &mut self,
        tasks: Vec<Task>,
        worklogs: Vec<WorklogEntry>,
        sprints: Vec<SprintMetadata>,
        rates: HourlyRates,
    ) -> Arc<Reports> {
        self.swap(Snapshot {
            tasks,
            worklogs,
            sprints,
            rates,
        })
    }

    pub fn replace_tasks(&mut self, tasks: Vec<Task>) -> Arc<Reports> {
        let next = Snapshot {
            tasks,
            ..(*self.snapshot).clone()
        };
        self.swap(next)
    }

    pub fn replace_worklogs(&mut self, worklogs: Vec<WorklogEntry>) -> Arc<Reports> {
        let next = Snapshot {
            worklogs,
            ..(*self.snapshot).clone()
        };
        self.swap(next)
    }

    pub fn replace_sprints(&mut self, sprints: Vec<SprintMetadata>) -> Arc<Reports> {
        let next = Snapshot {
            sprints,
            ..(*self.snapshot).clone()
        };
        self.swap(next)
    }

    pub fn replace_rates(&mut self, rates: HourlyRates) -> Arc<Reports> {
        let next = Snapshot {
            rates,
            ..(*self.snapshot).clone()
        };
        self.swap(next)
    }

    /// Recompute against the current date without changing the data, e.g.
    /// after midnight.
    pub fn refresh(&mut self) -> Arc<Reports> {
        let snapshot = Arc::clone(&self.snapshot);
        self.recompute(&snapshot)
    }

    /// Capacity forecast restricted to `developers` (empty selects everyone).
    pub fn capacity_for(&self, developers: &[String]) -> CapacityForecast {
        let index = WorklogIndex::build(&self.snapshot.tasks, &self.snapshot.worklogs);
        CapacityPlanner::from_config(&self.config).forecast(
            &self.snapshot.tasks,
            &index,
            &self.snapshot.sprints,
            &self.reports.backlog_flow.averages,
            developers,
            self.reports.today,
        )
    }

    /// Cost report over the named iterations.
    pub fn cost_for(&self, iterations: &[String]) -> CostReport {
        let index = WorklogIndex::build(&self.snapshot.tasks, &self.snapshot.worklogs);
        CostAggregator::new(self.reports.today).aggregate(
            &self.snapshot.tasks,
            &index,
            &self.snapshot.sprints,
            &self.snapshot.rates,
            Some(iterations),
        )
    }

    /// Group the current snapshot's tasks by `dimension`.
    pub fn aggregate(&self, dimension: Dimension, options: AggregateOptions) -> Vec<AggregateRow> {
        aggregate(&self.snapshot.tasks, dimension, options)
    }

    fn swap(&mut self, next: Snapshot) -> Arc<Reports> {
        debug!(
            tasks = next.tasks.len(),
            worklogs = next.worklogs.len(),
            sprints = next.sprints.len(),
            rates = next.rates.len(),
            "swapping analytics snapshot"
        );
        let next = Arc::new(next);
        let reports = self.recompute(&next);
        self.snapshot = next;
        reports
    }

    fn recompute(&mut self, snapshot: &Snapshot) -> Arc<Reports> {
        let generation = self.reports.generation + 1;
        let reports = Arc::new(Reports::compute(snapshot, &self.config, self.clock.today(), generation));
        info!(
            generation,
            today = %reports.today,
            orphan_worklogs = reports.worklog_audit.orphan_entries,
            "analytics reports recomputed"
        );
        self.reports = Arc::clone(&reports);
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn store() -> AnalyticsStore<FixedClock> {
        AnalyticsStore::with_clock(EngineConfig::default(), FixedClock(d(2, 1)))
    }

    #[test]
    fn starts_empty_with_reports() {
        let store = store();
        let reports = store.reports();
        assert_eq!(reports.generation, 0);
        assert!(reports.sprint_summaries.is_empty());
        assert!(reports.capacity.is_insufficient());
        assert_eq!(reports.cost.total_cost, 0.0);
    }

    #[test]
    fn partial_replacement_keeps_other_collections() {
        let mut store = store();
        store.load(
            vec![Task::new("1", "A-1").with_status("Closed").with_sprint("S1")],
            vec![WorklogEntry::new("A-1", d(1, 2), 2.0).by("Ana")],
            vec![SprintMetadata::new("S1", d(1, 1), d(1, 14))],
            HourlyRates::new(),
        );
        let before = store.reports();
        assert_eq!(before.generation, 1);
        assert_eq!(before.cost.total_cost, 0.0);

        let after = store.replace_rates(HourlyRates::new().with_rate("Ana", 10.0));
        assert_eq!(after.generation, 2);
        assert_eq!(after.cost.total_cost, 20.0);
        assert_eq!(store.snapshot().tasks.len(), 1);
        // Readers holding the old Arc still see the old figures.
        assert_eq!(before.cost.total_cost, 0.0);
    }

    #[test]
    fn snapshot_json_errors_surface_as_core_errors() {
        let err = Snapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Json(_)));

        let snapshot = Snapshot::from_json(r#"{ "tasks": [{ "id": "1" }] }"#).unwrap();
        assert_eq!(snapshot.tasks.len(), 1);
        assert!(snapshot.worklogs.is_empty());

        let json = store().reports().to_json().unwrap();
        assert!(json.contains("\"worklog_audit\""));
    }

    #[test]
    fn on_demand_reports_use_snapshot() {
        let mut store = store();
        store.load(
            vec![
                Task::new("1", "A-1").with_status("Closed").with_sprint("S1").with_responsible("Ana"),
                Task::new("2", "A-2").with_created(d(1, 3)),
            ],
            vec![WorklogEntry::new("A-1", d(1, 2), 2.0)],
            vec![SprintMetadata::new("S1", d(1, 1), d(1, 14))],
            HourlyRates::new().with_rate("Ana", 30.0),
        );
        assert!(store.capacity_for(&["Ana".to_string()]).recommendation().is_some());
        assert!(store.capacity_for(&["Bia".to_string()]).is_insufficient());
        assert_eq!(store.cost_for(&["S1".to_string()]).total_cost, 60.0);
        assert_eq!(store.cost_for(&[]).total_cost, 0.0);
        assert_eq!(store.aggregate(Dimension::Type, AggregateOptions::default()).len(), 1);
    }
}
