//! # Sprintlens Core Library
//!
//! Analytics and capacity forecasting over an iterative delivery process.
//! The library takes tasks, worklogs, iteration calendars and developer
//! hourly rates, and derives sprint summaries, backlog inflow/outflow,
//! staffing forecasts, deadline-risk buckets and cost breakdowns.
//!
//! ## Architecture
//!
//! - **Model**: plain serde records for tasks, worklogs, sprints and rates
//! - **Classification**: status and tag vocabularies behind one normalizer
//! - **Metrics**: reconciles the current-iteration and lifetime views of effort
//! - **Flow**: backlog inflow/outflow per iteration and percentile-based capacity
//! - **Store**: immutable snapshot plus a full recompute on every load
//!
//! Every computation is synchronous and pure given a snapshot and a date.
//!
//! ## Key Components
//!
//! - [`AnalyticsStore`]: snapshot container holding the current [`Reports`]
//! - [`BacklogFlowAnalyzer`]: per-iteration inflow/outflow
//! - [`CapacityPlanner`]: staffing recommendation from throughput percentiles
//! - [`DeadlineClassifier`]: deadline-risk buckets for open tasks
//! - [`CostAggregator`]: worklog cost by client, feature, developer and iteration
//! - [`EngineConfig`]: TOML-backed tuning knobs

pub mod aggregate;
pub mod classify;
pub mod clock;
pub mod config;
pub mod cost;
pub mod dates;
pub mod deadline;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod model;
pub mod store;
pub mod summary;
pub mod worklogs;

pub use aggregate::{aggregate, aggregate_by_key, AggregateOptions, AggregateRow, Dimension, SortOrder};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use cost::{CostAggregator, CostLine, CostReport};
pub use dates::DateWindow;
pub use deadline::{DeadlineBucket, DeadlineClassifier, DeadlineReport};
pub use error::{ConfigError, CoreError, Result};
pub use flow::{
    BacklogFlowAnalyzer, BacklogFlowReport, CapacityForecast, CapacityPlanner, CapacityRecommendation,
    ExitRatio, PercentileMethod,
};
pub use metrics::{estimation_accuracy, reconcile, AccuracySummary, HybridMetrics, MetricScope};
pub use model::{HourlyRates, SprintMetadata, SprintPhase, Task, TaskType, WorklogEntry};
pub use store::{AnalyticsStore, Reports, Snapshot};
pub use summary::{SprintSummarizer, SprintSummary};
pub use worklogs::{WorklogAudit, WorklogIndex};
