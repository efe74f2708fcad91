//! Backlog flow and capacity forecasting.
//!
//! This module tracks how work enters and leaves the backlog per iteration
//! and turns historical throughput into staffing recommendations.

mod backlog;
mod capacity;
mod percentile;

pub use backlog::{
    Allocation, BacklogFlowAnalyzer, BacklogFlowReport, ExitRatio, FlowAverages,
    FlowBreakdown, FlowCategory, FlowCounts, IterationFlow,
};

pub use capacity::{
    CapacityForecast, CapacityPlanner, CapacityRecommendation, StaffingScenario,
    ThroughputSample,
};

pub use percentile::{percentile, PercentileMethod};
