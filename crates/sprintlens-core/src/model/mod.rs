//! Input snapshot types: tasks, worklogs, the iteration calendar and
//! hourly rates.

mod rates;
mod sprint;
mod task;
mod worklog;

pub use rates::HourlyRates;
pub use sprint::{find_by_label, sorted_by_start, SprintMetadata, SprintPhase};
pub use task::{CurrentIterationMetrics, LifetimeMetrics, Task, TaskType};
pub use worklog::WorklogEntry;
