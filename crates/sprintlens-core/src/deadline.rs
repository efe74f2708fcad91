//! Delivery deadline risk buckets and per-client delivery schedules.
//!
//! An open task's deadline is its explicit due date when it has one. Without
//! one, a task planned into an iteration that has not ended yet gets a
//! forecast deadline derived from the iteration end. Tasks left on a past
//! iteration with no due date are dropped from deadline management, and tasks
//! with neither a due date nor a known iteration are unscheduled.
//!
//! Forecasts are estimates, not commitments, so they are never overdue.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::NONE_LABEL;
use crate::classify;
use crate::config::EngineConfig;
use crate::dates::{add_days, days_between, forecast_delivery_date};
use crate::model::{find_by_label, SprintMetadata, Task};

/// Deadline risk bucket. Every open task lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineBucket {
    Overdue,
    DueToday,
    DueSoon,
    DueMonth,
    OnTrack,
    Unscheduled,
}

/// Bucket a deadline relative to `today`.
pub fn bucket_for(
    deadline: NaiveDate,
    is_forecast: bool,
    today: NaiveDate,
    due_soon_days: i64,
    due_month_days: i64,
) -> DeadlineBucket {
    if deadline < today {
        return if is_forecast {
            DeadlineBucket::OnTrack
        } else {
            DeadlineBucket::Overdue
        };
    }
    if deadline == today {
        DeadlineBucket::DueToday
    } else if deadline <= add_days(today, due_soon_days) {
        DeadlineBucket::DueSoon
    } else if deadline <= add_days(today, due_month_days) {
        DeadlineBucket::DueMonth
    } else {
        DeadlineBucket::OnTrack
    }
}

/// One open task with its resolved deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineEntry {
    pub task_id: String,
    pub code: String,
    pub summary: String,
    pub responsible: Option<String>,
    pub clients: Vec<String>,
    pub sprint: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub is_forecast: bool,
    pub bucket: DeadlineBucket,
    /// Days from today to the deadline, negative when past
    pub days_remaining: Option<i64>,
}

/// Number of entries per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub overdue: usize,
    pub due_today: usize,
    pub due_soon: usize,
    pub due_month: usize,
    pub on_track: usize,
    pub unscheduled: usize,
}

impl BucketCounts {
    fn add(&mut self, bucket: DeadlineBucket) {
        match bucket {
            DeadlineBucket::Overdue => self.overdue += 1,
            DeadlineBucket::DueToday => self.due_today += 1,
            DeadlineBucket::DueSoon => self.due_soon += 1,
            DeadlineBucket::DueMonth => self.due_month += 1,
            DeadlineBucket::OnTrack => self.on_track += 1,
            DeadlineBucket::Unscheduled => self.unscheduled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.overdue + self.due_today + self.due_soon + self.due_month + self.on_track + self.unscheduled
    }
}

/// All deliveries for a client on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDay {
    pub date: NaiveDate,
    /// True only when every task on this day carries a forecast deadline
    pub is_forecast: bool,
    pub bucket: DeadlineBucket,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSchedule {
    pub client: String,
    pub deliveries: Vec<DeliveryDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineReport {
    pub today: NaiveDate,
    /// Sorted by deadline, unscheduled last
    pub entries: Vec<DeadlineEntry>,
    pub counts: BucketCounts,
    /// Open tasks on a past iteration without a due date
    pub excluded_past_iteration: usize,
    pub client_schedules: Vec<ClientSchedule>,
}

/// Resolves deadlines and buckets open tasks.
#[derive(Debug, Clone)]
pub struct DeadlineClassifier {
    pub today: NaiveDate,
    pub forecast_offset_days: i64,
    pub forecast_weekday: Weekday,
    pub due_soon_days: i64,
    pub due_month_days: i64,
}

/// How a task's deadline was resolved.
enum Resolution {
    Dated { deadline: NaiveDate, is_forecast: bool },
    Unscheduled,
    Excluded,
}

impl DeadlineClassifier {
    pub fn new(today: NaiveDate) -> Self {
        Self::from_config(today, &EngineConfig::default())
    }

    pub fn from_config(today: NaiveDate, config: &EngineConfig) -> Self {
        Self {
            today,
            forecast_offset_days: config.forecast_offset_days,
            forecast_weekday: config.weekday(),
            due_soon_days: config.due_soon_days,
            due_month_days: config.due_month_days,
        }
    }

    fn resolve(&self, task: &Task, sprints: &[SprintMetadata]) -> Resolution {
        if let Some(due) = task.due_date {
            return Resolution::Dated {
                deadline: due,
                is_forecast: false,
            };
        }
        let Some(sprint) = task.sprint_label().and_then(|label| find_by_label(sprints, label)) else {
            return Resolution::Unscheduled;
        };
        if sprint.end < self.today {
            return Resolution::Excluded;
        }
        Resolution::Dated {
            deadline: forecast_delivery_date(sprint.end, self.forecast_offset_days, self.forecast_weekday),
            is_forecast: true,
        }
    }

    pub fn classify(&self, tasks: &[Task], sprints: &[SprintMetadata]) -> DeadlineReport {
        let mut entries = Vec::new();
        let mut counts = BucketCounts::default();
        let mut excluded_past_iteration = 0;

        for task in tasks {
            if classify::is_fully_completed(&task.status) {
                continue;
            }
            let (deadline, is_forecast, bucket) = match self.resolve(task, sprints) {
                Resolution::Excluded => {
                    excluded_past_iteration += 1;
                    continue;
                }
                Resolution::Unscheduled => (None, false, DeadlineBucket::Unscheduled),
                Resolution::Dated { deadline, is_forecast } => (
                    Some(deadline),
                    is_forecast,
                    bucket_for(deadline, is_forecast, self.today, self.due_soon_days, self.due_month_days),
                ),
            };
            counts.add(bucket);
            entries.push(DeadlineEntry {
                task_id: task.id.clone(),
                code: task.display_key().to_string(),
                summary: task.summary.clone(),
                responsible: task.responsible.clone(),
                clients: task.clients.clone(),
                sprint: task.sprint_label().map(str::to_string),
                deadline,
                is_forecast,
                bucket,
                days_remaining: deadline.map(|date| days_between(self.today, date)),
            });
        }

        // `None` sorts before `Some`, so flip it to push unscheduled work last.
        entries.sort_by(|a, b| {
            (a.deadline.is_none(), a.deadline, &a.code).cmp(&(b.deadline.is_none(), b.deadline, &b.code))
        });

        let client_schedules = self.client_schedules(&entries);
        DeadlineReport {
            today: self.today,
            entries,
            counts,
            excluded_past_iteration,
            client_schedules,
        }
    }

    /// Group dated entries by client and merge same-day deliveries.
    fn client_schedules(&self, entries: &[DeadlineEntry]) -> Vec<ClientSchedule> {
        let mut by_client: BTreeMap<String, BTreeMap<NaiveDate, (bool, Vec<String>)>> = BTreeMap::new();

        for entry in entries {
            let Some(date) = entry.deadline else {
                continue;
            };
            let mut clients: Vec<&str> = entry
                .clients
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect();
            if clients.is_empty() {
                clients.push(NONE_LABEL);
            }
            clients.sort_unstable();
            clients.dedup();
            for client in clients {
                let day = by_client
                    .entry(client.to_string())
                    .or_default()
                    .entry(date)
                    .or_insert_with(|| (true, Vec::new()));
                day.0 &= entry.is_forecast;
                day.1.push(entry.code.clone());
            }
        }

        by_client
            .into_iter()
            .map(|(client, days)| ClientSchedule {
                client,
                deliveries: days
                    .into_iter()
                    .map(|(date, (is_forecast, tasks))| DeliveryDay {
                        date,
                        is_forecast,
                        bucket: bucket_for(date, is_forecast, self.today, self.due_soon_days, self.due_month_days),
                        tasks,
                    })
                    .collect(),
            })
            .collect()
    }
}
