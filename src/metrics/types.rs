use std::fmt;

use serde::Serialize;

/// Hours of work one sprint can absorb (two weeks).
pub const DEFAULT_CAPACITY_HOURS: f64 = 80.0;

/// Status names counted as done / in progress / open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabels {
    pub done: String,
    pub in_progress: String,
    pub open: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            done: "Готово".to_string(),
            in_progress: "В работе".to_string(),
            open: "Открыто".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsOptions {
    pub capacity_hours: f64,
    pub statuses: StatusLabels,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            capacity_hours: DEFAULT_CAPACITY_HOURS,
            statuses: StatusLabels::default(),
        }
    }
}

/// Raw aggregates over the issues of one sprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SprintTotals {
    pub sprint: String,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub in_progress_tasks: u64,
    pub open_tasks: u64,
    pub total_estimated: f64,
    pub total_spent: f64,
    /// Hours spent on completed issues only.
    pub completed_spent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadStatus {
    /// Above 100% of capacity.
    Overloaded,
    /// Above 90%.
    Full,
    /// Above 70%.
    Normal,
    Light,
}

impl WorkloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadStatus::Overloaded => "overloaded",
            WorkloadStatus::Full => "full",
            WorkloadStatus::Normal => "normal",
            WorkloadStatus::Light => "light",
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workload and progress figures for one sprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintMetrics {
    pub sprint_name: String,
    pub sprint_capacity: f64,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub in_progress_tasks: u64,
    pub open_tasks: u64,
    pub total_estimated: f64,
    pub total_spent: f64,
    pub completed_spent: f64,
    /// Capacity minus hours spent; negative when over capacity.
    pub remaining_capacity: f64,
    /// Estimated hours minus hours spent on completed issues.
    pub remaining_work: f64,
    pub progress_percent: f64,
    pub workload_percent: f64,
    pub time_used_percent: f64,
    pub workload_status: WorkloadStatus,
}

/// Result of the current-sprint computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CurrentSprintMetrics {
    Data(SprintMetrics),
    /// No issue is assigned to any sprint.
    NoData,
}
