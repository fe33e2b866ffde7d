//! Line-oriented status stream
//!
//! The executor emits one [`StatusEvent`] when a workload is scheduled and
//! one when it finishes. Abandoned workloads produce no finish event.

use std::fmt;

use serde::Serialize;

use crate::workload::{RunOutcome, RunReport, WorkIndex};

/// One status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Workload derived and about to be created
    Scheduled {
        /// Work index
        index: WorkIndex,
        /// Workload name
        name: String,
        /// Assigned network
        network_id: String,
        /// Sleep duration in seconds
        duration_secs: u64,
    },

    /// Removal event arrived
    Exited {
        /// Work index
        index: WorkIndex,
        /// Workload name
        name: String,
        /// Exit status
        exit_code: i64,
        /// Error attached by the runtime
        #[serde(skip_serializing_if = "Option::is_none")]
        runtime_error: Option<String>,
        /// Completion time
        finished_at: chrono::DateTime<chrono::Utc>,
    },

    /// Waiting for removal failed
    WaitFailed {
        /// Work index
        index: WorkIndex,
        /// Workload name
        name: String,
        /// Wait error text
        error: String,
        /// Failure time
        finished_at: chrono::DateTime<chrono::Utc>,
    },
}

impl StatusEvent {
    /// Finish event for a report; `None` for abandoned workloads
    pub fn from_report(report: &RunReport) -> Option<Self> {
        let index = report.spec.index;
        let name = report.spec.name.clone();
        match &report.outcome {
            RunOutcome::Completed(exit) => Some(StatusEvent::Exited {
                index,
                name,
                exit_code: exit.exit_code,
                runtime_error: exit.runtime_error.clone(),
                finished_at: report.finished_at,
            }),
            RunOutcome::WaitFailed(err) => Some(StatusEvent::WaitFailed {
                index,
                name,
                error: err.to_string(),
                finished_at: report.finished_at,
            }),
            RunOutcome::Abandoned => None,
        }
    }

    /// Work index the event refers to
    pub fn index(&self) -> WorkIndex {
        match self {
            StatusEvent::Scheduled { index, .. }
            | StatusEvent::Exited { index, .. }
            | StatusEvent::WaitFailed { index, .. } => *index,
        }
    }

    /// Whether this event ends a workload's lifecycle
    pub fn is_finish(&self) -> bool {
        !matches!(self, StatusEvent::Scheduled { .. })
    }

    /// JSON rendering, one object per line
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "event": "encode_error", "error": e.to_string() }).to_string()
        })
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Scheduled {
                name,
                duration_secs,
                ..
            } => write!(f, "{name} will sleep for {duration_secs} seconds"),
            StatusEvent::Exited {
                name,
                exit_code,
                runtime_error,
                ..
            } => {
                if let Some(err) = runtime_error {
                    writeln!(f, "{name}: wait: received error: {err}")?;
                }
                write!(f, "{name}: wait: code={exit_code}")
            }
            StatusEvent::WaitFailed { name, error, .. } => {
                write!(f, "{name}: error while waiting: {error}")
            }
        }
    }
}
