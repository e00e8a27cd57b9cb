//! Scheduler runtime data: jobs, per-task statistics, snapshots

use chrono::{DateTime, Utc};
use mailsprint_common::types::{JobId, JobStatus, RecipientId, SenderId, TaskId, TaskStatus};
use serde::Serialize;

/// A single planned send, owned by the scheduler from task start until
/// stop/reset
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub task_id: TaskId,
    pub sender_id: SenderId,
    pub recipient_id: RecipientId,
    pub day: u32,
    pub scheduled_at: DateTime<Utc>,
    pub status: JobStatus,
    pub attempts: u32,
    pub error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Subject and body handed to the send backend for every job of a task
#[derive(Debug, Clone)]
pub struct MessageSpec {
    pub subject: String,
    pub body: String,
}

/// Aggregate counters for one task.
///
/// Counter updates happen under the scheduler lock in the same critical
/// section as the job transition, so
/// `sent + failed + pending + processing == total_emails` holds at every
/// observable point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStatistics {
    pub total_emails: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_pending: u64,
    pub total_processing: u64,
    pub success_rate: f64,
    pub progress_percent: f64,
}

impl TaskStatistics {
    /// Fresh counters for a task with `total` pending jobs
    pub fn seeded(total: u64) -> Self {
        Self {
            total_emails: total,
            total_pending: total,
            ..Self::default()
        }
    }

    /// Recompute the derived rates from the counters
    pub(crate) fn recompute_rates(&mut self) {
        let done = self.total_sent + self.total_failed;
        self.success_rate = if done > 0 {
            self.total_sent as f64 / done as f64
        } else {
            0.0
        };
        self.progress_percent = if self.total_emails > 0 {
            done as f64 / self.total_emails as f64 * 100.0
        } else {
            0.0
        };
    }
}

/// Per-task runtime state, in-memory only
#[derive(Debug)]
pub(crate) struct TaskRuntime {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub is_running: bool,
    pub message: MessageSpec,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: TaskStatistics,
    /// Job ids in plan order
    pub job_ids: Vec<JobId>,
}

/// Read-only view of a task's runtime
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub is_running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: TaskStatistics,
}

impl TaskRuntime {
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id,
            status: self.status,
            is_running: self.is_running,
            started_at: self.started_at,
            completed_at: self.completed_at,
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_statistics() {
        let stats = TaskStatistics::seeded(40);
        assert_eq!(stats.total_emails, 40);
        assert_eq!(stats.total_pending, 40);
        assert_eq!(stats.total_sent, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_rate_recompute() {
        let mut stats = TaskStatistics::seeded(10);
        stats.total_pending = 4;
        stats.total_sent = 4;
        stats.total_failed = 2;
        stats.recompute_rates();

        assert!((stats.success_rate - 4.0 / 6.0).abs() < 1e-9);
        assert!((stats.progress_percent - 60.0).abs() < 1e-9);
    }
}
