//! Status matrix - per-(recipient, sender) view over a task's jobs
//!
//! A pure projection: the job store stays authoritative and the matrix is
//! rebuilt on read. Keyed recipient-first so "all senders for one
//! recipient" is a single inner-map lookup.

use mailsprint_common::types::{JobStatus, RecipientId, SenderId};
use serde::Serialize;
use std::collections::HashMap;

use crate::scheduler::Job;

/// Two-level status view: recipient id -> sender id -> job status
pub type StatusMatrix = HashMap<RecipientId, HashMap<SenderId, JobStatus>>;

/// Aggregate counters computed in the same pass as the matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatrixStats {
    pub pending: u64,
    pub processing: u64,
    pub sent: u64,
    pub failed: u64,
    pub total: u64,
    pub success_rate: f64,
    pub completion_rate: f64,
}

/// Build the matrix and its stats from a task's jobs
pub fn from_jobs(jobs: &[Job]) -> (StatusMatrix, MatrixStats) {
    let mut matrix: StatusMatrix = HashMap::new();
    let mut stats = MatrixStats::default();

    for job in jobs {
        matrix
            .entry(job.recipient_id)
            .or_default()
            .insert(job.sender_id, job.status);

        stats.total += 1;
        match job.status {
            JobStatus::Pending => stats.pending += 1,
            JobStatus::Processing => stats.processing += 1,
            JobStatus::Sent => stats.sent += 1,
            JobStatus::Failed => stats.failed += 1,
        }
    }

    let done = stats.sent + stats.failed;
    if done > 0 {
        stats.success_rate = stats.sent as f64 / done as f64;
    }
    if stats.total > 0 {
        stats.completion_rate = done as f64 / stats.total as f64 * 100.0;
    }

    (matrix, stats)
}

/// Matrix with every seeded pair marked pending, as returned by the
/// calculate operation before any job exists
pub fn seeded(seed: &[(RecipientId, SenderId)]) -> StatusMatrix {
    let mut matrix: StatusMatrix = HashMap::new();
    for &(recipient_id, sender_id) in seed {
        matrix
            .entry(recipient_id)
            .or_default()
            .insert(sender_id, JobStatus::Pending);
    }
    matrix
}
