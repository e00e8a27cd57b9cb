//! Campaign scheduler - materialises plans into timed jobs
//!
//! Owns per-task runtime: jobs, timer handles, statistics, and lifecycle.
//! One mutex guards all of it; the lock is taken briefly around state
//! transitions and is never held across a send-backend call.

mod jobs;

pub use jobs::{Job, MessageSpec, TaskSnapshot, TaskStatistics};

use jobs::TaskRuntime;

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use mailsprint_common::config::SchedulerConfig;
use mailsprint_common::types::{JobId, JobStatus, TaskId, TaskStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backend::SendBackend;
use crate::clock::{start_of_day, Clock, TimerHandle};
use crate::matrix::{self, MatrixStats, StatusMatrix};
use crate::planner::Plan;

/// Scheduler-level errors surfaced to the control path
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("plan integrity violation: {0}")]
    DataIntegrity(String),

    #[error("plan contains no emails to send")]
    EmptyPlan,
}

#[derive(Default)]
struct SchedulerState {
    tasks: HashMap<TaskId, TaskRuntime>,
    jobs: HashMap<JobId, Job>,
    /// One-shot timers for pending jobs, keyed by job id
    timers: HashMap<JobId, TimerHandle>,
    /// Low-frequency completion ticks, one per running task
    completion_ticks: HashMap<TaskId, TimerHandle>,
}

/// Time-driven campaign scheduler
#[derive(Clone)]
pub struct Scheduler {
    clock: Clock,
    backend: Arc<dyn SendBackend>,
    completion_interval: Duration,
    inner: Arc<Mutex<SchedulerState>>,
}

impl Scheduler {
    pub fn new(clock: Clock, backend: Arc<dyn SendBackend>, config: &SchedulerConfig) -> Self {
        Self {
            clock,
            backend,
            completion_interval: Duration::from_secs(config.completion_check_interval_secs),
            inner: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Expand a plan into jobs for `task_id`, arm their timers, and mark
    /// the task running. Any prior runtime for the task is wiped first, so
    /// re-starting is always safe.
    ///
    /// Plans with misaligned recipient/time lists are rejected without
    /// repair; nothing is created in that case.
    pub fn start_task(
        &self,
        task_id: TaskId,
        plan: &Plan,
        message: MessageSpec,
    ) -> Result<(), SchedulerError> {
        if let Some(detail) = plan.alignment_error() {
            return Err(SchedulerError::DataIntegrity(detail));
        }
        if plan.total_emails == 0 {
            return Err(SchedulerError::EmptyPlan);
        }

        let now = self.clock.now();
        let day_zero = start_of_day(now);

        let mut state = self.state();
        cleanup_task(&mut state, task_id);

        let mut job_ids = Vec::with_capacity(plan.total_emails);
        let mut jobs = Vec::with_capacity(plan.total_emails);
        for day_schedule in &plan.daily_schedule {
            let day_start = day_zero + ChronoDuration::days(day_schedule.day as i64 - 1);
            for per_sender in &day_schedule.per_sender {
                for (i, &recipient_id) in per_sender.recipient_ids.iter().enumerate() {
                    let scheduled_at = match per_sender.planned_times.get(i) {
                        Some(time) => {
                            day_start + ChronoDuration::seconds(time.num_seconds_from_midnight() as i64)
                        }
                        None => {
                            error!(
                                task = %task_id,
                                sender = %per_sender.sender_id,
                                day = day_schedule.day,
                                slot = i,
                                "missing planned time, falling back to start of day"
                            );
                            day_start
                        }
                    };

                    let id = JobId::compose(
                        task_id,
                        per_sender.sender_id,
                        recipient_id,
                        day_schedule.day,
                        i,
                    );
                    job_ids.push(id.clone());
                    jobs.push(Job {
                        id,
                        task_id,
                        sender_id: per_sender.sender_id,
                        recipient_id,
                        day: day_schedule.day,
                        scheduled_at,
                        status: JobStatus::Pending,
                        attempts: 0,
                        error: None,
                        sent_at: None,
                    });
                }
            }
        }

        let total = jobs.len();
        for job in jobs {
            self.arm_job(&mut state, job.id.clone(), job.scheduled_at);
            state.jobs.insert(job.id.clone(), job);
        }

        state.tasks.insert(
            task_id,
            TaskRuntime {
                task_id,
                status: TaskStatus::Running,
                is_running: true,
                message,
                started_at: Some(now),
                completed_at: None,
                stats: TaskStatistics::seeded(total as u64),
                job_ids,
            },
        );
        self.spawn_completion_tick(&mut state, task_id);

        info!(task = %task_id, jobs = total, days = plan.calculated_days, "task started");
        Ok(())
    }

    /// Freeze a running task: cancel every pending timer and the
    /// completion tick, keeping job statuses intact. Jobs already being
    /// sent run to their terminal outcome.
    pub fn pause_task(&self, task_id: TaskId) -> bool {
        let mut state = self.state();
        let SchedulerState {
            tasks,
            timers,
            completion_ticks,
            ..
        } = &mut *state;

        let Some(runtime) = tasks.get_mut(&task_id) else {
            return false;
        };
        if runtime.status != TaskStatus::Running {
            return false;
        }

        runtime.status = TaskStatus::Paused;
        runtime.is_running = false;
        for job_id in &runtime.job_ids {
            if let Some(handle) = timers.remove(job_id) {
                handle.cancel();
            }
        }
        if let Some(handle) = completion_ticks.remove(&task_id) {
            handle.cancel();
        }

        info!(task = %task_id, "task paused");
        true
    }

    /// Re-arm every still-pending job of a paused task. Overdue jobs fire
    /// immediately.
    pub fn resume_task(&self, task_id: TaskId) -> bool {
        let mut state = self.state();

        let pending: Vec<(JobId, DateTime<Utc>)> = {
            let SchedulerState { tasks, jobs, .. } = &mut *state;
            let Some(runtime) = tasks.get_mut(&task_id) else {
                return false;
            };
            if runtime.status != TaskStatus::Paused {
                return false;
            }
            runtime.status = TaskStatus::Running;
            runtime.is_running = true;

            runtime
                .job_ids
                .iter()
                .filter_map(|id| jobs.get(id))
                .filter(|job| job.status == JobStatus::Pending)
                .map(|job| (job.id.clone(), job.scheduled_at))
                .collect()
        };

        let rearmed = pending.len();
        for (job_id, scheduled_at) in pending {
            self.arm_job(&mut state, job_id, scheduled_at);
        }
        self.spawn_completion_tick(&mut state, task_id);
        self.check_completion(&mut state, task_id);

        info!(task = %task_id, rearmed, "task resumed");
        true
    }

    /// Full cleanup: cancel all timers and delete every job and the
    /// runtime for the task.
    pub fn stop_task(&self, task_id: TaskId) -> bool {
        let mut state = self.state();
        let stopped = cleanup_task(&mut state, task_id);
        if stopped {
            info!(task = %task_id, "task stopped");
        }
        stopped
    }

    /// Administrative wipe of every task, job, and timer
    pub fn reset(&self) {
        let mut state = self.state();
        for handle in state.timers.values() {
            handle.cancel();
        }
        for handle in state.completion_ticks.values() {
            handle.cancel();
        }
        let tasks = state.tasks.len();
        let jobs = state.jobs.len();
        state.timers.clear();
        state.completion_ticks.clear();
        state.jobs.clear();
        state.tasks.clear();

        warn!(tasks, jobs, "scheduler reset, all runtime state dropped");
    }

    /// Read-only runtime snapshot for a task
    pub fn task_status(&self, task_id: TaskId) -> Option<TaskSnapshot> {
        self.state().tasks.get(&task_id).map(TaskRuntime::snapshot)
    }

    /// Clone the task's jobs in plan order
    pub fn jobs_for_task(&self, task_id: TaskId) -> Vec<Job> {
        let state = self.state();
        let Some(runtime) = state.tasks.get(&task_id) else {
            return Vec::new();
        };
        runtime
            .job_ids
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .cloned()
            .collect()
    }

    /// Status matrix and aggregate stats for a task
    pub fn status_matrix(&self, task_id: TaskId) -> (StatusMatrix, MatrixStats) {
        matrix::from_jobs(&self.jobs_for_task(task_id))
    }

    /// Ids of all tasks with live runtime
    pub fn active_task_ids(&self) -> Vec<TaskId> {
        self.state().tasks.keys().copied().collect()
    }

    fn arm_job(&self, state: &mut SchedulerState, job_id: JobId, scheduled_at: DateTime<Utc>) {
        let scheduler = self.clone();
        let dispatch_id = job_id.clone();
        let handle = self
            .clock
            .schedule(scheduled_at, async move { scheduler.dispatch(dispatch_id).await });
        state.timers.insert(job_id, handle);
    }

    /// Timer callback: claim the job, run the send outside the lock, then
    /// apply the terminal transition.
    async fn dispatch(&self, job_id: JobId) {
        let claim = {
            let mut state = self.state();
            state.timers.remove(&job_id);

            let SchedulerState { tasks, jobs, .. } = &mut *state;
            let Some(job) = jobs.get_mut(&job_id) else {
                return;
            };
            let Some(runtime) = tasks.get_mut(&job.task_id) else {
                return;
            };
            // Re-check under the lock: the task may have been paused
            // between timer fire and here.
            if !runtime.is_running || job.status != JobStatus::Pending {
                return;
            }

            job.status = JobStatus::Processing;
            job.attempts += 1;
            runtime.stats.total_pending -= 1;
            runtime.stats.total_processing += 1;
            (
                job.task_id,
                job.sender_id,
                job.recipient_id,
                runtime.message.clone(),
            )
        };
        let (task_id, sender_id, recipient_id, message) = claim;

        debug!(job = %job_id, sender = %sender_id, "dispatching send");
        let result = self
            .backend
            .send(sender_id, recipient_id, &message.subject, &message.body)
            .await;

        let now = self.clock.now();
        let mut state = self.state();
        let SchedulerState { tasks, jobs, .. } = &mut *state;
        let Some(job) = jobs.get_mut(&job_id) else {
            // task stopped while the send was in flight
            return;
        };
        if job.status != JobStatus::Processing {
            return;
        }
        let Some(runtime) = tasks.get_mut(&task_id) else {
            return;
        };

        match result {
            Ok(receipt) => {
                job.status = JobStatus::Sent;
                job.sent_at = Some(now);
                runtime.stats.total_processing -= 1;
                runtime.stats.total_sent += 1;
                debug!(job = %job_id, message_id = %receipt.message_id, "send ok");
            }
            Err(e) => {
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                runtime.stats.total_processing -= 1;
                runtime.stats.total_failed += 1;
                warn!(job = %job_id, error = %e, "send failed");
            }
        }
        runtime.stats.recompute_rates();
        let running = runtime.is_running;

        // A paused task keeps its terminal transition, but follow-up
        // effects wait for resume.
        if running {
            self.check_completion(&mut state, task_id);
        }
    }

    fn check_completion(&self, state: &mut SchedulerState, task_id: TaskId) {
        let SchedulerState {
            tasks,
            timers,
            completion_ticks,
            ..
        } = state;
        let Some(runtime) = tasks.get_mut(&task_id) else {
            return;
        };
        if runtime.status != TaskStatus::Running
            || runtime.stats.total_pending > 0
            || runtime.stats.total_processing > 0
        {
            return;
        }

        runtime.status = TaskStatus::Completed;
        runtime.is_running = false;
        runtime.completed_at = Some(self.clock.now());
        for job_id in &runtime.job_ids {
            if let Some(handle) = timers.remove(job_id) {
                handle.cancel();
            }
        }
        if let Some(handle) = completion_ticks.remove(&task_id) {
            handle.cancel();
        }

        info!(
            task = %task_id,
            sent = runtime.stats.total_sent,
            failed = runtime.stats.total_failed,
            "task completed"
        );
    }

    /// Low-frequency safety net for completion detection, in case the
    /// final dispatch raced a pause/resume.
    fn spawn_completion_tick(&self, state: &mut SchedulerState, task_id: TaskId) {
        let scheduler = self.clone();
        let interval = self.completion_interval;
        let handle = TimerHandle::from(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut state = scheduler.state();
                scheduler.check_completion(&mut state, task_id);
                let still_running = state
                    .tasks
                    .get(&task_id)
                    .map(|rt| rt.status == TaskStatus::Running)
                    .unwrap_or(false);
                if !still_running {
                    break;
                }
            }
        }));
        state.completion_ticks.insert(task_id, handle);
    }
}

/// Remove all runtime traces of a task. Returns whether anything existed.
fn cleanup_task(state: &mut SchedulerState, task_id: TaskId) -> bool {
    let Some(runtime) = state.tasks.remove(&task_id) else {
        return false;
    };
    for job_id in &runtime.job_ids {
        if let Some(handle) = state.timers.remove(job_id) {
            handle.cancel();
        }
        state.jobs.remove(job_id);
    }
    if let Some(handle) = state.completion_ticks.remove(&task_id) {
        handle.cancel();
    }
    true
}
