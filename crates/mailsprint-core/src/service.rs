//! Campaign service - in-process control surface
//!
//! Validates control requests against the record store, runs the planner,
//! and drives the scheduler. Only the task record's lifecycle fields are
//! written back; everything per-job stays in scheduler memory.

use chrono::Duration as ChronoDuration;
use mailsprint_common::config::SchedulerConfig;
use mailsprint_common::types::{ControlAction, SenderId, TaskId, TaskStatus};
use mailsprint_common::{Error, Result};
use mailsprint_storage::models::{CreateTask, Sender, Task};
use mailsprint_storage::{RecipientRepository, SenderRepository, TaskRepository};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::clock::Clock;
use crate::matrix::{self, MatrixStats, StatusMatrix};
use crate::planner::{self, Plan, PlanParams};
use crate::scheduler::{MessageSpec, Scheduler, SchedulerError, TaskSnapshot, TaskStatistics};

/// Plan calculation request
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub sender_ids: Vec<SenderId>,
    pub emails_per_hour: f64,
    pub emails_per_recipient_per_day: u32,
    pub working_hours: Option<u32>,
}

/// Plan calculation result, echoed back verbatim on `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub plan: Plan,
    pub status_matrix: Option<StatusMatrix>,
}

/// Snapshot returned by status queries and control operations
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusResponse {
    pub task: Task,
    pub senders: Vec<Sender>,
    pub scheduler: Option<TaskSnapshot>,
    pub status_matrix: StatusMatrix,
    pub matrix_stats: MatrixStats,
    pub realtime_stats: Option<TaskStatistics>,
}

/// In-process campaign service façade
pub struct CampaignService {
    senders: SenderRepository,
    recipients: RecipientRepository,
    tasks: TaskRepository,
    scheduler: Scheduler,
    clock: Clock,
    config: SchedulerConfig,
}

impl CampaignService {
    pub fn new(
        senders: SenderRepository,
        recipients: RecipientRepository,
        tasks: TaskRepository,
        scheduler: Scheduler,
        clock: Clock,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            senders,
            recipients,
            tasks,
            scheduler,
            clock,
            config,
        }
    }

    /// Compute a delivery plan for the given senders against the current
    /// non-blacklisted recipient population.
    pub async fn calculate(&self, req: &CalculateRequest) -> Result<CalculationResult> {
        if req.sender_ids.is_empty() {
            return Err(Error::Validation("sender_ids must not be empty".to_string()));
        }
        if req.emails_per_hour <= 0.0 {
            return Err(Error::Validation(
                "emails_per_hour must be positive".to_string(),
            ));
        }
        if req.emails_per_recipient_per_day < 1 {
            return Err(Error::Validation(
                "emails_per_recipient_per_day must be at least 1".to_string(),
            ));
        }
        let working_hours = req
            .working_hours
            .unwrap_or(self.config.default_working_hours);
        if !(1..=24).contains(&working_hours) {
            return Err(Error::Validation(
                "working_hours must be in 1..=24".to_string(),
            ));
        }

        let found = self.senders.get_many(&req.sender_ids).await;
        let missing: Vec<String> = req
            .sender_ids
            .iter()
            .zip(&found)
            .filter(|(_, s)| s.is_none())
            .map(|(id, _)| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidSenders(missing.join(", ")));
        }
        let disabled: Vec<String> = found
            .iter()
            .flatten()
            .filter(|s| !s.enabled)
            .map(|s| s.email_account.clone())
            .collect();
        if !disabled.is_empty() {
            return Err(Error::DisabledSenders(disabled.join(", ")));
        }

        let recipients = self.recipients.list_active().await;
        if recipients.is_empty() {
            return Err(Error::NoRecipients);
        }

        let plan = planner::plan(&PlanParams {
            sender_ids: req.sender_ids.clone(),
            recipient_ids: recipients.iter().map(|r| r.id).collect(),
            emails_per_hour: req.emails_per_hour,
            emails_per_recipient_per_day: req.emails_per_recipient_per_day,
            working_hours,
            group_tail: self.config.group_tail,
        });

        info!(
            senders = req.sender_ids.len(),
            recipients = recipients.len(),
            days = plan.calculated_days,
            emails = plan.total_emails,
            "plan calculated"
        );

        Ok(CalculationResult {
            status_matrix: Some(matrix::seeded(&plan.status_matrix_seed)),
            plan,
        })
    }

    /// Create a task record with its sender bindings
    pub async fn create_task(&self, input: CreateTask) -> Result<Task> {
        if input.name.is_empty() {
            return Err(Error::Validation("task name is required".to_string()));
        }
        if input.sender_ids.is_empty() {
            return Err(Error::Validation(
                "task needs at least one sender".to_string(),
            ));
        }
        if input.emails_per_hour <= 0.0 || input.emails_per_recipient_per_day < 1 {
            return Err(Error::Validation("invalid throughput limits".to_string()));
        }

        Ok(self.tasks.create(input).await)
    }

    /// Apply a control action to a task. `start` requires a calculation
    /// result with a status matrix; a scheduler start failure rolls the
    /// task record to `Failed`.
    pub async fn control(
        &self,
        task_id: TaskId,
        action: &str,
        calculation: Option<CalculationResult>,
    ) -> Result<TaskStatusResponse> {
        let task = self
            .tasks
            .get(task_id)
            .await
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let action: ControlAction = action.parse()?;

        match action {
            ControlAction::Start => {
                let calc = calculation.ok_or(Error::CalculationRequired)?;
                if calc.status_matrix.as_ref().map_or(true, |m| m.is_empty()) {
                    return Err(Error::MissingStatusMatrix);
                }

                let message = MessageSpec {
                    subject: task.subject.clone(),
                    body: task.body.clone(),
                };
                if let Err(e) = self.scheduler.start_task(task_id, &calc.plan, message) {
                    error!(task = %task_id, error = %e, "scheduler start failed");
                    let _ = self.tasks.update_status(task_id, TaskStatus::Failed).await;
                    return Err(match e {
                        SchedulerError::DataIntegrity(detail) => Error::DataIntegrity(detail),
                        other => Error::SchedulerStartFailed(other.to_string()),
                    });
                }

                let now = self.clock.now();
                let days = calc.plan.calculated_days;
                let _ = self
                    .tasks
                    .set_schedule(
                        task_id,
                        Some(now),
                        Some(now + ChronoDuration::days(days as i64)),
                        Some(days),
                    )
                    .await;
                let _ = self.tasks.update_status(task_id, TaskStatus::Running).await;
            }
            ControlAction::Pause => {
                if self.scheduler.pause_task(task_id) {
                    let _ = self.tasks.update_status(task_id, TaskStatus::Paused).await;
                }
            }
            ControlAction::Resume => {
                if self.scheduler.resume_task(task_id) {
                    let _ = self.tasks.update_status(task_id, TaskStatus::Running).await;
                }
            }
            ControlAction::Stop => {
                self.scheduler.stop_task(task_id);
                let _ = self
                    .tasks
                    .set_schedule(task_id, None, None, task.duration_days)
                    .await;
                let _ = self
                    .tasks
                    .update_status(task_id, TaskStatus::Initialized)
                    .await;
            }
        }

        self.task_status(task_id).await
    }

    /// Full status view: record, bound senders, runtime snapshot, and the
    /// live status matrix
    pub async fn task_status(&self, task_id: TaskId) -> Result<TaskStatusResponse> {
        let task = self
            .tasks
            .get(task_id)
            .await
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        let sender_ids = self.tasks.sender_ids(task_id).await;
        let senders = self
            .senders
            .get_many(&sender_ids)
            .await
            .into_iter()
            .flatten()
            .collect();

        let (status_matrix, matrix_stats) = self.scheduler.status_matrix(task_id);
        let snapshot = self.scheduler.task_status(task_id);

        Ok(TaskStatusResponse {
            task,
            senders,
            realtime_stats: snapshot.as_ref().map(|s| s.stats.clone()),
            scheduler: snapshot,
            status_matrix,
            matrix_stats,
        })
    }

    /// Administrative wipe of all scheduler runtime
    pub async fn reset(&self) {
        self.scheduler.reset();
    }
}
