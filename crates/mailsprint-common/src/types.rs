//! Common types for Mailsprint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for sender accounts
pub type SenderId = Uuid;

/// Unique identifier for recipients
pub type RecipientId = Uuid;

/// Unique identifier for send tasks
pub type TaskId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a planned send job.
///
/// Composed deterministically from the task, sender, recipient, plan day,
/// and slot index, so re-generating jobs for the same plan yields the same
/// ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Compose a job id from its scheduling coordinates.
    pub fn compose(
        task_id: TaskId,
        sender_id: SenderId,
        recipient_id: RecipientId,
        day: u32,
        index: usize,
    ) -> Self {
        Self(format!(
            "{}|{}|{}|{}|{}",
            task_id, sender_id, recipient_id, day, index
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Send task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Initialized,
    Running,
    Paused,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Initialized => write!(f, "initialized"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialized" => Ok(TaskStatus::Initialized),
            "running" => Ok(TaskStatus::Running),
            "paused" => Ok(TaskStatus::Paused),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(crate::Error::Validation(format!(
                "Unknown task status: {}",
                other
            ))),
        }
    }
}

/// Per-job send status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Sent => write!(f, "sent"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Control action accepted by the task control operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl std::str::FromStr for ControlAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ControlAction::Start),
            "pause" => Ok(ControlAction::Pause),
            "resume" => Ok(ControlAction::Resume),
            "stop" => Ok(ControlAction::Stop),
            other => Err(crate::Error::InvalidAction(other.to_string())),
        }
    }
}

/// How the planner fills the last sender group when the sender count does
/// not divide evenly by the diversity cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupTailPolicy {
    /// Pad the tail group by wrapping senders from the head of the list.
    /// Wrapped senders do their full per-group workload again.
    #[default]
    Wrap,
    /// Leave the tail group smaller than the diversity cap.
    Short,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_job_id_compose() {
        let task = Uuid::new_v4();
        let sender = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let a = JobId::compose(task, sender, recipient, 3, 7);
        let b = JobId::compose(task, sender, recipient, 3, 7);
        let c = JobId::compose(task, sender, recipient, 3, 8);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().ends_with("|3|7"));
    }

    #[test]
    fn test_task_status_round_trip() {
        for status in [
            TaskStatus::Initialized,
            TaskStatus::Running,
            TaskStatus::Paused,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed = TaskStatus::from_str(&status.to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(TaskStatus::from_str("bogus").is_err());
    }

    #[test]
    fn test_control_action_parse() {
        assert_eq!(ControlAction::from_str("start").unwrap(), ControlAction::Start);
        assert_eq!(ControlAction::from_str("stop").unwrap(), ControlAction::Stop);

        let err = ControlAction::from_str("restart").unwrap_err();
        assert_eq!(err.code(), "INVALID_ACTION");
    }
}
