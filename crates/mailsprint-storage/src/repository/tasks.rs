//! Send task repository

use chrono::{DateTime, Utc};
use mailsprint_common::types::{SenderId, TaskId, TaskStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateTask, Task};

/// Send task repository, including the task-to-sender bindings
#[derive(Clone, Default)]
pub struct TaskRepository {
    records: Arc<RwLock<HashMap<TaskId, Task>>>,
    bindings: Arc<RwLock<HashMap<TaskId, Vec<SenderId>>>>,
}

impl TaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new task record with its sender bindings
    pub async fn create(&self, input: CreateTask) -> Task {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            name: input.name,
            subject: input.subject,
            body: input.body,
            status: TaskStatus::Initialized,
            start_time: None,
            end_time: None,
            duration_days: input.duration_days,
            emails_per_hour: input.emails_per_hour,
            emails_per_recipient_per_day: input.emails_per_recipient_per_day,
            created_by: input.created_by,
            deleted: false,
            created_at: now,
            updated_at: now,
        };

        self.bindings
            .write()
            .await
            .insert(task.id, input.sender_ids);
        self.records.write().await.insert(task.id, task.clone());
        task
    }

    /// Get a task by id; soft-deleted tasks are not returned
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.records
            .read()
            .await
            .get(&id)
            .filter(|t| !t.deleted)
            .cloned()
    }

    /// List tasks, optionally filtered by status
    pub async fn list(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .records
            .read()
            .await
            .values()
            .filter(|t| !t.deleted)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Sender ids bound to a task
    pub async fn sender_ids(&self, id: TaskId) -> Vec<SenderId> {
        self.bindings
            .read()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Update a task's lifecycle status
    pub async fn update_status(&self, id: TaskId, status: TaskStatus) -> Option<Task> {
        let mut records = self.records.write().await;
        let task = records.get_mut(&id)?;
        task.status = status;
        task.updated_at = Utc::now();
        Some(task.clone())
    }

    /// Set the schedule window written by the control path on start
    pub async fn set_schedule(
        &self,
        id: TaskId,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        duration_days: Option<u32>,
    ) -> Option<Task> {
        let mut records = self.records.write().await;
        let task = records.get_mut(&id)?;
        task.start_time = start_time;
        task.end_time = end_time;
        task.duration_days = duration_days;
        task.updated_at = Utc::now();
        Some(task.clone())
    }

    /// Soft-delete a task record
    pub async fn delete(&self, id: TaskId) -> bool {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(task) if !task.deleted => {
                task.deleted = true;
                task.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(sender_ids: Vec<SenderId>) -> CreateTask {
        CreateTask {
            name: "spring launch".to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
            emails_per_hour: 2.0,
            emails_per_recipient_per_day: 2,
            duration_days: None,
            created_by: "ops".to_string(),
            sender_ids,
        }
    }

    #[tokio::test]
    async fn test_create_with_bindings() {
        let repo = TaskRepository::new();
        let senders = vec![Uuid::new_v4(), Uuid::new_v4()];
        let task = repo.create(input(senders.clone())).await;

        assert_eq!(task.status, TaskStatus::Initialized);
        assert_eq!(repo.sender_ids(task.id).await, senders);
    }

    #[tokio::test]
    async fn test_status_and_schedule_updates() {
        let repo = TaskRepository::new();
        let task = repo.create(input(vec![Uuid::new_v4()])).await;

        let start = Utc::now();
        repo.set_schedule(task.id, Some(start), None, Some(6))
            .await
            .unwrap();
        let updated = repo.update_status(task.id, TaskStatus::Running).await.unwrap();

        assert_eq!(updated.status, TaskStatus::Running);
        assert_eq!(updated.start_time, Some(start));
        assert_eq!(updated.duration_days, Some(6));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_record() {
        let repo = TaskRepository::new();
        let task = repo.create(input(vec![Uuid::new_v4()])).await;

        assert!(repo.delete(task.id).await);
        assert!(repo.get(task.id).await.is_none());
        assert!(repo.list(None).await.is_empty());
        // second delete is a no-op
        assert!(!repo.delete(task.id).await);
    }
}
