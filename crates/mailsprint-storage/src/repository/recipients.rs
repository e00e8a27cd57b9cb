//! Recipient repository

use chrono::Utc;
use mailsprint_common::types::RecipientId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateRecipient, Recipient};

/// Recipient repository
#[derive(Clone, Default)]
pub struct RecipientRepository {
    records: Arc<RwLock<HashMap<RecipientId, Recipient>>>,
}

impl RecipientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new recipient
    pub async fn create(&self, input: CreateRecipient) -> Recipient {
        let now = Utc::now();
        let recipient = Recipient {
            id: Uuid::new_v4(),
            email: input.email,
            name: input.name,
            company: input.company,
            blacklisted: false,
            created_at: now,
            updated_at: now,
        };
        self.records
            .write()
            .await
            .insert(recipient.id, recipient.clone());
        recipient
    }

    /// Get a recipient by id
    pub async fn get(&self, id: RecipientId) -> Option<Recipient> {
        self.records.read().await.get(&id).cloned()
    }

    /// List all recipients, including blacklisted ones
    pub async fn list(&self) -> Vec<Recipient> {
        let mut recipients: Vec<Recipient> =
            self.records.read().await.values().cloned().collect();
        recipients.sort_by_key(|r| r.created_at);
        recipients
    }

    /// List recipients eligible for planning (blacklist excluded)
    pub async fn list_active(&self) -> Vec<Recipient> {
        let mut recipients: Vec<Recipient> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| !r.blacklisted)
            .cloned()
            .collect();
        recipients.sort_by_key(|r| r.created_at);
        recipients
    }

    /// Count recipients eligible for planning
    pub async fn count_active(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| !r.blacklisted)
            .count()
    }

    /// Blacklist or un-blacklist a recipient
    pub async fn set_blacklisted(&self, id: RecipientId, blacklisted: bool) -> Option<Recipient> {
        let mut records = self.records.write().await;
        let recipient = records.get_mut(&id)?;
        recipient.blacklisted = blacklisted;
        recipient.updated_at = Utc::now();
        Some(recipient.clone())
    }

    /// Delete a recipient
    pub async fn delete(&self, id: RecipientId) -> bool {
        self.records.write().await.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str) -> CreateRecipient {
        CreateRecipient {
            email: email.to_string(),
            name: None,
            company: None,
        }
    }

    #[tokio::test]
    async fn test_blacklist_excluded_from_active() {
        let repo = RecipientRepository::new();
        let a = repo.create(input("a@example.com")).await;
        let _b = repo.create(input("b@example.com")).await;

        repo.set_blacklisted(a.id, true).await.unwrap();

        let active = repo.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "b@example.com");
        assert_eq!(repo.count_active().await, 1);
        assert_eq!(repo.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = RecipientRepository::new();
        let a = repo.create(input("a@example.com")).await;

        assert!(repo.delete(a.id).await);
        assert!(!repo.delete(a.id).await);
        assert!(repo.get(a.id).await.is_none());
    }
}
