//! Sender account repository

use chrono::Utc;
use mailsprint_common::types::SenderId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateSender, Sender, SmtpCredentials};

/// Sender account repository
#[derive(Clone, Default)]
pub struct SenderRepository {
    records: Arc<RwLock<HashMap<SenderId, Sender>>>,
    /// Secrets are kept out of the record map so list/get can never return them
    secrets: Arc<RwLock<HashMap<SenderId, SmtpCredentials>>>,
}

impl SenderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new sender account
    pub async fn create(&self, input: CreateSender) -> Sender {
        let now = Utc::now();
        let sender = Sender {
            id: Uuid::new_v4(),
            company_name: input.company_name,
            email_account: input.email_account.clone(),
            smtp_endpoint: input.smtp_endpoint,
            port: input.port,
            tls: input.tls,
            sender_name: input.sender_name,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        self.secrets.write().await.insert(
            sender.id,
            SmtpCredentials {
                username: input.email_account,
                password: input.password,
            },
        );
        self.records.write().await.insert(sender.id, sender.clone());
        sender
    }

    /// Get a sender by id
    pub async fn get(&self, id: SenderId) -> Option<Sender> {
        self.records.read().await.get(&id).cloned()
    }

    /// Fetch several senders, preserving input order; `None` for unknown ids
    pub async fn get_many(&self, ids: &[SenderId]) -> Vec<Option<Sender>> {
        let records = self.records.read().await;
        ids.iter().map(|id| records.get(id).cloned()).collect()
    }

    /// List all senders
    pub async fn list(&self) -> Vec<Sender> {
        let mut senders: Vec<Sender> = self.records.read().await.values().cloned().collect();
        senders.sort_by_key(|s| s.created_at);
        senders
    }

    /// Enable or disable a sender account
    pub async fn set_enabled(&self, id: SenderId, enabled: bool) -> Option<Sender> {
        let mut records = self.records.write().await;
        let sender = records.get_mut(&id)?;
        sender.enabled = enabled;
        sender.updated_at = Utc::now();
        Some(sender.clone())
    }

    /// Delete a sender account and its credentials
    pub async fn delete(&self, id: SenderId) -> bool {
        self.secrets.write().await.remove(&id);
        self.records.write().await.remove(&id).is_some()
    }

    /// Fetch SMTP credentials for a sender; only the send backend calls this
    pub async fn credentials(&self, id: SenderId) -> Option<SmtpCredentials> {
        self.secrets.read().await.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str) -> CreateSender {
        CreateSender {
            company_name: "Acme Corp".to_string(),
            email_account: email.to_string(),
            smtp_endpoint: "smtp.acme.test".to_string(),
            port: 587,
            tls: true,
            sender_name: "Acme Mailer".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = SenderRepository::new();
        let sender = repo.create(input("a@acme.test")).await;

        let found = repo.get(sender.id).await.unwrap();
        assert_eq!(found.email_account, "a@acme.test");
        assert!(found.enabled);
    }

    #[tokio::test]
    async fn test_secret_not_on_model() {
        let repo = SenderRepository::new();
        let sender = repo.create(input("a@acme.test")).await;

        // The model can be serialized anywhere; make sure the secret is
        // genuinely absent rather than merely skipped.
        let json = serde_json::to_string(&sender).unwrap();
        assert!(!json.contains("hunter2"));

        let creds = repo.credentials(sender.id).await.unwrap();
        assert_eq!(creds.password, "hunter2");
    }

    #[tokio::test]
    async fn test_set_enabled_and_delete() {
        let repo = SenderRepository::new();
        let sender = repo.create(input("a@acme.test")).await;

        let updated = repo.set_enabled(sender.id, false).await.unwrap();
        assert!(!updated.enabled);

        assert!(repo.delete(sender.id).await);
        assert!(repo.get(sender.id).await.is_none());
        assert!(repo.credentials(sender.id).await.is_none());
    }

    #[tokio::test]
    async fn test_get_many_preserves_order() {
        let repo = SenderRepository::new();
        let a = repo.create(input("a@acme.test")).await;
        let b = repo.create(input("b@acme.test")).await;
        let missing = Uuid::new_v4();

        let found = repo.get_many(&[b.id, missing, a.id]).await;
        assert_eq!(found[0].as_ref().unwrap().id, b.id);
        assert!(found[1].is_none());
        assert_eq!(found[2].as_ref().unwrap().id, a.id);
    }
}
