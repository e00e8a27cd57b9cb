//! Simulated send backend
//!
//! Dispatches nothing: sleeps a sampled latency and resolves to success or
//! a sampled failure kind. Used for load and scheduler testing without a
//! live SMTP relay.

use async_trait::async_trait;
use chrono::Utc;
use mailsprint_common::config::SendConfig;
use mailsprint_common::types::{RecipientId, SenderId};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{SendBackend, SendError, SendRateLimiter, SendReceipt};

/// Simulated rate-limited send backend
pub struct SimulatedSendBackend {
    min_latency: Duration,
    max_latency: Duration,
    success_probability: f64,
    limiter: Arc<SendRateLimiter>,
}

impl SimulatedSendBackend {
    pub fn new(config: &SendConfig, limiter: Arc<SendRateLimiter>) -> Self {
        Self {
            min_latency: Duration::from_millis(config.min_latency_ms),
            max_latency: Duration::from_millis(config.max_latency_ms),
            success_probability: config.success_probability.clamp(0.0, 1.0),
            limiter,
        }
    }

    fn sample_latency(&self) -> Duration {
        if self.max_latency <= self.min_latency {
            return self.min_latency;
        }
        let mut rng = rand::thread_rng();
        rng.gen_range(self.min_latency..=self.max_latency)
    }

    fn sample_outcome(&self, recipient_id: RecipientId) -> Result<(), SendError> {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.success_probability) {
            return Ok(());
        }
        Err(match rng.gen_range(0..4) {
            0 => SendError::MailboxFull,
            1 => SendError::Transient("451 requested action aborted".to_string()),
            2 => SendError::InvalidRecipient(recipient_id.to_string()),
            _ => SendError::SpamBlocked,
        })
    }
}

#[async_trait]
impl SendBackend for SimulatedSendBackend {
    async fn send(
        &self,
        sender_id: SenderId,
        recipient_id: RecipientId,
        _subject: &str,
        _body: &str,
    ) -> Result<SendReceipt, SendError> {
        if !self.limiter.try_acquire(sender_id).await {
            return Err(SendError::AntiSpam(sender_id));
        }

        let latency = self.sample_latency();
        tokio::time::sleep(latency).await;

        self.sample_outcome(recipient_id)?;

        let message_id = format!("<{}.{}@mailsprint>", Uuid::new_v4(), Utc::now().timestamp());
        debug!(sender = %sender_id, recipient = %recipient_id, %message_id, "simulated send ok");
        Ok(SendReceipt { message_id })
    }
}
