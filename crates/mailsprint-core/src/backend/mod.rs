//! Send backend abstraction
//!
//! The scheduler never opens SMTP connections itself; every dispatch goes
//! through a `SendBackend`. Both shipped backends share the per-sender
//! anti-spam rate envelope.

mod rate_limit;
mod simulated;
mod smtp;

pub use rate_limit::{RateEnvelope, SendRateLimiter};
pub use simulated::SimulatedSendBackend;
pub use smtp::SmtpSendBackend;

use async_trait::async_trait;
use mailsprint_common::types::{RecipientId, SenderId};
use thiserror::Error;

/// Proof of a completed send
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Terminal send failure. The scheduler records the message and does not
/// retry; rate-envelope rejections are not distinguished from other
/// failures downstream.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    #[error("recipient mailbox is full")]
    MailboxFull,

    #[error("transient server failure: {0}")]
    Transient(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("message blocked by spam filter")]
    SpamBlocked,

    #[error("anti-spam send envelope exceeded for sender {0}")]
    AntiSpam(SenderId),

    #[error("smtp failure: {0}")]
    Smtp(String),
}

/// Rate-limited send backend
#[async_trait]
pub trait SendBackend: Send + Sync {
    async fn send(
        &self,
        sender_id: SenderId,
        recipient_id: RecipientId,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, SendError>;
}
