//! SMTP send backend
//!
//! Real dispatch through the sender account's configured relay. The
//! transport is built per call from the sender record; credentials come
//! from the repository's credential store and never transit the scheduler.

use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use mailsprint_common::config::SendConfig;
use mailsprint_common::types::{RecipientId, SenderId};
use mailsprint_storage::{RecipientRepository, SenderRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{SendBackend, SendError, SendRateLimiter, SendReceipt};

/// SMTP send backend
pub struct SmtpSendBackend {
    senders: SenderRepository,
    recipients: RecipientRepository,
    limiter: Arc<SendRateLimiter>,
    timeout: Duration,
}

impl SmtpSendBackend {
    pub fn new(
        config: &SendConfig,
        senders: SenderRepository,
        recipients: RecipientRepository,
        limiter: Arc<SendRateLimiter>,
    ) -> Self {
        Self {
            senders,
            recipients,
            limiter,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl SendBackend for SmtpSendBackend {
    async fn send(
        &self,
        sender_id: SenderId,
        recipient_id: RecipientId,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, SendError> {
        if !self.limiter.try_acquire(sender_id).await {
            return Err(SendError::AntiSpam(sender_id));
        }

        let sender = self
            .senders
            .get(sender_id)
            .await
            .ok_or_else(|| SendError::Smtp(format!("unknown sender account {}", sender_id)))?;
        let recipient = self
            .recipients
            .get(recipient_id)
            .await
            .ok_or_else(|| SendError::InvalidRecipient(recipient_id.to_string()))?;

        let from: Mailbox = format!("{} <{}>", sender.sender_name, sender.email_account)
            .parse()
            .map_err(|e| SendError::Smtp(format!("invalid from address: {}", e)))?;
        let to: Mailbox = recipient
            .email
            .parse()
            .map_err(|e| SendError::InvalidRecipient(format!("{}: {}", recipient.email, e)))?;

        let message_id = format!("<{}.{}@mailsprint>", Uuid::new_v4(), Utc::now().timestamp());
        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError::Smtp(format!("failed to build email: {}", e)))?;

        let builder = if sender.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&sender.smtp_endpoint)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&sender.smtp_endpoint)
        };
        let mut transport = builder
            .map_err(|e| SendError::Transient(format!("failed to create SMTP transport: {}", e)))?
            .port(sender.port);

        if let Some(creds) = self.senders.credentials(sender_id).await {
            transport = transport.credentials(Credentials::new(creds.username, creds.password));
        }

        let mailer = transport.timeout(Some(self.timeout)).build();

        match mailer.send(email).await {
            Ok(response) => {
                debug!(sender = %sender_id, recipient = %recipient_id, ?response, "email sent");
                Ok(SendReceipt { message_id })
            }
            Err(e) => Err(classify_smtp_error(&e.to_string())),
        }
    }
}

/// Map an SMTP error string onto the send failure kinds
fn classify_smtp_error(error: &str) -> SendError {
    let lower = error.to_lowercase();

    if lower.contains("552") || lower.contains("mailbox full") || lower.contains("quota") {
        SendError::MailboxFull
    } else if lower.contains("550")
        || lower.contains("5.1.1")
        || lower.contains("user unknown")
        || lower.contains("does not exist")
    {
        SendError::InvalidRecipient(error.to_string())
    } else if lower.contains("554") || lower.contains("spam") || lower.contains("blocked") {
        SendError::SpamBlocked
    } else if lower.contains("temporarily") || lower.contains("try again") || lower.starts_with('4')
    {
        SendError::Transient(error.to_string())
    } else {
        SendError::Smtp(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mailbox_full() {
        assert!(matches!(
            classify_smtp_error("552 5.2.2 Mailbox full"),
            SendError::MailboxFull
        ));
        assert!(matches!(
            classify_smtp_error("over quota for user"),
            SendError::MailboxFull
        ));
    }

    #[test]
    fn test_classify_invalid_recipient() {
        assert!(matches!(
            classify_smtp_error("550 5.1.1 User unknown"),
            SendError::InvalidRecipient(_)
        ));
        assert!(matches!(
            classify_smtp_error("mailbox does not exist"),
            SendError::InvalidRecipient(_)
        ));
    }

    #[test]
    fn test_classify_spam_block() {
        assert!(matches!(
            classify_smtp_error("554 message rejected as spam"),
            SendError::SpamBlocked
        ));
    }

    #[test]
    fn test_classify_transient() {
        assert!(matches!(
            classify_smtp_error("421 service temporarily unavailable"),
            SendError::Transient(_)
        ));
        assert!(matches!(
            classify_smtp_error("please try again later"),
            SendError::Transient(_)
        ));
    }

    #[test]
    fn test_classify_fallback() {
        assert!(matches!(
            classify_smtp_error("connection reset by peer"),
            SendError::Smtp(_)
        ));
    }
}
