//! Record models

use chrono::{DateTime, Utc};
use mailsprint_common::types::{RecipientId, SenderId, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

/// Sender account model.
///
/// The SMTP secret is stored separately by the repository and is never part
/// of this model, so no read path can leak it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    pub id: SenderId,
    pub company_name: String,
    pub email_account: String,
    pub smtp_endpoint: String,
    pub port: u16,
    pub tls: bool,
    pub sender_name: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SMTP credentials, handed only to the send backend
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

/// Create sender input
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSender {
    pub company_name: String,
    pub email_account: String,
    pub smtp_endpoint: String,
    pub port: u16,
    pub tls: bool,
    pub sender_name: String,
    /// SMTP secret; moved into the repository's credential store on create
    pub password: String,
}

/// Recipient model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create recipient input
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipient {
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
}

/// Send task record.
///
/// Only the lifecycle fields (`status`, `start_time`, `end_time`,
/// `duration_days`) are written by the control path; everything else is set
/// at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_days: Option<u32>,
    /// Emails per hour per sender; fractional values mean less than one
    /// send per hour on average
    pub emails_per_hour: f64,
    /// Maximum distinct senders reaching one recipient per calendar day
    pub emails_per_recipient_per_day: u32,
    pub created_by: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create task input
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub emails_per_hour: f64,
    pub emails_per_recipient_per_day: u32,
    pub duration_days: Option<u32>,
    pub created_by: String,
    pub sender_ids: Vec<SenderId>,
}
