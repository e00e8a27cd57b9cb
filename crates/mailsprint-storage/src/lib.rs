//! Mailsprint Storage - Sender, recipient, and task record store
//!
//! This crate provides the record-store collaborator interfaces consumed by
//! the scheduler core, together with in-memory implementations. Runtime
//! per-task data (jobs, timers, statistics) is owned by the scheduler and
//! is never persisted here.

pub mod models;
pub mod repository;

pub use repository::{RecipientRepository, SenderRepository, TaskRepository};
