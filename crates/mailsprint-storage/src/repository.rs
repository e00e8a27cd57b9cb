//! Record repositories
//!
//! In-memory implementations of the record-store collaborator interfaces.
//! Each repository is cheaply cloneable and shares its maps behind an
//! `Arc<RwLock<...>>`.

mod recipients;
mod senders;
mod tasks;

pub use recipients::RecipientRepository;
pub use senders::SenderRepository;
pub use tasks::TaskRepository;
