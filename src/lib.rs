//! boxOffice Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod audit;
pub mod catalog;
pub mod domain;
pub mod handlers;
pub mod idempotency;
pub mod inventory;
pub mod jobs;
pub mod ledger;

// Private modules (used only by main.rs binary)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{DomainError, EventStatus, OperationContext, Quantity, TicketCode, TicketStatus, UserRole};
pub use catalog::{Event, EventCatalog, EventDraft, TicketTypeDraft};
pub use inventory::{TicketType, TicketTypeInventory};
pub use ledger::{BookingLedger, Ticket};
