//! Event Catalog module
//!
//! Leaf data owner for event records and their lifecycle.

mod event;
mod repository;

pub use event::{Event, EventDraft, TicketTypeDraft};
pub use repository::EventCatalog;
