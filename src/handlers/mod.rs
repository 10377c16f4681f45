//! Command Handlers module
//!
//! The reservation coordinator: handlers that compose the catalog,
//! inventory and ledger inside single transactions and enforce every
//! cross-entity invariant.

mod cancel_handler;
mod commands;
mod event_handler;
mod purchase_handler;
mod status_handler;
mod ticket_status_handler;

#[cfg(test)]
mod tests;

pub use cancel_handler::CancelHandler;
pub use commands::*;
pub use event_handler::CreateEventHandler;
pub use purchase_handler::PurchaseHandler;
pub use status_handler::EventStatusHandler;
pub use ticket_status_handler::TicketStatusHandler;

use crate::domain::DomainError;
use crate::error::AppError;

/// Bounded retry budget for transient transaction conflicts
pub(crate) const MAX_RETRIES: u32 = 3;

/// Conflicts worth retrying: lost row races, deadlocks, serialization
/// failures, and ticket code collisions (fresh codes are generated on the
/// next attempt). Everything else surfaces immediately.
pub(crate) fn is_retryable_conflict(err: &AppError) -> bool {
    match err {
        AppError::Domain(DomainError::ConcurrencyConflict) => true,
        AppError::Database(sqlx::Error::Database(db)) => match db.code().as_deref() {
            Some("40001") | Some("40P01") => true,
            Some("23505") => db.constraint() == Some("tickets_ticket_code_key"),
            _ => false,
        },
        _ => false,
    }
}
