//! Domain Error Types
//!
//! Pure business-rule errors that don't depend on infrastructure.

use thiserror::Error;
use uuid::Uuid;

use super::status::{EventStatus, TicketStatus};

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant
/// failures. They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed input (e.g. quantity < 1)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Event does not exist
    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    /// Ticket type does not exist under the given event
    #[error("Ticket type not found: {0}")]
    TicketTypeNotFound(Uuid),

    /// Ticket does not exist
    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    /// Event is not in a status that accepts purchases
    #[error("Event is not bookable (status: {status})")]
    EventNotBookable { status: EventStatus },

    /// Every ticket type of the event is depleted
    #[error("Event is sold out")]
    EventSoldOut,

    /// Not enough availability to satisfy the requested quantity
    #[error("Insufficient availability: requested {requested}, available {available}")]
    InsufficientAvailability { requested: u32, available: u32 },

    /// Single request exceeds the event's per-user ticket limit
    #[error("Requested quantity {requested} exceeds the per-user limit of {limit}")]
    PerRequestLimitExceeded { requested: u32, limit: u32 },

    /// Cumulative holdings would exceed the event's per-user ticket limit
    #[error("User holds {held} tickets; {requested} more would exceed the limit of {limit}")]
    PerUserLimitExceeded {
        held: u32,
        requested: u32,
        limit: u32,
    },

    /// Caller is not allowed to perform this operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Ticket already reached a terminal status
    #[error("Ticket is already finalized (status: {status})")]
    AlreadyFinalized { status: TicketStatus },

    /// Ticket status transition outside the state machine
    #[error("Invalid ticket status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: TicketStatus,
        to: TicketStatus,
    },

    /// Event status transition outside the state machine
    #[error("Invalid event status transition: {from} -> {to}")]
    InvalidTransition { from: EventStatus, to: EventStatus },

    /// Concurrent modification could not be resolved within the retry budget
    #[error("Concurrency conflict: concurrent modification detected")]
    ConcurrencyConflict,
}

impl DomainError {
    /// Create an insufficient availability error
    pub fn insufficient_availability(requested: u32, available: u32) -> Self {
        Self::InsufficientAvailability {
            requested,
            available,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::ConcurrencyConflict)
    }

    /// Check if this is a conflict error (retry may help)
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_availability_error() {
        let err = DomainError::insufficient_availability(4, 1);

        assert!(err.is_client_error());
        assert!(!err.is_conflict_error());
        assert!(err.to_string().contains("requested 4"));
        assert!(err.to_string().contains("available 1"));
    }

    #[test]
    fn test_per_user_limit_error_message() {
        let err = DomainError::PerUserLimitExceeded {
            held: 3,
            requested: 2,
            limit: 4,
        };

        assert!(err.is_client_error());
        assert!(err.to_string().contains("holds 3"));
        assert!(err.to_string().contains("limit of 4"));
    }

    #[test]
    fn test_concurrency_conflict_error() {
        let err = DomainError::ConcurrencyConflict;

        assert!(!err.is_client_error());
        assert!(err.is_conflict_error());
    }

    #[test]
    fn test_not_bookable_carries_status() {
        let err = DomainError::EventNotBookable {
            status: EventStatus::Draft,
        };
        assert!(err.to_string().contains("draft"));
    }
}
