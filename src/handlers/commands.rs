//! Command definitions
//!
//! Commands represent intentions to change the system state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Event, EventDraft};
use crate::domain::{EventStatus, TicketStatus};
use crate::inventory::TicketType;
use crate::ledger::Ticket;

/// Command to create a new event with its ticket types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventCommand {
    /// Organizer who will own the event
    pub organizer_id: Uuid,
    /// Validated draft with title, dates, limits and ticket types
    pub draft: EventDraft,
}

impl CreateEventCommand {
    pub fn new(organizer_id: Uuid, draft: EventDraft) -> Self {
        Self {
            organizer_id,
            draft,
        }
    }
}

/// Command to move an event through its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEventStatusCommand {
    pub event_id: Uuid,
    pub new_status: EventStatus,
}

impl SetEventStatusCommand {
    pub fn new(event_id: Uuid, new_status: EventStatus) -> Self {
        Self {
            event_id,
            new_status,
        }
    }
}

/// Command to purchase tickets of one type for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseCommand {
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    /// Purchasing user (must match the request identity)
    pub user_id: Uuid,
    pub quantity: u32,
    /// Optional free-form requests attached to every issued ticket
    pub special_requests: Option<String>,
}

impl PurchaseCommand {
    pub fn new(event_id: Uuid, ticket_type_id: Uuid, user_id: Uuid, quantity: u32) -> Self {
        Self {
            event_id,
            ticket_type_id,
            user_id,
            quantity,
            special_requests: None,
        }
    }

    pub fn with_special_requests(mut self, special_requests: String) -> Self {
        self.special_requests = Some(special_requests);
        self
    }
}

/// Command to cancel a purchased ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelCommand {
    pub ticket_id: Uuid,
}

impl CancelCommand {
    pub fn new(ticket_id: Uuid) -> Self {
        Self { ticket_id }
    }
}

/// Command to move a single ticket through its state machine
/// (check-in and refund collaborators)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTicketStatusCommand {
    pub ticket_id: Uuid,
    pub new_status: TicketStatus,
}

impl SetTicketStatusCommand {
    pub fn new(ticket_id: Uuid, new_status: TicketStatus) -> Self {
        Self {
            ticket_id,
            new_status,
        }
    }
}

/// Result of a successful event creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventResult {
    pub event: Event,
    pub ticket_types: Vec<TicketType>,
}

/// Result of a successful status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEventStatusResult {
    pub event_id: Uuid,
    pub status: EventStatus,
}

/// Result of a successful purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    pub user_id: Uuid,
    pub tickets: Vec<Ticket>,
}

impl PurchaseResult {
    pub fn ticket_ids(&self) -> Vec<Uuid> {
        self.tickets.iter().map(|t| t.id).collect()
    }
}

/// Result of a successful cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
}
