//! Ticket records
//!
//! One ledger entry per physical ticket. Price is snapshotted from the
//! ticket type at purchase time and never changes afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{TicketCode, TicketStatus};
use crate::inventory::TicketType;

/// An issued ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub status: TicketStatus,
    /// Price snapshot taken at purchase time.
    pub price: Decimal,
    pub ticket_code: TicketCode,
    pub is_transferred: bool,
    pub transferred_to: Option<Uuid>,
    pub special_requests: Option<String>,
}

impl Ticket {
    /// Issue a fresh ticket against a ticket type.
    ///
    /// The generated code is unique with overwhelming probability; the
    /// ledger's unique index is the backstop for the remainder.
    pub fn issue(
        ticket_type: &TicketType,
        user_id: Uuid,
        special_requests: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_type_id: ticket_type.id,
            event_id: ticket_type.event_id,
            user_id,
            purchase_date: Utc::now(),
            status: TicketStatus::Purchased,
            price: ticket_type.price,
            ticket_code: TicketCode::generate(),
            is_transferred: false,
            transferred_to: None,
            special_requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vip_type() -> TicketType {
        TicketType {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "VIP".to_string(),
            price: dec!(80.00),
            total: 10,
            available: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_snapshots_price() {
        let ticket_type = vip_type();
        let user_id = Uuid::new_v4();

        let ticket = Ticket::issue(&ticket_type, user_id, Some("aisle seat".to_string()));

        assert_eq!(ticket.ticket_type_id, ticket_type.id);
        assert_eq!(ticket.event_id, ticket_type.event_id);
        assert_eq!(ticket.user_id, user_id);
        assert_eq!(ticket.price, dec!(80.00));
        assert_eq!(ticket.status, TicketStatus::Purchased);
        assert!(!ticket.is_transferred);
        assert!(ticket.transferred_to.is_none());
        assert_eq!(ticket.special_requests.as_deref(), Some("aisle seat"));
    }

    #[test]
    fn test_issued_tickets_get_distinct_codes() {
        let ticket_type = vip_type();
        let user_id = Uuid::new_v4();

        let a = Ticket::issue(&ticket_type, user_id, None);
        let b = Ticket::issue(&ticket_type, user_id, None);

        assert_ne!(a.id, b.id);
        assert_ne!(a.ticket_code, b.ticket_code);
    }
}
