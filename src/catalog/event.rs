//! Event records
//!
//! The event entity owned by the catalog, plus the draft shapes used when
//! an organizer creates a new event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, EventStatus};

/// An event as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub status: EventStatus,
    /// Maximum tickets one user may hold for this event, enforced
    /// cumulatively across purchases.
    pub max_tickets_per_user: i32,
    /// Sum of all ticket type totals, fixed at creation.
    pub total_capacity: i32,
    pub tickets_sold: i32,
    /// Derived from ticket type availability, persisted for fast reads.
    pub sold_out: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Per-user limit as an unsigned count.
    pub fn per_user_limit(&self) -> u32 {
        self.max_tickets_per_user.max(0) as u32
    }
}

/// Draft for a new event, validated before insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub max_tickets_per_user: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub ticket_types: Vec<TicketTypeDraft>,
}

/// Draft for one ticket type of a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTypeDraft {
    pub name: String,
    pub price: Decimal,
    pub total: u32,
}

impl EventDraft {
    /// Validate the draft against the catalog's business rules.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidRequest(
                "Event title must not be empty".to_string(),
            ));
        }

        if self.max_tickets_per_user == 0 {
            return Err(DomainError::InvalidRequest(
                "max_tickets_per_user must be at least 1".to_string(),
            ));
        }

        if self.end_date <= self.start_date {
            return Err(DomainError::InvalidRequest(
                "end_date must be after start_date".to_string(),
            ));
        }

        if self.ticket_types.is_empty() {
            return Err(DomainError::InvalidRequest(
                "An event needs at least one ticket type".to_string(),
            ));
        }

        for ticket_type in &self.ticket_types {
            if ticket_type.name.trim().is_empty() {
                return Err(DomainError::InvalidRequest(
                    "Ticket type name must not be empty".to_string(),
                ));
            }
            if ticket_type.total == 0 {
                return Err(DomainError::InvalidRequest(format!(
                    "Ticket type '{}' must have a positive total",
                    ticket_type.name
                )));
            }
            if ticket_type.price < Decimal::ZERO {
                return Err(DomainError::InvalidRequest(format!(
                    "Ticket type '{}' must not have a negative price",
                    ticket_type.name
                )));
            }
        }

        Ok(())
    }

    /// Total capacity across all ticket types.
    pub fn total_capacity(&self) -> i64 {
        self.ticket_types.iter().map(|t| i64::from(t.total)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> EventDraft {
        EventDraft {
            title: "Rust Meetup".to_string(),
            max_tickets_per_user: 4,
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::hours(3),
            ticket_types: vec![
                TicketTypeDraft {
                    name: "Regular".to_string(),
                    price: dec!(25.00),
                    total: 100,
                },
                TicketTypeDraft {
                    name: "VIP".to_string(),
                    price: dec!(80.00),
                    total: 10,
                },
            ],
        }
    }

    #[test]
    fn test_valid_draft() {
        let d = draft();
        assert!(d.validate().is_ok());
        assert_eq!(d.total_capacity(), 110);
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut d = draft();
        d.title = "  ".to_string();
        assert!(matches!(d.validate(), Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut d = draft();
        d.max_tickets_per_user = 0;
        assert!(matches!(d.validate(), Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn test_dates_must_be_ordered() {
        let mut d = draft();
        d.end_date = d.start_date;
        assert!(matches!(d.validate(), Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn test_requires_ticket_types() {
        let mut d = draft();
        d.ticket_types.clear();
        assert!(matches!(d.validate(), Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_zero_total_and_negative_price() {
        let mut d = draft();
        d.ticket_types[0].total = 0;
        assert!(d.validate().is_err());

        let mut d = draft();
        d.ticket_types[1].price = dec!(-1.00);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_per_user_limit_conversion() {
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "X".to_string(),
            status: EventStatus::Draft,
            max_tickets_per_user: 4,
            total_capacity: 10,
            tickets_sold: 0,
            sold_out: false,
            start_date: Utc::now(),
            end_date: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(event.per_user_limit(), 4);
    }
}
