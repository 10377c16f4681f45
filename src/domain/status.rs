//! Lifecycle status types
//!
//! Event and ticket status enums with their transition state machines,
//! plus the caller role supplied by the external auth collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }

    /// Check whether a transition to `next` is allowed.
    ///
    /// Draft events can be published or cancelled; published events can be
    /// cancelled or completed. Cancelled and completed are terminal.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Draft, EventStatus::Published)
                | (EventStatus::Draft, EventStatus::Cancelled)
                | (EventStatus::Published, EventStatus::Cancelled)
                | (EventStatus::Published, EventStatus::Completed)
        )
    }

    /// Only published events accept purchases.
    pub fn is_bookable(&self) -> bool {
        *self == EventStatus::Published
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(StatusParseError::UnknownEventStatus(other.to_string())),
        }
    }
}

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Reserved,
    Purchased,
    Used,
    Cancelled,
    Refunded,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Reserved => "reserved",
            TicketStatus::Purchased => "purchased",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Refunded => "refunded",
        }
    }

    /// Ticket state machine:
    /// reserved -> purchased -> used | cancelled | refunded.
    /// Used, cancelled and refunded are terminal.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Reserved, TicketStatus::Purchased)
                | (TicketStatus::Purchased, TicketStatus::Used)
                | (TicketStatus::Purchased, TicketStatus::Cancelled)
                | (TicketStatus::Purchased, TicketStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TicketStatus::Used | TicketStatus::Cancelled | TicketStatus::Refunded
        )
    }

    /// A ticket counts toward the holder's per-event total unless it was
    /// cancelled. Refunded tickets were sold and stay counted.
    pub fn counts_as_held(&self) -> bool {
        *self != TicketStatus::Cancelled
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(TicketStatus::Reserved),
            "purchased" => Ok(TicketStatus::Purchased),
            "used" => Ok(TicketStatus::Used),
            "cancelled" => Ok(TicketStatus::Cancelled),
            "refunded" => Ok(TicketStatus::Refunded),
            other => Err(StatusParseError::UnknownTicketStatus(other.to_string())),
        }
    }
}

/// Role of the end user on whose behalf a request is made.
/// Supplied by the external auth collaborator and trusted as verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Organizer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Organizer => "organizer",
            UserRole::Admin => "admin",
        }
    }

    /// Event creation is restricted to organizers and admins.
    pub fn can_create_events(&self) -> bool {
        matches!(self, UserRole::Organizer | UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        *self == UserRole::Admin
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "organizer" => Ok(UserRole::Organizer),
            "admin" => Ok(UserRole::Admin),
            other => Err(StatusParseError::UnknownRole(other.to_string())),
        }
    }
}

/// Errors from decoding a stored status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusParseError {
    #[error("Unknown event status: {0}")]
    UnknownEventStatus(String),

    #[error("Unknown ticket status: {0}")]
    UnknownTicketStatus(String),

    #[error("Unknown user role: {0}")]
    UnknownRole(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_status_transitions() {
        assert!(EventStatus::Draft.can_transition_to(EventStatus::Published));
        assert!(EventStatus::Draft.can_transition_to(EventStatus::Cancelled));
        assert!(EventStatus::Published.can_transition_to(EventStatus::Cancelled));
        assert!(EventStatus::Published.can_transition_to(EventStatus::Completed));

        // Terminal states reject everything
        assert!(!EventStatus::Completed.can_transition_to(EventStatus::Published));
        assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Published));
        assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Draft));

        // Draft events never complete directly
        assert!(!EventStatus::Draft.can_transition_to(EventStatus::Completed));
    }

    #[test]
    fn test_only_published_is_bookable() {
        assert!(EventStatus::Published.is_bookable());
        assert!(!EventStatus::Draft.is_bookable());
        assert!(!EventStatus::Cancelled.is_bookable());
        assert!(!EventStatus::Completed.is_bookable());
    }

    #[test]
    fn test_ticket_status_transitions() {
        assert!(TicketStatus::Reserved.can_transition_to(TicketStatus::Purchased));
        assert!(TicketStatus::Purchased.can_transition_to(TicketStatus::Used));
        assert!(TicketStatus::Purchased.can_transition_to(TicketStatus::Cancelled));
        assert!(TicketStatus::Purchased.can_transition_to(TicketStatus::Refunded));

        // No path out of terminal states
        assert!(!TicketStatus::Used.can_transition_to(TicketStatus::Purchased));
        assert!(!TicketStatus::Cancelled.can_transition_to(TicketStatus::Purchased));
        assert!(!TicketStatus::Refunded.can_transition_to(TicketStatus::Cancelled));

        // Reserved tickets cannot skip straight to a terminal state
        assert!(!TicketStatus::Reserved.can_transition_to(TicketStatus::Used));
        assert!(!TicketStatus::Reserved.can_transition_to(TicketStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TicketStatus::Used.is_terminal());
        assert!(TicketStatus::Cancelled.is_terminal());
        assert!(TicketStatus::Refunded.is_terminal());
        assert!(!TicketStatus::Reserved.is_terminal());
        assert!(!TicketStatus::Purchased.is_terminal());
    }

    #[test]
    fn test_counts_as_held() {
        assert!(TicketStatus::Purchased.counts_as_held());
        assert!(TicketStatus::Used.counts_as_held());
        assert!(TicketStatus::Refunded.counts_as_held());
        assert!(!TicketStatus::Cancelled.counts_as_held());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::Cancelled,
            EventStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }

        for status in [
            TicketStatus::Reserved,
            TicketStatus::Purchased,
            TicketStatus::Used,
            TicketStatus::Cancelled,
            TicketStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }

        assert!("archived".parse::<EventStatus>().is_err());
        assert!("pending".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Organizer.can_create_events());
        assert!(UserRole::Admin.can_create_events());
        assert!(!UserRole::User.can_create_events());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Organizer.is_admin());
    }
}
