//! Handler unit tests
//!
//! Pure-logic coverage of the coordinator; transaction behavior is covered
//! by the integration tests, which require a database.

#[cfg(test)]
mod tests {
    use crate::catalog::{EventDraft, TicketTypeDraft};
    use crate::domain::{DomainError, EventStatus, Quantity, TicketStatus};
    use crate::error::AppError;
    use crate::handlers::{
        is_retryable_conflict, CancelCommand, CreateEventCommand, PurchaseCommand,
        SetEventStatusCommand, SetTicketStatusCommand,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn draft() -> EventDraft {
        EventDraft {
            title: "Launch Party".to_string(),
            max_tickets_per_user: 4,
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::hours(6),
            ticket_types: vec![TicketTypeDraft {
                name: "General".to_string(),
                price: dec!(10.00),
                total: 50,
            }],
        }
    }

    // =========================================================================
    // Command construction
    // =========================================================================

    #[test]
    fn test_purchase_command_validation() {
        let event_id = Uuid::new_v4();
        let ticket_type_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let cmd = PurchaseCommand::new(event_id, ticket_type_id, user_id, 3);

        assert_eq!(cmd.event_id, event_id);
        assert_eq!(cmd.ticket_type_id, ticket_type_id);
        assert_eq!(cmd.user_id, user_id);
        assert_eq!(cmd.quantity, 3);
        assert!(cmd.special_requests.is_none());
    }

    #[test]
    fn test_purchase_command_with_special_requests() {
        let cmd = PurchaseCommand::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 1)
            .with_special_requests("vegetarian meal".to_string());

        assert_eq!(cmd.special_requests, Some("vegetarian meal".to_string()));
    }

    #[test]
    fn test_create_event_command_carries_draft() {
        let cmd = CreateEventCommand::new(Uuid::new_v4(), draft());
        assert!(cmd.draft.validate().is_ok());
        assert_eq!(cmd.draft.total_capacity(), 50);
    }

    #[test]
    fn test_status_commands() {
        let event_id = Uuid::new_v4();
        let cmd = SetEventStatusCommand::new(event_id, EventStatus::Cancelled);
        assert_eq!(cmd.new_status, EventStatus::Cancelled);

        let ticket_id = Uuid::new_v4();
        let cmd = SetTicketStatusCommand::new(ticket_id, TicketStatus::Refunded);
        assert_eq!(cmd.new_status, TicketStatus::Refunded);

        let cmd = CancelCommand::new(ticket_id);
        assert_eq!(cmd.ticket_id, ticket_id);
    }

    // =========================================================================
    // Quantity gate (check 1 of the purchase path)
    // =========================================================================

    #[test]
    fn test_quantity_below_one_is_invalid_request() {
        let err = Quantity::new(0)
            .map_err(|e| DomainError::InvalidRequest(e.to_string()))
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidRequest(_)));
        assert!(err.is_client_error());
    }

    // =========================================================================
    // Limit checks are independent of each other
    // =========================================================================

    #[test]
    fn test_per_request_and_per_user_limits_are_distinct_kinds() {
        let per_request = DomainError::PerRequestLimitExceeded {
            requested: 5,
            limit: 4,
        };
        let per_user = DomainError::PerUserLimitExceeded {
            held: 3,
            requested: 2,
            limit: 4,
        };

        assert_ne!(per_request, per_user);
        assert!(per_request.is_client_error());
        assert!(per_user.is_client_error());
    }

    #[test]
    fn test_cumulative_cap_arithmetic() {
        // maxTicketsPerUser = 4, user already holds 3
        let limit: u32 = 4;
        let held: u32 = 3;

        // Requesting 2 more must trip the cumulative check
        assert!(held + 2 > limit);
        // Requesting 1 more fits exactly
        assert!(held + 1 <= limit);
        // And afterwards nothing more fits
        assert!(4 + 1 > limit);
    }

    // =========================================================================
    // Retry classification
    // =========================================================================

    #[test]
    fn test_concurrency_conflict_is_retryable() {
        let err = AppError::Domain(DomainError::ConcurrencyConflict);
        assert!(is_retryable_conflict(&err));
    }

    #[test]
    fn test_business_errors_are_not_retryable() {
        let sold_out = AppError::Domain(DomainError::EventSoldOut);
        assert!(!is_retryable_conflict(&sold_out));

        let insufficient = AppError::Domain(DomainError::insufficient_availability(2, 1));
        assert!(!is_retryable_conflict(&insufficient));

        let internal = AppError::Internal("boom".to_string());
        assert!(!is_retryable_conflict(&internal));
    }

    #[test]
    fn test_pool_errors_are_not_retryable() {
        let err = AppError::Database(sqlx::Error::PoolClosed);
        assert!(!is_retryable_conflict(&err));
    }
}
