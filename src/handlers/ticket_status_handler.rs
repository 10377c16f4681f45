//! Ticket Status Handler
//!
//! Surface for the external check-in and refund collaborators: applies a
//! single status transition through the ledger's state machine. Inventory
//! and sold counters are untouched here; only cancellation releases units.

use sqlx::PgPool;

use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::ledger::BookingLedger;

use super::SetTicketStatusCommand;

/// Handler for externally driven ticket status transitions
pub struct TicketStatusHandler {
    ledger: BookingLedger,
    audit: AuditLogService,
    pool: PgPool,
}

impl TicketStatusHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: BookingLedger::new(pool.clone()),
            audit: AuditLogService::new(pool.clone()),
            pool,
        }
    }

    /// Execute the ticket status command
    pub async fn execute(
        &self,
        command: SetTicketStatusCommand,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let ticket = self.ledger.get_for_update(&mut tx, command.ticket_id).await?;

        self.ledger
            .update_status(&mut tx, command.ticket_id, command.new_status)
            .await?;

        tx.commit().await?;

        tracing::info!(
            ticket_id = %command.ticket_id,
            from = %ticket.status,
            to = %command.new_status,
            "Ticket status changed"
        );

        let entry = AuditLogBuilder::new(AuditAction::TicketStatusChanged)
            .resource_type("Ticket")
            .resource_id(command.ticket_id)
            .before_state(&ticket.status)
            .after_state(&command.new_status)
            .changed_fields(vec!["status".to_string()]);
        if let Err(e) = self.audit.log(entry, context).await {
            tracing::warn!("Audit log write failed for ticket status change: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TicketStatus;
    use uuid::Uuid;

    #[test]
    fn test_set_ticket_status_command() {
        let ticket_id = Uuid::new_v4();
        let cmd = SetTicketStatusCommand::new(ticket_id, TicketStatus::Used);

        assert_eq!(cmd.ticket_id, ticket_id);
        assert_eq!(cmd.new_status, TicketStatus::Used);
    }
}
