//! Cancel Handler
//!
//! Reverses a purchase: the ticket goes to cancelled, one unit returns to
//! the pool, the sold counter drops, and the event cannot stay sold out.

use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::catalog::EventCatalog;
use crate::domain::{DomainError, OperationContext, Quantity, TicketStatus, UserRole};
use crate::error::AppError;
use crate::inventory::TicketTypeInventory;
use crate::ledger::BookingLedger;

use super::{is_retryable_conflict, CancelCommand, CancelResult, MAX_RETRIES};

/// Handler for ticket cancellations
pub struct CancelHandler {
    catalog: EventCatalog,
    inventory: TicketTypeInventory,
    ledger: BookingLedger,
    audit: AuditLogService,
    pool: PgPool,
}

impl CancelHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: EventCatalog::new(pool.clone()),
            inventory: TicketTypeInventory::new(pool.clone()),
            ledger: BookingLedger::new(pool.clone()),
            audit: AuditLogService::new(pool.clone()),
            pool,
        }
    }

    /// Execute the cancel command
    pub async fn execute(
        &self,
        command: CancelCommand,
        context: &OperationContext,
    ) -> Result<CancelResult, AppError> {
        let caller_id = context
            .request_user_id
            .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))?;

        let result = self
            .cancel_with_retry(command.ticket_id, caller_id, context.role())
            .await;

        if let Ok(ref cancel_result) = result {
            let entry = AuditLogBuilder::new(AuditAction::TicketCancelled)
                .resource_type("Ticket")
                .resource_id(cancel_result.ticket_id)
                .before_state(&TicketStatus::Purchased)
                .after_state(&TicketStatus::Cancelled);
            if let Err(e) = self.audit.log(entry, context).await {
                tracing::warn!("Audit log write failed for cancellation: {}", e);
            }
        }

        result
    }

    async fn cancel_with_retry(
        &self,
        ticket_id: Uuid,
        caller_id: Uuid,
        caller_role: UserRole,
    ) -> Result<CancelResult, AppError> {
        for attempt in 0..MAX_RETRIES {
            match self.try_cancel(ticket_id, caller_id, caller_role).await {
                Ok(result) => return Ok(result),
                Err(e) if is_retryable_conflict(&e) && attempt < MAX_RETRIES - 1 => {
                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    tokio::time::sleep(delay).await;
                    tracing::warn!(
                        "Cancellation conflict, retrying (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::ConcurrencyConflict.into())
    }

    /// Try to cancel (single attempt, one transaction)
    async fn try_cancel(
        &self,
        ticket_id: Uuid,
        caller_id: Uuid,
        caller_role: UserRole,
    ) -> Result<CancelResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let ticket = self.ledger.get_for_update(&mut tx, ticket_id).await?;

        // Only the holder or an admin may cancel
        if ticket.user_id != caller_id && !caller_role.is_admin() {
            return Err(DomainError::Unauthorized(
                "caller is not the ticket holder".to_string(),
            )
            .into());
        }

        if ticket.status != TicketStatus::Purchased {
            return Err(DomainError::AlreadyFinalized {
                status: ticket.status,
            }
            .into());
        }

        // Event row lock before the ticket type row, same order as purchase
        self.catalog
            .get_event_for_update(&mut tx, ticket.event_id)
            .await?;

        self.ledger
            .update_status(&mut tx, ticket.id, TicketStatus::Cancelled)
            .await?;

        self.inventory
            .release(
                &mut tx,
                ticket.event_id,
                ticket.ticket_type_id,
                Quantity::one(),
            )
            .await?;

        self.catalog
            .increment_sold(&mut tx, ticket.event_id, -1)
            .await?;

        // A cancellation always frees at least one unit
        self.catalog
            .set_sold_out(&mut tx, ticket.event_id, false)
            .await?;

        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket.id,
            event_id = %ticket.event_id,
            caller_id = %caller_id,
            "Ticket cancelled"
        );

        Ok(CancelResult {
            ticket_id: ticket.id,
            status: TicketStatus::Cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_command() {
        let ticket_id = Uuid::new_v4();
        let cmd = CancelCommand::new(ticket_id);
        assert_eq!(cmd.ticket_id, ticket_id);
    }
}
