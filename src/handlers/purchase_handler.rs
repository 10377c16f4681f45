//! Purchase Handler
//!
//! The coordinator's purchase path: all checks and all writes happen inside
//! one transaction over locked rows, wrapped in a bounded conflict retry.

use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::catalog::EventCatalog;
use crate::domain::{DomainError, OperationContext, Quantity};
use crate::error::AppError;
use crate::idempotency::{IdempotencyError, IdempotencyRepository};
use crate::inventory::TicketTypeInventory;
use crate::ledger::{BookingLedger, Ticket};

use super::{is_retryable_conflict, PurchaseCommand, PurchaseResult, MAX_RETRIES};

/// Handler for ticket purchases
pub struct PurchaseHandler {
    catalog: EventCatalog,
    inventory: TicketTypeInventory,
    ledger: BookingLedger,
    idempotency: IdempotencyRepository,
    audit: AuditLogService,
    pool: PgPool,
}

impl PurchaseHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: EventCatalog::new(pool.clone()),
            inventory: TicketTypeInventory::new(pool.clone()),
            ledger: BookingLedger::new(pool.clone()),
            idempotency: IdempotencyRepository::new(pool.clone()),
            audit: AuditLogService::new(pool.clone()),
            pool,
        }
    }

    /// Execute the purchase command
    pub async fn execute(
        &self,
        command: PurchaseCommand,
        idempotency_key: Option<Uuid>,
        context: &OperationContext,
    ) -> Result<PurchaseResult, AppError> {
        // Authorization check: the verified request identity must be the
        // purchasing user (admins may purchase on behalf of others)
        match context.request_user_id {
            None => return Err(AppError::MissingHeader("X-Request-User-Id".to_string())),
            Some(request_user_id)
                if request_user_id != command.user_id && !context.role().is_admin() =>
            {
                return Err(DomainError::Unauthorized(
                    "request user does not match purchaser".to_string(),
                )
                .into());
            }
            Some(_) => {}
        }

        let quantity = Quantity::new(command.quantity)
            .map_err(|e| DomainError::InvalidRequest(e.to_string()))?;

        // Replay a completed idempotent request instead of booking twice
        if let Some(key) = idempotency_key {
            let body = serde_json::to_vec(&command)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            let request_hash = IdempotencyRepository::compute_request_hash(&body);

            match self.idempotency.start_processing(key, &request_hash).await {
                Ok(Some(completed)) => {
                    let body = completed.response_body.ok_or_else(|| {
                        AppError::Internal(format!("Idempotency key {} has no stored response", key))
                    })?;
                    let result: PurchaseResult = serde_json::from_value(body)
                        .map_err(|e| AppError::Internal(e.to_string()))?;
                    tracing::info!(key = %key, "Replaying stored purchase response");
                    return Ok(result);
                }
                Ok(None) => {}
                Err(IdempotencyError::HashMismatch(_)) => {
                    return Err(AppError::InvalidRequest(
                        "Idempotency key was already used with a different request".to_string(),
                    ));
                }
                Err(IdempotencyError::KeyInProgress) => {
                    return Err(DomainError::ConcurrencyConflict.into());
                }
                Err(IdempotencyError::Database(e)) => return Err(e.into()),
                Err(e) => return Err(AppError::Internal(e.to_string())),
            }
        }

        let outcome = self.purchase_with_retry(&command, quantity).await;

        match &outcome {
            Ok(result) => {
                if let Some(key) = idempotency_key {
                    let body = serde_json::to_value(result)
                        .map_err(|e| AppError::Internal(e.to_string()))?;
                    self.idempotency
                        .mark_completed(key, &result.ticket_ids(), 201, body)
                        .await
                        .map_err(|e| AppError::Internal(e.to_string()))?;
                }

                let entry = AuditLogBuilder::new(AuditAction::TicketsPurchased)
                    .resource_type("Event")
                    .resource_id(result.event_id)
                    .after_state(&result.ticket_ids());
                if let Err(e) = self.audit.log(entry, context).await {
                    tracing::warn!("Audit log write failed for purchase: {}", e);
                }
            }
            Err(e) => {
                if let Some(key) = idempotency_key {
                    if let Err(mark_err) = self
                        .idempotency
                        .mark_failed(key, None, Some(serde_json::json!({ "error": e.to_string() })))
                        .await
                    {
                        tracing::warn!("Failed to mark idempotency key {}: {}", key, mark_err);
                    }
                }
            }
        }

        outcome
    }

    /// Run the purchase transaction, retrying transient conflicts
    async fn purchase_with_retry(
        &self,
        command: &PurchaseCommand,
        quantity: Quantity,
    ) -> Result<PurchaseResult, AppError> {
        for attempt in 0..MAX_RETRIES {
            match self.try_purchase(command, quantity).await {
                Ok(result) => return Ok(result),
                Err(e) if is_retryable_conflict(&e) && attempt < MAX_RETRIES - 1 => {
                    // Linear backoff before retry
                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    tokio::time::sleep(delay).await;
                    tracing::warn!(
                        "Purchase conflict, retrying (attempt {}/{})",
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

    /// Try to purchase (single attempt, one transaction)
    ///
    /// Check order per the coordinator contract: bookable status, sold-out
    /// flag, type existence, availability, per-request limit, cumulative
    /// per-user limit. All checks read rows locked by this transaction, so
    /// a passing check cannot be invalidated by a concurrent purchase.
    async fn try_purchase(
        &self,
        command: &PurchaseCommand,
        quantity: Quantity,
    ) -> Result<PurchaseResult, AppError> {
        let mut tx = self.pool.begin().await?;

        // Event row lock first, then the ticket type row (fixed lock order)
        let event = self
            .catalog
            .get_event_for_update(&mut tx, command.event_id)
            .await?;

        if !event.status.is_bookable() {
            return Err(DomainError::EventNotBookable {
                status: event.status,
            }
            .into());
        }

        if event.sold_out {
            return Err(DomainError::EventSoldOut.into());
        }

        let ticket_type = self
            .inventory
            .get_for_update(&mut tx, command.event_id, command.ticket_type_id)
            .await?;

        let available = ticket_type.available.max(0) as u32;
        if available < quantity.value() {
            return Err(DomainError::insufficient_availability(quantity.value(), available).into());
        }

        let limit = event.per_user_limit();
        if quantity.value() > limit {
            return Err(DomainError::PerRequestLimitExceeded {
                requested: quantity.value(),
                limit,
            }
            .into());
        }

        // Cumulative check: several small purchases must not pass the cap
        let held = self
            .ledger
            .count_active_for_user(&mut tx, event.id, command.user_id)
            .await?;
        if held + quantity.value() > limit {
            return Err(DomainError::PerUserLimitExceeded {
                held,
                requested: quantity.value(),
                limit,
            }
            .into());
        }

        self.inventory
            .reserve(&mut tx, event.id, ticket_type.id, quantity)
            .await?;

        let tickets: Vec<Ticket> = (0..quantity.value())
            .map(|_| {
                Ticket::issue(
                    &ticket_type,
                    command.user_id,
                    command.special_requests.clone(),
                )
            })
            .collect();

        self.ledger.insert_tickets(&mut tx, &tickets).await?;

        self.catalog
            .increment_sold(&mut tx, event.id, quantity.as_i32())
            .await?;

        // Sold out once every type of the event is depleted
        if self.inventory.all_depleted(&mut tx, event.id).await? {
            self.catalog.set_sold_out(&mut tx, event.id, true).await?;
        }

        tx.commit().await?;

        tracing::info!(
            event_id = %event.id,
            ticket_type_id = %ticket_type.id,
            user_id = %command.user_id,
            quantity = quantity.value(),
            "Tickets purchased"
        );

        Ok(PurchaseResult {
            event_id: event.id,
            ticket_type_id: ticket_type.id,
            user_id: command.user_id,
            tickets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_command_builder() {
        let cmd = PurchaseCommand::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 2)
            .with_special_requests("wheelchair access".to_string());

        assert_eq!(cmd.quantity, 2);
        assert_eq!(cmd.special_requests, Some("wheelchair access".to_string()));
    }

    #[test]
    fn test_zero_quantity_is_rejected_before_any_io() {
        let result = Quantity::new(0);
        assert!(result.is_err());
    }
}
