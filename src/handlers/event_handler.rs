//! Create Event Handler
//!
//! Creates an event and its ticket type pools in one transaction.

use sqlx::PgPool;

use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::catalog::EventCatalog;
use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;
use crate::inventory::TicketTypeInventory;

use super::{CreateEventCommand, CreateEventResult};

/// Handler for event creation
pub struct CreateEventHandler {
    catalog: EventCatalog,
    inventory: TicketTypeInventory,
    audit: AuditLogService,
    pool: PgPool,
}

impl CreateEventHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: EventCatalog::new(pool.clone()),
            inventory: TicketTypeInventory::new(pool.clone()),
            audit: AuditLogService::new(pool.clone()),
            pool,
        }
    }

    /// Execute the create event command
    pub async fn execute(
        &self,
        command: CreateEventCommand,
        context: &OperationContext,
    ) -> Result<CreateEventResult, AppError> {
        // Role gate: only organizers and admins create events
        if !context.role().can_create_events() {
            let entry = AuditLogBuilder::new(AuditAction::PermissionDenied)
                .resource_type("Event")
                .changed_fields(vec!["create".to_string()]);
            if let Err(e) = self.audit.log(entry, context).await {
                tracing::warn!("Audit log write failed for denied creation: {}", e);
            }
            return Err(DomainError::Unauthorized(
                "organizer or admin role required to create events".to_string(),
            )
            .into());
        }

        // The request identity must be the organizer recorded as owner
        match context.request_user_id {
            None => return Err(AppError::MissingHeader("X-Request-User-Id".to_string())),
            Some(request_user_id)
                if request_user_id != command.organizer_id && !context.role().is_admin() =>
            {
                return Err(DomainError::Unauthorized(
                    "request user does not match organizer".to_string(),
                )
                .into());
            }
            Some(_) => {}
        }

        command.draft.validate()?;

        let mut tx = self.pool.begin().await?;

        let event = self
            .catalog
            .insert_event(&mut tx, command.organizer_id, &command.draft)
            .await?;

        let ticket_types = self
            .inventory
            .insert_ticket_types(&mut tx, event.id, &command.draft.ticket_types)
            .await?;

        tx.commit().await?;

        tracing::info!(
            event_id = %event.id,
            organizer_id = %command.organizer_id,
            ticket_types = ticket_types.len(),
            total_capacity = event.total_capacity,
            "Event created"
        );

        let entry = AuditLogBuilder::new(AuditAction::EventCreated)
            .resource_type("Event")
            .resource_id(event.id)
            .after_state(&event);
        if let Err(e) = self.audit.log(entry, context).await {
            tracing::warn!("Audit log write failed for event creation: {}", e);
        }

        Ok(CreateEventResult {
            event,
            ticket_types,
        })
    }
}
