//! Event Status Handler
//!
//! Moves an event through its lifecycle, enforcing the transition machine
//! and the owner/admin gate.

use sqlx::PgPool;

use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::catalog::EventCatalog;
use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;

use super::{SetEventStatusCommand, SetEventStatusResult};

/// Handler for event lifecycle changes
pub struct EventStatusHandler {
    catalog: EventCatalog,
    audit: AuditLogService,
    pool: PgPool,
}

impl EventStatusHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: EventCatalog::new(pool.clone()),
            audit: AuditLogService::new(pool.clone()),
            pool,
        }
    }

    /// Execute the status change command
    pub async fn execute(
        &self,
        command: SetEventStatusCommand,
        context: &OperationContext,
    ) -> Result<SetEventStatusResult, AppError> {
        let caller_id = context
            .request_user_id
            .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))?;

        let mut tx = self.pool.begin().await?;

        let event = self
            .catalog
            .get_event_for_update(&mut tx, command.event_id)
            .await?;

        // Only the owning organizer or an admin may change the lifecycle
        if event.organizer_id != caller_id && !context.role().is_admin() {
            return Err(DomainError::Unauthorized(
                "caller does not own this event".to_string(),
            )
            .into());
        }

        if !event.status.can_transition_to(command.new_status) {
            return Err(DomainError::InvalidTransition {
                from: event.status,
                to: command.new_status,
            }
            .into());
        }

        self.catalog
            .set_status(&mut tx, event.id, command.new_status)
            .await?;

        tx.commit().await?;

        tracing::info!(
            event_id = %event.id,
            from = %event.status,
            to = %command.new_status,
            "Event status changed"
        );

        let entry = AuditLogBuilder::new(AuditAction::EventStatusChanged)
            .resource_type("Event")
            .resource_id(event.id)
            .before_state(&event.status)
            .after_state(&command.new_status)
            .changed_fields(vec!["status".to_string()]);
        if let Err(e) = self.audit.log(entry, context).await {
            tracing::warn!("Audit log write failed for status change: {}", e);
        }

        Ok(SetEventStatusResult {
            event_id: event.id,
            status: command.new_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventStatus;
    use uuid::Uuid;

    #[test]
    fn test_set_event_status_command() {
        let event_id = Uuid::new_v4();
        let cmd = SetEventStatusCommand::new(event_id, EventStatus::Published);

        assert_eq!(cmd.event_id, event_id);
        assert_eq!(cmd.new_status, EventStatus::Published);
    }
}
