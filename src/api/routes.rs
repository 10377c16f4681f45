//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditLogEntry, AuditLogService, ChainVerificationResult};
use crate::catalog::{Event, EventCatalog, EventDraft, TicketTypeDraft};
use crate::domain::{EventStatus, OperationContext, TicketStatus};
use crate::error::AppError;
use crate::handlers::{
    CancelCommand, CancelHandler, CreateEventCommand, CreateEventHandler, EventStatusHandler,
    PurchaseCommand, PurchaseHandler, SetEventStatusCommand, SetTicketStatusCommand,
    TicketStatusHandler,
};
use crate::inventory::{TicketType, TicketTypeInventory};
use crate::ledger::{BookingLedger, Ticket};

use super::middleware::{AuthenticatedApiKey, RequestUser};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub max_tickets_per_user: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub ticket_types: Vec<TicketTypeRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketTypeRequest {
    pub name: String,
    pub price: Decimal,
    pub total: u32,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub status: EventStatus,
    pub max_tickets_per_user: i32,
    pub total_capacity: i32,
    pub tickets_sold: i32,
    pub sold_out: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            organizer_id: event.organizer_id,
            title: event.title,
            status: event.status,
            max_tickets_per_user: event.max_tickets_per_user,
            total_capacity: event.total_capacity,
            tickets_sold: event.tickets_sold,
            sold_out: event.sold_out,
            start_date: event.start_date,
            end_date: event.end_date,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketTypeResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub total: i32,
    pub available: i32,
}

impl From<TicketType> for TicketTypeResponse {
    fn from(ticket_type: TicketType) -> Self {
        Self {
            id: ticket_type.id,
            event_id: ticket_type.event_id,
            name: ticket_type.name,
            price: ticket_type.price,
            total: ticket_type.total,
            available: ticket_type.available,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub event: EventResponse,
    pub ticket_types: Vec<TicketTypeResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetEventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Serialize)]
pub struct SetEventStatusResponse {
    pub event_id: Uuid,
    pub status: EventStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub ticket_type_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub status: TicketStatus,
    pub price: Decimal,
    pub ticket_code: String,
    pub is_transferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_to: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            ticket_type_id: ticket.ticket_type_id,
            event_id: ticket.event_id,
            user_id: ticket.user_id,
            purchase_date: ticket.purchase_date,
            status: ticket.status,
            price: ticket.price,
            ticket_code: ticket.ticket_code.into(),
            is_transferred: ticket.is_transferred,
            transferred_to: ticket.transferred_to,
            special_requests: ticket.special_requests,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    pub user_id: Uuid,
    pub quantity: usize,
    pub tickets: Vec<TicketResponse>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetTicketStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct AuditLogsQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    pub entries: Vec<AuditLogEntry>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<PgPool> {
    Router::new()
        // Event endpoints
        .route("/events", post(create_event))
        .route("/events/:event_id", get(get_event))
        .route("/events/:event_id/status", patch(set_event_status))
        .route("/events/:event_id/ticket-types", get(list_ticket_types))
        .route("/events/:event_id/tickets", get(list_event_tickets))
        // Booking endpoints
        .route("/events/:event_id/purchase", post(purchase))
        .route("/tickets/:ticket_id", get(get_ticket))
        .route("/tickets/:ticket_id/cancel", post(cancel_ticket))
        .route("/users/:user_id/tickets", get(list_user_tickets))
        // Collaborator / admin endpoints
        .route("/admin/tickets/:ticket_id/status", post(set_ticket_status))
        .route("/admin/audit-logs", get(get_audit_logs))
        .route("/admin/audit-logs/verify", get(verify_audit_logs))
}

// =========================================================================
// POST /events
// =========================================================================

/// Create a new event with its ticket types
async fn create_event(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    request_user: Option<Extension<RequestUser>>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let request_user = request_user
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))?;

    let draft = EventDraft {
        title: request.title,
        max_tickets_per_user: request.max_tickets_per_user,
        start_date: request.start_date,
        end_date: request.end_date,
        ticket_types: request
            .ticket_types
            .into_iter()
            .map(|t| TicketTypeDraft {
                name: t.name,
                price: t.price,
                total: t.total,
            })
            .collect(),
    };

    let handler = CreateEventHandler::new(pool);
    let command = CreateEventCommand::new(request_user.user_id, draft);
    let result = handler.execute(command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            event: result.event.into(),
            ticket_types: result.ticket_types.into_iter().map(Into::into).collect(),
        }),
    ))
}

// =========================================================================
// GET /events/:event_id
// =========================================================================

/// Get event by ID
async fn get_event(
    State(pool): State<PgPool>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, AppError> {
    let catalog = EventCatalog::new(pool);
    let event = catalog.get_event(event_id).await?;

    Ok(Json(event.into()))
}

// =========================================================================
// PATCH /events/:event_id/status
// =========================================================================

/// Move an event through its lifecycle
async fn set_event_status(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<SetEventStatusRequest>,
) -> Result<Json<SetEventStatusResponse>, AppError> {
    let handler = EventStatusHandler::new(pool);
    let command = SetEventStatusCommand::new(event_id, request.status);
    let result = handler.execute(command, &context).await?;

    Ok(Json(SetEventStatusResponse {
        event_id: result.event_id,
        status: result.status,
    }))
}

// =========================================================================
// GET /events/:event_id/ticket-types
// =========================================================================

/// List ticket types with availability for an event
async fn list_ticket_types(
    State(pool): State<PgPool>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<TicketTypeResponse>>, AppError> {
    // The event must exist even when it has no types yet
    let catalog = EventCatalog::new(pool.clone());
    catalog.get_event(event_id).await?;

    let inventory = TicketTypeInventory::new(pool);
    let ticket_types = inventory.list_ticket_types(event_id).await?;

    Ok(Json(ticket_types.into_iter().map(Into::into).collect()))
}

// =========================================================================
// GET /events/:event_id/tickets
// =========================================================================

/// List tickets issued for an event (owning organizer or admin)
async fn list_event_tickets(
    State(pool): State<PgPool>,
    request_user: Option<Extension<RequestUser>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<TicketListResponse>, AppError> {
    let request_user = request_user
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))?;

    let catalog = EventCatalog::new(pool.clone());
    let event = catalog.get_event(event_id).await?;

    if event.organizer_id != request_user.user_id && !request_user.role.is_admin() {
        return Err(crate::domain::DomainError::Unauthorized(
            "caller does not own this event".to_string(),
        )
        .into());
    }

    let ledger = BookingLedger::new(pool);
    let tickets = ledger.list_by_event(event_id).await?;
    let total = tickets.len();

    Ok(Json(TicketListResponse {
        tickets: tickets.into_iter().map(Into::into).collect(),
        total,
    }))
}

// =========================================================================
// POST /events/:event_id/purchase
// =========================================================================

/// Purchase tickets of one type for the requesting user
async fn purchase(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    request_user: Option<Extension<RequestUser>>,
    Path(event_id): Path<Uuid>,
    headers: axum::http::HeaderMap,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    // X-Request-User-Id is required for purchase
    let request_user = request_user
        .ok_or_else(|| AppError::MissingHeader("X-Request-User-Id".to_string()))?;

    // Extract idempotency key if present
    let idempotency_key = headers.get("Idempotency-Key");
    let idem_key = idempotency_key
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());

    let handler = PurchaseHandler::new(pool);

    let command = PurchaseCommand::new(
        event_id,
        request.ticket_type_id,
        request_user.user_id,
        request.quantity,
    );
    let command = if let Some(special_requests) = request.special_requests {
        command.with_special_requests(special_requests)
    } else {
        command
    };

    let result = handler.execute(command, idem_key, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            event_id: result.event_id,
            ticket_type_id: result.ticket_type_id,
            user_id: result.user_id,
            quantity: result.tickets.len(),
            tickets: result.tickets.into_iter().map(Into::into).collect(),
        }),
    ))
}

// =========================================================================
// GET /tickets/:ticket_id
// =========================================================================

/// Get a ticket by ID
async fn get_ticket(
    State(pool): State<PgPool>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    let ledger = BookingLedger::new(pool);
    let ticket = ledger.get_ticket(ticket_id).await?;

    Ok(Json(ticket.into()))
}

// =========================================================================
// POST /tickets/:ticket_id/cancel
// =========================================================================

/// Cancel a purchased ticket (holder or admin)
async fn cancel_ticket(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let handler = CancelHandler::new(pool);
    let result = handler.execute(CancelCommand::new(ticket_id), &context).await?;

    Ok(Json(CancelResponse {
        ticket_id: result.ticket_id,
        status: result.status,
    }))
}

// =========================================================================
// GET /users/:user_id/tickets
// =========================================================================

/// List the tickets held by a user
async fn list_user_tickets(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TicketListResponse>, AppError> {
    let ledger = BookingLedger::new(pool);
    let tickets = ledger.list_by_user(user_id).await?;
    let total = tickets.len();

    Ok(Json(TicketListResponse {
        tickets: tickets.into_iter().map(Into::into).collect(),
        total,
    }))
}

// =========================================================================
// POST /admin/tickets/:ticket_id/status
// =========================================================================

/// Apply a ticket status transition (check-in / refund collaborators)
async fn set_ticket_status(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<SetTicketStatusRequest>,
) -> Result<Json<TicketResponse>, AppError> {
    if !api_key.has_permission("write:tickets") {
        return Err(AppError::Forbidden(
            "write:tickets permission required".to_string(),
        ));
    }

    let handler = TicketStatusHandler::new(pool.clone());
    handler
        .execute(SetTicketStatusCommand::new(ticket_id, request.status), &context)
        .await?;

    let ledger = BookingLedger::new(pool);
    let ticket = ledger.get_ticket(ticket_id).await?;

    Ok(Json(ticket.into()))
}

// =========================================================================
// GET /admin/audit-logs
// =========================================================================

/// List recent audit log entries (admin only)
async fn get_audit_logs(
    State(pool): State<PgPool>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
    Query(query): Query<AuditLogsQuery>,
) -> Result<Json<AuditLogsResponse>, AppError> {
    if !api_key.has_permission("admin") {
        return Err(AppError::Forbidden("admin permission required".to_string()));
    }

    let audit = AuditLogService::new(pool);
    let limit = query.limit.min(1000);

    let entries = match query.user_id {
        Some(user_id) => audit
            .get_by_user(user_id, limit)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?,
        None => audit
            .get_recent(limit)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?,
    };

    Ok(Json(AuditLogsResponse { entries }))
}

// =========================================================================
// GET /admin/audit-logs/verify
// =========================================================================

/// Verify the audit log hash chain (admin only)
async fn verify_audit_logs(
    State(pool): State<PgPool>,
    Extension(api_key): Extension<AuthenticatedApiKey>,
) -> Result<Json<ChainVerificationResult>, AppError> {
    if !api_key.has_permission("admin") {
        return Err(AppError::Forbidden("admin permission required".to_string()));
    }

    let audit = AuditLogService::new(pool);
    let result = audit
        .verify_hash_chain(None)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(result))
}
