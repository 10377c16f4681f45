//! Booking Ledger
//!
//! Append-mostly store of issued tickets. Inserts happen only inside
//! coordinator transactions; status updates go through the ticket state
//! machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{DomainError, TicketCode, TicketStatus};
use crate::error::AppError;

use super::ticket::Ticket;

type TicketRow = (
    Uuid,
    Uuid,
    Uuid,
    Uuid,
    DateTime<Utc>,
    String,
    Decimal,
    String,
    bool,
    Option<Uuid>,
    Option<String>,
);

fn ticket_from_row(row: TicketRow) -> Result<Ticket, AppError> {
    let (
        id,
        ticket_type_id,
        event_id,
        user_id,
        purchase_date,
        status,
        price,
        ticket_code,
        is_transferred,
        transferred_to,
        special_requests,
    ) = row;

    let status: TicketStatus = status
        .parse()
        .map_err(|e| AppError::Internal(format!("Corrupt ticket row {}: {}", id, e)))?;

    Ok(Ticket {
        id,
        ticket_type_id,
        event_id,
        user_id,
        purchase_date,
        status,
        price,
        ticket_code: TicketCode::from_stored(ticket_code),
        is_transferred,
        transferred_to,
        special_requests,
    })
}

/// Repository for issued tickets
#[derive(Debug, Clone)]
pub struct BookingLedger {
    pool: PgPool,
}

impl BookingLedger {
    /// Create a new BookingLedger with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of freshly issued tickets.
    ///
    /// All-or-nothing: any failure aborts the caller's transaction, so no
    /// partial batch ever becomes visible. A ticket code collision violates
    /// the unique index here and is retried by the coordinator with fresh
    /// codes.
    pub async fn insert_tickets(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tickets: &[Ticket],
    ) -> Result<Vec<Uuid>, AppError> {
        let mut ids = Vec::with_capacity(tickets.len());

        for ticket in tickets {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO tickets (
                    id, ticket_type_id, event_id, user_id, purchase_date,
                    status, price, ticket_code, is_transferred, transferred_to,
                    special_requests
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id
                "#,
            )
            .bind(ticket.id)
            .bind(ticket.ticket_type_id)
            .bind(ticket.event_id)
            .bind(ticket.user_id)
            .bind(ticket.purchase_date)
            .bind(ticket.status.as_str())
            .bind(ticket.price)
            .bind(ticket.ticket_code.as_str())
            .bind(ticket.is_transferred)
            .bind(ticket.transferred_to)
            .bind(&ticket.special_requests)
            .fetch_one(&mut **tx)
            .await?;

            ids.push(id);
        }

        Ok(ids)
    }

    /// Fetch a ticket by ID
    pub async fn get_ticket(&self, ticket_id: Uuid) -> Result<Ticket, AppError> {
        let row: Option<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_type_id, event_id, user_id, purchase_date,
                   status, price, ticket_code, is_transferred, transferred_to,
                   special_requests
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => ticket_from_row(row),
            None => Err(DomainError::TicketNotFound(ticket_id).into()),
        }
    }

    /// Fetch a ticket inside a transaction, taking a row lock
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ticket_id: Uuid,
    ) -> Result<Ticket, AppError> {
        let row: Option<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_type_id, event_id, user_id, purchase_date,
                   status, price, ticket_code, is_transferred, transferred_to,
                   special_requests
            FROM tickets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => ticket_from_row(row),
            None => Err(DomainError::TicketNotFound(ticket_id).into()),
        }
    }

    /// All tickets held by a user, newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_type_id, event_id, user_id, purchase_date,
                   status, price, ticket_code, is_transferred, transferred_to,
                   special_requests
            FROM tickets
            WHERE user_id = $1
            ORDER BY purchase_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ticket_from_row).collect()
    }

    /// All tickets issued for an event, newest first
    pub async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_type_id, event_id, user_id, purchase_date,
                   status, price, ticket_code, is_transferred, transferred_to,
                   special_requests
            FROM tickets
            WHERE event_id = $1
            ORDER BY purchase_date DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ticket_from_row).collect()
    }

    /// Count of a user's non-cancelled tickets for an event.
    ///
    /// Feeds the cumulative per-user cap; evaluated inside the purchase
    /// transaction so concurrent purchases by the same user serialize on
    /// the event row lock before counting.
    pub async fn count_active_for_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<u32, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tickets
            WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count.max(0) as u32)
    }

    /// Apply a status transition, enforcing the ticket state machine.
    pub async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ticket_id: Uuid,
        new_status: TicketStatus,
    ) -> Result<(), AppError> {
        let ticket = self.get_for_update(tx, ticket_id).await?;

        if !ticket.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidStatusTransition {
                from: ticket.status,
                to: new_status,
            }
            .into());
        }

        sqlx::query(
            r#"
            UPDATE tickets SET status = $2 WHERE id = $1
            "#,
        )
        .bind(ticket_id)
        .bind(new_status.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
