//! Ticket Type Inventory
//!
//! Owns per-type capacity pools. `available` is only ever mutated through
//! `reserve` and `release`, inside a coordinator transaction that already
//! holds the event row lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::catalog::TicketTypeDraft;
use crate::domain::{DomainError, Quantity};
use crate::error::AppError;

/// A priced admission category with its own capacity pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    /// Capacity, fixed at creation.
    pub total: i32,
    /// Remaining unsold capacity, 0 <= available <= total.
    pub available: i32,
    pub created_at: DateTime<Utc>,
}

type TicketTypeRow = (Uuid, Uuid, String, Decimal, i32, i32, DateTime<Utc>);

fn ticket_type_from_row(row: TicketTypeRow) -> TicketType {
    let (id, event_id, name, price, total, available, created_at) = row;
    TicketType {
        id,
        event_id,
        name,
        price,
        total,
        available,
        created_at,
    }
}

/// Repository for ticket type capacity
#[derive(Debug, Clone)]
pub struct TicketTypeInventory {
    pool: PgPool,
}

impl TicketTypeInventory {
    /// Create a new TicketTypeInventory with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a ticket type scoped to its owning event
    pub async fn get_ticket_type(
        &self,
        event_id: Uuid,
        ticket_type_id: Uuid,
    ) -> Result<TicketType, AppError> {
        let row: Option<TicketTypeRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, name, price, total, available, created_at
            FROM ticket_types
            WHERE id = $1 AND event_id = $2
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ticket_type_from_row)
            .ok_or_else(|| DomainError::TicketTypeNotFound(ticket_type_id).into())
    }

    /// Fetch a ticket type inside a transaction, taking a row lock.
    ///
    /// Callers must already hold the event row lock (see EventCatalog).
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        ticket_type_id: Uuid,
    ) -> Result<TicketType, AppError> {
        let row: Option<TicketTypeRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, name, price, total, available, created_at
            FROM ticket_types
            WHERE id = $1 AND event_id = $2
            FOR UPDATE
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(ticket_type_from_row)
            .ok_or_else(|| DomainError::TicketTypeNotFound(ticket_type_id).into())
    }

    /// List all ticket types of an event
    pub async fn list_ticket_types(&self, event_id: Uuid) -> Result<Vec<TicketType>, AppError> {
        let rows: Vec<TicketTypeRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, name, price, total, available, created_at
            FROM ticket_types
            WHERE event_id = $1
            ORDER BY created_at ASC, name ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ticket_type_from_row).collect())
    }

    /// Insert the ticket types of a newly created event.
    /// New pools start full: available == total.
    pub async fn insert_ticket_types(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        drafts: &[TicketTypeDraft],
    ) -> Result<Vec<TicketType>, AppError> {
        let mut created = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let row: TicketTypeRow = sqlx::query_as(
                r#"
                INSERT INTO ticket_types (id, event_id, name, price, total, available)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING id, event_id, name, price, total, available, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(event_id)
            .bind(&draft.name)
            .bind(draft.price)
            .bind(draft.total as i32)
            .fetch_one(&mut **tx)
            .await?;

            created.push(ticket_type_from_row(row));
        }

        Ok(created)
    }

    /// Atomically take `quantity` units out of the pool.
    ///
    /// The guard re-checks availability at write time; with the row lock
    /// held a refusal means a lost race, which the coordinator retries.
    pub async fn reserve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        ticket_type_id: Uuid,
        quantity: Quantity,
    ) -> Result<(), AppError> {
        let rows = sqlx::query(
            r#"
            UPDATE ticket_types
            SET available = available - $3
            WHERE id = $1 AND event_id = $2 AND available >= $3
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .bind(quantity.as_i32())
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(DomainError::ConcurrencyConflict.into());
        }

        Ok(())
    }

    /// Return `quantity` units to the pool, capped at `total`.
    ///
    /// Exceeding the cap cannot happen in correct operation; when it does,
    /// it is logged as an invariant violation and clamped so the stored
    /// state stays inside its range.
    pub async fn release(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        ticket_type_id: Uuid,
        quantity: Quantity,
    ) -> Result<(), AppError> {
        let rows = sqlx::query(
            r#"
            UPDATE ticket_types
            SET available = available + $3
            WHERE id = $1 AND event_id = $2 AND available + $3 <= total
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .bind(quantity.as_i32())
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows > 0 {
            return Ok(());
        }

        // Either the row is gone or the release would exceed total
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM ticket_types WHERE id = $1 AND event_id = $2)
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await?;

        if !exists {
            return Err(DomainError::TicketTypeNotFound(ticket_type_id).into());
        }

        tracing::error!(
            event_id = %event_id,
            ticket_type_id = %ticket_type_id,
            quantity = quantity.value(),
            "Invariant violation: release would push available above total; clamping"
        );

        sqlx::query(
            r#"
            UPDATE ticket_types
            SET available = total
            WHERE id = $1 AND event_id = $2
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// True iff no ticket type of the event has units left.
    /// Used to recompute the event's sold-out flag after a decrement.
    pub async fn all_depleted(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<bool, AppError> {
        let any_left: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM ticket_types WHERE event_id = $1 AND available > 0
            )
            "#,
        )
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(!any_left)
    }
}
