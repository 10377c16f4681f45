//! Event Catalog
//!
//! Owns event records and their lifecycle status. The sold counters and the
//! sold-out flag are mutated only from inside coordinator transactions.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{DomainError, EventStatus};
use crate::error::AppError;

use super::event::{Event, EventDraft};

type EventRow = (
    Uuid,
    Uuid,
    String,
    String,
    i32,
    i32,
    i32,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn event_from_row(row: EventRow) -> Result<Event, AppError> {
    let (
        id,
        organizer_id,
        title,
        status,
        max_tickets_per_user,
        total_capacity,
        tickets_sold,
        sold_out,
        start_date,
        end_date,
        created_at,
        updated_at,
    ) = row;

    let status: EventStatus = status
        .parse()
        .map_err(|e| AppError::Internal(format!("Corrupt event row {}: {}", id, e)))?;

    Ok(Event {
        id,
        organizer_id,
        title,
        status,
        max_tickets_per_user,
        total_capacity,
        tickets_sold,
        sold_out,
        start_date,
        end_date,
        created_at,
        updated_at,
    })
}

/// Repository for event records
#[derive(Debug, Clone)]
pub struct EventCatalog {
    pool: PgPool,
}

impl EventCatalog {
    /// Create a new EventCatalog with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch an event by ID
    pub async fn get_event(&self, event_id: Uuid) -> Result<Event, AppError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, organizer_id, title, status, max_tickets_per_user,
                   total_capacity, tickets_sold, sold_out, start_date, end_date,
                   created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => event_from_row(row),
            None => Err(DomainError::EventNotFound(event_id).into()),
        }
    }

    /// Fetch an event inside a transaction, taking a row lock.
    ///
    /// All coordinator transactions lock the event row first, then the
    /// ticket type row; the fixed order keeps them deadlock-free.
    pub async fn get_event_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<Event, AppError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, organizer_id, title, status, max_tickets_per_user,
                   total_capacity, tickets_sold, sold_out, start_date, end_date,
                   created_at, updated_at
            FROM events
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => event_from_row(row),
            None => Err(DomainError::EventNotFound(event_id).into()),
        }
    }

    /// Insert a new event from a validated draft.
    ///
    /// New events start as drafts with nothing sold; capacity is the sum of
    /// the draft's ticket type totals and never changes afterwards.
    pub async fn insert_event(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        organizer_id: Uuid,
        draft: &EventDraft,
    ) -> Result<Event, AppError> {
        let event_id = Uuid::new_v4();
        let total_capacity = i32::try_from(draft.total_capacity()).map_err(|_| {
            AppError::from(DomainError::InvalidRequest(
                "Total capacity is too large".to_string(),
            ))
        })?;

        let row: EventRow = sqlx::query_as(
            r#"
            INSERT INTO events (
                id, organizer_id, title, status, max_tickets_per_user,
                total_capacity, tickets_sold, sold_out, start_date, end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, false, $7, $8)
            RETURNING id, organizer_id, title, status, max_tickets_per_user,
                      total_capacity, tickets_sold, sold_out, start_date, end_date,
                      created_at, updated_at
            "#,
        )
        .bind(event_id)
        .bind(organizer_id)
        .bind(&draft.title)
        .bind(EventStatus::Draft.as_str())
        .bind(draft.max_tickets_per_user as i32)
        .bind(total_capacity)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .fetch_one(&mut **tx)
        .await?;

        event_from_row(row)
    }

    /// Persist a lifecycle status change.
    ///
    /// Transition validity and caller authorization are checked by the
    /// status handler against a locked read before calling this.
    pub async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        new_status: EventStatus,
    ) -> Result<(), AppError> {
        let rows = sqlx::query(
            r#"
            UPDATE events SET status = $2, updated_at = NOW() WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(new_status.as_str())
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(DomainError::EventNotFound(event_id).into());
        }

        Ok(())
    }

    /// Adjust the sold counter. Internal mutator, coordinator-only.
    pub async fn increment_sold(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        delta: i32,
    ) -> Result<(), AppError> {
        let rows = sqlx::query(
            r#"
            UPDATE events
            SET tickets_sold = tickets_sold + $2, updated_at = NOW()
            WHERE id = $1 AND tickets_sold + $2 >= 0 AND tickets_sold + $2 <= total_capacity
            "#,
        )
        .bind(event_id)
        .bind(delta)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows == 0 {
            // The guarded update refused: the counter would leave its range
            tracing::error!(
                event_id = %event_id,
                delta = delta,
                "tickets_sold adjustment rejected, counter would leave [0, total_capacity]"
            );
            return Err(AppError::Internal(format!(
                "tickets_sold adjustment out of range for event {}",
                event_id
            )));
        }

        Ok(())
    }

    /// Persist the sold-out flag. Internal mutator, coordinator-only.
    pub async fn set_sold_out(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        sold_out: bool,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE events SET sold_out = $2, updated_at = NOW() WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(sold_out)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
