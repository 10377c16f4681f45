//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.
//! These jobs are run on a schedule to apply end-of-life transitions and
//! clean up expired data.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

/// How often the maintenance loop runs
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

// =========================================================================
// Event completion sweep
// =========================================================================

/// Complete published events whose end date has passed.
/// Completed is terminal; draft events are left alone (they can only be
/// published or cancelled by their organizer).
pub async fn complete_finished_events(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        UPDATE events
        SET status = 'completed', updated_at = NOW()
        WHERE status = 'published' AND end_date < NOW()
        "#,
    )
    .execute(pool)
    .await?;

    let rows_updated = result.rows_affected();

    if rows_updated > 0 {
        tracing::info!(
            rows_updated = rows_updated,
            "Completed events past their end date"
        );
    }

    Ok(rows_updated)
}

// =========================================================================
// Rate Limit Bucket Cleanup Job
// =========================================================================

/// Clean up expired rate limit buckets
/// Removes buckets older than 2 minutes to prevent unbounded growth
pub async fn cleanup_rate_limit_buckets(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        DELETE FROM rate_limit_buckets
        WHERE window_start < NOW() - INTERVAL '2 minutes'
        "#,
    )
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            "Cleaned up expired rate limit buckets"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Idempotency Key Timeout Reset Job
// =========================================================================

/// Reset stale idempotency keys that are stuck in 'processing' status
/// Keys stuck for more than 5 minutes are reset to 'failed' to allow retry
pub async fn reset_stale_idempotency_keys(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        UPDATE idempotency_keys
        SET processing_status = 'failed'
        WHERE processing_status = 'processing'
          AND processing_started_at < NOW() - INTERVAL '5 minutes'
        "#,
    )
    .execute(pool)
    .await?;

    let rows_affected = result.rows_affected();

    if rows_affected > 0 {
        tracing::warn!(
            rows_affected = rows_affected,
            "Reset stale processing idempotency keys"
        );
    }

    Ok(rows_affected)
}

// =========================================================================
// Expired Idempotency Key Deletion Job
// =========================================================================

/// Delete expired idempotency keys
/// Keys older than their expiration time (default 24 hours) are removed
pub async fn delete_expired_idempotency_keys(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        DELETE FROM idempotency_keys
        WHERE expires_at < NOW()
        "#,
    )
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            "Deleted expired idempotency keys"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Maintenance loop
// =========================================================================

/// Spawn the periodic maintenance loop.
/// Individual job failures are logged and do not stop the loop.
pub fn spawn(pool: PgPool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(MAINTENANCE_INTERVAL);

        loop {
            ticker.tick().await;

            if let Err(e) = complete_finished_events(&pool).await {
                tracing::error!("Event completion sweep failed: {}", e);
            }
            if let Err(e) = cleanup_rate_limit_buckets(&pool).await {
                tracing::error!("Rate limit cleanup failed: {}", e);
            }
            if let Err(e) = reset_stale_idempotency_keys(&pool).await {
                tracing::error!("Idempotency key reset failed: {}", e);
            }
            if let Err(e) = delete_expired_idempotency_keys(&pool).await {
                tracing::error!("Idempotency key cleanup failed: {}", e);
            }
        }
    })
}

/// Job errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
