//! Common test utilities

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Setup test database - truncate tables and seed test data
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    // Compute hash dynamically to match what middleware expects
    let hash_check: String = sqlx::query_scalar("SELECT encode(sha256('test_key_123'::bytea), 'hex')")
        .fetch_one(&pool)
        .await
        .unwrap();

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    // Clean up DB for fresh state
    sqlx::query(
        "TRUNCATE TABLE tickets, ticket_types, events, api_keys, rate_limit_buckets, idempotency_keys, audit_logs CASCADE",
    )
    .execute(&mut *tx)
    .await
    .expect("Failed to clean up DB");

    // Seed test API Key with dynamically computed hash
    sqlx::query(
        r#"
        INSERT INTO api_keys (id, name, key_hash, key_prefix, permissions, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (key_prefix) DO NOTHING
        "#
    )
    .bind(Uuid::new_v4())
    .bind("Test Key")
    .bind(&hash_check)
    .bind("test_")
    .bind(vec![
        "admin".to_string(),
        "write:tickets".to_string(),
        "read:events".to_string(),
    ])
    .bind(true)
    .execute(&mut *tx)
    .await
    .expect("Failed to seed API key");

    tx.commit().await.expect("Failed to commit transaction");

    pool
}

/// Seed an event with ticket types directly, bypassing the handlers.
/// Returns the event ID and the ticket type IDs in input order.
pub async fn seed_event(
    pool: &PgPool,
    status: &str,
    max_tickets_per_user: i32,
    ticket_types: &[(&str, Decimal, i32)],
) -> (Uuid, Vec<Uuid>) {
    let event_id = Uuid::new_v4();
    let organizer_id = Uuid::new_v4();
    let total_capacity: i32 = ticket_types.iter().map(|(_, _, total)| total).sum();

    sqlx::query(
        r#"
        INSERT INTO events (
            id, organizer_id, title, status, max_tickets_per_user,
            total_capacity, tickets_sold, sold_out, start_date, end_date
        )
        VALUES ($1, $2, 'Seeded Event', $3, $4, $5, 0, false,
                NOW() + INTERVAL '1 day', NOW() + INTERVAL '2 days')
        "#,
    )
    .bind(event_id)
    .bind(organizer_id)
    .bind(status)
    .bind(max_tickets_per_user)
    .bind(total_capacity)
    .execute(pool)
    .await
    .expect("Failed to seed event");

    let mut type_ids = Vec::with_capacity(ticket_types.len());
    for (name, price, total) in ticket_types {
        let ticket_type_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO ticket_types (id, event_id, name, price, total, available)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(ticket_type_id)
        .bind(event_id)
        .bind(name)
        .bind(price)
        .bind(total)
        .execute(pool)
        .await
        .expect("Failed to seed ticket type");

        type_ids.push(ticket_type_id);
    }

    (event_id, type_ids)
}

/// Read back (available, tickets_sold, sold_out) for one ticket type
pub async fn inventory_state(
    pool: &PgPool,
    event_id: Uuid,
    ticket_type_id: Uuid,
) -> (i32, i32, bool) {
    sqlx::query_as(
        r#"
        SELECT tt.available, e.tickets_sold, e.sold_out
        FROM ticket_types tt
        JOIN events e ON e.id = tt.event_id
        WHERE tt.id = $1 AND e.id = $2
        "#,
    )
    .bind(ticket_type_id)
    .bind(event_id)
    .fetch_one(pool)
    .await
    .expect("Failed to read inventory state")
}
