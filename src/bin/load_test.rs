//! Load Testing Tool
//!
//! Fires concurrent purchases at a single ticket type and verifies the
//! no-oversell property from the outside.
//!
//! Run with: cargo run --bin load_test --release -- --buyers 200 --capacity 50

use std::time::Instant;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use box_office::domain::{OperationContext, UserRole};
use box_office::handlers::{PurchaseCommand, PurchaseHandler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let buyers: u64 = args
        .iter()
        .position(|a| a == "--buyers")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(200);
    let capacity: i32 = args
        .iter()
        .position(|a| a == "--capacity")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Load Test - {} buyers against capacity {}", buyers, capacity);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await?;

    // Seed one published event with a single ticket type
    let event_id = Uuid::new_v4();
    let ticket_type_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO events (
            id, organizer_id, title, status, max_tickets_per_user,
            total_capacity, tickets_sold, sold_out, start_date, end_date
        )
        VALUES ($1, $2, 'Load Test Event', 'published', 10, $3, 0, false,
                NOW() + INTERVAL '1 day', NOW() + INTERVAL '2 days')
        "#,
    )
    .bind(event_id)
    .bind(Uuid::new_v4())
    .bind(capacity)
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO ticket_types (id, event_id, name, price, total, available)
        VALUES ($1, $2, 'General', 10.00, $3, $3)
        "#,
    )
    .bind(ticket_type_id)
    .bind(event_id)
    .bind(capacity)
    .execute(&pool)
    .await?;

    let start = Instant::now();

    let mut tasks = Vec::with_capacity(buyers as usize);
    for _ in 0..buyers {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let user_id = Uuid::new_v4();
            let handler = PurchaseHandler::new(pool);
            let context = OperationContext::new()
                .with_request_user(user_id)
                .with_request_role(UserRole::User);
            let command = PurchaseCommand::new(event_id, ticket_type_id, user_id, 1);

            handler.execute(command, None, &context).await.is_ok()
        }));
    }

    let mut success_count = 0u64;
    for task in tasks {
        if task.await.unwrap_or(false) {
            success_count += 1;
        }
    }

    let elapsed = start.elapsed();

    // Read back the authoritative state
    let (available, sold): (i32, i32) = sqlx::query_as(
        r#"
        SELECT tt.available, e.tickets_sold
        FROM ticket_types tt
        JOIN events e ON e.id = tt.event_id
        WHERE tt.id = $1
        "#,
    )
    .bind(ticket_type_id)
    .fetch_one(&pool)
    .await?;

    let expected = (buyers as i64).min(capacity as i64) as u64;

    println!("\n=== Load Test Results ===");
    println!("Buyers: {}", buyers);
    println!("Capacity: {}", capacity);
    println!("Successful purchases: {} (expected {})", success_count, expected);
    println!("Remaining availability: {}", available);
    println!("Tickets sold counter: {}", sold);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {:.0} purchases/sec", success_count as f64 / elapsed.as_secs_f64());

    if available < 0 {
        anyhow::bail!("OVERSOLD: available went negative ({})", available);
    }
    if success_count != expected {
        anyhow::bail!(
            "Winner count mismatch: {} succeeded, expected {}",
            success_count,
            expected
        );
    }

    println!("No oversell detected.");
    Ok(())
}
