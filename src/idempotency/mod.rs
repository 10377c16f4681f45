//! Idempotency module
//!
//! Duplicate-request protection for the purchase path.

mod repository;

pub use repository::{IdempotencyError, IdempotencyKey, IdempotencyRepository, IdempotencyStatus};
