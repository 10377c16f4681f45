//! Booking Ledger module
//!
//! Leaf data owner for issued ticket records.

mod repository;
mod ticket;

pub use repository::BookingLedger;
pub use ticket::Ticket;
