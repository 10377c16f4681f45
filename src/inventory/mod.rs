//! Ticket Type Inventory module
//!
//! Leaf data owner for per-type capacity pools.

mod repository;

pub use repository::{TicketType, TicketTypeInventory};
