//! Database module for read-only access to Messages.db.
//!
//! CHANGELOG:
//! - 10/19/2026 - Reduced to delivery-state lookups
//! - 01/10/2026 - Initial module structure

pub mod connection;
pub mod delivery;
pub mod queries;
