//! Command implementations.
//!
//! CHANGELOG:
//! - 10/19/2026 - Bulk send command
//! - 01/10/2026 - Initial module structure

pub mod send;
