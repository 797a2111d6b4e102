//! Contact feed and phone handling.
//!
//! CHANGELOG:
//! - 10/19/2026 - CSV feed and phone normalization
//! - 01/10/2026 - Initial module structure

pub mod feed;
pub mod phone;

pub use feed::{Contact, ContactFeed};
