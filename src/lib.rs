//! bulk-imessage library
//!
//! Exposes modules for the CLI binary and for tests.
//!
//! CHANGELOG:
//! - 10/19/2026 - Bulk sender modules (channels, dispatch, send log, verify)
//! - 01/10/2026 - Initial library structure

// Core modules
pub mod applescript;
pub mod channels;
pub mod commands;
pub mod contacts;
pub mod db;
pub mod dispatch;
pub mod output;
pub mod send_log;
pub mod template;
pub mod verify;
