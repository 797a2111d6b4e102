//! SQL queries for Messages.db.
//!
//! CHANGELOG:
//! - 10/19/2026 - Dropped Cocoa date helpers; verification only reads delivery state
//! - 10/19/2026 - Delivery-state queries for send verification
//! - 01/10/2026 - Initial stub with query constants

/// Every handle, newest first. Matching on digits happens in Rust because
/// handles are stored in whatever format the carrier delivered.
pub const HANDLES_NEWEST_FIRST: &str = r#"
SELECT ROWID, id
FROM handle
ORDER BY ROWID DESC
"#;

/// Column listing for the message table (delivery columns vary by macOS release).
pub const MESSAGE_COLUMNS: &str = "PRAGMA table_info(message)";

/// Newest outgoing message for a handle.
///
/// `{is_delivered}` / `{date_delivered}` are replaced with the column or
/// `NULL` depending on what the schema has.
/// Parameters: ?1 = handle ROWID
pub const LATEST_OUTGOING_TEMPLATE: &str = r#"
SELECT
    m.ROWID,
    {is_delivered},
    {date_delivered}
FROM message m
WHERE m.is_from_me = 1
  AND m.handle_id = ?1
ORDER BY m.date DESC
LIMIT 1
"#;
