//! Delivery-state lookups for outgoing messages.
//!
//! These functions accept `&Connection` so the verifier can reopen the
//! database on every poll while tests run against an in-memory schema.
//!
//! CHANGELOG:
//! - 10/19/2026 - Read only delivery state from the newest outgoing message
//! - 10/19/2026 - Initial implementation

use anyhow::Result;
use rusqlite::{self, Connection, OptionalExtension};
use tracing::debug;

use super::queries;
use crate::contacts::phone::digits_only;

/// Which delivery columns the message table has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryColumns {
    pub is_delivered: bool,
    pub date_delivered: bool,
}

impl DeliveryColumns {
    pub fn any(&self) -> bool {
        self.is_delivered || self.date_delivered
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub rowid: i64,
    pub is_delivered: Option<i64>,
    pub date_delivered: Option<i64>,
}

/// Inspect the message table for delivery columns.
pub fn message_columns(conn: &Connection) -> Result<DeliveryColumns> {
    let mut stmt = conn.prepare(queries::MESSAGE_COLUMNS)?;
    let names = stmt.query_map([], |row: &rusqlite::Row| row.get::<_, String>(1))?;

    let mut cols = DeliveryColumns::default();
    for name in names {
        match name?.as_str() {
            "is_delivered" => cols.is_delivered = true,
            "date_delivered" => cols.date_delivered = true,
            _ => {}
        }
    }
    Ok(cols)
}

/// Find the newest handle whose digits end with the phone's digits.
pub fn find_handle_for_phone(conn: &Connection, phone: &str) -> Result<Option<(i64, String)>> {
    let want = digits_only(phone);
    if want.is_empty() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(queries::HANDLES_NEWEST_FIRST)?;
    let rows = stmt.query_map([], |row: &rusqlite::Row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (rowid, addr) = row?;
        if digits_only(&addr).ends_with(&want) {
            return Ok(Some((rowid, addr)));
        }
    }
    Ok(None)
}

/// Newest outgoing message for a handle.
pub fn latest_outgoing(
    conn: &Connection,
    handle_rowid: i64,
    cols: DeliveryColumns,
) -> Result<Option<OutgoingMessage>> {
    let sql = queries::LATEST_OUTGOING_TEMPLATE
        .replace(
            "{is_delivered}",
            if cols.is_delivered { "m.is_delivered" } else { "NULL" },
        )
        .replace(
            "{date_delivered}",
            if cols.date_delivered { "m.date_delivered" } else { "NULL" },
        );

    let mut stmt = conn.prepare(&sql)?;
    let msg = stmt
        .query_row([handle_rowid], |row: &rusqlite::Row| {
            Ok(OutgoingMessage {
                rowid: row.get(0)?,
                is_delivered: row.get(1)?,
                date_delivered: row.get(2)?,
            })
        })
        .optional()?;
    Ok(msg)
}

/// Whether a message still counts as undelivered.
///
/// A schema with no delivery columns is undetermined, which counts as
/// undelivered so the caller keeps polling until its timeout.
pub fn is_undelivered(msg: Option<&OutgoingMessage>, cols: DeliveryColumns) -> bool {
    let Some(msg) = msg else {
        return true;
    };
    if !cols.any() {
        return true;
    }

    let by_flag = cols.is_delivered && msg.is_delivered == Some(0);
    let by_date = cols.date_delivered && matches!(msg.date_delivered, None | Some(0));
    by_flag || by_date
}

/// One poll: has the latest outgoing message to `phone` been delivered?
pub fn delivery_confirmed(conn: &Connection, phone: &str) -> Result<bool> {
    let Some((handle_rowid, _)) = find_handle_for_phone(conn, phone)? else {
        return Ok(false);
    };
    let cols = message_columns(conn)?;
    let msg = latest_outgoing(conn, handle_rowid, cols)?;
    let delivered = !is_undelivered(msg.as_ref(), cols);
    debug!(
        handle = handle_rowid,
        message = ?msg.as_ref().map(|m| m.rowid),
        delivered,
        "delivery poll"
    );
    Ok(delivered)
}
