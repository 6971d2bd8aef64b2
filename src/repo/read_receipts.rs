use rusqlite::params;

use crate::error::AppResult;
use crate::models::ReadReceipt;
use crate::time::now_secs;

use super::Repository;

impl Repository {
    /// Marks `message_id` read by `user_id` (spec §4.6.4 mark-read). A later
    /// call with an earlier message in the same room is still recorded
    /// per-message; "read up to" is derived by the caller from `seq`, not
    /// stored redundantly here.
    pub fn read_receipt_mark(&self, message_id: &str, room_id: &str, user_id: &str) -> AppResult<ReadReceipt> {
        let conn = self.db.conn();
        let now = now_secs();
        conn.execute(
            "INSERT INTO read_receipts (message_id, user_id, room_id, read_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(message_id, user_id) DO UPDATE SET read_at = excluded.read_at",
            params![message_id, user_id, room_id, now],
        )?;
        Ok(ReadReceipt {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            read_at: now,
        })
    }

    /// Every reader's receipt for one message (spec §4.6.4 receipts-for).
    pub fn read_receipt_list_for_message(&self, message_id: &str) -> AppResult<Vec<ReadReceipt>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT message_id, user_id, read_at FROM read_receipts WHERE message_id = ?1 ORDER BY read_at ASC",
        )?;
        let rows = stmt
            .query_map(params![message_id], |row| {
                Ok(ReadReceipt {
                    message_id: row.get(0)?,
                    user_id: row.get(1)?,
                    read_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The most recent message `user_id` has read in `room_id`, if any (spec
    /// §4.6.4 unread-count support).
    pub fn read_receipt_latest_for_user(&self, room_id: &str, user_id: &str) -> AppResult<Option<ReadReceipt>> {
        let conn = self.db.conn();
        let result = conn.query_row(
            "SELECT message_id, user_id, read_at FROM read_receipts WHERE room_id = ?1 AND user_id = ?2 ORDER BY read_at DESC LIMIT 1",
            params![room_id, user_id],
            |row| {
                Ok(ReadReceipt {
                    message_id: row.get(0)?,
                    user_id: row.get(1)?,
                    read_at: row.get(2)?,
                })
            },
        );
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
