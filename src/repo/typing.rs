use rusqlite::params;

use crate::error::AppResult;
use crate::models::TypingIndicator;
use crate::time::now_secs;

use super::Repository;

/// Implicit typing-indicator expiry (spec §3, §8 scenario 4).
pub const TYPING_TTL_SECS: i64 = 5;

impl Repository {
    /// Upserts a typing indicator's `started_at` (spec §4.6.4 typing-start).
    /// There is no separate "keep alive" operation; a client still typing
    /// just calls this again, resetting the expiry clock.
    pub fn typing_start(&self, room_id: &str, user_id: &str) -> AppResult<TypingIndicator> {
        let conn = self.db.conn();
        let now = now_secs();
        conn.execute(
            "INSERT INTO typing_indicators (room_id, user_id, started_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(room_id, user_id) DO UPDATE SET started_at = excluded.started_at",
            params![room_id, user_id, now],
        )?;
        Ok(TypingIndicator {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            started_at: now,
        })
    }

    pub fn typing_stop(&self, room_id: &str, user_id: &str) -> AppResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM typing_indicators WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
        )?;
        Ok(())
    }

    /// Active typists in a room, excluding indicators older than `ttl_secs`
    /// (spec §9 open question — typing indicators expire by age rather than
    /// an explicit stop, matching the teacher's never-emitting-on-expiry
    /// behavior: a stale row is simply filtered out of future reads, not
    /// announced as a stop event).
    pub fn typing_list_active(&self, room_id: &str, ttl_secs: i64) -> AppResult<Vec<TypingIndicator>> {
        let conn = self.db.conn();
        let cutoff = now_secs() - ttl_secs;
        let mut stmt = conn.prepare(
            "SELECT room_id, user_id, started_at FROM typing_indicators WHERE room_id = ?1 AND started_at >= ?2",
        )?;
        let rows = stmt
            .query_map(params![room_id, cutoff], |row| {
                Ok(TypingIndicator {
                    room_id: row.get(0)?,
                    user_id: row.get(1)?,
                    started_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sweeps indicators older than `ttl_secs` across all rooms. Intended to
    /// run from the same background task that evicts rate limiter buckets.
    pub fn typing_evict_stale(&self, ttl_secs: i64) -> AppResult<usize> {
        let conn = self.db.conn();
        let cutoff = now_secs() - ttl_secs;
        let removed = conn.execute(
            "DELETE FROM typing_indicators WHERE started_at < ?1",
            params![cutoff],
        )?;
        Ok(removed)
    }
}
