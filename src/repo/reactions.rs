use std::collections::HashMap;

use rusqlite::params;

use crate::error::AppResult;
use crate::models::ReactionSummary;
use crate::time::now_secs;

use super::Repository;

impl Repository {
    /// Adds a reaction; re-adding the same `(message, user, emoji)` triple is
    /// a silent no-op rather than a conflict, since toggling twice from two
    /// racing clients should settle on "reacted" (spec §4.6.4 add).
    pub fn reaction_add(&self, message_id: &str, room_id: &str, user_id: &str, emoji: &str) -> AppResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO reactions (message_id, user_id, emoji, room_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![message_id, user_id, emoji, room_id, now_secs()],
        )?;
        Ok(())
    }

    pub fn reaction_remove(&self, message_id: &str, user_id: &str, emoji: &str) -> AppResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            params![message_id, user_id, emoji],
        )?;
        Ok(())
    }

    /// Aggregates per-emoji counts and reactor ids for one message (spec
    /// §4.6.4 summary). Grouped in Rust rather than SQL `GROUP_CONCAT` to
    /// keep the reactor list ordered and easy to serialize.
    pub fn reaction_summary(&self, message_id: &str) -> AppResult<Vec<ReactionSummary>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT emoji, user_id FROM reactions WHERE message_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![message_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_emoji: HashMap<String, Vec<String>> = HashMap::new();
        for (emoji, user_id) in rows {
            by_emoji.entry(emoji).or_default().push(user_id);
        }

        let mut summaries: Vec<ReactionSummary> = by_emoji
            .into_iter()
            .map(|(emoji, user_ids)| ReactionSummary {
                count: user_ids.len() as i64,
                emoji,
                user_ids,
            })
            .collect();
        summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.emoji.cmp(&b.emoji)));
        Ok(summaries)
    }
}
