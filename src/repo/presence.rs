use rusqlite::params;

use crate::error::AppResult;
use crate::models::{Presence, PresenceStatus};
use crate::time::now_secs;

use super::Repository;

impl Repository {
    /// Upserts a user's presence status (spec §4.6.4 presence-set).
    pub fn presence_set(&self, user_id: &str, status: PresenceStatus) -> AppResult<Presence> {
        let conn = self.db.conn();
        let now = now_secs();
        conn.execute(
            "INSERT INTO presence (user_id, status, last_seen) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET status = excluded.status, last_seen = excluded.last_seen",
            params![user_id, status.as_str(), now],
        )?;
        Ok(Presence {
            user_id: user_id.to_string(),
            status: status.as_str().to_string(),
            last_seen: now,
        })
    }

    pub fn presence_get(&self, user_id: &str) -> AppResult<Option<Presence>> {
        let conn = self.db.conn();
        let result = conn.query_row(
            "SELECT user_id, status, last_seen FROM presence WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Presence {
                    user_id: row.get(0)?,
                    status: row.get(1)?,
                    last_seen: row.get(2)?,
                })
            },
        );
        match result {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Presence for every participant of a room, in one query (spec §4.6.4
    /// bulk presence), grounded on the teacher's `PresenceTracker` batch
    /// lookup by room membership.
    pub fn presence_list_for_room(&self, room_id: &str) -> AppResult<Vec<Presence>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT pr.user_id, pr.status, pr.last_seen FROM presence pr
             JOIN participants p ON p.user_id = pr.user_id
             WHERE p.room_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![room_id], |row| {
                Ok(Presence {
                    user_id: row.get(0)?,
                    status: row.get(1)?,
                    last_seen: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
