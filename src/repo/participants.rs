use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::models::{Participant, ParticipantRole};

use super::Repository;

fn row_to_participant(row: &rusqlite::Row) -> rusqlite::Result<Participant> {
    Ok(Participant {
        room_id: row.get("room_id")?,
        user_id: row.get("user_id")?,
        role: row.get("role")?,
        joined_at: row.get("joined_at")?,
        is_muted: row.get::<_, i64>("is_muted")? != 0,
    })
}

impl Repository {
    /// Adds `user_id` to `room_id` at `role` (spec §4.6.2 add). Idempotent
    /// insert; re-adding an existing participant is a conflict, not a no-op,
    /// since role would otherwise change silently.
    pub fn participant_add(
        &self,
        room_id: &str,
        user_id: &str,
        role: ParticipantRole,
    ) -> AppResult<Participant> {
        let conn = self.db.conn();
        let now = crate::time::now_secs();
        conn.execute(
            "INSERT INTO participants (room_id, user_id, role, joined_at, is_muted) VALUES (?1, ?2, ?3, ?4, 0)",
            params![room_id, user_id, role.as_str(), now],
        )?;
        Ok(Participant {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            role: role.as_str().to_string(),
            joined_at: now,
            is_muted: false,
        })
    }

    pub fn participant_get(&self, room_id: &str, user_id: &str) -> AppResult<Participant> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM participants WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
            row_to_participant,
        )
        .map_err(|_| AppError::NotFound("participant".to_string()))
    }

    pub fn participant_list(&self, room_id: &str) -> AppResult<Vec<Participant>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM participants WHERE room_id = ?1 ORDER BY joined_at ASC",
        )?;
        let rows = stmt
            .query_map(params![room_id], row_to_participant)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Changes a participant's role. Demoting or removing the sole owner is
    /// rejected by the handler layer before this is called (spec §4.6.2
    /// invariant: a room always has at least one owner).
    pub fn participant_set_role(
        &self,
        room_id: &str,
        user_id: &str,
        role: ParticipantRole,
    ) -> AppResult<Participant> {
        let conn = self.db.conn();
        let updated = conn.execute(
            "UPDATE participants SET role = ?1 WHERE room_id = ?2 AND user_id = ?3",
            params![role.as_str(), room_id, user_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound("participant".to_string()));
        }
        drop(conn);
        self.participant_get(room_id, user_id)
    }

    /// Atomically transfers ownership to `new_owner_id`: the room's current
    /// owner (if any, and if not already `new_owner_id`) is demoted to
    /// `admin` in the same transaction that promotes `new_owner_id`, so the
    /// exactly-one-owner invariant (spec §3, §8 invariant 1) never observes
    /// two owners at once.
    pub fn participant_transfer_ownership(&self, room_id: &str, new_owner_id: &str) -> AppResult<Participant> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE participants SET role = ?1 WHERE room_id = ?2 AND role = ?3 AND user_id != ?4",
            params![ParticipantRole::Admin.as_str(), room_id, ParticipantRole::Owner.as_str(), new_owner_id],
        )?;

        let updated = tx.execute(
            "UPDATE participants SET role = ?1 WHERE room_id = ?2 AND user_id = ?3",
            params![ParticipantRole::Owner.as_str(), room_id, new_owner_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound("participant".to_string()));
        }

        tx.commit()?;
        drop(conn);
        self.participant_get(room_id, new_owner_id)
    }

    pub fn participant_set_muted(&self, room_id: &str, user_id: &str, muted: bool) -> AppResult<()> {
        let conn = self.db.conn();
        let updated = conn.execute(
            "UPDATE participants SET is_muted = ?1 WHERE room_id = ?2 AND user_id = ?3",
            params![muted as i64, room_id, user_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound("participant".to_string()));
        }
        Ok(())
    }

    pub fn participant_remove(&self, room_id: &str, user_id: &str) -> AppResult<()> {
        let conn = self.db.conn();
        let updated = conn.execute(
            "DELETE FROM participants WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound("participant".to_string()));
        }
        Ok(())
    }

    pub fn participant_count_owners(&self, room_id: &str) -> AppResult<i64> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM participants WHERE room_id = ?1 AND role = ?2",
            params![room_id, ParticipantRole::Owner.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn participant_is_member(&self, room_id: &str, user_id: &str) -> bool {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT 1 FROM participants WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
            |_| Ok(()),
        )
        .is_ok()
    }
}
