use rusqlite::params;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{ContentFormat, EditHistoryEntry, Message, MessageType};
use crate::time::{now_millis, now_secs};

use super::{parse_json, Repository};

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let metadata: String = row.get("metadata")?;
    Ok(Message {
        id: row.get("id")?,
        room_id: row.get("room_id")?,
        sender_id: row.get("sender_id")?,
        message_type: row.get("type")?,
        content: row.get("content")?,
        content_format: row.get("content_format")?,
        parent_id: row.get("parent_id")?,
        quoted_message_id: row.get("quoted_message_id")?,
        is_edited: row.get::<_, i64>("is_edited")? != 0,
        is_pinned: row.get::<_, i64>("is_pinned")? != 0,
        pinned_by: row.get("pinned_by")?,
        pinned_at: row.get("pinned_at")?,
        created_at: row.get("created_at")?,
        edited_at: row.get("edited_at")?,
        metadata: parse_json(&metadata),
        seq: row.get("seq")?,
    })
}

fn row_to_edit(row: &rusqlite::Row) -> rusqlite::Result<EditHistoryEntry> {
    let metadata: String = row.get("previous_metadata")?;
    Ok(EditHistoryEntry {
        id: row.get("id")?,
        message_id: row.get("message_id")?,
        editor_id: row.get("editor_id")?,
        previous_content: row.get("previous_content")?,
        previous_content_format: row.get("previous_content_format")?,
        previous_metadata: parse_json(&metadata),
        edit_number: row.get("edit_number")?,
        edited_at: row.get("edited_at")?,
    })
}

impl Repository {
    /// Inserts a message with a room-monotonic `seq` (spec §4.6.3 send;
    /// supplemented ordering field, see DESIGN.md). `seq` assignment and the
    /// insert happen in the same transaction so concurrent senders in the
    /// same room never collide.
    pub fn message_create(
        &self,
        room_id: &str,
        sender_id: &str,
        message_type: MessageType,
        content: &str,
        content_format: ContentFormat,
        parent_id: Option<&str>,
        quoted_message_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> AppResult<Message> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let now = now_secs();
        let id = uuid::Uuid::new_v4().to_string();
        let metadata_str = metadata.to_string();

        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO messages (id, room_id, sender_id, type, content, content_format, parent_id, quoted_message_id, is_edited, is_pinned, created_at, metadata, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?10, ?11)",
            params![&id, room_id, sender_id, message_type.as_str(), content, content_format.as_str(), parent_id, quoted_message_id, now, &metadata_str, next_seq],
        )?;

        tx.execute(
            "UPDATE rooms SET updated_at = ?1 WHERE id = ?2",
            params![now, room_id],
        )?;

        db::upsert_fts(&tx, &id);

        tx.commit()?;

        Ok(Message {
            id,
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            message_type: message_type.as_str().to_string(),
            content: content.to_string(),
            content_format: content_format.as_str().to_string(),
            parent_id: parent_id.map(String::from),
            quoted_message_id: quoted_message_id.map(String::from),
            is_edited: false,
            is_pinned: false,
            pinned_by: None,
            pinned_at: None,
            created_at: now,
            edited_at: None,
            metadata: metadata.clone(),
            seq: next_seq,
        })
    }

    pub fn message_get(&self, message_id: &str) -> AppResult<Message> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM messages WHERE id = ?1 AND deleted = 0",
            params![message_id],
            row_to_message,
        )
        .map_err(|_| AppError::NotFound("message".to_string()))
    }

    /// Lists a room's messages oldest-first by `seq`, optionally before/after
    /// a cursor message, for a max page of `limit` (spec §4.6.3 list).
    pub fn message_list(
        &self,
        room_id: &str,
        limit: i64,
        before_seq: Option<i64>,
        after_seq: Option<i64>,
    ) -> AppResult<Vec<Message>> {
        let conn = self.db.conn();
        let (sql, desc) = match (before_seq, after_seq) {
            (Some(_), _) => (
                "SELECT * FROM messages WHERE room_id = ?1 AND deleted = 0 AND seq < ?2 ORDER BY seq DESC LIMIT ?3",
                true,
            ),
            (None, Some(_)) => (
                "SELECT * FROM messages WHERE room_id = ?1 AND deleted = 0 AND seq > ?2 ORDER BY seq ASC LIMIT ?3",
                false,
            ),
            (None, None) => (
                "SELECT * FROM messages WHERE room_id = ?1 AND deleted = 0 ORDER BY seq DESC LIMIT ?3",
                true,
            ),
        };
        let cursor = before_seq.or(after_seq).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt
            .query_map(params![room_id, cursor, limit], row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        if desc {
            rows.reverse();
        }
        Ok(rows)
    }

    /// Edits a message's content, snapshotting the previous content into
    /// `edit_history` in the same transaction (spec §4.6.3 edit; §9 design
    /// note — stricter-than-spec atomicity, both rows or neither).
    pub fn message_edit(
        &self,
        message_id: &str,
        editor_id: &str,
        new_content: &str,
        new_content_format: ContentFormat,
    ) -> AppResult<Message> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let (prev_content, prev_format, prev_metadata, room_id): (String, String, String, String) = tx
            .query_row(
                "SELECT content, content_format, metadata, room_id FROM messages WHERE id = ?1 AND deleted = 0",
                params![message_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(|_| AppError::NotFound("message".to_string()))?;

        let next_edit_number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(edit_number), 0) + 1 FROM edit_history WHERE message_id = ?1",
            params![message_id],
            |row| row.get(0),
        )?;

        let edited_at_ms = now_millis();
        let edited_at_secs = now_secs();
        let history_id = uuid::Uuid::new_v4().to_string();

        tx.execute(
            "INSERT INTO edit_history (id, message_id, editor_id, previous_content, previous_content_format, previous_metadata, edit_number, edited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![&history_id, message_id, editor_id, &prev_content, &prev_format, &prev_metadata, next_edit_number, edited_at_ms],
        )?;

        tx.execute(
            "UPDATE messages SET content = ?1, content_format = ?2, is_edited = 1, edited_at = ?3 WHERE id = ?4",
            params![new_content, new_content_format.as_str(), edited_at_secs, message_id],
        )?;

        db::upsert_fts(&tx, message_id);
        tx.commit()?;
        drop(conn);

        let mut message = self.message_get(message_id)?;
        message.room_id = room_id;
        Ok(message)
    }

    pub fn message_edit_history(&self, message_id: &str) -> AppResult<Vec<EditHistoryEntry>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM edit_history WHERE message_id = ?1 ORDER BY edit_number ASC",
        )?;
        let rows = stmt
            .query_map(params![message_id], row_to_edit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn message_soft_delete(&self, message_id: &str) -> AppResult<()> {
        let conn = self.db.conn();
        let now = now_secs();
        let updated = conn.execute(
            "UPDATE messages SET deleted = 1, deleted_at = ?1 WHERE id = ?2 AND deleted = 0",
            params![now, message_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound("message".to_string()));
        }
        db::delete_fts(&conn, message_id);
        Ok(())
    }

    pub fn message_set_pinned(
        &self,
        message_id: &str,
        pinned: bool,
        pinned_by: Option<&str>,
    ) -> AppResult<Message> {
        let conn = self.db.conn();
        let now = now_secs();
        let updated = if pinned {
            conn.execute(
                "UPDATE messages SET is_pinned = 1, pinned_by = ?1, pinned_at = ?2 WHERE id = ?3 AND deleted = 0",
                params![pinned_by, now, message_id],
            )?
        } else {
            conn.execute(
                "UPDATE messages SET is_pinned = 0, pinned_by = NULL, pinned_at = NULL WHERE id = ?1 AND deleted = 0",
                params![message_id],
            )?
        };
        if updated == 0 {
            return Err(AppError::NotFound("message".to_string()));
        }
        drop(conn);
        self.message_get(message_id)
    }

    pub fn message_list_pinned(&self, room_id: &str) -> AppResult<Vec<Message>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM messages WHERE room_id = ?1 AND is_pinned = 1 AND deleted = 0 ORDER BY pinned_at DESC",
        )?;
        let rows = stmt
            .query_map(params![room_id], row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Full-text search over a room's non-deleted messages (spec §4.6.3
    /// search), grounded on the teacher's FTS5 `MATCH` query shape.
    pub fn message_search(&self, room_id: &str, query: &str, limit: i64) -> AppResult<Vec<Message>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT m.* FROM messages m
             JOIN messages_fts f ON f.message_id = m.id
             WHERE f.room_id = ?1 AND messages_fts MATCH ?2 AND m.deleted = 0
             ORDER BY rank LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![room_id, query, limit], row_to_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn message_room_id(&self, message_id: &str) -> AppResult<String> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT room_id FROM messages WHERE id = ?1 AND deleted = 0",
            params![message_id],
            |row| row.get(0),
        )
        .map_err(|_| AppError::NotFound("message".to_string()))
    }
}
