use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::models::{ChatRoom, ParticipantRole, RoomType};
use crate::time::now_secs;

use super::{parse_json, Repository};

fn row_to_room(row: &rusqlite::Row) -> rusqlite::Result<ChatRoom> {
    let metadata: String = row.get("metadata")?;
    Ok(ChatRoom {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        room_type: row.get("type")?,
        is_private: row.get::<_, i64>("is_private")? != 0,
        entity_type: row.get("entity_type")?,
        entity_id: row.get("entity_id")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        metadata: parse_json(&metadata),
    })
}

impl Repository {
    /// Inserts a room and its creator-as-owner participant in one
    /// transaction; either both succeed or neither does (spec §4.5).
    pub fn room_create(
        &self,
        creator_id: &str,
        name: &str,
        description: &str,
        room_type: RoomType,
        is_private: bool,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> AppResult<ChatRoom> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let now = now_secs();
        let id = uuid::Uuid::new_v4().to_string();
        let metadata_str = metadata.to_string();

        let inserted = tx.execute(
            "INSERT INTO rooms (id, name, description, type, is_private, entity_type, entity_id, created_by, created_at, updated_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10)",
            params![&id, name, description, room_type.as_str(), is_private as i64, entity_type, entity_id, creator_id, now, &metadata_str],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg))) if msg.contains("UNIQUE") => {
                return Err(AppError::Conflict(
                    "a non-deleted room is already bound to this entity".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tx.execute(
            "INSERT INTO participants (room_id, user_id, role, joined_at, is_muted) VALUES (?1, ?2, ?3, ?4, 0)",
            params![&id, creator_id, ParticipantRole::Owner.as_str(), now],
        )?;

        tx.commit()?;

        Ok(ChatRoom {
            id,
            name: name.to_string(),
            description: description.to_string(),
            room_type: room_type.as_str().to_string(),
            is_private,
            entity_type: entity_type.map(String::from),
            entity_id: entity_id.map(String::from),
            created_by: creator_id.to_string(),
            created_at: now,
            updated_at: now,
            metadata: metadata.clone(),
        })
    }

    /// Fetches a non-deleted room by id.
    pub fn room_get(&self, room_id: &str) -> AppResult<ChatRoom> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM rooms WHERE id = ?1 AND deleted = 0",
            params![room_id],
            row_to_room,
        )
        .map_err(|_| AppError::NotFound("room".to_string()))
    }

    pub fn room_get_by_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<Option<ChatRoom>> {
        let conn = self.db.conn();
        let result = conn.query_row(
            "SELECT * FROM rooms WHERE entity_type = ?1 AND entity_id = ?2 AND deleted = 0",
            params![entity_type, entity_id],
            row_to_room,
        );
        match result {
            Ok(room) => Ok(Some(room)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists rooms `user_id` participates in (spec §4.6.1 list; invariant
    /// 5 — listing one's own rooms never requires participation).
    pub fn room_list_for_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        type_filter: Option<RoomType>,
    ) -> AppResult<Vec<ChatRoom>> {
        let conn = self.db.conn();
        let mut sql = String::from(
            "SELECT r.* FROM rooms r JOIN participants p ON p.room_id = r.id
             WHERE p.user_id = ?1 AND r.deleted = 0",
        );
        if type_filter.is_some() {
            sql.push_str(" AND r.type = ?4");
        }
        sql.push_str(" ORDER BY r.updated_at DESC LIMIT ?2 OFFSET ?3");

        let mut stmt = conn.prepare(&sql)?;
        let rooms = if let Some(t) = type_filter {
            stmt.query_map(params![user_id, limit, offset, t.as_str()], row_to_room)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![user_id, limit, offset], row_to_room)?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(rooms)
    }

    /// Updates the limited set of mutable fields (spec §4.6.1 update).
    pub fn room_update(
        &self,
        room_id: &str,
        name: Option<&str>,
        description: Option<&str>,
        is_private: Option<bool>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<ChatRoom> {
        let room = self.room_get(room_id)?;
        let conn = self.db.conn();
        let now = now_secs();

        let new_name = name.unwrap_or(&room.name);
        let new_description = description.unwrap_or(&room.description);
        let new_private = is_private.unwrap_or(room.is_private);
        let new_metadata = metadata.cloned().unwrap_or(room.metadata.clone());
        let metadata_str = new_metadata.to_string();

        conn.execute(
            "UPDATE rooms SET name = ?1, description = ?2, is_private = ?3, metadata = ?4, updated_at = ?5 WHERE id = ?6 AND deleted = 0",
            params![new_name, new_description, new_private as i64, &metadata_str, now, room_id],
        )?;

        Ok(ChatRoom {
            name: new_name.to_string(),
            description: new_description.to_string(),
            is_private: new_private,
            metadata: new_metadata,
            updated_at: now,
            ..room
        })
    }

    /// Single-row soft delete; does not cascade physically (spec §4.5).
    pub fn room_soft_delete(&self, room_id: &str) -> AppResult<()> {
        let conn = self.db.conn();
        let now = now_secs();
        let updated = conn.execute(
            "UPDATE rooms SET deleted = 1, deleted_at = ?1 WHERE id = ?2 AND deleted = 0",
            params![now, room_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound("room".to_string()));
        }
        Ok(())
    }

    pub fn room_is_active(&self, room_id: &str) -> bool {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT 1 FROM rooms WHERE id = ?1 AND deleted = 0",
            params![room_id],
            |_| Ok(()),
        )
        .is_ok()
    }
}
