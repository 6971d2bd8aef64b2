use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::models::Attachment;
use crate::time::now_secs;

use super::{parse_json, Repository};

fn row_to_attachment(row: &rusqlite::Row) -> rusqlite::Result<Attachment> {
    let metadata: String = row.get("metadata")?;
    Ok(Attachment {
        id: row.get("id")?,
        message_id: row.get("message_id")?,
        file_name: row.get("file_name")?,
        file_size: row.get("file_size")?,
        mime_type: row.get("mime_type")?,
        storage_url: row.get("storage_url")?,
        uploaded_at: row.get("uploaded_at")?,
        metadata: parse_json(&metadata),
    })
}

impl Repository {
    /// Records attachment metadata against an existing message (spec §4.6.5
    /// attach). The binary payload itself is already in external storage by
    /// the time this is called; this stores only the pointer and bookkeeping.
    pub fn attachment_create(
        &self,
        message_id: &str,
        file_name: &str,
        file_size: i64,
        mime_type: &str,
        storage_url: &str,
        metadata: &serde_json::Value,
    ) -> AppResult<Attachment> {
        let conn = self.db.conn();
        let now = now_secs();
        let id = uuid::Uuid::new_v4().to_string();
        let metadata_str = metadata.to_string();
        conn.execute(
            "INSERT INTO attachments (id, message_id, file_name, file_size, mime_type, storage_url, uploaded_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![&id, message_id, file_name, file_size, mime_type, storage_url, now, &metadata_str],
        )?;
        Ok(Attachment {
            id,
            message_id: message_id.to_string(),
            file_name: file_name.to_string(),
            file_size,
            mime_type: mime_type.to_string(),
            storage_url: storage_url.to_string(),
            uploaded_at: now,
            metadata: metadata.clone(),
        })
    }

    pub fn attachment_get(&self, attachment_id: &str) -> AppResult<Attachment> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM attachments WHERE id = ?1",
            params![attachment_id],
            row_to_attachment,
        )
        .map_err(|_| AppError::NotFound("attachment".to_string()))
    }

    pub fn attachment_delete(&self, attachment_id: &str) -> AppResult<()> {
        let conn = self.db.conn();
        let deleted = conn.execute("DELETE FROM attachments WHERE id = ?1", params![attachment_id])?;
        if deleted == 0 {
            return Err(AppError::NotFound("attachment".to_string()));
        }
        Ok(())
    }

    pub fn attachment_list_for_message(&self, message_id: &str) -> AppResult<Vec<Attachment>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM attachments WHERE message_id = ?1 ORDER BY uploaded_at ASC",
        )?;
        let rows = stmt
            .query_map(params![message_id], row_to_attachment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
