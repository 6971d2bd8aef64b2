//! Repository Layer storage (spec §3, §4.5, §9): schema creation and the
//! shared connection wrapper every repository module borrows. Grounded on
//! the teacher's `src/db.rs` (`Mutex<Connection>`, `execute_batch`
//! migrations, FTS5 search index, idempotent `ALTER TABLE` style), expanded
//! from the teacher's two-table `rooms`/`messages` schema to the full
//! ChatRoom / Participant / Message / EditHistory / Reaction / ReadReceipt /
//! TypingIndicator / Presence / Attachment model spec.md §3 requires.
//!
//! Timestamp convention (spec §6, decided in DESIGN.md): every `snake_case`
//! column that appears verbatim in an API response (`created_at`,
//! `updated_at`, `joined_at`, `last_seen`, `started_at`, `read_at`,
//! `pinned_at`, `uploaded_at`) is stored and exchanged as epoch **seconds**.
//! `edit_history.edited_at` is the one field spec.md explicitly licenses to
//! use milliseconds, to preserve ordering of rapid edits; it is internal
//! (never returned bare without a seconds-precision `edited_at` on the
//! parent message) and is stored as epoch **milliseconds**.

use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn new(path: &str) -> Self {
        let conn = Connection::open(path).expect("failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("failed to set pragmas");
        let db = Db { conn: Mutex::new(conn) };
        db.migrate();
        db
    }

    /// Acquires the shared connection lock. All repository modules go
    /// through this single choke point, mirroring the teacher's
    /// `db.conn.lock().unwrap()` call sites.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                type TEXT NOT NULL DEFAULT 'group',
                is_private INTEGER NOT NULL DEFAULT 0,
                entity_type TEXT,
                entity_id TEXT,
                created_by TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_rooms_entity_active
                ON rooms(entity_type, entity_id)
                WHERE deleted = 0 AND entity_type IS NOT NULL AND entity_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS participants (
                room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                joined_at INTEGER NOT NULL,
                is_muted INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (room_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_participants_user ON participants(user_id);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
                sender_id TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT 'text',
                content TEXT NOT NULL,
                content_format TEXT NOT NULL DEFAULT 'plain',
                parent_id TEXT REFERENCES messages(id),
                quoted_message_id TEXT REFERENCES messages(id),
                is_edited INTEGER NOT NULL DEFAULT 0,
                is_pinned INTEGER NOT NULL DEFAULT 0,
                pinned_by TEXT,
                pinned_at INTEGER,
                created_at INTEGER NOT NULL,
                edited_at INTEGER,
                deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                metadata TEXT NOT NULL DEFAULT '{}',
                seq INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_room_seq ON messages(room_id, seq);
            CREATE INDEX IF NOT EXISTS idx_messages_room_created ON messages(room_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id);

            CREATE TABLE IF NOT EXISTS edit_history (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                editor_id TEXT NOT NULL,
                previous_content TEXT NOT NULL,
                previous_content_format TEXT NOT NULL,
                previous_metadata TEXT NOT NULL DEFAULT '{}',
                edit_number INTEGER NOT NULL,
                edited_at INTEGER NOT NULL,
                UNIQUE(message_id, edit_number)
            );

            CREATE INDEX IF NOT EXISTS idx_edit_history_message ON edit_history(message_id, edit_number);

            CREATE TABLE IF NOT EXISTS reactions (
                message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                emoji TEXT NOT NULL,
                room_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (message_id, user_id, emoji)
            );

            CREATE TABLE IF NOT EXISTS read_receipts (
                message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                read_at INTEGER NOT NULL,
                PRIMARY KEY (message_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_read_receipts_user ON read_receipts(user_id);

            CREATE TABLE IF NOT EXISTS typing_indicators (
                room_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                PRIMARY KEY (room_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS presence (
                user_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                last_seen INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS attachments (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                mime_type TEXT NOT NULL,
                storage_url TEXT NOT NULL,
                uploaded_at INTEGER NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE INDEX IF NOT EXISTS idx_attachments_message ON attachments(message_id);

            CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
                message_id UNINDEXED,
                room_id UNINDEXED,
                content,
                tokenize='porter unicode61'
            );",
        )
        .expect("failed to run migrations");
    }
}

/// Rebuilds the FTS5 index from all non-deleted messages. Called on startup
/// and available to ops tooling if the index ever needs a full rebuild.
pub fn rebuild_fts_index(conn: &Connection) {
    conn.execute("DELETE FROM messages_fts", []).ok();
    conn.execute_batch(
        "INSERT INTO messages_fts (message_id, room_id, content)
         SELECT id, room_id, content FROM messages WHERE deleted = 0;",
    )
    .ok();
}

pub fn upsert_fts(conn: &Connection, message_id: &str) {
    conn.execute("DELETE FROM messages_fts WHERE message_id = ?1", [message_id]).ok();
    conn.execute(
        "INSERT INTO messages_fts (message_id, room_id, content)
         SELECT id, room_id, content FROM messages WHERE id = ?1 AND deleted = 0",
        [message_id],
    )
    .ok();
}

pub fn delete_fts(conn: &Connection, message_id: &str) {
    conn.execute("DELETE FROM messages_fts WHERE message_id = ?1", [message_id]).ok();
}
