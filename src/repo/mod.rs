//! Repository Layer (spec §4.5): transactional persistence of rooms,
//! participants, messages, edit history, reactions, read receipts,
//! presence, typing, and attachment metadata, exposed as a single
//! interface. Grounded on the teacher's `src/db.rs` + `src/routes/*.rs`
//! query style (`rusqlite::params!`, `query_row`/`query_map`), split by
//! entity the way the teacher splits routes by entity.

mod attachments;
mod messages;
mod participants;
mod presence;
mod reactions;
mod read_receipts;
mod rooms;
mod typing;

pub use typing::TYPING_TTL_SECS;

use std::sync::Arc;

use crate::db::Db;

/// The single repository interface every handler depends on (spec §4.5).
/// Holds the shared `Db` connection; each entity's operations live in their
/// own submodule as additional `impl Repository` blocks.
pub struct Repository {
    db: Arc<Db>,
}

impl Repository {
    pub fn new(db: Arc<Db>) -> Self {
        Repository { db }
    }

    /// Exposes the underlying connection for ambient concerns (the health
    /// check) that aren't really entity operations.
    pub fn raw_conn(&self) -> std::sync::MutexGuard<'_, rusqlite::Connection> {
        self.db.conn()
    }
}

pub(crate) fn parse_json(s: &str) -> serde_json::Value {
    serde_json::from_str(s).unwrap_or(serde_json::json!({}))
}
