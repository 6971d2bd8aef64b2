//! Timestamp helpers. All API-surface `snake_case` fields are epoch
//! seconds; `edit_history.edited_at` is epoch milliseconds (spec §6,
//! decided in `db.rs`'s module doc and DESIGN.md).

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
