//! Health and version endpoints (spec §6): plain, unauthenticated GETs.
//! Grounded on the teacher's `src/routes.rs::health`/`stats`, generalized
//! to report repository reachability instead of room/message counts.

use rocket::serde::json::Json;
use rocket::{get, State};

use crate::state::AppState;

#[get("/health")]
pub fn health(state: &State<AppState>) -> Json<serde_json::Value> {
    let conn = state.repo.raw_conn();
    let database = match conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)) {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };
    Json(serde_json::json!({
        "status": if database == "ok" { "ok" } else { "degraded" },
        "database": database,
    }))
}

#[get("/version")]
pub fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build": option_env!("CHAT_BUILD_ID").unwrap_or("dev"),
    }))
}
