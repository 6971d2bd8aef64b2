//! Uniform error taxonomy (spec §7) and the response envelope (spec §4.1).
//!
//! Every dispatcher reply is `{errorCode, errorMessage, data}`. `-1` means
//! success; everything else falls into a 1000/2000/3000/4000 range. This
//! mirrors the `e.to_string()` → JSON error-body mapping the teacher repeats
//! in every route (`src/routes.rs`), consolidated into one type with `From`
//! impls so handlers can use `?`.

use serde::Serialize;

pub const SUCCESS: i32 = -1;

#[derive(Debug, Clone)]
pub enum AppError {
    /// 1000 — malformed envelope (bad JSON, wrong shape)
    MalformedRequest(String),
    /// 1001 — action name not in the routing table
    UnknownAction(String),
    /// 1002 — required field missing, wrong type, out of bounds
    InvalidParameter(String),
    /// 1003 — missing/invalid/expired bearer credential
    InvalidCredential(String),
    /// 2000 — repository or other transient system failure
    System(String),
    /// 2000 — handler exceeded its request-scoped deadline
    Timeout,
    /// 3000 — referenced entity does not exist (or is soft-deleted)
    NotFound(String),
    /// 3001 — uniqueness / invariant violation
    Conflict(String),
    /// 3002 — caller lacks the role/participation required for this action
    Forbidden(String),
    /// 4000 — rate limiter denied the request
    RateLimited,
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::MalformedRequest(_) => 1000,
            AppError::UnknownAction(_) => 1001,
            AppError::InvalidParameter(_) => 1002,
            AppError::InvalidCredential(_) => 1003,
            AppError::System(_) => 2000,
            AppError::Timeout => 2000,
            AppError::NotFound(_) => 3000,
            AppError::Conflict(_) => 3001,
            AppError::Forbidden(_) => 3002,
            AppError::RateLimited => 4000,
        }
    }

    /// Concise, non-localized, no internal identifiers or stack traces (spec §7).
    pub fn message(&self) -> String {
        match self {
            AppError::MalformedRequest(m) => m.clone(),
            AppError::UnknownAction(action) => format!("unknown action '{action}'"),
            AppError::InvalidParameter(m) => m.clone(),
            AppError::InvalidCredential(m) => m.clone(),
            AppError::System(_) => "internal error".to_string(),
            AppError::Timeout => "request timeout".to_string(),
            AppError::NotFound(entity) => format!("{entity} not found"),
            AppError::Conflict(m) => m.clone(),
            AppError::Forbidden(m) => m.clone(),
            AppError::RateLimited => "rate limit exceeded".to_string(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound("entity".to_string()),
            rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("UNIQUE") => {
                AppError::Conflict("duplicate entity".to_string())
            }
            other => {
                log::error!("repository failure: {other}");
                AppError::System(other.to_string())
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// The uniform envelope returned for every request, success or failure.
#[derive(Debug, Serialize)]
pub struct Envelope {
    #[serde(rename = "errorCode")]
    pub error_code: i32,
    #[serde(rename = "errorMessage")]
    pub error_message: String,
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    pub fn ok(data: serde_json::Value) -> Self {
        Envelope {
            error_code: SUCCESS,
            error_message: String::new(),
            data: Some(data),
        }
    }

    pub fn err(e: &AppError) -> Self {
        Envelope {
            error_code: e.code(),
            error_message: e.message(),
            data: None,
        }
    }
}
