//! Request Validator (spec §4.4): shared primitives for the per-action
//! declarative contracts implemented by each payload type in
//! `handlers::*::*Payload`. Grounded on the inline length/emptiness checks
//! the teacher repeats in every route of `src/routes/*.rs`
//! (e.g. `send_message`'s `sender.len() > 100` / `content.len() > 10_000`
//! checks), consolidated here so every handler enforces the same rules the
//! same way instead of re-deriving them.

use crate::error::{AppError, AppResult};

/// Payload types implement this to describe their own schema/semantic
/// contract (required keys, length bounds, enum membership, format).
/// The dispatcher calls it immediately after deserializing `data`,
/// before routing to the handler (spec §4.1 step 4).
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

pub fn non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidParameter(format!("{field} must not be empty")));
    }
    Ok(())
}

pub fn bounded_len(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::InvalidParameter(format!(
            "{field} must be {min}-{max} characters"
        )));
    }
    Ok(())
}

/// Message content against the configured size cap (spec §4.4, default 512 KiB).
pub fn bounded_bytes(field: &str, value: &str, max_bytes: usize) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::InvalidParameter(format!("{field} must not be empty")));
    }
    if value.len() > max_bytes {
        return Err(AppError::InvalidParameter(format!(
            "{field} exceeds the maximum size of {max_bytes} bytes"
        )));
    }
    Ok(())
}

pub fn is_uuid(field: &str, value: &str) -> AppResult<()> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| AppError::InvalidParameter(format!("{field} must be a valid UUID")))
}

pub fn one_of<'a>(field: &str, value: &str, allowed: &'a [&'a str]) -> AppResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::InvalidParameter(format!(
            "{field} must be one of {allowed:?}"
        )))
    }
}

/// A single grapheme-cluster emoji. We approximate grapheme-cluster counting
/// with `chars().count()` bounded tightly (most reaction emoji, including
/// skin-tone/ZWJ sequences, are well under this bound; a small allowance
/// covers ZWJ family/flag sequences without accepting arbitrary text).
pub fn is_emoji(field: &str, value: &str) -> AppResult<()> {
    if value.is_empty() || value.chars().count() > 8 {
        return Err(AppError::InvalidParameter(format!("{field} must be a single emoji")));
    }
    if !value.chars().any(|c| (c as u32) > 0x2000) {
        return Err(AppError::InvalidParameter(format!("{field} must be a single emoji")));
    }
    Ok(())
}

/// Clamps a client-supplied `limit` to `[0, max]`, defaulting when absent
/// (spec §4.6.1 list: default 20/max 100; §4.6.2 list: default 50/max 100).
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    match limit {
        None => default,
        Some(n) if n < 0 => 0,
        Some(n) => n.min(max),
    }
}
