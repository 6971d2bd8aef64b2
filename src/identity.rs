//! Identity & Claims (spec §4.2): verifies a signed bearer token and
//! produces a `Principal`. The teacher never had JWT — it had an opaque
//! per-room `admin_key` — but it already pulls in `hmac`/`sha2`/`base64`/
//! `hex` for webhook-signature work (`src/webhooks.rs`). This module
//! generalizes that same primitive stack into a compact HS256 bearer-token
//! verifier instead of reaching for a new dependency.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Coarse grant consulted only for directory-side operations; chat-internal
/// authorization is always by participant role (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Read,
    Create,
    Update,
    Delete,
}

/// The authenticated caller, derived from a verified bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub permissions: Vec<Permission>,
    pub directory_url: String,
    /// Epoch seconds.
    pub expiry: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    display_name: String,
    role: String,
    #[serde(default)]
    permissions: Vec<Permission>,
    directory_url: String,
    exp: i64,
}

/// Verifies a compact `header.payload.signature` bearer token (HS256) against
/// `secret`. Rejects expired, unsigned, or wrong-algorithm tokens (spec §4.2).
pub fn verify_token(token: &str, secret: &str, now: i64) -> AppResult<Principal> {
    let mut parts = token.split('.');
    let (header_b64, payload_b64, sig_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => return Err(AppError::InvalidCredential("malformed bearer token".to_string())),
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AppError::InvalidCredential("malformed token header".to_string()))?;
    let header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|_| AppError::InvalidCredential("malformed token header".to_string()))?;
    if header.alg != "HS256" {
        return Err(AppError::InvalidCredential("unsupported signing algorithm".to_string()));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| AppError::InvalidCredential("malformed token signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidCredential("bearer token signature mismatch".to_string()))?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::InvalidCredential("malformed token payload".to_string()))?;
    let claims: Claims = serde_json::from_slice(&payload_bytes)
        .map_err(|_| AppError::InvalidCredential("malformed token payload".to_string()))?;

    if claims.exp <= now {
        return Err(AppError::InvalidCredential("bearer token expired".to_string()));
    }

    Ok(Principal {
        subject: claims.sub,
        username: claims.username,
        display_name: claims.display_name,
        role: claims.role,
        permissions: claims.permissions,
        directory_url: claims.directory_url,
        expiry: claims.exp,
    })
}

/// Signs a compact HS256 bearer token for the given claims. Used by tests
/// and by any trusted issuer composed ahead of this service.
pub fn issue_token(
    subject: &str,
    username: &str,
    display_name: &str,
    role: &str,
    permissions: &[Permission],
    directory_url: &str,
    exp: i64,
    secret: &str,
) -> String {
    let header = Header { alg: "HS256".to_string(), typ: "JWT".to_string() };
    let claims = Claims {
        sub: subject.to_string(),
        username: username.to_string(),
        display_name: display_name.to_string(),
        role: role.to_string(),
        permissions: permissions.to_vec(),
        directory_url: directory_url.to_string(),
        exp,
    };

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{header_b64}.{payload_b64}.{sig_b64}")
}

/// Resolves the bearer credential from header, query, or envelope body, in
/// that priority order (spec §6; grounded on `AdminKey`'s `FromRequest` impl
/// in the teacher's `src/routes.rs`, which already prefers the `Authorization`
/// header over a fallback).
pub fn resolve_credential<'a>(
    header: Option<&'a str>,
    query: Option<&'a str>,
    body_jwt: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(h) = header
        && let Some(token) = h.strip_prefix("Bearer ")
    {
        return Some(token);
    }
    query.or(body_jwt)
}
