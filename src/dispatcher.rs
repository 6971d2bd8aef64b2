//! Dispatcher & Request Envelope (spec §4.1): a single `POST /do` route
//! parses `{action, jwt?, data}`, runs the identity → rate-limit → handler
//! chain, and wraps every reply in the uniform `{errorCode, errorMessage,
//! data}` envelope. Grounded on the teacher's `src/lib.rs` route-table
//! construction, replacing its many-routes-per-verb mounting with the
//! tag→handler table spec.md §9 "Dynamic dispatch" requires; the
//! credential-resolution precedence is grounded on `AdminKey`'s
//! `FromRequest` impl in `src/routes.rs`.

use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::{post, State};
use serde::Deserialize;

use crate::error::{AppError, AppResult, Envelope};
use crate::handlers::HandlerFn;
use crate::identity::{resolve_credential, verify_token};
use crate::state::AppState;
use crate::time::now_secs;

/// Source network identity, used as the rate-limiter key before a request
/// is authenticated (spec §4.3). Grounded on the teacher's `ClientIp`
/// `FromRequest` impl in `src/routes.rs`.
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| req.remote().map(|r| r.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

/// The raw `Authorization` header value, if present. Grounded on the
/// teacher's `AdminKey` `FromRequest` impl in `src/routes.rs`, which reads
/// a header the same way rather than taking `&Request` as a route argument
/// (Rocket 0.5 has no `FromRequest` impl for bare `&Request`).
pub struct BearerHeader(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerHeader {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(BearerHeader(req.headers().get_one("Authorization").map(String::from)))
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionEnvelope {
    action: String,
    #[serde(default)]
    jwt: Option<String>,
    #[serde(default = "default_data")]
    data: serde_json::Value,
}

fn default_data() -> serde_json::Value {
    serde_json::json!({})
}

/// Dispatch table, built once at startup and managed by Rocket as shared
/// state alongside [`AppState`].
pub struct Dispatcher {
    table: std::collections::HashMap<&'static str, HandlerFn>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher { table: crate::handlers::build_table() }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(
    envelope: ActionEnvelope,
    auth_header: Option<&str>,
    jwt_query: Option<&str>,
    client_ip: &str,
    state: &AppState,
    dispatcher: &Dispatcher,
) -> AppResult<serde_json::Value> {
    let credential = resolve_credential(auth_header, jwt_query, envelope.jwt.as_deref());
    let principal = match credential {
        Some(token) => verify_token(token, &state.config.jwt_secret, now_secs())?,
        None => return Err(AppError::InvalidCredential("no bearer credential supplied".to_string())),
    };

    let rate_key = format!("{}:{}", client_ip, principal.subject);
    state
        .rate_limiter
        .check(&rate_key, state.config.rate_sustained_rps, state.config.rate_burst)?;

    let handler = dispatcher
        .table
        .get(envelope.action.as_str())
        .ok_or_else(|| AppError::UnknownAction(envelope.action.clone()))?;

    handler(&principal, envelope.data, state).await
}

/// `POST /do`: the single request-API entry path (spec §6). The bearer
/// credential may arrive via `Authorization: Bearer`, a `jwt` query
/// parameter, or the envelope's own `jwt` field, in that priority order.
#[post("/do?<jwt>", data = "<body>")]
pub async fn dispatch(
    body: Json<ActionEnvelope>,
    jwt: Option<&str>,
    client_ip: ClientIp,
    auth: BearerHeader,
    state: &State<AppState>,
    dispatcher: &State<Dispatcher>,
) -> Json<Envelope> {
    match run(body.into_inner(), auth.0.as_deref(), jwt, &client_ip.0, state, dispatcher).await {
        Ok(data) => Json(Envelope::ok(data)),
        Err(e) => Json(Envelope::err(&e)),
    }
}

/// Malformed JSON never reaches the route body guard; Rocket's own JSON
/// guard failure is caught here and mapped to 1000 (spec §4.1).
#[rocket::catch(400)]
pub fn malformed_request() -> Json<Envelope> {
    Json(Envelope::err(&AppError::MalformedRequest("malformed request body".to_string())))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<Envelope> {
    Json(Envelope::err(&AppError::NotFound("route".to_string())))
}

#[rocket::catch(429)]
pub fn too_many_requests() -> Json<Envelope> {
    Json(Envelope::err(&AppError::RateLimited))
}
