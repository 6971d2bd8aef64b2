//! Action Handlers (spec §4.6): one pure-ish async function per action,
//! over `(Principal, decoded payload, repositories, event fabric)`.
//! Grounded on the teacher's per-subsystem route module layout
//! (`src/routes/{rooms,messages,participants,typing,presence,reactions,
//! read_positions,files}.rs`), stripped of direct Rocket binding and
//! renamed to match the action namespace spec.md §4.6 groups them under.
//!
//! Each handler deserializes and validates its own `data` payload (the
//! `Validate` contract from `validate.rs`) before touching the repository,
//! since the shape of `data` differs per action and the dispatcher only
//! knows the action tag, not the payload type.

pub mod attachments;
pub mod messages;
pub mod participants;
pub mod realtime;
pub mod rooms;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::{AppError, AppResult};
use crate::identity::Principal;
use crate::state::AppState;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = AppResult<serde_json::Value>> + Send + 'a>>;
pub type HandlerFn = for<'a> fn(&'a Principal, serde_json::Value, &'a AppState) -> HandlerFuture<'a>;

/// Builds the action-name → handler table once at startup (spec §9 "Dynamic
/// dispatch"), replacing the teacher's many-routes-per-verb Rocket mounting
/// with a single lookup the dispatcher consults per request.
pub fn build_table() -> HashMap<&'static str, HandlerFn> {
    let mut table: HashMap<&'static str, HandlerFn> = HashMap::new();

    table.insert("chatRoom.create", rooms::create);
    table.insert("chatRoom.read", rooms::read);
    table.insert("chatRoom.list", rooms::list);
    table.insert("chatRoom.update", rooms::update);
    table.insert("chatRoom.delete", rooms::delete);
    table.insert("chatRoom.getByEntity", rooms::get_by_entity);

    table.insert("message.send", messages::send);
    table.insert("message.reply", messages::reply);
    table.insert("message.quote", messages::quote);
    table.insert("message.list", messages::list);
    table.insert("message.read", messages::read);
    table.insert("message.search", messages::search);
    table.insert("message.update", messages::update);
    table.insert("message.delete", messages::delete);
    table.insert("message.pin", messages::pin);
    table.insert("message.unpin", messages::unpin);
    table.insert("message.getEditHistory", messages::get_edit_history);

    table.insert("participant.add", participants::add);
    table.insert("participant.remove", participants::remove);
    table.insert("participant.list", participants::list);
    table.insert("participant.updateRole", participants::update_role);
    table.insert("participant.mute", participants::mute);
    table.insert("participant.unmute", participants::unmute);

    table.insert("typing.start", realtime::typing_start);
    table.insert("typing.stop", realtime::typing_stop);
    table.insert("presence.update", realtime::presence_update);
    table.insert("presence.get", realtime::presence_get);
    table.insert("readReceipt.mark", realtime::read_receipt_mark);
    table.insert("readReceipt.get", realtime::read_receipt_get);
    table.insert("reaction.add", realtime::reaction_add);
    table.insert("reaction.remove", realtime::reaction_remove);
    table.insert("reaction.list", realtime::reaction_list);

    table.insert("attachment.upload", attachments::upload);
    table.insert("attachment.delete", attachments::delete);
    table.insert("attachment.list", attachments::list);

    table
}

/// Requires the principal be an active participant of `room_id` (spec §8
/// invariant 5); returns the caller's role on success.
pub(crate) fn require_participant(
    state: &AppState,
    room_id: &str,
    user_id: &str,
) -> AppResult<crate::models::ParticipantRole> {
    let participant = state
        .repo
        .participant_get(room_id, user_id)
        .map_err(|_| AppError::Forbidden("not a participant of this room".to_string()))?;
    crate::models::ParticipantRole::parse(&participant.role)
        .ok_or_else(|| AppError::System("corrupt participant role".to_string()))
}

pub(crate) fn require_role_at_least(
    state: &AppState,
    room_id: &str,
    user_id: &str,
    min_role: crate::models::ParticipantRole,
) -> AppResult<crate::models::ParticipantRole> {
    let role = require_participant(state, room_id, user_id)?;
    if role.at_least(min_role) {
        Ok(role)
    } else {
        Err(AppError::Forbidden(format!(
            "requires role at least {}",
            min_role.as_str()
        )))
    }
}

pub(crate) fn require_str<'a>(data: &'a serde_json::Value, field: &str) -> AppResult<&'a str> {
    data.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::InvalidParameter(format!("{field} is required")))
}

pub(crate) fn optional_str<'a>(data: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    data.get(field).and_then(|v| v.as_str())
}
