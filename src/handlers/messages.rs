use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::events::{Event, EventType};
use crate::identity::Principal;
use crate::models::{ContentFormat, MessageType, ParticipantRole};
use crate::state::AppState;
use crate::time::now_secs;
use crate::validate::{bounded_bytes, clamp_limit, one_of};

use super::HandlerFuture;

const CONTENT_FORMATS: &[&str] = &["plain", "markdown"];

fn require_active_participant(state: &AppState, room_id: &str, user_id: &str) -> AppResult<()> {
    let participant = state
        .repo
        .participant_get(room_id, user_id)
        .map_err(|_| AppError::Forbidden("not a participant of this room".to_string()))?;
    if participant.is_muted {
        return Err(AppError::Forbidden("muted participants may not send messages".to_string()));
    }
    Ok(())
}

fn resolve_in_room(state: &AppState, room_id: &str, message_id: &str, field: &str) -> AppResult<()> {
    let referenced = state.repo.message_get(message_id)?;
    if referenced.room_id != room_id {
        return Err(AppError::InvalidParameter(format!("{field} must reference a message in the same room")));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SendPayload {
    room_id: String,
    content: String,
    #[serde(default = "default_content_format")]
    content_format: String,
    #[serde(rename = "type", default = "default_message_type")]
    message_type: String,
    #[serde(default = "default_metadata")]
    metadata: serde_json::Value,
}

fn default_content_format() -> String {
    "plain".to_string()
}

fn default_message_type() -> String {
    "text".to_string()
}

fn default_metadata() -> serde_json::Value {
    serde_json::json!({})
}

fn create_message<'a>(
    principal: &'a Principal,
    state: &'a AppState,
    room_id: String,
    content: String,
    content_format: String,
    message_type: String,
    metadata: serde_json::Value,
    parent_id: Option<String>,
    quoted_message_id: Option<String>,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        bounded_bytes("content", &content, state.config.message_max_bytes)?;
        one_of("content_format", &content_format, CONTENT_FORMATS)?;
        let format = ContentFormat::parse(&content_format).unwrap();
        let msg_type = MessageType::parse(&message_type)
            .ok_or_else(|| AppError::InvalidParameter("type must be a known message type".to_string()))?;

        require_active_participant(state, &room_id, &principal.subject)?;

        if let Some(parent) = &parent_id {
            resolve_in_room(state, &room_id, parent, "parent_id")?;
        }
        if let Some(quoted) = &quoted_message_id {
            resolve_in_room(state, &room_id, quoted, "quoted_message_id")?;
        }

        let message = state.repo.message_create(
            &room_id,
            &principal.subject,
            msg_type,
            &content,
            format,
            parent_id.as_deref(),
            quoted_message_id.as_deref(),
            &metadata,
        )?;

        state.events.publish(
            &room_id,
            Event::new(EventType::MessageNew, Some(room_id.clone()), serde_json::to_value(&message).unwrap(), now_secs()),
        );

        Ok(serde_json::to_value(&message).unwrap())
    })
}

/// `message.send` (spec §4.6.2).
pub fn send<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: SendPayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        create_message(
            principal,
            state,
            payload.room_id,
            payload.content,
            payload.content_format,
            payload.message_type,
            payload.metadata,
            None,
            None,
        )
        .await
    })
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    room_id: String,
    parent_id: String,
    content: String,
    #[serde(default = "default_content_format")]
    content_format: String,
    #[serde(default = "default_metadata")]
    metadata: serde_json::Value,
}

/// `message.reply` (spec §4.6.2): like send, with `parent_id` resolved in the
/// same room.
pub fn reply<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: ReplyPayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        create_message(
            principal,
            state,
            payload.room_id,
            payload.content,
            payload.content_format,
            default_message_type(),
            payload.metadata,
            Some(payload.parent_id),
            None,
        )
        .await
    })
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    room_id: String,
    quoted_message_id: String,
    content: String,
    #[serde(default = "default_content_format")]
    content_format: String,
    #[serde(default = "default_metadata")]
    metadata: serde_json::Value,
}

/// `message.quote` (spec §4.6.2): like send, with `quoted_message_id`
/// resolved in the same room.
pub fn quote<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: QuotePayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        create_message(
            principal,
            state,
            payload.room_id,
            payload.content,
            payload.content_format,
            default_message_type(),
            payload.metadata,
            None,
            Some(payload.quoted_message_id),
        )
        .await
    })
}

/// `message.list` (spec §4.6.2): default 50, max 100, newest-first unless
/// `order=asc`.
pub fn list<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?;
        if !state.repo.participant_is_member(room_id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }

        let limit = clamp_limit(data.get("limit").and_then(|v| v.as_i64()), 50, 100);
        let before_seq = data.get("before_seq").and_then(|v| v.as_i64());
        let after_seq = data.get("after_seq").and_then(|v| v.as_i64());
        let order_asc = data.get("order").and_then(|v| v.as_str()) == Some("asc");

        let mut messages = state.repo.message_list(room_id, limit, before_seq, after_seq)?;
        if !order_asc && before_seq.is_none() && after_seq.is_none() {
            messages.reverse();
        }

        Ok(serde_json::json!({ "messages": messages }))
    })
}

/// `message.read` (spec §4.6.2): single message fetch for a participant.
pub fn read<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?;
        let message = state.repo.message_get(message_id)?;
        if !state.repo.participant_is_member(&message.room_id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }
        Ok(serde_json::to_value(&message).unwrap())
    })
}

/// `message.search` (spec §4.6.2): full-text over `content`, scoped to one room.
pub fn search<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?;
        let query = super::require_str(&data, "query")?;
        if !state.repo.participant_is_member(room_id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }
        let limit = clamp_limit(data.get("limit").and_then(|v| v.as_i64()), 20, 100);
        let results = state.repo.message_search(room_id, query, limit)?;
        Ok(serde_json::json!({ "messages": results }))
    })
}

#[derive(Debug, Deserialize)]
struct UpdatePayload {
    message_id: String,
    content: String,
    #[serde(default = "default_content_format")]
    content_format: String,
}

/// `message.update` (spec §4.6.2): only by sender; writes EditHistory in the
/// same transaction; emits `message.updated`.
pub fn update<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: UpdatePayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        bounded_bytes("content", &payload.content, state.config.message_max_bytes)?;
        one_of("content_format", &payload.content_format, CONTENT_FORMATS)?;
        let format = ContentFormat::parse(&payload.content_format).unwrap();

        let existing = state.repo.message_get(&payload.message_id)?;
        if existing.sender_id != principal.subject {
            return Err(AppError::Forbidden("only the sender may edit this message".to_string()));
        }

        let message = state.repo.message_edit(&payload.message_id, &principal.subject, &payload.content, format)?;

        state.events.publish(
            &message.room_id,
            Event::new(EventType::MessageUpdated, Some(message.room_id.clone()), serde_json::to_value(&message).unwrap(), now_secs()),
        );

        Ok(serde_json::to_value(&message).unwrap())
    })
}

/// `message.delete` (spec §4.6.2): by sender OR room admin/owner; soft delete.
pub fn delete<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?.to_string();
        let existing = state.repo.message_get(&message_id)?;

        if existing.sender_id != principal.subject {
            super::require_role_at_least(state, &existing.room_id, &principal.subject, ParticipantRole::Admin)?;
        }

        state.repo.message_soft_delete(&message_id)?;

        state.events.publish(
            &existing.room_id,
            Event::new(
                EventType::MessageDeleted,
                Some(existing.room_id.clone()),
                serde_json::json!({ "message_id": message_id }),
                now_secs(),
            ),
        );

        Ok(serde_json::json!({ "message_id": message_id }))
    })
}

fn set_pinned<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState, pinned: bool) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?.to_string();
        let existing = state.repo.message_get(&message_id)?;
        super::require_role_at_least(state, &existing.room_id, &principal.subject, ParticipantRole::Moderator)?;

        let pinned_by = if pinned { Some(principal.subject.as_str()) } else { None };
        let message = state.repo.message_set_pinned(&message_id, pinned, pinned_by)?;

        state.events.publish(
            &message.room_id,
            Event::new(EventType::MessageUpdated, Some(message.room_id.clone()), serde_json::to_value(&message).unwrap(), now_secs()),
        );

        Ok(serde_json::to_value(&message).unwrap())
    })
}

/// `message.pin` (spec §4.6.2): requires role ∈ {owner, admin, moderator}.
pub fn pin<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    set_pinned(principal, data, state, true)
}

/// `message.unpin` (spec §4.6.2).
pub fn unpin<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    set_pinned(principal, data, state, false)
}

/// `message.getEditHistory` (spec §4.6.2): ascending `edit_number` for a
/// message the principal can see.
pub fn get_edit_history<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?;
        let message = state.repo.message_get(message_id)?;
        if !state.repo.participant_is_member(&message.room_id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }
        let history = state.repo.message_edit_history(message_id)?;
        Ok(serde_json::json!({ "history": history }))
    })
}
