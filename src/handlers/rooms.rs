use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::events::{Event, EventType};
use crate::identity::Principal;
use crate::models::{ParticipantRole, RoomType};
use crate::state::AppState;
use crate::time::now_secs;
use crate::validate::{bounded_len, clamp_limit, one_of, Validate};

use super::{require_role_at_least, HandlerFuture};

const ROOM_TYPES: &[&str] = &["direct", "group", "channel", "private"];

#[derive(Debug, Deserialize)]
struct CreatePayload {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default = "default_room_type")]
    room_type: String,
    #[serde(default)]
    is_private: bool,
    entity_type: Option<String>,
    entity_id: Option<String>,
    #[serde(default = "default_metadata")]
    metadata: serde_json::Value,
}

fn default_room_type() -> String {
    "group".to_string()
}

fn default_metadata() -> serde_json::Value {
    serde_json::json!({})
}

impl Validate for CreatePayload {
    fn validate(&self) -> AppResult<()> {
        bounded_len("name", &self.name, 1, 255)?;
        one_of("type", &self.room_type, ROOM_TYPES)?;
        if self.entity_type.is_some() != self.entity_id.is_some() {
            return Err(AppError::InvalidParameter(
                "entity_type and entity_id must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

/// `chatRoom.create` (spec §4.6.1): creator becomes owner; duplicate active
/// entity binding surfaces as 3001 from the repository's unique index.
pub fn create<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: CreatePayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        payload.validate()?;

        let room_type = RoomType::parse(&payload.room_type)
            .ok_or_else(|| AppError::InvalidParameter("type must be a known room type".to_string()))?;

        let room = state.repo.room_create(
            &principal.subject,
            &payload.name,
            &payload.description,
            room_type,
            payload.is_private,
            payload.entity_type.as_deref(),
            payload.entity_id.as_deref(),
            &payload.metadata,
        )?;

        state.events.publish(
            &room.id,
            Event::new(EventType::ChatRoomCreated, Some(room.id.clone()), serde_json::to_value(&room).unwrap(), now_secs()),
        );

        Ok(serde_json::to_value(&room).unwrap())
    })
}

/// `chatRoom.read` (spec §4.6.1): requires participation (spec §8 invariant 5).
pub fn read<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?;
        let room = state.repo.room_get(room_id)?;
        if !state.repo.participant_is_member(room_id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }
        Ok(serde_json::to_value(&room).unwrap())
    })
}

/// `chatRoom.list` (spec §4.6.1): scoped to the principal's own rooms; no
/// participation check needed beyond being the caller (spec §8 invariant 5
/// explicitly exempts this).
pub fn list<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let limit = clamp_limit(data.get("limit").and_then(|v| v.as_i64()), 20, 100);
        let offset = data.get("offset").and_then(|v| v.as_i64()).unwrap_or(0).max(0);
        let type_filter = data
            .get("type")
            .and_then(|v| v.as_str())
            .and_then(RoomType::parse);

        let rooms = state.repo.room_list_for_user(&principal.subject, limit, offset, type_filter)?;
        Ok(serde_json::json!({ "rooms": rooms }))
    })
}

#[derive(Debug, Deserialize)]
struct UpdatePayload {
    room_id: String,
    name: Option<String>,
    description: Option<String>,
    is_private: Option<bool>,
    metadata: Option<serde_json::Value>,
}

/// `chatRoom.update` (spec §4.6.1): requires role ∈ {owner, admin}.
pub fn update<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: UpdatePayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        if let Some(name) = &payload.name {
            bounded_len("name", name, 1, 255)?;
        }

        require_role_at_least(state, &payload.room_id, &principal.subject, ParticipantRole::Admin)?;

        let room = state.repo.room_update(
            &payload.room_id,
            payload.name.as_deref(),
            payload.description.as_deref(),
            payload.is_private,
            payload.metadata.as_ref(),
        )?;

        state.events.publish(
            &room.id,
            Event::new(EventType::ChatRoomUpdated, Some(room.id.clone()), serde_json::to_value(&room).unwrap(), now_secs()),
        );

        Ok(serde_json::to_value(&room).unwrap())
    })
}

/// `chatRoom.delete` (spec §4.6.1): requires role = owner; soft delete.
pub fn delete<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?.to_string();
        require_role_at_least(state, &room_id, &principal.subject, ParticipantRole::Owner)?;

        state.repo.room_soft_delete(&room_id)?;

        state.events.publish(
            &room_id,
            Event::new(EventType::ChatRoomDeleted, Some(room_id.clone()), serde_json::json!({ "room_id": room_id }), now_secs()),
        );

        Ok(serde_json::json!({ "room_id": room_id }))
    })
}

/// `chatRoom.getByEntity` (spec §4.6.1): the single active room bound to
/// (entity_type, entity_id), if the principal participates in it.
pub fn get_by_entity<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let entity_type = super::require_str(&data, "entity_type")?;
        let entity_id = super::require_str(&data, "entity_id")?;

        let room = state
            .repo
            .room_get_by_entity(entity_type, entity_id)?
            .ok_or_else(|| AppError::NotFound("room".to_string()))?;

        if !state.repo.participant_is_member(&room.id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }

        Ok(serde_json::to_value(&room).unwrap())
    })
}
