use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::events::{Event, EventType};
use crate::identity::Principal;
use crate::models::ParticipantRole;
use crate::state::AppState;
use crate::time::now_secs;

use super::{require_role_at_least, HandlerFuture};

#[derive(Debug, Deserialize)]
struct AddPayload {
    room_id: String,
    user_id: String,
    #[serde(default = "default_role")]
    role: String,
}

fn default_role() -> String {
    "member".to_string()
}

/// `participant.add` (spec §4.6.3): requires role ∈ {owner, admin,
/// moderator}; added principal defaults to `member`; duplicate → 3001 from
/// the participants table's primary key. `role: "owner"` is rejected —
/// ownership only moves via `participant.updateRole`'s atomic transfer,
/// never via a plain add (spec §3, §8 invariant 1).
pub fn add<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: AddPayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        let role = ParticipantRole::parse(&payload.role)
            .ok_or_else(|| AppError::InvalidParameter("role must be a known participant role".to_string()))?;
        if role == ParticipantRole::Owner {
            return Err(AppError::InvalidParameter(
                "owner may not be granted via participant.add; use participant.updateRole to transfer ownership".to_string(),
            ));
        }

        require_role_at_least(state, &payload.room_id, &principal.subject, ParticipantRole::Moderator)?;

        let participant = state.repo.participant_add(&payload.room_id, &payload.user_id, role)?;

        state.events.publish(
            &payload.room_id,
            Event::new(
                EventType::ParticipantJoined,
                Some(payload.room_id.clone()),
                serde_json::to_value(&participant).unwrap(),
                now_secs(),
            ),
        );

        Ok(serde_json::to_value(&participant).unwrap())
    })
}

/// `participant.remove` (spec §4.6.3): requires role ∈ {owner, admin} OR
/// self-removal; the owner may never be removed (must transfer first).
pub fn remove<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?.to_string();
        let user_id = super::require_str(&data, "user_id")?.to_string();

        let target = state.repo.participant_get(&room_id, &user_id)?;
        if target.role == ParticipantRole::Owner.as_str() {
            return Err(AppError::Forbidden("the owner must transfer ownership before being removed".to_string()));
        }

        if user_id != principal.subject {
            require_role_at_least(state, &room_id, &principal.subject, ParticipantRole::Admin)?;
        } else {
            super::require_participant(state, &room_id, &principal.subject)?;
        }

        state.repo.participant_remove(&room_id, &user_id)?;

        state.events.publish(
            &room_id,
            Event::new(
                EventType::ParticipantLeft,
                Some(room_id.clone()),
                serde_json::json!({ "room_id": room_id, "user_id": user_id }),
                now_secs(),
            ),
        );

        Ok(serde_json::json!({ "room_id": room_id, "user_id": user_id }))
    })
}

/// `participant.list` (spec §4.6.3): any participant may list.
pub fn list<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?;
        super::require_participant(state, room_id, &principal.subject)?;
        let participants = state.repo.participant_list(room_id)?;
        Ok(serde_json::json!({ "participants": participants }))
    })
}

#[derive(Debug, Deserialize)]
struct UpdateRolePayload {
    room_id: String,
    user_id: String,
    role: String,
}

/// `participant.updateRole` (spec §4.6.3): requires role ∈ {owner, admin};
/// must preserve the exactly-one-owner invariant (spec §4.6.6, §8 invariant 1).
pub fn update_role<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: UpdateRolePayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        let new_role = ParticipantRole::parse(&payload.role)
            .ok_or_else(|| AppError::InvalidParameter("role must be a known participant role".to_string()))?;

        require_role_at_least(state, &payload.room_id, &principal.subject, ParticipantRole::Admin)?;

        let target = state.repo.participant_get(&payload.room_id, &payload.user_id)?;
        let was_owner = target.role == ParticipantRole::Owner.as_str();

        if was_owner && new_role != ParticipantRole::Owner {
            let owners = state.repo.participant_count_owners(&payload.room_id)?;
            if owners <= 1 {
                return Err(AppError::Conflict("a room must always have exactly one owner".to_string()));
            }
        }

        // Promoting to owner is a transfer, not a plain role write: it must
        // demote the room's current owner in the same transaction so two
        // owners are never observed (spec §3, §8 invariant 1).
        let participant = if new_role == ParticipantRole::Owner {
            state.repo.participant_transfer_ownership(&payload.room_id, &payload.user_id)?
        } else {
            state.repo.participant_set_role(&payload.room_id, &payload.user_id, new_role)?
        };

        state.events.publish(
            &payload.room_id,
            Event::new(
                EventType::ParticipantUpdated,
                Some(payload.room_id.clone()),
                serde_json::to_value(&participant).unwrap(),
                now_secs(),
            ),
        );

        Ok(serde_json::to_value(&participant).unwrap())
    })
}

fn set_muted<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState, muted: bool) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?.to_string();
        let user_id = super::require_str(&data, "user_id")?.to_string();

        require_role_at_least(state, &room_id, &principal.subject, ParticipantRole::Moderator)?;
        state.repo.participant_set_muted(&room_id, &user_id, muted)?;

        let participant = state.repo.participant_get(&room_id, &user_id)?;
        state.events.publish(
            &room_id,
            Event::new(
                EventType::ParticipantUpdated,
                Some(room_id.clone()),
                serde_json::to_value(&participant).unwrap(),
                now_secs(),
            ),
        );

        Ok(serde_json::to_value(&participant).unwrap())
    })
}

/// `participant.mute` (spec §4.6.3): requires role ∈ {owner, admin, moderator}.
pub fn mute<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    set_muted(principal, data, state, true)
}

/// `participant.unmute` (spec §4.6.3).
pub fn unmute<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    set_muted(principal, data, state, false)
}
