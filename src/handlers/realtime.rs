use crate::events::{Event, EventType};
use crate::identity::Principal;
use crate::models::PresenceStatus;
use crate::state::AppState;
use crate::time::now_secs;
use crate::validate::{is_emoji, one_of};

use super::HandlerFuture;

const PRESENCE_STATUSES: &[&str] = &["online", "offline", "away", "busy", "dnd"];

/// `typing.start` (spec §4.6.4): records (room, user, now); implicit expiry
/// after 5s (spec §3); emits `typing.started`.
pub fn typing_start<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?.to_string();
        super::require_participant(state, &room_id, &principal.subject)?;

        let indicator = state.repo.typing_start(&room_id, &principal.subject)?;

        state.events.publish(
            &room_id,
            Event::new(
                EventType::TypingStarted,
                Some(room_id.clone()),
                serde_json::to_value(&indicator).unwrap(),
                now_secs(),
            ),
        );

        Ok(serde_json::to_value(&indicator).unwrap())
    })
}

/// `typing.stop` (spec §4.6.4): removes the record; emits `typing.stopped`.
pub fn typing_stop<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let room_id = super::require_str(&data, "room_id")?.to_string();
        super::require_participant(state, &room_id, &principal.subject)?;

        state.repo.typing_stop(&room_id, &principal.subject)?;

        state.events.publish(
            &room_id,
            Event::new(
                EventType::TypingStopped,
                Some(room_id.clone()),
                serde_json::json!({ "room_id": room_id, "user_id": principal.subject }),
                now_secs(),
            ),
        );

        Ok(serde_json::json!({ "room_id": room_id }))
    })
}

/// `presence.update` (spec §4.6.4): sets status for the principal; emits
/// `presence.changed` to every room the principal participates in (spec §8
/// invariant 5 explicitly exempts this action from a participation check).
pub fn presence_update<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let status_str = super::require_str(&data, "status")?;
        one_of("status", status_str, PRESENCE_STATUSES)?;
        let status = PresenceStatus::parse(status_str).unwrap();

        let presence = state.repo.presence_set(&principal.subject, status)?;

        let rooms = state.repo.room_list_for_user(&principal.subject, 100, 0, None)?;
        for room in rooms {
            state.events.publish(
                &room.id,
                Event::new(
                    EventType::PresenceChanged,
                    Some(room.id.clone()),
                    serde_json::to_value(&presence).unwrap(),
                    now_secs(),
                ),
            );
        }

        Ok(serde_json::to_value(&presence).unwrap())
    })
}

/// `presence.get` (spec §4.6.4): reads a user's current status; exempt from
/// the participation check (spec §8 invariant 5).
pub fn presence_get<'a>(_principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let user_id = super::require_str(&data, "user_id")?;
        let presence = state.repo.presence_get(user_id)?;
        Ok(match presence {
            Some(p) => serde_json::to_value(&p).unwrap(),
            None => serde_json::json!({ "user_id": user_id, "status": "offline", "last_seen": null }),
        })
    })
}

/// `readReceipt.mark` (spec §4.6.4): upserts receipt for (message, user);
/// emits `read.receipt`.
pub fn read_receipt_mark<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?.to_string();
        let message = state.repo.message_get(&message_id)?;
        super::require_participant(state, &message.room_id, &principal.subject)?;

        let receipt = state.repo.read_receipt_mark(&message_id, &message.room_id, &principal.subject)?;

        state.events.publish(
            &message.room_id,
            Event::new(
                EventType::ReadReceipt,
                Some(message.room_id.clone()),
                serde_json::to_value(&receipt).unwrap(),
                now_secs(),
            ),
        );

        Ok(serde_json::to_value(&receipt).unwrap())
    })
}

/// `readReceipt.get` (spec §4.6.4): lists receipts for a visible message.
pub fn read_receipt_get<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?;
        let message = state.repo.message_get(message_id)?;
        super::require_participant(state, &message.room_id, &principal.subject)?;

        let receipts = state.repo.read_receipt_list_for_message(message_id)?;
        Ok(serde_json::json!({ "receipts": receipts }))
    })
}

/// `reaction.add` (spec §4.6.4): triple-keyed; emits `reaction.added`.
pub fn reaction_add<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?.to_string();
        let emoji = super::require_str(&data, "emoji")?.to_string();
        is_emoji("emoji", &emoji)?;

        let message = state.repo.message_get(&message_id)?;
        super::require_participant(state, &message.room_id, &principal.subject)?;

        state.repo.reaction_add(&message_id, &message.room_id, &principal.subject, &emoji)?;

        state.events.publish(
            &message.room_id,
            Event::new(
                EventType::ReactionAdded,
                Some(message.room_id.clone()),
                serde_json::json!({ "message_id": message_id, "user_id": principal.subject, "emoji": emoji }),
                now_secs(),
            ),
        );

        Ok(serde_json::json!({ "message_id": message_id, "emoji": emoji }))
    })
}

/// `reaction.remove` (spec §4.6.4): emits `reaction.removed`.
pub fn reaction_remove<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?.to_string();
        let emoji = super::require_str(&data, "emoji")?.to_string();

        let message = state.repo.message_get(&message_id)?;
        super::require_participant(state, &message.room_id, &principal.subject)?;

        state.repo.reaction_remove(&message_id, &principal.subject, &emoji)?;

        state.events.publish(
            &message.room_id,
            Event::new(
                EventType::ReactionRemoved,
                Some(message.room_id.clone()),
                serde_json::json!({ "message_id": message_id, "user_id": principal.subject, "emoji": emoji }),
                now_secs(),
            ),
        );

        Ok(serde_json::json!({ "message_id": message_id, "emoji": emoji }))
    })
}

/// `reaction.list` (spec §4.6.4): aggregated counts per emoji and opted-in
/// user ids.
pub fn reaction_list<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?;
        let message = state.repo.message_get(message_id)?;
        super::require_participant(state, &message.room_id, &principal.subject)?;

        let summary = state.repo.reaction_summary(message_id)?;
        Ok(serde_json::json!({ "reactions": summary }))
    })
}
