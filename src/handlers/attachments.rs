use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::identity::Principal;
use crate::models::ParticipantRole;
use crate::state::AppState;
use crate::validate::non_empty;

use super::HandlerFuture;

fn require_message_authority(state: &AppState, message_id: &str, principal: &Principal) -> AppResult<crate::models::Message> {
    let message = state.repo.message_get(message_id)?;
    if message.sender_id != principal.subject {
        super::require_role_at_least(state, &message.room_id, &principal.subject, ParticipantRole::Admin)?;
    }
    Ok(message)
}

#[derive(Debug, Deserialize)]
struct UploadPayload {
    message_id: String,
    file_name: String,
    file_size: i64,
    mime_type: String,
    storage_url: String,
    #[serde(default = "default_metadata")]
    metadata: serde_json::Value,
}

fn default_metadata() -> serde_json::Value {
    serde_json::json!({})
}

/// `attachment.upload` (spec §4.6.5, metadata only): binds an attachment
/// record to a message the principal sent or has admin authority over; the
/// byte transfer itself happens outside this service.
pub fn upload<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let payload: UploadPayload = serde_json::from_value(data)
            .map_err(|e| AppError::InvalidParameter(e.to_string()))?;
        non_empty("file_name", &payload.file_name)?;
        non_empty("storage_url", &payload.storage_url)?;
        non_empty("mime_type", &payload.mime_type)?;
        if payload.file_size <= 0 || payload.file_size as usize > state.config.attachment_max_bytes {
            return Err(AppError::InvalidParameter(format!(
                "file_size must be between 1 and {} bytes",
                state.config.attachment_max_bytes
            )));
        }

        require_message_authority(state, &payload.message_id, principal)?;

        let attachment = state.repo.attachment_create(
            &payload.message_id,
            &payload.file_name,
            payload.file_size,
            &payload.mime_type,
            &payload.storage_url,
            &payload.metadata,
        )?;

        Ok(serde_json::to_value(&attachment).unwrap())
    })
}

/// `attachment.delete` (spec §4.6.5): deletion cascades with the message
/// naturally via the schema's foreign key; this only removes the metadata
/// row directly when an attachment is removed independently of its message.
pub fn delete<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let attachment_id = super::require_str(&data, "attachment_id")?.to_string();
        let attachment = state.repo.attachment_get(&attachment_id)?;
        require_message_authority(state, &attachment.message_id, principal)?;

        state.repo.attachment_delete(&attachment_id)?;

        Ok(serde_json::json!({ "attachment_id": attachment_id }))
    })
}

/// `attachment.list` (spec §4.6.5): metadata for every attachment on a
/// message the principal can see.
pub fn list<'a>(principal: &'a Principal, data: serde_json::Value, state: &'a AppState) -> HandlerFuture<'a> {
    Box::pin(async move {
        let message_id = super::require_str(&data, "message_id")?;
        let message = state.repo.message_get(message_id)?;
        if !state.repo.participant_is_member(&message.room_id, &principal.subject) {
            return Err(AppError::Forbidden("not a participant of this room".to_string()));
        }
        let attachments = state.repo.attachment_list_for_message(message_id)?;
        Ok(serde_json::json!({ "attachments": attachments }))
    })
}
