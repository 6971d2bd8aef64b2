//! Domain model (spec §3). Grounded on the teacher's `src/models.rs`
//! (`Room`, `Message`, `Reaction`, `PresenceEntry`, `ReadPosition` structs,
//! `#[serde(skip_serializing_if = "Option::is_none")]` convention for
//! optional fields), expanded with the role/type enums and ownership
//! invariants the teacher's trust-based design never needed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Direct,
    Group,
    Channel,
    Private,
}

impl RoomType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(RoomType::Direct),
            "group" => Some(RoomType::Group),
            "channel" => Some(RoomType::Channel),
            "private" => Some(RoomType::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Direct => "direct",
            RoomType::Group => "group",
            RoomType::Channel => "channel",
            RoomType::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Guest,
    Member,
    Moderator,
    Admin,
    Owner,
}

impl ParticipantRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(ParticipantRole::Owner),
            "admin" => Some(ParticipantRole::Admin),
            "moderator" => Some(ParticipantRole::Moderator),
            "member" => Some(ParticipantRole::Member),
            "guest" => Some(ParticipantRole::Guest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Owner => "owner",
            ParticipantRole::Admin => "admin",
            ParticipantRole::Moderator => "moderator",
            ParticipantRole::Member => "member",
            ParticipantRole::Guest => "guest",
        }
    }

    pub fn at_least(&self, other: ParticipantRole) -> bool {
        *self >= other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
    System,
}

impl MessageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "file" => Some(MessageType::File),
            "system" => Some(MessageType::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Plain,
    Markdown,
}

impl ContentFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(ContentFormat::Plain),
            "markdown" => Some(ContentFormat::Markdown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Plain => "plain",
            ContentFormat::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
    Away,
    Busy,
    Dnd,
}

impl PresenceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(PresenceStatus::Online),
            "offline" => Some(PresenceStatus::Offline),
            "away" => Some(PresenceStatus::Away),
            "busy" => Some(PresenceStatus::Busy),
            "dnd" => Some(PresenceStatus::Dnd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
            PresenceStatus::Away => "away",
            PresenceStatus::Busy => "busy",
            PresenceStatus::Dnd => "dnd",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub room_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: i64,
    pub is_muted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub content: String,
    pub content_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_message_id: Option<String>,
    pub is_edited: bool,
    pub is_pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_at: Option<i64>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<i64>,
    pub metadata: serde_json::Value,
    pub seq: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditHistoryEntry {
    pub id: String,
    pub message_id: String,
    pub editor_id: String,
    pub previous_content: String,
    pub previous_content_format: String,
    pub previous_metadata: serde_json::Value,
    pub edit_number: i64,
    /// Epoch milliseconds (spec §6 — internal record, not a bare API field).
    pub edited_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: i64,
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: String,
    pub user_id: String,
    pub read_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub room_id: String,
    pub user_id: String,
    pub started_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: String,
    pub status: String,
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub message_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub storage_url: String,
    pub uploaded_at: i64,
    pub metadata: serde_json::Value,
}
