//! Event Fabric (spec §4.7): an in-process registry mapping `room_id` to a
//! set of subscriber handles, fanning events to bounded per-subscriber
//! queues with drop-on-overflow. Grounded on the teacher's
//! `src/events.rs` (`tokio::sync::broadcast` hub), but redesigned per the
//! spec's REDESIGN FLAGS: the teacher's single global broadcast channel
//! (every subscriber sees every room, filtered client-side) is replaced
//! with per-room subscriber sets and per-subscriber bounded `mpsc` queues,
//! matching spec §4.7/§5 exactly. The room-scoped, `RwLock`-protected
//! registry shape is grounded on `PresenceTracker` in the teacher's
//! `src/routes/mod.rs`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::{mpsc, Notify};

use crate::identity::Principal;

/// One of the real-time event types listed in spec §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    MessageNew,
    MessageUpdated,
    MessageDeleted,
    TypingStarted,
    TypingStopped,
    ReadReceipt,
    ReactionAdded,
    ReactionRemoved,
    ParticipantJoined,
    ParticipantLeft,
    ParticipantUpdated,
    PresenceChanged,
    ChatRoomCreated,
    ChatRoomUpdated,
    ChatRoomDeleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MessageNew => "message.new",
            EventType::MessageUpdated => "message.updated",
            EventType::MessageDeleted => "message.deleted",
            EventType::TypingStarted => "typing.started",
            EventType::TypingStopped => "typing.stopped",
            EventType::ReadReceipt => "read.receipt",
            EventType::ReactionAdded => "reaction.added",
            EventType::ReactionRemoved => "reaction.removed",
            EventType::ParticipantJoined => "participant.joined",
            EventType::ParticipantLeft => "participant.left",
            EventType::ParticipantUpdated => "participant.updated",
            EventType::PresenceChanged => "presence.changed",
            EventType::ChatRoomCreated => "chatroom.created",
            EventType::ChatRoomUpdated => "chatroom.updated",
            EventType::ChatRoomDeleted => "chatroom.deleted",
        }
    }
}

/// `{type, room_id?, data, timestamp}` (spec §4.7).
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub data: serde_json::Value,
    pub timestamp: i64,
}

impl Event {
    pub fn new(event_type: EventType, room_id: Option<String>, data: serde_json::Value, timestamp: i64) -> Self {
        Event { event_type: event_type.as_str(), room_id, data, timestamp }
    }
}

/// A connected session's subscription state: its principal, the rooms it has
/// subscribed to, a bounded outbound queue, and a cancellation handle (spec
/// §4.7).
pub struct Subscriber {
    pub id: uuid::Uuid,
    pub principal: Principal,
    rooms: RwLock<HashSet<String>>,
    sender: mpsc::Sender<Event>,
    dropped: AtomicU64,
    cancel: Notify,
    cancelled: std::sync::atomic::AtomicBool,
}

impl Subscriber {
    pub fn rooms(&self) -> HashSet<String> {
        self.rooms.read().unwrap().clone()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Resolves once `cancel()` has been called (idle eviction or explicit
    /// close), for the writer/reader tasks to select on (spec §4.8, §5).
    pub async fn cancelled(&self) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        self.cancel.notified().await;
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.cancel.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// The narrow capability the core publishes through: `publish`, `subscribe`,
/// `unsubscribe` (spec §9 "Event fabric as a replaceable capability"). This
/// is the in-process hub variant; a cross-instance fan-out variant could
/// implement the same shape backed by an external broker.
pub struct EventFabric {
    registry: RwLock<HashMap<String, Vec<Arc<Subscriber>>>>,
    queue_size: usize,
}

impl EventFabric {
    pub fn new(queue_size: usize) -> Self {
        EventFabric { registry: RwLock::new(HashMap::new()), queue_size }
    }

    /// Registers a new subscriber for the given rooms and returns its handle
    /// plus the receiving half of its outbound queue.
    pub fn subscribe(&self, principal: Principal, rooms: Vec<String>) -> (Arc<Subscriber>, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(self.queue_size);
        let subscriber = Arc::new(Subscriber {
            id: uuid::Uuid::new_v4(),
            principal,
            rooms: RwLock::new(rooms.iter().cloned().collect()),
            sender,
            dropped: AtomicU64::new(0),
            cancel: Notify::new(),
            cancelled: std::sync::atomic::AtomicBool::new(false),
        });

        let mut registry = self.registry.write().unwrap();
        for room in &rooms {
            registry.entry(room.clone()).or_default().push(subscriber.clone());
        }

        (subscriber, receiver)
    }

    pub fn add_room(&self, subscriber: &Arc<Subscriber>, room_id: &str) {
        subscriber.rooms.write().unwrap().insert(room_id.to_string());
        let mut registry = self.registry.write().unwrap();
        let room_subscribers = registry.entry(room_id.to_string()).or_default();
        if !room_subscribers.iter().any(|s| s.id == subscriber.id) {
            room_subscribers.push(subscriber.clone());
        }
    }

    pub fn remove_room(&self, subscriber: &Arc<Subscriber>, room_id: &str) {
        subscriber.rooms.write().unwrap().remove(room_id);
        let mut registry = self.registry.write().unwrap();
        if let Some(room_subscribers) = registry.get_mut(room_id) {
            room_subscribers.retain(|s| s.id != subscriber.id);
            if room_subscribers.is_empty() {
                registry.remove(room_id);
            }
        }
    }

    /// Deregisters a subscriber from every room it had joined.
    pub fn unsubscribe(&self, subscriber: &Arc<Subscriber>) {
        let rooms = subscriber.rooms();
        let mut registry = self.registry.write().unwrap();
        for room_id in rooms {
            if let Some(room_subscribers) = registry.get_mut(&room_id) {
                room_subscribers.retain(|s| s.id != subscriber.id);
                if room_subscribers.is_empty() {
                    registry.remove(&room_id);
                }
            }
        }
        subscriber.cancel();
    }

    /// Iterates subscribers of `room_id` and tries to enqueue without
    /// blocking. Full queues drop silently — the subscriber is not
    /// disconnected for drops alone (spec §4.6.7, §4.7).
    pub fn publish(&self, room_id: &str, event: Event) {
        let subscribers: Vec<Arc<Subscriber>> = {
            let registry = self.registry.read().unwrap();
            match registry.get(room_id) {
                Some(subs) => subs.clone(),
                None => return,
            }
        };

        for subscriber in subscribers {
            if let Err(mpsc::error::TrySendError::Full(_)) = subscriber.sender.try_send(event.clone()) {
                subscriber.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "event fabric dropped event for subscriber {} in room {room_id} ({} total)",
                    subscriber.id,
                    subscriber.dropped_count()
                );
            }
        }
    }
}
