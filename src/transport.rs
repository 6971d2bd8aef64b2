//! Real-time Transport (spec §4.8): the long-lived duplex `/ws` session.
//! Authenticates at handshake with the same credential as the request API,
//! registers a subscriber with the event fabric, then runs a reader (control
//! frames) and a writer (outbound events plus heartbeat) cooperatively until
//! idle eviction or explicit close. Grounded on the teacher's
//! `src/routes.rs::message_stream` (`tokio::select!` over a broadcast
//! receiver and a heartbeat interval), generalized from server-sent-events
//! to a full duplex socket via `rocket_ws`.

use futures::{SinkExt, StreamExt};
use rocket::{get, State};
use rocket_ws as ws;
use serde::Deserialize;
use tokio::time::interval;

use crate::dispatcher::BearerHeader;
use crate::events::Event;
use crate::identity::verify_token;
use crate::state::AppState;
use crate::time::now_secs;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ControlFrame {
    Subscribe { rooms: Vec<String> },
    Unsubscribe { rooms: Vec<String> },
}

/// `/ws`: handshake carries the bearer credential via `Authorization`
/// header or `jwt` query parameter (spec §6).
#[get("/ws?<jwt>")]
pub fn connect<'r>(
    ws: ws::WebSocket,
    jwt: Option<&'r str>,
    auth: BearerHeader,
    state: &'r State<AppState>,
) -> Result<ws::Channel<'r>, rocket::http::Status> {
    let credential = crate::identity::resolve_credential(auth.0.as_deref(), jwt, None)
        .ok_or(rocket::http::Status::Unauthorized)?;
    let principal = verify_token(credential, &state.config.jwt_secret, now_secs())
        .map_err(|_| rocket::http::Status::Unauthorized)?;

    let state = state.inner().clone();
    let heartbeat_period = state.config.ws_heartbeat;
    let idle_timeout = state.config.ws_idle_timeout;

    Ok(ws.channel(move |duplex| {
        Box::pin(async move {
            let (mut sink, mut stream) = duplex.split();
            let (subscriber, mut outbound) = state.events.subscribe(principal, Vec::new());

            let mut heartbeat = interval(heartbeat_period);
            let mut last_activity = tokio::time::Instant::now();

            loop {
                tokio::select! {
                    _ = subscriber.cancelled() => {
                        break;
                    }
                    maybe_event = outbound.recv() => {
                        match maybe_event {
                            Some(event) => {
                                if send_event(&mut sink, &event).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    incoming = stream.next() => {
                        match incoming {
                            Some(Ok(ws::Message::Text(text))) => {
                                last_activity = tokio::time::Instant::now();
                                handle_control_frame(&text, &state, &subscriber);
                            }
                            Some(Ok(ws::Message::Pong(_))) => {
                                last_activity = tokio::time::Instant::now();
                            }
                            Some(Ok(ws::Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(_)) => break,
                        }
                    }
                    _ = heartbeat.tick() => {
                        if last_activity.elapsed() > idle_timeout {
                            log::debug!("ws session for {} idle past {:?}, closing", subscriber.principal.subject, idle_timeout);
                            break;
                        }
                        if sink.send(ws::Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            state.events.unsubscribe(&subscriber);
            Ok(())
        })
    }))
}

async fn send_event<S>(sink: &mut S, event: &Event) -> Result<(), S::Error>
where
    S: futures::Sink<ws::Message> + Unpin,
{
    let body = serde_json::to_string(event).unwrap_or_default();
    sink.send(ws::Message::Text(body)).await
}

fn handle_control_frame(text: &str, state: &AppState, subscriber: &std::sync::Arc<crate::events::Subscriber>) {
    let Ok(frame) = serde_json::from_str::<ControlFrame>(text) else {
        log::debug!("ignoring malformed control frame: {text}");
        return;
    };

    match frame {
        ControlFrame::Subscribe { rooms } => {
            for room_id in rooms {
                if state.repo.participant_is_member(&room_id, &subscriber.principal.subject) {
                    state.events.add_room(subscriber, &room_id);
                }
            }
        }
        ControlFrame::Unsubscribe { rooms } => {
            for room_id in rooms {
                state.events.remove_room(subscriber, &room_id);
            }
        }
    }
}
