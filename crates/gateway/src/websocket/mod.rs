//! Realtime gateway: per-connection state machine and room fan-out.
//!
//! Each connection starts unauthenticated, binds to a user on
//! `authenticate`, joins zero or more chat rooms, and is cleaned up on
//! disconnect. Rooms are broadcast channels keyed by chat public id; each
//! connection additionally has a personal channel for acks and scoped
//! errors.

pub mod events;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dispatch_chats::MessageDraft;
use dispatch_database::{MessageBody, MessageType};
use dispatch_push::PushPayload;

use crate::payloads::MessagePayload;
use crate::state::GatewayState;
pub use events::{ClientEvent, ServerEvent};

const ROOM_CHANNEL_CAPACITY: usize = 256;

/// A frame queued to a room, with an optional origin to skip so relays like
/// typing and presence do not echo back to their sender.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub exclude: Option<i64>,
    pub event: ServerEvent,
}

/// A live connection's personal channel, registered under its user id.
#[derive(Clone)]
struct ConnectionHandle {
    connection_id: u64,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Process-local registry of rooms and connections.
///
/// The user-to-connection mapping is last-writer-wins: a second connection
/// from the same user replaces the first. A multi-device-aware redesign
/// would key by (user, connection) and fan out to all of a user's
/// connections.
#[derive(Clone, Default)]
pub struct RealtimeState {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<Outbound>>>>,
    connections: Arc<RwLock<HashMap<i64, ConnectionHandle>>>,
    next_connection_id: Arc<AtomicU64>,
}

impl RealtimeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the broadcast channel for a chat room.
    pub async fn room(&self, chat_public_id: &str) -> broadcast::Sender<Outbound> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(chat_public_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Broadcast an event to everyone in a chat room.
    pub async fn broadcast_to_chat(&self, chat_public_id: &str, event: ServerEvent) {
        let room = self.room(chat_public_id).await;
        let _ = room.send(Outbound {
            exclude: None,
            event,
        });
    }

    /// Broadcast to a chat room, skipping the originating user.
    pub async fn broadcast_to_chat_excluding(
        &self,
        chat_public_id: &str,
        origin: i64,
        event: ServerEvent,
    ) {
        let room = self.room(chat_public_id).await;
        let _ = room.send(Outbound {
            exclude: Some(origin),
            event,
        });
    }

    /// Bind a connection to a user id, replacing any previous connection.
    async fn register(&self, user_id: i64, sender: mpsc::UnboundedSender<ServerEvent>) -> u64 {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.connections.write().await;
        connections.insert(
            user_id,
            ConnectionHandle {
                connection_id,
                sender,
            },
        );
        connection_id
    }

    /// Drop the user mapping, but only if it still points at this
    /// connection. A newer connection from the same user is left alone.
    async fn unregister(&self, user_id: i64, connection_id: u64) {
        let mut connections = self.connections.write().await;
        if let Some(handle) = connections.get(&user_id) {
            if handle.connection_id == connection_id {
                connections.remove(&user_id);
            }
        }
    }

    /// Whether a user currently has a live connection.
    pub async fn is_connected(&self, user_id: i64) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }
}

/// WebSocket upgrade endpoint.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Single writer: everything destined for this connection funnels
    // through the personal channel.
    let write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(state, tx);

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => session.handle(event).await,
                Err(_) => session.send(ServerEvent::Error {
                    message: "unrecognized event".to_string(),
                }),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    session.finish().await;
    write_task.abort();
}

/// Per-connection state machine.
struct Session {
    state: Arc<GatewayState>,
    tx: mpsc::UnboundedSender<ServerEvent>,
    user_id: Option<i64>,
    connection_id: Option<u64>,
    /// Forwarder task per joined room, keyed by chat public id.
    joined: HashMap<String, JoinHandle<()>>,
}

impl Session {
    fn new(state: Arc<GatewayState>, tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            state,
            tx,
            user_id: None,
            connection_id: None,
            joined: HashMap::new(),
        }
    }

    /// Queue an event to this connection only.
    fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }

    async fn handle(&mut self, event: ClientEvent) {
        if let ClientEvent::Authenticate { user_id } = event {
            self.authenticate(user_id).await;
            return;
        }

        let Some(user_id) = self.user_id else {
            self.send(ServerEvent::Error {
                message: "authenticate first".to_string(),
            });
            return;
        };

        match event {
            ClientEvent::Authenticate { .. } => unreachable!("handled above"),
            ClientEvent::JoinChat { chat_id } => self.join_chat(user_id, chat_id).await,
            ClientEvent::SendMessage {
                chat_id,
                content,
                message_type,
                reply_to,
                file_data,
                mentions,
                temp_id,
            } => {
                let body = match MessageBody::from_parts(
                    message_type.unwrap_or(MessageType::Text),
                    file_data,
                ) {
                    Ok(body) => body,
                    Err(reason) => {
                        self.send(ServerEvent::MessageError {
                            error: reason,
                            temp_id,
                        });
                        return;
                    }
                };
                let draft = MessageDraft {
                    content,
                    body,
                    reply_to,
                    mentions,
                };
                self.send_message(user_id, chat_id, draft, temp_id).await;
            }
            ClientEvent::EditMessage {
                message_id,
                content,
            } => {
                match self
                    .state
                    .message_service
                    .edit_message(&message_id, user_id, &content)
                    .await
                {
                    Ok(record) => {
                        let chat_id = record.chat_public_id.clone();
                        self.state
                            .realtime
                            .broadcast_to_chat(
                                &chat_id,
                                ServerEvent::MessageEdited {
                                    message: MessagePayload::from(record),
                                },
                            )
                            .await;
                    }
                    Err(error) => self.send(ServerEvent::Error {
                        message: error.to_string(),
                    }),
                }
            }
            ClientEvent::DeleteMessage { message_id } => {
                match self
                    .state
                    .message_service
                    .delete_message(&message_id, user_id)
                    .await
                {
                    Ok(record) => {
                        self.state
                            .realtime
                            .broadcast_to_chat(
                                &record.chat_public_id,
                                ServerEvent::MessageDeleted {
                                    chat_id: record.chat_public_id.clone(),
                                    message_id: record.message.public_id.clone(),
                                },
                            )
                            .await;
                    }
                    Err(error) => self.send(ServerEvent::Error {
                        message: error.to_string(),
                    }),
                }
            }
            ClientEvent::AddReaction { message_id, emoji } => {
                match self
                    .state
                    .message_service
                    .add_reaction(&message_id, user_id, &emoji)
                    .await
                {
                    Ok(record) => {
                        let chat_id = record.chat_public_id.clone();
                        self.state
                            .realtime
                            .broadcast_to_chat(
                                &chat_id,
                                ServerEvent::ReactionAdded {
                                    message: MessagePayload::from(record),
                                },
                            )
                            .await;
                    }
                    Err(error) => self.send(ServerEvent::Error {
                        message: error.to_string(),
                    }),
                }
            }
            ClientEvent::RemoveReaction { message_id } => {
                match self
                    .state
                    .message_service
                    .remove_reaction(&message_id, user_id)
                    .await
                {
                    Ok(record) => {
                        let chat_id = record.chat_public_id.clone();
                        self.state
                            .realtime
                            .broadcast_to_chat(
                                &chat_id,
                                ServerEvent::ReactionRemoved {
                                    message: MessagePayload::from(record),
                                },
                            )
                            .await;
                    }
                    Err(error) => self.send(ServerEvent::Error {
                        message: error.to_string(),
                    }),
                }
            }
            ClientEvent::MarkMessageRead { message_id, .. } => {
                match self
                    .state
                    .message_service
                    .mark_message_read(&message_id, user_id)
                    .await
                {
                    Ok(record) => {
                        self.state
                            .realtime
                            .broadcast_to_chat(
                                &record.chat_public_id,
                                ServerEvent::MessageRead {
                                    chat_id: record.chat_public_id.clone(),
                                    message_id: record.message.public_id.clone(),
                                    user_id,
                                },
                            )
                            .await;
                    }
                    Err(error) => self.send(ServerEvent::Error {
                        message: error.to_string(),
                    }),
                }
            }
            ClientEvent::TypingStart { chat_id } => {
                self.relay_typing(user_id, chat_id, true).await;
            }
            ClientEvent::TypingStop { chat_id } => {
                self.relay_typing(user_id, chat_id, false).await;
            }
        }
    }

    async fn authenticate(&mut self, user_id: i64) {
        if self.user_id.is_some() {
            self.send(ServerEvent::Error {
                message: "connection already authenticated".to_string(),
            });
            return;
        }

        let connection_id = self
            .state
            .realtime
            .register(user_id, self.tx.clone())
            .await;
        self.user_id = Some(user_id);
        self.connection_id = Some(connection_id);

        debug!(user_id = user_id, connection_id = connection_id, "connection authenticated");
        self.send(ServerEvent::Authenticated { user_id });
    }

    async fn join_chat(&mut self, user_id: i64, chat_id: String) {
        if let Err(error) = self.state.chat_service.membership(&chat_id, user_id).await {
            self.send(ServerEvent::Error {
                message: error.to_string(),
            });
            return;
        }

        if !self.joined.contains_key(&chat_id) {
            let room = self.state.realtime.room(&chat_id).await;
            let mut receiver = room.subscribe();
            let tx = self.tx.clone();
            let room_id = chat_id.clone();
            let forwarder = tokio::spawn(async move {
                loop {
                    match receiver.recv().await {
                        Ok(outbound) => {
                            if outbound.exclude == Some(user_id) {
                                continue;
                            }
                            if tx.send(outbound.event).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(chat_id = %room_id, skipped = skipped, "connection lagged behind room broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
            self.joined.insert(chat_id.clone(), forwarder);
        }

        self.state
            .realtime
            .broadcast_to_chat_excluding(
                &chat_id,
                user_id,
                ServerEvent::UserOnline {
                    chat_id: chat_id.clone(),
                    user_id,
                },
            )
            .await;

        self.send(ServerEvent::JoinedChat { chat_id });
    }

    async fn send_message(
        &mut self,
        user_id: i64,
        chat_id: String,
        draft: MessageDraft,
        temp_id: Option<String>,
    ) {
        let record = match self
            .state
            .message_service
            .create_message(&chat_id, user_id, draft)
            .await
        {
            Ok(record) => record,
            Err(error) => {
                self.send(ServerEvent::MessageError {
                    error: error.to_string(),
                    temp_id,
                });
                return;
            }
        };

        let message_id = record.message.public_id.clone();
        let content = record.message.content.clone();
        let chat_public_id = record.chat_public_id.clone();

        self.state
            .realtime
            .broadcast_to_chat(
                &chat_public_id,
                ServerEvent::NewMessage {
                    message: MessagePayload::from(record),
                },
            )
            .await;

        self.send(ServerEvent::MessageDelivered { message_id, temp_id });

        // Push delivery is fire-and-forget: queued after the send commits so
        // provider latency never holds up the ack.
        let state = self.state.clone();
        tokio::spawn(async move {
            notify_offline_participants(&state, &chat_public_id, user_id, &content).await;
        });
    }

    async fn relay_typing(&self, user_id: i64, chat_id: String, is_typing: bool) {
        // Only relay into rooms this connection has actually joined.
        if !self.joined.contains_key(&chat_id) {
            return;
        }

        self.state
            .realtime
            .broadcast_to_chat_excluding(
                &chat_id,
                user_id,
                ServerEvent::UserTyping {
                    chat_id: chat_id.clone(),
                    user_id,
                    is_typing,
                },
            )
            .await;
    }

    /// Disconnect cleanup: release the user mapping and announce departure
    /// to every joined room.
    async fn finish(&mut self) {
        let (Some(user_id), Some(connection_id)) = (self.user_id, self.connection_id) else {
            return;
        };

        self.state.realtime.unregister(user_id, connection_id).await;

        for (chat_id, forwarder) in self.joined.drain() {
            forwarder.abort();
            self.state
                .realtime
                .broadcast_to_chat_excluding(
                    &chat_id,
                    user_id,
                    ServerEvent::UserOffline {
                        chat_id: chat_id.clone(),
                        user_id,
                    },
                )
                .await;
        }

        debug!(user_id = user_id, connection_id = connection_id, "connection closed");
    }
}

/// Best-effort push to chat participants without a live connection.
async fn notify_offline_participants(
    state: &GatewayState,
    chat_public_id: &str,
    sender_id: i64,
    content: &str,
) {
    let targets = match state
        .chat_service
        .notification_targets(chat_public_id, sender_id)
        .await
    {
        Ok(targets) => targets,
        Err(error) => {
            warn!(chat_id = chat_public_id, error = %error, "failed to resolve push recipients");
            return;
        }
    };

    let mut recipients = Vec::with_capacity(targets.len());
    for user_id in targets {
        if !state.realtime.is_connected(user_id).await {
            recipients.push(user_id);
        }
    }
    if recipients.is_empty() {
        return;
    }

    let title = match state.directory.find_by_id(sender_id).await {
        Ok(Some(profile)) => profile.display_name(),
        _ => "New message".to_string(),
    };

    let payload = PushPayload {
        title,
        body: content.to_string(),
        link: format!("{}/chats/{}", state.link_base, chat_public_id),
    };

    state.push.dispatch(&recipients, &payload).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_last_writer_wins() {
        let realtime = RealtimeState::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let first = realtime.register(7, tx1).await;
        let second = realtime.register(7, tx2).await;
        assert_ne!(first, second);
        assert!(realtime.is_connected(7).await);

        // The stale connection cannot unbind the newer one.
        realtime.unregister(7, first).await;
        assert!(realtime.is_connected(7).await);

        realtime.unregister(7, second).await;
        assert!(!realtime.is_connected(7).await);

        // The second channel was the registered one.
        drop(realtime);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_broadcast_respects_exclusion() {
        let realtime = RealtimeState::new();
        let room = realtime.room("chat-1").await;
        let mut receiver = room.subscribe();

        realtime
            .broadcast_to_chat_excluding(
                "chat-1",
                7,
                ServerEvent::UserTyping {
                    chat_id: "chat-1".to_string(),
                    user_id: 7,
                    is_typing: true,
                },
            )
            .await;

        let outbound = receiver.recv().await.unwrap();
        assert_eq!(outbound.exclude, Some(7));

        realtime
            .broadcast_to_chat(
                "chat-1",
                ServerEvent::JoinedChat {
                    chat_id: "chat-1".to_string(),
                },
            )
            .await;
        let outbound = receiver.recv().await.unwrap();
        assert_eq!(outbound.exclude, None);
    }

    #[tokio::test]
    async fn test_same_room_is_reused() {
        let realtime = RealtimeState::new();
        let room_a = realtime.room("chat-1").await;
        let mut receiver = realtime.room("chat-1").await.subscribe();

        let _ = room_a.send(Outbound {
            exclude: None,
            event: ServerEvent::JoinedChat {
                chat_id: "chat-1".to_string(),
            },
        });

        assert!(receiver.recv().await.is_ok());
    }
}
