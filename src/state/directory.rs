use super::{AppState, Relay};
use crate::error::{RelayError, RelayResult};
use crate::protocol::ServerMessage;
use crate::types::{ChatMessage, ConnectionId};
use tokio::sync::mpsc;

/// Send side of one live connection.
///
/// Frames are queued to the connection's writer task, which is the only
/// writer on the socket, so concurrent senders never interleave frames.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    connection_id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl StreamHandle {
    pub fn new(connection_id: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { connection_id, tx }
    }

    /// Create a handle with a fresh connection id and the receiver its writer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ulid::Ulid::new().to_string(), tx), rx)
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn send(&self, frame: ServerMessage) -> RelayResult<()> {
        self.tx.send(frame).map_err(|_| {
            RelayError::StreamTransport(format!("connection {} is closed", self.connection_id))
        })
    }

    pub fn push(&self, msg: ChatMessage) -> RelayResult<()> {
        self.send(ServerMessage::Message(msg))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn same_stream(&self, other: &StreamHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

impl Relay {
    pub(super) fn attach(&mut self, user_id: &str, handle: StreamHandle) -> Option<StreamHandle> {
        self.streams.insert(user_id.to_string(), handle)
    }

    /// Attach `handle` unless a live one is already recorded for `user_id`.
    /// A closed handle counts as absent.
    pub(super) fn attach_if_absent(&mut self, user_id: &str, handle: &StreamHandle) -> bool {
        match self.streams.get(user_id) {
            Some(existing) if !existing.is_closed() => false,
            _ => {
                self.attach(user_id, handle.clone());
                true
            }
        }
    }
}

impl AppState {
    /// Install `handle` for `user_id`, replacing any previous one without notice
    pub async fn attach(&self, user_id: &str, handle: StreamHandle) {
        let replaced = self.relay.lock().await.attach(user_id, handle);
        if let Some(old) = replaced {
            tracing::info!(
                "Stream for user {} replaced (old connection {})",
                user_id,
                old.connection_id()
            );
        } else {
            tracing::info!("Stream attached for user {}", user_id);
        }
    }

    pub async fn resolve(&self, user_id: &str) -> Option<StreamHandle> {
        self.relay.lock().await.streams.get(user_id).cloned()
    }

    /// Remove the directory entry for `user_id` if it still points at `handle`.
    /// Returns whether an entry was removed.
    pub async fn detach(&self, user_id: &str, handle: &StreamHandle) -> bool {
        let mut relay = self.relay.lock().await;
        let owned = relay
            .streams
            .get(user_id)
            .is_some_and(|current| current.same_stream(handle));

        if owned {
            relay.streams.remove(user_id);
            tracing::info!(
                "Stream detached for user {} (connection {})",
                user_id,
                handle.connection_id()
            );
        }
        owned
    }
}
