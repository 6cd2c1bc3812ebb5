//! Chat frame dispatch
//!
//! Entry point for frames read off a connection. Kept free of socket types so
//! the routing path can be driven directly from tests.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, StreamHandle};
use crate::types::UserId;
use std::collections::HashSet;
use std::sync::Arc;

/// Per-connection state
#[derive(Debug)]
pub struct Session {
    pub handle: StreamHandle,
    /// User ids that have sent on this connection
    senders: HashSet<UserId>,
}

impl Session {
    pub fn new(handle: StreamHandle) -> Self {
        Self {
            handle,
            senders: HashSet::new(),
        }
    }

    pub fn senders(&self) -> impl Iterator<Item = &UserId> {
        self.senders.iter()
    }

    /// Detach every directory entry still owned by this connection
    pub async fn close(&self, state: &Arc<AppState>) {
        for user_id in &self.senders {
            state.detach(user_id, &self.handle).await;
        }
    }
}

/// Handle a client frame and return an optional direct reply
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Message(chat) => {
            if chat.user.user_id.trim().is_empty() {
                return Some(ServerMessage::Error {
                    code: "INVALID_MESSAGE".to_string(),
                    msg: "user.user_id must not be empty".to_string(),
                });
            }

            tracing::debug!(
                "Message from {} to {}: {}",
                chat.user.user_id,
                chat.chat_room.channel_id,
                chat.content.text
            );

            session.senders.insert(chat.user.user_id.clone());
            state.route(chat, &session.handle).await;
            None
        }
    }
}
