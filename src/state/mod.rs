mod directory;
mod registry;
mod router;

pub use directory::StreamHandle;
pub use registry::RoomRegistration;
pub use router::RouteOutcome;

use crate::types::*;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Registry and stream directory, guarded together by the single lock in [`AppState`].
#[derive(Debug, Default)]
pub struct Relay {
    users: HashMap<UserId, User>,
    rooms: HashMap<RoomId, ChatRoom>,
    /// Room ids in creation order, for stable listing
    room_order: Vec<RoomId>,
    streams: HashMap<UserId, StreamHandle>,
}

/// Shared broker state
///
/// Every read and write of users, rooms and streams goes through `relay`.
/// Critical sections only touch maps and lists; the lock is never held
/// while pushing to a stream.
pub struct AppState {
    relay: Mutex<Relay>,
    room_policy: RoomPolicy,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_room_policy(RoomPolicy::default())
    }

    pub fn with_room_policy(room_policy: RoomPolicy) -> Self {
        Self {
            relay: Mutex::new(Relay::default()),
            room_policy,
        }
    }

    pub fn room_policy(&self) -> RoomPolicy {
        self.room_policy
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::protocol::ServerMessage;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn user(id: &str, name: &str) -> User {
        User {
            user_id: id.to_string(),
            user_name: name.to_string(),
        }
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ChatMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let ServerMessage::Message(msg) = frame {
                out.push(msg);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_register_user() {
        let state = AppState::new();
        let alice = state
            .register_user("u1".to_string(), "alice".to_string())
            .await
            .unwrap();

        assert_eq!(alice.user_name, "alice");
        assert_eq!(state.get_user("u1").await, Some(alice));
    }

    #[tokio::test]
    async fn test_duplicate_user_keeps_first() {
        let state = AppState::new();
        state
            .register_user("u1".to_string(), "alice".to_string())
            .await
            .unwrap();

        let result = state
            .register_user("u1".to_string(), "mallory".to_string())
            .await;
        assert!(matches!(result, Err(RelayError::DuplicateUser(id)) if id == "u1"));

        let stored = state.get_user("u1").await.unwrap();
        assert_eq!(stored.user_name, "alice");
    }

    #[tokio::test]
    async fn test_register_user_rejects_empty_id() {
        let state = AppState::new();
        let result = state.register_user("  ".to_string(), "x".to_string()).await;
        assert!(matches!(result, Err(RelayError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_register_room_reuses_by_name() {
        let state = AppState::new();
        let first = state.register_room("general".to_string()).await.unwrap();
        let second = state.register_room("general".to_string()).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.room.channel_id, second.room.channel_id);
        assert_eq!(state.list_rooms().await.count(), 1);
    }

    #[tokio::test]
    async fn test_register_room_reject_policy() {
        let state = AppState::with_room_policy(RoomPolicy::Reject);
        state.register_room("general".to_string()).await.unwrap();

        let result = state.register_room("general".to_string()).await;
        assert!(matches!(result, Err(RelayError::DuplicateRoom(name)) if name == "general"));
        assert_eq!(state.list_rooms().await.count(), 1);
    }

    #[tokio::test]
    async fn test_list_rooms_is_a_snapshot() {
        let state = AppState::new();
        state.register_room("a".to_string()).await.unwrap();
        state.register_room("b".to_string()).await.unwrap();

        let rooms = state.list_rooms().await;
        state.register_room("c".to_string()).await.unwrap();

        let names: Vec<_> = rooms.map(|r| r.channel_name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_attach_overwrites_and_resolve() {
        let state = AppState::new();
        let (first, _rx1) = StreamHandle::channel();
        let (second, _rx2) = StreamHandle::channel();

        state.attach("u1", first.clone()).await;
        state.attach("u1", second.clone()).await;

        let resolved = state.resolve("u1").await.unwrap();
        assert!(resolved.same_stream(&second));
        assert!(state.resolve("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_detach_ignores_newer_stream() {
        let state = AppState::new();
        let (old, _rx1) = StreamHandle::channel();
        let (new, _rx2) = StreamHandle::channel();

        state.attach("u1", old.clone()).await;
        state.attach("u1", new.clone()).await;

        // The old connection closing must not evict the replacement
        assert!(!state.detach("u1", &old).await);
        assert!(state.resolve("u1").await.is_some());

        assert!(state.detach("u1", &new).await);
        assert!(state.resolve("u1").await.is_none());
    }

    #[tokio::test]
    async fn test_first_message_joins_room_once() {
        let state = AppState::new();
        let alice = user("a", "alice");
        let room = state.register_room("lobby".to_string()).await.unwrap().room;
        let (handle, _rx) = StreamHandle::channel();

        let first = state
            .route(ChatMessage::new(alice.clone(), &room, "hi"), &handle)
            .await;
        let second = state
            .route(ChatMessage::new(alice.clone(), &room, "again"), &handle)
            .await;

        assert_eq!(first.membership, Membership::Joined);
        assert!(first.attached);
        assert_eq!(second.membership, Membership::Member);
        assert!(!second.attached);

        let room = state.get_room(&room.channel_id).await.unwrap();
        assert_eq!(room.users, vec![alice]);
    }

    #[tokio::test]
    async fn test_route_skips_sender_and_unattached_members() {
        let state = AppState::new();
        let room = state.register_room("lobby".to_string()).await.unwrap().room;
        let (a_handle, mut a_rx) = StreamHandle::channel();
        let (b_handle, mut b_rx) = StreamHandle::channel();
        let (c_handle, _c_rx) = StreamHandle::channel();

        state
            .route(ChatMessage::new(user("b", "bob"), &room, "b here"), &b_handle)
            .await;
        state
            .route(ChatMessage::new(user("c", "carol"), &room, "c here"), &c_handle)
            .await;
        // carol's connection goes away cleanly
        state.detach("c", &c_handle).await;
        drain(&mut b_rx);

        let outcome = state
            .route(ChatMessage::new(user("a", "alice"), &room, "hello"), &a_handle)
            .await;

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 0);
        assert!(drain(&mut a_rx).is_empty());
        let got = drain(&mut b_rx);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].content.text, "hello");
    }

    #[tokio::test]
    async fn test_stale_stream_does_not_abort_fanout() {
        let state = AppState::new();
        let room = state.register_room("lobby".to_string()).await.unwrap().room;
        let (a_handle, _a_rx) = StreamHandle::channel();
        let (b_handle, b_rx) = StreamHandle::channel();
        let (c_handle, mut c_rx) = StreamHandle::channel();

        // bob joins first so he is iterated before carol
        state
            .route(ChatMessage::new(user("b", "bob"), &room, "b"), &b_handle)
            .await;
        state
            .route(ChatMessage::new(user("c", "carol"), &room, "c"), &c_handle)
            .await;
        drop(b_rx);

        let outcome = state
            .route(ChatMessage::new(user("a", "alice"), &room, "hello"), &a_handle)
            .await;

        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.delivered, 1);
        let texts: Vec<_> = drain(&mut c_rx)
            .into_iter()
            .map(|m| m.content.text)
            .collect();
        assert_eq!(texts, vec!["hello"]);
    }

    #[tokio::test]
    async fn test_unknown_room_is_tolerated() {
        let state = AppState::new();
        let (handle, _rx) = StreamHandle::channel();
        let ghost = RoomRef {
            channel_id: "missing".to_string(),
            channel_name: "ghost".to_string(),
        };

        let outcome = state
            .route(ChatMessage::new(user("a", "alice"), ghost, "anyone?"), &handle)
            .await;

        assert_eq!(outcome.membership, Membership::NoRoom);
        assert_eq!(outcome.delivered, 0);
        // The sender's stream is still recorded
        assert!(state.resolve("a").await.is_some());
    }

    #[tokio::test]
    async fn test_closed_handle_is_replaced_on_next_message() {
        let state = AppState::new();
        let room = state.register_room("lobby".to_string()).await.unwrap().room;
        let (stale, stale_rx) = StreamHandle::channel();
        state.attach("a", stale.clone()).await;
        drop(stale_rx);

        let (fresh, _fresh_rx) = StreamHandle::channel();
        let outcome = state
            .route(ChatMessage::new(user("a", "alice"), &room, "back"), &fresh)
            .await;

        assert!(outcome.attached);
        assert!(state.resolve("a").await.unwrap().same_stream(&fresh));
    }
}
