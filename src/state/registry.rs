use super::{AppState, Relay};
use crate::error::{RelayError, RelayResult};
use crate::types::*;

/// Outcome of registering a room by name
#[derive(Debug, Clone)]
pub struct RoomRegistration {
    pub room: ChatRoom,
    /// False when an existing room with the same name was returned
    pub created: bool,
}

impl Relay {
    fn room_by_name(&self, name: &str) -> Option<&ChatRoom> {
        self.rooms.values().find(|r| r.channel_name == name)
    }

    /// Append `user` to the room's member list if missing
    pub(super) fn ensure_member(&mut self, room_id: &str, user: &User) -> Membership {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Membership::NoRoom;
        };

        if room.has_member(&user.user_id) {
            Membership::Member
        } else {
            room.users.push(user.clone());
            Membership::Joined
        }
    }
}

impl AppState {
    /// Register a user. The first registration of an id wins.
    pub async fn register_user(&self, user_id: UserId, user_name: String) -> RelayResult<User> {
        if user_id.trim().is_empty() {
            return Err(RelayError::InvalidInput("user_id must not be empty".to_string()));
        }

        let mut relay = self.relay.lock().await;
        if relay.users.contains_key(&user_id) {
            tracing::warn!("Rejected duplicate user id {}", user_id);
            return Err(RelayError::DuplicateUser(user_id));
        }

        let user = User { user_id, user_name };
        relay.users.insert(user.user_id.clone(), user.clone());
        tracing::info!("User registered: {} ({})", user.user_name, user.user_id);
        Ok(user)
    }

    /// Register a room by name, applying the configured [`RoomPolicy`] on a name collision.
    ///
    /// The name lookup and the insert share one critical section, so two
    /// concurrent callers can never both create a room with the same name.
    pub async fn register_room(&self, channel_name: String) -> RelayResult<RoomRegistration> {
        let channel_name = channel_name.trim().to_string();
        if channel_name.is_empty() {
            return Err(RelayError::InvalidInput(
                "channel_name must not be empty".to_string(),
            ));
        }

        let mut relay = self.relay.lock().await;
        if let Some(existing) = relay.room_by_name(&channel_name) {
            return match self.room_policy {
                RoomPolicy::Reuse => {
                    tracing::debug!("Reusing room {} ({})", channel_name, existing.channel_id);
                    Ok(RoomRegistration {
                        room: existing.clone(),
                        created: false,
                    })
                }
                RoomPolicy::Reject => Err(RelayError::DuplicateRoom(channel_name)),
            };
        }

        let room = ChatRoom::new(ulid::Ulid::new().to_string(), channel_name);
        relay.room_order.push(room.channel_id.clone());
        relay.rooms.insert(room.channel_id.clone(), room.clone());
        tracing::info!("Chat room created: {} ({})", room.channel_name, room.channel_id);

        Ok(RoomRegistration {
            room,
            created: true,
        })
    }

    /// Snapshot of all rooms in creation order. Later changes are not reflected.
    pub async fn list_rooms(&self) -> impl Iterator<Item = ChatRoom> + Send {
        let relay = self.relay.lock().await;
        let snapshot: Vec<ChatRoom> = relay
            .room_order
            .iter()
            .filter_map(|id| relay.rooms.get(id).cloned())
            .collect();
        snapshot.into_iter()
    }

    pub async fn get_room(&self, room_id: &str) -> Option<ChatRoom> {
        self.relay.lock().await.rooms.get(room_id).cloned()
    }

    pub async fn get_user(&self, user_id: &str) -> Option<User> {
        self.relay.lock().await.users.get(user_id).cloned()
    }
}
