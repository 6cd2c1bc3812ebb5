use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type UserId = String;
pub type RoomId = String;
pub type ConnectionId = String;

/// A registered chat participant. Never mutated after registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRoom {
    pub channel_id: RoomId,
    pub channel_name: String,
    /// Members in join order
    #[serde(default)]
    pub users: Vec<User>,
}

impl ChatRoom {
    pub fn new(channel_id: RoomId, channel_name: String) -> Self {
        Self {
            channel_id,
            channel_name,
            users: Vec::new(),
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u.user_id == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub text: String,
}

/// A chat message as it travels over the wire, both inbound and forwarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub user: User,
    pub chat_room: RoomRef,
    pub content: Content,
}

/// Reference to a room inside a message. Only the id is used for routing;
/// the name is carried through so recipients can display it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomRef {
    pub channel_id: RoomId,
    #[serde(default)]
    pub channel_name: String,
}

impl From<&ChatRoom> for RoomRef {
    fn from(room: &ChatRoom) -> Self {
        Self {
            channel_id: room.channel_id.clone(),
            channel_name: room.channel_name.clone(),
        }
    }
}

impl ChatMessage {
    pub fn new(user: User, room: impl Into<RoomRef>, text: impl Into<String>) -> Self {
        Self {
            user,
            chat_room: room.into(),
            content: Content { text: text.into() },
        }
    }
}

/// What to do when a room is registered under a name that already exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomPolicy {
    /// Return the existing room
    #[default]
    Reuse,
    /// Fail with `DuplicateRoom`
    Reject,
}

/// Result of the membership check performed while routing a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Sender was already in the member list
    Member,
    /// Sender was not a member and has just been appended (NotMember -> Member)
    Joined,
    /// The referenced room does not exist
    NoRoom,
}
