//! Client side of the registration surface.
//!
//! Used by the console client to bootstrap before it opens its chat stream.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{RelayError, RelayResult};
use crate::protocol::{CreateRoomRequest, CreateUserRequest};
use crate::types::{ChatRoom, User};

/// Error body returned by the relay's HTTP endpoints
#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    msg: String,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    /// `host:port` of the relay
    addr: String,
}

impl RelayClient {
    /// Every registration call runs under `timeout`
    pub fn new(addr: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Startup(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            addr: addr.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// WebSocket URL of the chat stream
    pub fn chat_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn create_user(&self, user_id: &str, user_name: &str) -> RelayResult<User> {
        let resp = self
            .http
            .post(self.url("/api/users"))
            .json(&CreateUserRequest {
                user_id: user_id.to_string(),
                user_name: user_name.to_string(),
            })
            .send()
            .await
            .map_err(request_failed)?;

        match resp.status() {
            StatusCode::CREATED => resp.json().await.map_err(request_failed),
            _ => Err(api_error(resp, user_id).await),
        }
    }

    pub async fn get_chat_rooms(&self) -> RelayResult<Vec<ChatRoom>> {
        let resp = self
            .http
            .get(self.url("/api/rooms"))
            .send()
            .await
            .map_err(request_failed)?;

        if resp.status().is_success() {
            resp.json().await.map_err(request_failed)
        } else {
            Err(api_error(resp, "").await)
        }
    }

    pub async fn create_chat_room(&self, channel_name: &str) -> RelayResult<ChatRoom> {
        let resp = self
            .http
            .post(self.url("/api/rooms"))
            .json(&CreateRoomRequest {
                channel_name: channel_name.to_string(),
            })
            .send()
            .await
            .map_err(request_failed)?;

        if resp.status().is_success() {
            resp.json().await.map_err(request_failed)
        } else {
            Err(api_error(resp, channel_name).await)
        }
    }

    /// Reuse the room called `channel_name` if the relay already has one,
    /// otherwise create it
    pub async fn find_or_create_room(&self, channel_name: &str) -> RelayResult<ChatRoom> {
        let rooms = self.get_chat_rooms().await?;
        if let Some(room) = rooms.into_iter().find(|r| r.channel_name == channel_name) {
            tracing::debug!("Found chat room {} ({})", room.channel_name, room.channel_id);
            return Ok(room);
        }
        self.create_chat_room(channel_name).await
    }
}

fn request_failed(e: reqwest::Error) -> RelayError {
    RelayError::Startup(format!("relay request failed: {}", e))
}

/// Turn an error response back into the matching [`RelayError`]
async fn api_error(resp: reqwest::Response, subject: &str) -> RelayError {
    let status = resp.status();
    let body: ApiError = match resp.json().await {
        Ok(body) => body,
        Err(_) => {
            return RelayError::Startup(format!("relay answered {}", status));
        }
    };

    match body.code.as_str() {
        "DUPLICATE_USER" => RelayError::DuplicateUser(subject.to_string()),
        "DUPLICATE_ROOM" => RelayError::DuplicateRoom(subject.to_string()),
        "ROOM_NOT_FOUND" => RelayError::RoomNotFound(subject.to_string()),
        "INVALID_INPUT" => RelayError::InvalidInput(body.msg),
        _ => RelayError::Startup(format!("relay answered {}: {}", status, body.msg)),
    }
}
