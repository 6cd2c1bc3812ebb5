//! Process configuration loaded from the environment

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::types::RoomPolicy;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Interface to bind
    pub host: IpAddr,
    pub port: u16,
    /// Behaviour when a room name is registered twice
    pub room_policy: RoomPolicy,
    /// Deadline applied to registration requests (the chat stream has none)
    pub request_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            room_policy: RoomPolicy::Reuse,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl RelayConfig {
    /// Load config from environment variables
    ///
    /// - `RELAY_HOST`: bind address (default `0.0.0.0`)
    /// - `RELAY_PORT`: listen port (default `8081`)
    /// - `RELAY_ROOM_POLICY`: `reuse` or `reject` (default `reuse`)
    /// - `RELAY_REQUEST_TIMEOUT_SECS`: registration deadline (default `10`)
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env_parsed("RELAY_HOST", defaults.host);
        let port = env_parsed("RELAY_PORT", defaults.port);

        let room_policy = match std::env::var("RELAY_ROOM_POLICY") {
            Ok(v) => match v.trim().to_lowercase().as_str() {
                "reuse" => RoomPolicy::Reuse,
                "reject" => RoomPolicy::Reject,
                other => {
                    tracing::warn!("Unknown RELAY_ROOM_POLICY '{}', using reuse", other);
                    RoomPolicy::Reuse
                }
            },
            Err(_) => defaults.room_policy,
        };

        let request_timeout = Duration::from_secs(env_parsed(
            "RELAY_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ));

        Self {
            host,
            port,
            room_policy,
            request_timeout,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_parsed<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Invalid value '{}' for {}, using {}", raw, key, default);
                default
            }
        },
        Err(_) => default,
    }
}
