//! Environment-driven server settings.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use duelroom_room::RoomConfig;

/// Settings for the `duelroom` binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
    /// Fixes role assignment across restarts; random when unset.
    pub seed: Option<u64>,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_level: String,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            idle_timeout: Duration::from_secs(60),
            seed: None,
            log_level: "info".to_string(),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads settings from the process environment, after merging in a
    /// `.env` file if one exists. Unset or unparsable values fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("DUELROOM_HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "DUELROOM_PORT").unwrap_or(defaults.port),
            idle_timeout: parse(&lookup, "DUELROOM_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            seed: parse(&lookup, "DUELROOM_SEED"),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            room: RoomConfig {
                max_nickname_len: parse(&lookup, "DUELROOM_MAX_NICKNAME_LEN")
                    .unwrap_or(defaults.room.max_nickname_len),
                max_room_name_len: parse(&lookup, "DUELROOM_MAX_ROOM_NAME_LEN")
                    .unwrap_or(defaults.room.max_room_name_len),
                max_chat_len: parse(&lookup, "DUELROOM_MAX_CHAT_LEN")
                    .unwrap_or(defaults.room.max_chat_len),
            },
        }
    }

    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
