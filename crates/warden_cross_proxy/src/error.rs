use thiserror::Error;
use warden_event_system::HostError;

#[derive(Error, Debug)]
pub enum CrossProxyError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed envelope: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Message bus is not connected")]
    NotConnected,

    #[error("Player not online anywhere on the network: {0}")]
    PlayerNotFound(String),

    #[error(transparent)]
    Host(#[from] HostError),
}
