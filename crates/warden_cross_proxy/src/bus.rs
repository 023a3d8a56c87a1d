//! # Message Bus
//!
//! Transport for [`Envelope`]s. [`RedisBus`] is the production transport:
//! one multiplexed connection for `PUBLISH` and a dedicated pub/sub
//! connection whose messages are forwarded into a tokio broadcast channel.
//! [`LocalBus`] keeps everything in-process; clones share one channel,
//! which is how tests wire several proxies together.

use crate::error::CrossProxyError;
use crate::protocol::Envelope;
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 1024;

#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    async fn publish(&self, envelope: &Envelope) -> Result<(), CrossProxyError>;

    /// A new receiver for every envelope published on the bus, including
    /// this process's own.
    fn subscribe(&self) -> broadcast::Receiver<Envelope>;

    async fn is_connected(&self) -> bool {
        true
    }

    /// Re-establishes lost connections. A no-op when already connected.
    async fn reconnect(&self) -> Result<(), CrossProxyError> {
        Ok(())
    }

    async fn close(&self) {}
}

/// In-process bus backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<Envelope>,
}

impl LocalBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn publish(&self, envelope: &Envelope) -> Result<(), CrossProxyError> {
        // Pass through the wire format so local runs catch codec problems.
        let decoded = Envelope::decode(&envelope.encode()?)?;
        // No subscribers is not an error.
        let _ = self.sender.send(decoded);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

/// Redis pub/sub bus.
pub struct RedisBus {
    client: redis::Client,
    channel: String,
    publisher: Mutex<Option<MultiplexedConnection>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    incoming: broadcast::Sender<Envelope>,
}

impl std::fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBus").field("channel", &self.channel).finish()
    }
}

impl RedisBus {
    /// Connects both connections and starts forwarding subscribed messages.
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Arc<Self>, CrossProxyError> {
        let client = redis::Client::open(url)?;
        let (incoming, _) = broadcast::channel(CHANNEL_CAPACITY);
        let bus = Arc::new(Self {
            client,
            channel: channel.into(),
            publisher: Mutex::new(None),
            listener: Mutex::new(None),
            incoming,
        });

        *bus.publisher.lock().await = Some(bus.client.get_multiplexed_async_connection().await?);
        bus.start_listener().await?;
        info!("📡 Connected to Redis, channel '{}'", bus.channel);
        Ok(bus)
    }

    async fn start_listener(&self) -> Result<(), CrossProxyError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(self.channel.as_str()).await?;

        let incoming = self.incoming.clone();
        let channel = self.channel.clone();
        let handle = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("⚠️ Unreadable payload on '{}': {}", channel, e);
                        continue;
                    }
                };
                match Envelope::decode(&payload) {
                    Ok(envelope) => {
                        let _ = incoming.send(envelope);
                    }
                    Err(e) => warn!("⚠️ Dropping malformed envelope on '{}': {}", channel, e),
                }
            }
            warn!("📡 Redis subscription on '{}' ended", channel);
        });

        if let Some(previous) = self.listener.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish(&self, envelope: &Envelope) -> Result<(), CrossProxyError> {
        let payload = envelope.encode()?;
        let mut guard = self.publisher.lock().await;
        let connection = guard.as_mut().ok_or(CrossProxyError::NotConnected)?;

        let result: redis::RedisResult<i64> = connection.publish(self.channel.as_str(), payload).await;
        match result {
            Ok(receivers) => {
                debug!("Published {} to {} receivers", envelope.message.kind(), receivers);
                Ok(())
            }
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    *guard = None;
                }
                Err(e.into())
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.incoming.subscribe()
    }

    async fn is_connected(&self) -> bool {
        let listening = self
            .listener
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        listening && self.publisher.lock().await.is_some()
    }

    async fn reconnect(&self) -> Result<(), CrossProxyError> {
        {
            let mut publisher = self.publisher.lock().await;
            if publisher.is_none() {
                *publisher = Some(self.client.get_multiplexed_async_connection().await?);
                info!("📡 Redis publisher reconnected");
            }
        }

        let listening = self
            .listener
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        if !listening {
            self.start_listener().await?;
            info!("📡 Redis subscription re-established");
        }
        Ok(())
    }

    async fn close(&self) {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.abort();
        }
        self.publisher.lock().await.take();
        info!("📡 Redis bus closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CrossProxyMessage;

    #[tokio::test]
    async fn test_local_bus_clones_share_channel() {
        let bus = LocalBus::new();
        let other = bus.clone();
        let mut receiver = other.subscribe();

        let envelope = Envelope::new("proxy-1", 7, CrossProxyMessage::ProxyShutdown);
        bus.publish(&envelope).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = LocalBus::new();
        let envelope = Envelope::new("proxy-1", 7, CrossProxyMessage::ProxyShutdown);
        assert!(bus.publish(&envelope).await.is_ok());
        assert!(bus.is_connected().await);
    }

    #[test]
    fn test_invalid_redis_url_is_rejected() {
        assert!(redis::Client::open("not a url").is_err());
    }
}
