//! # Cross-Proxy Service
//!
//! Glue between the local [`ProxyHost`], the [`PresenceRegistry`] and a
//! [`MessageBus`]. Local presence changes are recorded and published;
//! envelopes from other proxies are applied to the registry or handed to
//! the registered [`RelayHandler`] for delivery. Without a bus the service
//! runs disabled: presence covers the local proxy only and nothing is
//! published.

use crate::bus::MessageBus;
use crate::error::CrossProxyError;
use crate::presence::{PresenceEntry, PresenceRegistry};
use crate::protocol::{CrossProxyMessage, Envelope, RemotePlayer};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use warden_event_system::{current_timestamp_millis, PlayerInfo, ProxyHost};

/// Receives relay messages that need feature-specific rendering (private
/// messages, staff chat, join-me invitations, whitelist and maintenance
/// toggles).
#[async_trait]
pub trait RelayHandler: Send + Sync + 'static {
    async fn handle_relay(&self, origin: &str, message: &CrossProxyMessage);
}

/// Where a targeted message ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Local(PlayerInfo),
    Remote { proxy: String, name: String },
}

pub struct CrossProxyService {
    proxy_id: String,
    host: Arc<dyn ProxyHost>,
    bus: Option<Arc<dyn MessageBus>>,
    presence: PresenceRegistry,
    relay: RwLock<Option<Arc<dyn RelayHandler>>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    stale_after_ms: i64,
}

impl std::fmt::Debug for CrossProxyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossProxyService")
            .field("proxy_id", &self.proxy_id)
            .field("enabled", &self.is_enabled())
            .field("players", &self.presence.count())
            .finish()
    }
}

impl CrossProxyService {
    pub fn new(
        host: Arc<dyn ProxyHost>,
        bus: Option<Arc<dyn MessageBus>>,
        stale_after_ms: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            proxy_id: host.proxy_id().to_string(),
            host,
            bus,
            presence: PresenceRegistry::new(),
            relay: RwLock::new(None),
            receiver: Mutex::new(None),
            stale_after_ms,
        })
    }

    /// A service with no bus.
    pub fn disabled(host: Arc<dyn ProxyHost>) -> Arc<Self> {
        Self::new(host, None, i64::MAX)
    }

    pub fn is_enabled(&self) -> bool {
        self.bus.is_some()
    }

    pub fn proxy_id(&self) -> &str {
        &self.proxy_id
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub async fn set_relay_handler(&self, handler: Arc<dyn RelayHandler>) {
        *self.relay.write().await = Some(handler);
    }

    /// Spawns the task applying envelopes from the bus. No-op when disabled.
    pub async fn start(self: &Arc<Self>) {
        let Some(bus) = &self.bus else {
            info!("📡 Cross-proxy disabled, presence is local only");
            return;
        };

        let mut incoming = bus.subscribe();
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match incoming.recv().await {
                    Ok(envelope) => service.apply(envelope).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ Cross-proxy receiver lagged, skipped {} envelopes", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        if let Some(previous) = self.receiver.lock().await.replace(handle) {
            previous.abort();
        }
        info!("📡 Cross-proxy service started as '{}'", self.proxy_id);
    }

    /// Publishes a message from this proxy. Always succeeds when disabled.
    pub async fn publish(&self, message: CrossProxyMessage) -> Result<(), CrossProxyError> {
        let Some(bus) = &self.bus else {
            return Ok(());
        };
        let envelope = Envelope::new(self.proxy_id.clone(), current_timestamp_millis(), message);
        bus.publish(&envelope).await
    }

    pub async fn player_joined(&self, player: &PlayerInfo) -> Result<(), CrossProxyError> {
        let remote = RemotePlayer::from(player);
        self.presence.upsert(&self.proxy_id, &remote, current_timestamp_millis());
        self.publish(CrossProxyMessage::PlayerJoin { player: remote }).await
    }

    pub async fn player_switched(&self, player: &PlayerInfo, server: &str) -> Result<(), CrossProxyError> {
        self.presence
            .switch(&self.proxy_id, player.id, &player.name, server, current_timestamp_millis());
        self.publish(CrossProxyMessage::PlayerSwitch {
            id: player.id,
            name: player.name.clone(),
            server: server.to_string(),
        })
        .await
    }

    pub async fn player_quit(&self, player: &PlayerInfo) -> Result<(), CrossProxyError> {
        self.presence.remove(&self.proxy_id, &player.name);
        self.publish(CrossProxyMessage::PlayerQuit {
            id: player.id,
            name: player.name.clone(),
        })
        .await
    }

    pub fn find(&self, name: &str) -> Option<PresenceEntry> {
        self.presence.find(name)
    }

    /// Player names per backend server across the network.
    pub fn global_list(&self) -> BTreeMap<String, Vec<String>> {
        self.presence.by_server()
    }

    pub fn proxies(&self) -> Vec<(String, i64)> {
        self.presence.proxies()
    }

    pub fn online_count(&self) -> usize {
        self.presence.count()
    }

    /// Resolves the recipient of a private message. Local recipients are
    /// returned for the caller to deliver; remote ones get the message
    /// published to their proxy.
    pub async fn send_private(&self, from: &str, to: &str, message: &str) -> Result<Delivery, CrossProxyError> {
        if let Some(player) = self.host.player_by_name(to).await {
            return Ok(Delivery::Local(player));
        }
        let entry = self.remote_entry(to)?;
        self.publish(CrossProxyMessage::PrivateMessage {
            from: from.to_string(),
            to: entry.name.clone(),
            message: message.to_string(),
        })
        .await?;
        Ok(Delivery::Remote {
            proxy: entry.proxy,
            name: entry.name,
        })
    }

    /// Disconnects a player wherever they are connected.
    pub async fn disconnect(&self, name: &str, reason: &str) -> Result<Delivery, CrossProxyError> {
        if let Some(player) = self.host.player_by_name(name).await {
            self.host.disconnect(player.id, reason).await?;
            return Ok(Delivery::Local(player));
        }
        let entry = self.remote_entry(name)?;
        self.publish(CrossProxyMessage::Disconnect {
            player: entry.name.clone(),
            reason: reason.to_string(),
        })
        .await?;
        Ok(Delivery::Remote {
            proxy: entry.proxy,
            name: entry.name,
        })
    }

    /// Sends pre-rendered text to every proxy. Returns local deliveries.
    pub async fn broadcast(&self, message: &str, permission: Option<&str>) -> Result<usize, CrossProxyError> {
        let delivered = self.host.broadcast(message, permission).await;
        self.publish(CrossProxyMessage::Broadcast {
            message: message.to_string(),
            permission: permission.map(str::to_string),
        })
        .await?;
        Ok(delivered)
    }

    /// Publishes a relay message and hands it to the local relay handler
    /// as well, so every proxy renders it the same way.
    pub async fn relay(&self, message: CrossProxyMessage) -> Result<(), CrossProxyError> {
        self.dispatch_relay(&self.proxy_id, &message).await;
        self.publish(message).await
    }

    /// Applies an envelope received from the bus. Own envelopes are ignored.
    pub async fn apply(&self, envelope: Envelope) {
        if envelope.origin == self.proxy_id {
            return;
        }
        let origin = envelope.origin.as_str();
        let now = current_timestamp_millis();
        debug!("Applying {} from {}", envelope.message.kind(), origin);

        match &envelope.message {
            CrossProxyMessage::PlayerJoin { player } => self.presence.upsert(origin, player, now),
            CrossProxyMessage::PlayerSwitch { id, name, server } => {
                self.presence.switch(origin, *id, name, server, now)
            }
            CrossProxyMessage::PlayerQuit { name, .. } => {
                self.presence.remove(origin, name);
                self.presence.touch(origin, now);
            }
            CrossProxyMessage::Heartbeat { players } => self.presence.replace_proxy(origin, players, now),
            CrossProxyMessage::ProxyShutdown => {
                let dropped = self.presence.remove_proxy(origin);
                info!("📡 Proxy '{}' shut down, dropped {} players", origin, dropped);
            }
            CrossProxyMessage::Broadcast { message, permission } => {
                self.host.broadcast(message, permission.as_deref()).await;
            }
            CrossProxyMessage::Disconnect { player, reason } => {
                if let Some(target) = self.host.player_by_name(player).await {
                    if let Err(e) = self.host.disconnect(target.id, reason).await {
                        warn!("⚠️ Could not disconnect {} for {}: {}", player, origin, e);
                    }
                }
            }
            CrossProxyMessage::PrivateMessage { .. }
            | CrossProxyMessage::StaffChat { .. }
            | CrossProxyMessage::JoinMe { .. }
            | CrossProxyMessage::WhitelistToggle { .. }
            | CrossProxyMessage::MaintenanceToggle { .. } => {
                self.dispatch_relay(origin, &envelope.message).await;
            }
        }
    }

    /// Periodic work: reconnect a dropped bus, publish the heartbeat and
    /// drop proxies that stopped sending theirs.
    pub async fn tick(&self) {
        self.tick_at(current_timestamp_millis()).await;
    }

    pub async fn tick_at(&self, now: i64) {
        let players: Vec<RemotePlayer> = self
            .host
            .online_players()
            .await
            .iter()
            .map(RemotePlayer::from)
            .collect();
        self.presence.replace_proxy(&self.proxy_id, &players, now);

        let Some(bus) = &self.bus else {
            return;
        };

        if !bus.is_connected().await {
            if let Err(e) = bus.reconnect().await {
                warn!("⚠️ Cross-proxy bus still unavailable: {}", e);
                return;
            }
        }

        if let Err(e) = self.publish(CrossProxyMessage::Heartbeat { players }).await {
            warn!("⚠️ Failed to publish heartbeat: {}", e);
        }

        for proxy in self.presence.prune(now, self.stale_after_ms, &self.proxy_id) {
            warn!("📡 Proxy '{}' missed its heartbeats, dropping its players", proxy);
        }
    }

    /// Announces shutdown to the network and stops the receiver.
    pub async fn shutdown(&self) {
        if let Err(e) = self.publish(CrossProxyMessage::ProxyShutdown).await {
            error!("❌ Failed to announce shutdown: {}", e);
        }
        if let Some(receiver) = self.receiver.lock().await.take() {
            receiver.abort();
        }
        if let Some(bus) = &self.bus {
            bus.close().await;
        }
    }

    fn remote_entry(&self, name: &str) -> Result<PresenceEntry, CrossProxyError> {
        match self.presence.find(name) {
            Some(entry) if self.is_enabled() && entry.proxy != self.proxy_id => Ok(entry),
            _ => Err(CrossProxyError::PlayerNotFound(name.to_string())),
        }
    }

    async fn dispatch_relay(&self, origin: &str, message: &CrossProxyMessage) {
        let handler = self.relay.read().await.clone();
        match handler {
            Some(handler) => handler.handle_relay(origin, message).await,
            None => debug!("No relay handler for {}", message.kind()),
        }
    }
}
