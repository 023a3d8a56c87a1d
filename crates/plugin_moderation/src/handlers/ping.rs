use crate::context::ModerationContext;
use async_trait::async_trait;
use std::sync::Arc;
use warden_event_system::{EventError, EventHandler, ProxyPingEvent};

/// Applies the configured MOTD, the network-wide player count and the
/// maintenance screen to server list pings.
pub struct PingListener {
    ctx: Arc<ModerationContext>,
}

impl PingListener {
    pub fn new(ctx: Arc<ModerationContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler<ProxyPingEvent> for PingListener {
    async fn handle(&self, event: &mut ProxyPingEvent) -> Result<(), EventError> {
        let network_online = self.ctx.cross.is_enabled().then(|| self.ctx.cross.online_count());
        let maintenance = match self.ctx.maintenance.is_enabled() {
            true => Some(self.ctx.maintenance.settings().await),
            false => None,
        };
        self.ctx
            .motd
            .apply(&mut event.ping, network_online, maintenance.as_ref())
            .await;
        Ok(())
    }
}
