//! # Maintenance Mode
//!
//! While enabled, only players holding [`PERMISSION_MAINTENANCE_BYPASS`] or
//! listed in `maintenance.bypass_players` may stay or join, and pings show
//! the maintenance MOTD. Maintenance can be scheduled: a countdown is
//! broadcast network-wide at the configured marks before it starts.

use crate::config::MaintenanceSettings;
use crate::duration::format_duration;
use crate::services::messages::MessageService;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};
use warden_cross_proxy::{CrossProxyMessage, CrossProxyService};
use warden_event_system::{PlayerInfo, ProxyHost};

pub const PERMISSION_MAINTENANCE_BYPASS: &str = "warden.maintenance.bypass";

struct Scheduled {
    /// Distinguishes a schedule from the one that replaced it.
    id: u64,
    starts_at: Instant,
    task: JoinHandle<()>,
}

pub struct MaintenanceService {
    enabled: AtomicBool,
    settings: RwLock<MaintenanceSettings>,
    scheduled: Mutex<Option<Scheduled>>,
    next_schedule_id: AtomicU64,
    host: Arc<dyn ProxyHost>,
    cross: Arc<CrossProxyService>,
    messages: Arc<MessageService>,
}

impl MaintenanceService {
    pub fn new(
        settings: &MaintenanceSettings,
        host: Arc<dyn ProxyHost>,
        cross: Arc<CrossProxyService>,
        messages: Arc<MessageService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(settings.enabled),
            settings: RwLock::new(settings.clone()),
            scheduled: Mutex::new(None),
            next_schedule_id: AtomicU64::new(0),
            host,
            cross,
            messages,
        })
    }

    /// Reloads texts, bypass list and countdown marks. The on/off state is
    /// runtime state and is left alone.
    pub async fn reload(&self, settings: &MaintenanceSettings) {
        *self.settings.write().await = settings.clone();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub async fn settings(&self) -> MaintenanceSettings {
        self.settings.read().await.clone()
    }

    /// Enables maintenance on every proxy and disconnects local players
    /// without bypass. Returns how many were disconnected.
    pub async fn enable(&self, by: &str) -> usize {
        self.cancel_schedule().await;
        self.enabled.store(true, Ordering::SeqCst);
        info!("🚧 Maintenance enabled by {}", by);
        self.relay(true, by).await;
        self.kick_unprivileged().await
    }

    pub async fn disable(&self, by: &str) {
        self.cancel_schedule().await;
        self.enabled.store(false, Ordering::SeqCst);
        info!("🚧 Maintenance disabled by {}", by);
        self.relay(false, by).await;
    }

    /// Applies a toggle received from another proxy.
    pub async fn apply_remote(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if enabled {
            self.kick_unprivileged().await;
        }
    }

    /// Starts maintenance after `delay`, announcing the countdown at every
    /// configured mark that fits inside it. Replaces any earlier schedule.
    pub async fn schedule(self: &Arc<Self>, delay: Duration, by: &str) {
        let starts_at = Instant::now() + delay;
        let mut marks: Vec<u64> = self
            .settings
            .read()
            .await
            .countdown_marks
            .iter()
            .copied()
            .filter(|mark| Duration::from_secs(*mark) <= delay)
            .collect();
        marks.sort_unstable_by(|a, b| b.cmp(a));
        marks.dedup();

        let id = self.next_schedule_id.fetch_add(1, Ordering::SeqCst);
        let service = Arc::clone(self);
        let by = by.to_string();

        // Held until the new schedule is stored, so the task can never look
        // at the slot before its own entry is in it.
        let mut slot = self.scheduled.lock().await;
        let task = tokio::spawn(async move {
            for mark in marks {
                let remaining = Duration::from_secs(mark);
                tokio::time::sleep_until(starts_at.checked_sub(remaining).unwrap_or(starts_at)).await;
                let text = service
                    .messages
                    .render("maintenance-countdown", &[("time", &format_duration(remaining))]);
                if let Err(e) = service.cross.broadcast(&text, None).await {
                    warn!("⚠️ Failed to relay maintenance countdown: {}", e);
                }
            }
            tokio::time::sleep_until(starts_at).await;

            // Detach before enabling so enable() does not abort this task.
            // A replaced schedule must not enable or touch its successor.
            {
                let mut slot = service.scheduled.lock().await;
                if slot.as_ref().map(|scheduled| scheduled.id) != Some(id) {
                    return;
                }
                slot.take();
            }
            service.enable(&by).await;
        });

        if let Some(previous) = slot.replace(Scheduled { id, starts_at, task }) {
            previous.task.abort();
        }
        drop(slot);
        info!("🚧 Maintenance scheduled in {}", format_duration(delay));
    }

    /// Cancels a scheduled start. Returns `false` if none was pending.
    pub async fn cancel_schedule(&self) -> bool {
        match self.scheduled.lock().await.take() {
            Some(scheduled) => {
                scheduled.task.abort();
                true
            }
            None => false,
        }
    }

    /// Time left until a scheduled start.
    pub async fn scheduled_in(&self) -> Option<Duration> {
        self.scheduled
            .lock()
            .await
            .as_ref()
            .map(|scheduled| scheduled.starts_at.saturating_duration_since(Instant::now()))
    }

    /// Whether `player` may be connected while maintenance is enabled.
    pub async fn may_join(&self, player: &PlayerInfo) -> bool {
        let listed = self
            .settings
            .read()
            .await
            .bypass_players
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&player.name));
        listed || self.host.has_permission(player.id, PERMISSION_MAINTENANCE_BYPASS).await
    }

    async fn kick_unprivileged(&self) -> usize {
        let screen = self.messages.raw("maintenance-kick", &[]);
        let mut kicked = 0;
        for player in self.host.online_players().await {
            if self.may_join(&player).await {
                continue;
            }
            match self.host.disconnect(player.id, &screen).await {
                Ok(()) => kicked += 1,
                Err(e) => warn!("⚠️ Could not disconnect {} for maintenance: {}", player.name, e),
            }
        }
        if kicked > 0 {
            info!("🚧 Disconnected {} players for maintenance", kicked);
        }
        kicked
    }

    async fn relay(&self, enabled: bool, by: &str) {
        let toggle = CrossProxyMessage::MaintenanceToggle {
            enabled,
            by: by.to_string(),
        };
        if let Err(e) = self.cross.publish(toggle).await {
            warn!("⚠️ Failed to relay maintenance toggle: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MessageSettings;
    use warden_event_system::{LocalProxy, PlayerId};

    struct Fixture {
        host: Arc<LocalProxy>,
        service: Arc<MaintenanceService>,
        player: PlayerId,
        admin: PlayerId,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(LocalProxy::new("proxy-1", vec!["lobby".to_string()]));
        let dyn_host: Arc<dyn ProxyHost> = host.clone();
        let cross = CrossProxyService::disabled(Arc::clone(&dyn_host));
        let messages = MessageService::new(&MessageSettings::default());
        let service = MaintenanceService::new(&MaintenanceSettings::default(), dyn_host, cross, messages);

        let player = PlayerId::new();
        let admin = PlayerId::new();
        host.join(PlayerInfo::new(player, "Alex"));
        host.join(PlayerInfo::new(admin, "Admin"));
        host.grant(admin, PERMISSION_MAINTENANCE_BYPASS);
        Fixture {
            host,
            service,
            player,
            admin,
        }
    }

    fn countdowns(host: &LocalProxy, id: PlayerId) -> Vec<String> {
        host.messages_for(id)
            .into_iter()
            .filter(|message| message.contains("Maintenance begins in"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_counts_down_then_enables() {
        let f = fixture();
        f.service.schedule(Duration::from_secs(65), "Admin").await;
        assert!(f.service.scheduled_in().await.is_some());

        tokio::time::sleep(Duration::from_secs(6)).await;
        let seen = countdowns(&f.host, f.player);
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("1m"));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let seen = countdowns(&f.host, f.player);
        assert_eq!(seen.len(), 2);
        assert!(seen[1].contains("30s"));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(countdowns(&f.host, f.player)[2].contains("10s"));
        assert!(!f.service.is_enabled());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(f.service.is_enabled());
        assert!(f.service.scheduled_in().await.is_none());

        let disconnected: Vec<PlayerId> = f.host.disconnections().into_iter().map(|(id, _)| id).collect();
        assert_eq!(disconnected, vec![f.player]);
        assert!(f.host.player_by_id(f.admin).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_schedule_never_enables() {
        let f = fixture();
        f.service.schedule(Duration::from_secs(65), "Admin").await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(f.service.cancel_schedule().await);
        assert!(!f.service.cancel_schedule().await);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!f.service.is_enabled());
        assert!(f.host.disconnections().is_empty());
        assert_eq!(countdowns(&f.host, f.player).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_keeps_newest_cancellable() {
        let f = fixture();
        f.service.schedule(Duration::from_secs(10), "Admin").await;
        f.service.schedule(Duration::from_secs(30), "Admin").await;

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(!f.service.is_enabled());
        assert!(f.service.scheduled_in().await.is_some());

        assert!(f.service.cancel_schedule().await);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!f.service.is_enabled());
        assert!(f.host.disconnections().is_empty());
    }
}
