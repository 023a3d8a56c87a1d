//! # Punishment Service
//!
//! Issues and lifts punishments on top of [`PunishmentRepository`] and
//! carries out their side effects: disconnecting banned or kicked players
//! wherever they are on the network, notifying targets and staff, optional
//! public announcements and automatic warn escalation.

use crate::config::{EscalationAction, ModerationSettings};
use crate::duration::{format_duration_ms, format_timestamp, parse_duration};
use crate::error::ModerationError;
use crate::services::messages::MessageService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use warden_cross_proxy::{CrossProxyError, CrossProxyService};
use warden_event_system::{current_timestamp_millis, ProxyHost, CONSOLE_NAME};
use warden_storage::{NewPunishment, PlayerStatsRepository, Punishment, PunishmentRepository, PunishmentType};

pub const PERMISSION_NOTIFY: &str = "warden.notify";

/// A player as far as the network knows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub uuid: Option<String>,
}

/// Result of a warning, including any punishment it escalated into.
#[derive(Debug, Clone)]
pub struct WarnOutcome {
    pub warning: Punishment,
    pub active_warns: i64,
    pub escalation: Option<Punishment>,
}

pub struct PunishmentService {
    repo: PunishmentRepository,
    stats: PlayerStatsRepository,
    host: Arc<dyn ProxyHost>,
    cross: Arc<CrossProxyService>,
    messages: Arc<MessageService>,
    settings: Arc<RwLock<ModerationSettings>>,
    /// Serializes the active-check and insert of bans and mutes on this
    /// proxy. Two proxies can still race; the later row is harmless since
    /// lookups only ask whether any active row exists.
    issuing: Mutex<()>,
}

impl PunishmentService {
    pub fn new(
        repo: PunishmentRepository,
        stats: PlayerStatsRepository,
        host: Arc<dyn ProxyHost>,
        cross: Arc<CrossProxyService>,
        messages: Arc<MessageService>,
        settings: Arc<RwLock<ModerationSettings>>,
    ) -> Self {
        Self {
            repo,
            stats,
            host,
            cross,
            messages,
            settings,
            issuing: Mutex::new(()),
        }
    }

    /// Finds the canonical name and UUID for `name`: this proxy first, then
    /// network presence, then the last name seen in player statistics.
    pub async fn resolve(&self, name: &str) -> Result<Target, ModerationError> {
        if !is_valid_name(name) {
            return Err(ModerationError::PlayerNotFound(name.to_string()));
        }
        if let Some(player) = self.host.player_by_name(name).await {
            return Ok(Target {
                name: player.name,
                uuid: Some(player.id.to_string()),
            });
        }
        if let Some(entry) = self.cross.find(name) {
            return Ok(Target {
                name: entry.name,
                uuid: Some(entry.id.to_string()),
            });
        }
        if let Some(stats) = self.stats.find_by_name(name).await? {
            return Ok(Target {
                name: stats.last_name,
                uuid: Some(stats.player_uuid),
            });
        }
        Ok(Target {
            name: name.to_string(),
            uuid: None,
        })
    }

    pub async fn ban(
        &self,
        target: &str,
        issuer: &str,
        reason: Option<&str>,
        duration: Option<Duration>,
    ) -> Result<Punishment, ModerationError> {
        let target = self.resolve(target).await?;
        let ban = {
            let _issuing = self.issuing.lock().await;
            let now = current_timestamp_millis();
            if self.repo.is_active(&target.name, PunishmentType::Ban, now).await? {
                return Err(ModerationError::AlreadyPunished {
                    player: target.name,
                    kind: PunishmentType::Ban,
                });
            }
            self.record(&target, PunishmentType::Ban, issuer, reason, duration, now).await?
        };
        let now = current_timestamp_millis();
        self.disconnect_everywhere(&target.name, &self.ban_screen(&ban, now)).await;
        self.announce(&ban, "banned", now).await;
        info!("🔨 {} banned {} ({}): {}", issuer, ban.player_name, describe_length(&ban, now), ban.reason);
        Ok(ban)
    }

    pub async fn mute(
        &self,
        target: &str,
        issuer: &str,
        reason: Option<&str>,
        duration: Option<Duration>,
    ) -> Result<Punishment, ModerationError> {
        let target = self.resolve(target).await?;
        let mute = {
            let _issuing = self.issuing.lock().await;
            let now = current_timestamp_millis();
            if self.repo.is_active(&target.name, PunishmentType::Mute, now).await? {
                return Err(ModerationError::AlreadyPunished {
                    player: target.name,
                    kind: PunishmentType::Mute,
                });
            }
            self.record(&target, PunishmentType::Mute, issuer, reason, duration, now).await?
        };
        let now = current_timestamp_millis();
        self.notify_target(&target.name, &self.mute_notice(&mute, now)).await;
        self.announce(&mute, "muted", now).await;
        info!("🔇 {} muted {} ({}): {}", issuer, mute.player_name, describe_length(&mute, now), mute.reason);
        Ok(mute)
    }

    pub async fn warn(&self, target: &str, issuer: &str, reason: &str) -> Result<WarnOutcome, ModerationError> {
        let target = self.resolve(target).await?;
        let now = current_timestamp_millis();
        let warning = self
            .record(&target, PunishmentType::Warn, issuer, Some(reason), None, now)
            .await?;
        let active_warns = self.repo.count_active(&target.name, PunishmentType::Warn, now).await?;

        let count = active_warns.to_string();
        let notice = self.messages.render(
            "warn-notice",
            &[("issuer", issuer), ("reason", &warning.reason), ("count", &count)],
        );
        self.notify_target(&target.name, &notice).await;
        self.announce(&warning, "warned", now).await;
        info!("⚠️ {} warned {} ({} active): {}", issuer, warning.player_name, active_warns, warning.reason);

        let escalation = self.escalate(&target.name, active_warns).await?;
        Ok(WarnOutcome {
            warning,
            active_warns,
            escalation,
        })
    }

    /// Kicks a player who is online anywhere on the network.
    pub async fn kick(&self, target: &str, issuer: &str, reason: Option<&str>) -> Result<Punishment, ModerationError> {
        let online = match self.host.player_by_name(target).await {
            Some(player) => Some(player.name),
            None => self.cross.find(target).map(|entry| entry.name),
        };
        let Some(name) = online else {
            return Err(ModerationError::PlayerNotFound(target.to_string()));
        };

        let target = self.resolve(&name).await?;
        let now = current_timestamp_millis();
        let kick = self.record(&target, PunishmentType::Kick, issuer, reason, None, now).await?;
        let screen = self.messages.raw("kick-screen", &[("reason", &kick.reason)]);
        self.disconnect_everywhere(&target.name, &screen).await;
        self.announce(&kick, "kicked", now).await;
        info!("👢 {} kicked {}: {}", issuer, kick.player_name, kick.reason);
        Ok(kick)
    }

    pub async fn unban(&self, target: &str, issuer: &str, reason: Option<&str>) -> Result<u64, ModerationError> {
        let lifted = self.lift(target, PunishmentType::Ban, issuer, reason).await?;
        self.announce_lift(target, "unbanned", issuer).await;
        info!("🔓 {} unbanned {}", issuer, target);
        Ok(lifted)
    }

    pub async fn unmute(&self, target: &str, issuer: &str, reason: Option<&str>) -> Result<u64, ModerationError> {
        let lifted = self.lift(target, PunishmentType::Mute, issuer, reason).await?;
        self.notify_target(target, &self.messages.render("unmute-notice", &[])).await;
        self.announce_lift(target, "unmuted", issuer).await;
        info!("🔊 {} unmuted {}", issuer, target);
        Ok(lifted)
    }

    /// Deactivates every active warning. Returns how many were cleared.
    pub async fn clear_warns(&self, target: &str, issuer: &str) -> Result<u64, ModerationError> {
        let cleared = self.lift(target, PunishmentType::Warn, issuer, None).await?;
        info!("🧹 {} cleared {} warnings of {}", issuer, cleared, target);
        Ok(cleared)
    }

    pub async fn history(&self, target: &str, limit: i64) -> Result<Vec<Punishment>, ModerationError> {
        Ok(self.repo.history(target, limit, current_timestamp_millis()).await?)
    }

    pub async fn active_ban(&self, target: &str) -> Result<Option<Punishment>, ModerationError> {
        Ok(self
            .repo
            .find_active(target, PunishmentType::Ban, current_timestamp_millis())
            .await?)
    }

    pub async fn active_mute(&self, target: &str) -> Result<Option<Punishment>, ModerationError> {
        Ok(self
            .repo
            .find_active(target, PunishmentType::Mute, current_timestamp_millis())
            .await?)
    }

    pub async fn is_banned(&self, target: &str) -> Result<bool, ModerationError> {
        Ok(self
            .repo
            .is_active(target, PunishmentType::Ban, current_timestamp_millis())
            .await?)
    }

    pub async fn is_muted(&self, target: &str) -> Result<bool, ModerationError> {
        Ok(self
            .repo
            .is_active(target, PunishmentType::Mute, current_timestamp_millis())
            .await?)
    }

    pub async fn active_warn_count(&self, target: &str) -> Result<i64, ModerationError> {
        Ok(self
            .repo
            .count_active(target, PunishmentType::Warn, current_timestamp_millis())
            .await?)
    }

    /// Disconnect screen for a ban.
    pub fn ban_screen(&self, ban: &Punishment, now: i64) -> String {
        let expires = match ban.end_time {
            Some(end) => format!("{} ({})", format_timestamp(end), format_duration_ms(end - now)),
            None => "never".to_string(),
        };
        self.messages.raw(
            "ban-screen",
            &[("reason", &ban.reason), ("expires", &expires), ("issuer", &ban.issuer)],
        )
    }

    /// Chat notice shown to a muted player.
    pub fn mute_notice(&self, mute: &Punishment, now: i64) -> String {
        let remaining = match mute.remaining_ms(now) {
            Some(ms) => format_duration_ms(ms),
            None => "permanent".to_string(),
        };
        self.messages
            .render("mute-notice", &[("reason", &mute.reason), ("remaining", &remaining)])
    }

    async fn record(
        &self,
        target: &Target,
        kind: PunishmentType,
        issuer: &str,
        reason: Option<&str>,
        duration: Option<Duration>,
        now: i64,
    ) -> Result<Punishment, ModerationError> {
        let reason = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => reason.to_string(),
            None => self.settings.read().await.default_reason.clone(),
        };
        let duration_ms = duration.map(|d| d.as_millis().min(i64::MAX as u128) as i64);
        let new = NewPunishment {
            player_name: target.name.clone(),
            player_uuid: target.uuid.clone(),
            kind,
            reason: truncate(&reason, 255),
            issuer: issuer.to_string(),
            start_time: now,
            duration: duration_ms,
        };
        let id = self.repo.insert(&new).await?;

        Ok(Punishment {
            id,
            player_name: new.player_name,
            player_uuid: new.player_uuid,
            kind,
            reason: new.reason,
            issuer: new.issuer,
            start_time: now,
            duration: duration_ms,
            end_time: duration_ms.map(|d| now.saturating_add(d)),
            active: kind.starts_active(),
            removed_by: None,
            removed_at: None,
            removed_reason: None,
        })
    }

    async fn lift(
        &self,
        target: &str,
        kind: PunishmentType,
        issuer: &str,
        reason: Option<&str>,
    ) -> Result<u64, ModerationError> {
        let lifted = self
            .repo
            .deactivate(target, kind, issuer, reason, current_timestamp_millis())
            .await?;
        if lifted == 0 {
            return Err(ModerationError::NotPunished {
                player: target.to_string(),
                kind,
            });
        }
        Ok(lifted)
    }

    async fn escalate(&self, target: &str, active_warns: i64) -> Result<Option<Punishment>, ModerationError> {
        let rule = {
            let settings = self.settings.read().await;
            settings
                .warn_escalation
                .iter()
                .find(|rule| rule.warns == active_warns)
                .cloned()
        };
        let Some(rule) = rule else {
            return Ok(None);
        };

        let duration = match &rule.duration {
            Some(text) => parse_duration(text).map_err(ModerationError::Config)?,
            None => None,
        };
        let reason = rule
            .reason
            .clone()
            .unwrap_or_else(|| format!("Reached {} warnings", active_warns));

        let result = match rule.action {
            EscalationAction::Ban => self.ban(target, CONSOLE_NAME, Some(&reason), duration).await,
            EscalationAction::Mute => self.mute(target, CONSOLE_NAME, Some(&reason), duration).await,
            EscalationAction::Kick => self.kick(target, CONSOLE_NAME, Some(&reason)).await,
        };

        match result {
            Ok(punishment) => {
                let count = active_warns.to_string();
                let action = format!("{} ({})", punishment.kind, describe_length(&punishment, punishment.start_time));
                let text = self.messages.render(
                    "staff-escalation",
                    &[("player", &punishment.player_name), ("count", &count), ("action", &action)],
                );
                self.notify_staff(&text).await;
                Ok(Some(punishment))
            }
            // Already covered, or offline for a kick.
            Err(ModerationError::AlreadyPunished { .. }) | Err(ModerationError::PlayerNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn disconnect_everywhere(&self, name: &str, screen: &str) {
        match self.cross.disconnect(name, screen).await {
            Ok(_) | Err(CrossProxyError::PlayerNotFound(_)) => {}
            Err(e) => warn!("⚠️ Could not disconnect {}: {}", name, e),
        }
    }

    async fn notify_target(&self, name: &str, text: &str) {
        if let Some(player) = self.host.player_by_name(name).await {
            if let Err(e) = self.host.send_message(player.id, text).await {
                warn!("⚠️ Could not notify {}: {}", name, e);
            }
        }
    }

    async fn notify_staff(&self, text: &str) {
        self.host.send_console(text).await;
        if let Err(e) = self.cross.broadcast(text, Some(PERMISSION_NOTIFY)).await {
            warn!("⚠️ Failed to relay staff notification: {}", e);
        }
    }

    async fn announce(&self, punishment: &Punishment, action: &str, now: i64) {
        let length = describe_length(punishment, now);
        let text = self.messages.render(
            "staff-punish",
            &[
                ("action", action),
                ("player", &punishment.player_name),
                ("issuer", &punishment.issuer),
                ("reason", &punishment.reason),
                ("duration", &length),
            ],
        );
        self.notify_staff(&text).await;

        let public = self.settings.read().await.broadcast_punishments;
        if public && punishment.kind != PunishmentType::Warn {
            let text = self.messages.render(
                "broadcast-punish",
                &[("player", &punishment.player_name), ("action", action), ("reason", &punishment.reason)],
            );
            if let Err(e) = self.cross.broadcast(&text, None).await {
                warn!("⚠️ Failed to broadcast punishment: {}", e);
            }
        }
    }

    async fn announce_lift(&self, target: &str, action: &str, issuer: &str) {
        let text = self.messages.render(
            "staff-unpunish",
            &[("action", action), ("player", target), ("issuer", issuer)],
        );
        self.notify_staff(&text).await;
    }
}

/// `permanent`, or the remaining time of a timed punishment.
pub fn describe_length(punishment: &Punishment, now: i64) -> String {
    match (punishment.kind, punishment.remaining_ms(now)) {
        (PunishmentType::Kick | PunishmentType::Warn, _) => "-".to_string(),
        (_, None) => "permanent".to_string(),
        (_, Some(ms)) => format_duration_ms(ms),
    }
}

/// Minecraft usernames: 3 to 16 letters, digits or underscores.
pub fn is_valid_name(name: &str) -> bool {
    (3..=16).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("Notch"));
        assert!(is_valid_name("jeb_"));
        assert!(!is_valid_name("ab"));
        assert!(!is_valid_name("this_name_is_too_long"));
        assert!(!is_valid_name("bad name"));
    }
}
