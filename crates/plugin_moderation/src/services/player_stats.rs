//! Join counts and playtime. Session start times live in memory; the
//! session length is added to the stored playtime on quit.

use crate::error::ModerationError;
use dashmap::DashMap;
use tracing::debug;
use warden_event_system::{current_timestamp_millis, PlayerId, PlayerInfo};
use warden_storage::{PlayerStats, PlayerStatsRepository};

pub struct PlayerStatsService {
    repo: PlayerStatsRepository,
    sessions: DashMap<PlayerId, i64>,
}

impl PlayerStatsService {
    pub fn new(repo: PlayerStatsRepository) -> Self {
        Self {
            repo,
            sessions: DashMap::new(),
        }
    }

    pub async fn record_join(&self, player: &PlayerInfo) -> Result<(), ModerationError> {
        let now = current_timestamp_millis();
        self.repo.record_join(&player.id.to_string(), &player.name, now).await?;
        self.sessions.insert(player.id, now);
        Ok(())
    }

    pub async fn record_quit(&self, player: &PlayerInfo) -> Result<(), ModerationError> {
        let Some((_, started)) = self.sessions.remove(&player.id) else {
            return Ok(());
        };
        let session = current_timestamp_millis() - started;
        self.repo.add_playtime(&player.id.to_string(), session).await?;
        debug!("{} played for {}ms", player.name, session);
        Ok(())
    }

    pub async fn record_server(&self, player: &PlayerInfo, server: &str) -> Result<(), ModerationError> {
        Ok(self.repo.record_server(&player.id.to_string(), server).await?)
    }

    /// Stored statistics plus the running session of an online player.
    pub async fn stats(&self, name: &str) -> Result<Option<PlayerStats>, ModerationError> {
        let Some(mut stats) = self.repo.find_by_name(name).await? else {
            return Ok(None);
        };
        if let Ok(id) = PlayerId::parse(&stats.player_uuid) {
            if let Some(started) = self.sessions.get(&id) {
                stats.playtime_ms += current_timestamp_millis() - *started;
            }
        }
        Ok(Some(stats))
    }

    pub async fn top_playtime(&self, limit: i64) -> Result<Vec<PlayerStats>, ModerationError> {
        Ok(self.repo.top_playtime(limit).await?)
    }

    /// Flushes every open session, used on shutdown.
    pub async fn flush_sessions(&self) -> Result<(), ModerationError> {
        let now = current_timestamp_millis();
        let sessions: Vec<(PlayerId, i64)> = self.sessions.iter().map(|e| (*e.key(), *e.value())).collect();
        for (id, started) in sessions {
            self.repo.add_playtime(&id.to_string(), now - started).await?;
            self.sessions.remove(&id);
        }
        Ok(())
    }
}
