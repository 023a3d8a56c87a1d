//! Sliding-window chat throttle. More than `max_messages` messages inside
//! `window_ms` silences the player for `cooldown_secs`.

use crate::config::SpamSettings;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use warden_event_system::PlayerId;

pub const PERMISSION_SPAM_BYPASS: &str = "warden.spam.bypass";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    Allowed,
    Throttled { remaining: Duration },
}

#[derive(Debug, Default)]
struct SpamState {
    history: HashMap<PlayerId, VecDeque<Instant>>,
    throttled_until: HashMap<PlayerId, Instant>,
}

#[derive(Debug)]
pub struct SpamGuard {
    settings: RwLock<SpamSettings>,
    state: Mutex<SpamState>,
}

impl SpamGuard {
    pub fn new(settings: &SpamSettings) -> Self {
        Self {
            settings: RwLock::new(settings.clone()),
            state: Mutex::new(SpamState::default()),
        }
    }

    pub async fn reload(&self, settings: &SpamSettings) {
        *self.settings.write().await = settings.clone();
    }

    pub async fn check(&self, player: PlayerId) -> SpamVerdict {
        self.check_at(player, Instant::now()).await
    }

    pub async fn check_at(&self, player: PlayerId, now: Instant) -> SpamVerdict {
        let settings = self.settings.read().await.clone();
        if !settings.enabled {
            return SpamVerdict::Allowed;
        }
        let window = Duration::from_millis(settings.window_ms);
        let cooldown = Duration::from_secs(settings.cooldown_secs);

        let mut guard = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let state = &mut *guard;

        if let Some(until) = state.throttled_until.get(&player).copied() {
            if now < until {
                return SpamVerdict::Throttled { remaining: until - now };
            }
            state.throttled_until.remove(&player);
        }

        let history = state.history.entry(player).or_default();
        while let Some(sent) = history.front().copied() {
            if now.duration_since(sent) > window {
                history.pop_front();
            } else {
                break;
            }
        }

        history.push_back(now);
        if history.len() > settings.max_messages {
            history.clear();
            state.throttled_until.insert(player, now + cooldown);
            return SpamVerdict::Throttled { remaining: cooldown };
        }
        SpamVerdict::Allowed
    }

    /// Drops everything tracked for a player who left.
    pub fn forget(&self, player: PlayerId) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.history.remove(&player);
        state.throttled_until.remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> SpamGuard {
        SpamGuard::new(&SpamSettings {
            enabled: true,
            window_ms: 1_000,
            max_messages: 3,
            cooldown_secs: 10,
        })
    }

    #[tokio::test]
    async fn test_throttles_after_burst() {
        let guard = guard();
        let player = PlayerId::new();
        let start = Instant::now();

        for i in 0..3 {
            let at = start + Duration::from_millis(i * 100);
            assert_eq!(guard.check_at(player, at).await, SpamVerdict::Allowed);
        }
        assert_eq!(
            guard.check_at(player, start + Duration::from_millis(300)).await,
            SpamVerdict::Throttled { remaining: Duration::from_secs(10) }
        );
        assert!(matches!(
            guard.check_at(player, start + Duration::from_secs(5)).await,
            SpamVerdict::Throttled { .. }
        ));
        assert_eq!(
            guard.check_at(player, start + Duration::from_secs(11)).await,
            SpamVerdict::Allowed
        );
    }

    #[tokio::test]
    async fn test_window_slides() {
        let guard = guard();
        let player = PlayerId::new();
        let start = Instant::now();

        for i in 0..10 {
            let at = start + Duration::from_millis(i * 600);
            assert_eq!(guard.check_at(player, at).await, SpamVerdict::Allowed);
        }
    }

    #[tokio::test]
    async fn test_players_are_independent() {
        let guard = guard();
        let spammer = PlayerId::new();
        let start = Instant::now();
        for _ in 0..4 {
            guard.check_at(spammer, start).await;
        }
        assert_eq!(guard.check_at(PlayerId::new(), start).await, SpamVerdict::Allowed);

        guard.forget(spammer);
        assert_eq!(guard.check_at(spammer, start).await, SpamVerdict::Allowed);
    }
}
