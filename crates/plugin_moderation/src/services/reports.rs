//! Player reports with a per-reporter cooldown and open-report cap.

use crate::config::ReportSettings;
use crate::error::ModerationError;
use crate::services::messages::MessageService;
use crate::services::punishments::is_valid_name;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use warden_cross_proxy::CrossProxyService;
use warden_event_system::{current_timestamp_millis, ProxyHost};
use warden_storage::{NewReport, Report, ReportRepository};

pub const PERMISSION_REPORTS_NOTIFY: &str = "warden.reports.notify";

pub struct ReportService {
    repo: ReportRepository,
    host: Arc<dyn ProxyHost>,
    cross: Arc<CrossProxyService>,
    messages: Arc<MessageService>,
    settings: RwLock<ReportSettings>,
}

impl ReportService {
    pub fn new(
        repo: ReportRepository,
        host: Arc<dyn ProxyHost>,
        cross: Arc<CrossProxyService>,
        messages: Arc<MessageService>,
        settings: &ReportSettings,
    ) -> Self {
        Self {
            repo,
            host,
            cross,
            messages,
            settings: RwLock::new(settings.clone()),
        }
    }

    pub async fn reload(&self, settings: &ReportSettings) {
        *self.settings.write().await = settings.clone();
    }

    pub async fn list_limit(&self) -> i64 {
        self.settings.read().await.list_limit
    }

    /// Files a report and alerts online staff on every proxy.
    pub async fn create(
        &self,
        reporter: &str,
        target: &str,
        reason: &str,
        server: Option<&str>,
    ) -> Result<Report, ModerationError> {
        if reporter.eq_ignore_ascii_case(target) {
            return Err(ModerationError::SelfReport);
        }
        if !is_valid_name(target) {
            return Err(ModerationError::PlayerNotFound(target.to_string()));
        }

        let settings = self.settings.read().await.clone();
        let now = current_timestamp_millis();
        if let Some(last) = self.repo.last_report_at(reporter).await? {
            let cooldown_ms = (settings.cooldown_secs as i64).saturating_mul(1000);
            let elapsed = now - last;
            if elapsed < cooldown_ms {
                return Err(ModerationError::ReportCooldown {
                    remaining_ms: cooldown_ms - elapsed,
                });
            }
        }
        if self.repo.count_open_by_reporter(reporter).await? >= settings.max_open_per_reporter {
            return Err(ModerationError::TooManyOpenReports {
                limit: settings.max_open_per_reporter,
            });
        }

        // Prefer the canonical spelling if the target is online.
        let target = match self.host.player_by_name(target).await {
            Some(player) => player.name,
            None => self.cross.find(target).map(|e| e.name).unwrap_or_else(|| target.to_string()),
        };

        let new = NewReport {
            reporter: reporter.to_string(),
            target: target.clone(),
            reason: reason.chars().take(255).collect(),
            server: server.map(str::to_string),
            created_at: now,
        };
        let id = self.repo.insert(&new).await?;

        let id_text = id.to_string();
        let notice = self.messages.render(
            "report-notify",
            &[
                ("id", &id_text),
                ("reporter", reporter),
                ("player", &target),
                ("server", server.unwrap_or("?")),
                ("reason", &new.reason),
            ],
        );
        self.host.send_console(&notice).await;
        if let Err(e) = self.cross.broadcast(&notice, Some(PERMISSION_REPORTS_NOTIFY)).await {
            warn!("⚠️ Failed to relay report #{}: {}", id, e);
        }
        info!("📝 {} reported {} (#{}): {}", reporter, target, id, new.reason);

        self.repo
            .get(id)
            .await?
            .ok_or(ModerationError::ReportNotOpen(id))
    }

    pub async fn open_reports(&self, limit: i64) -> Result<Vec<Report>, ModerationError> {
        Ok(self.repo.open(limit).await?)
    }

    pub async fn reports_for(&self, target: &str, limit: i64) -> Result<Vec<Report>, ModerationError> {
        Ok(self.repo.for_target(target, limit).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Report>, ModerationError> {
        Ok(self.repo.get(id).await?)
    }

    pub async fn close(&self, id: i64, handler: &str, note: Option<&str>) -> Result<(), ModerationError> {
        if !self.repo.close(id, handler, note, current_timestamp_millis()).await? {
            return Err(ModerationError::ReportNotOpen(id));
        }
        info!("📝 {} closed report #{}", handler, id);
        Ok(())
    }

    pub async fn count_open(&self) -> Result<i64, ModerationError> {
        Ok(self.repo.count_open().await?)
    }
}
