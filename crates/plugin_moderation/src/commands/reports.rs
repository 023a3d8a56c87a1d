//! `/report` for players and `/reports` for staff.

use super::{Command, CommandRegistry, Invocation};
use crate::context::ModerationContext;
use crate::duration::format_timestamp;
use crate::error::CommandError;
use async_trait::async_trait;
use warden_storage::Report;

pub fn register(registry: &mut CommandRegistry) {
    registry.register(ReportCommand);
    registry.register(ReportsCommand);
}

pub struct ReportCommand;

#[async_trait]
impl Command for ReportCommand {
    fn name(&self) -> &'static str {
        "report"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.report")
    }

    fn usage(&self) -> &'static str {
        "/report <player> <reason>"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let reporter = inv.player()?;
        let target = inv.require(0)?;
        let reason = inv.require_rest(1)?;
        let report = ctx
            .reports
            .create(&reporter.name, target, &reason, reporter.server.as_deref())
            .await?;
        ctx.reply(
            &inv.source,
            "report-sent",
            &[("id", &report.id.to_string()), ("player", &report.target)],
        )
        .await;
        Ok(())
    }
}

/// `/reports` lists open reports oldest first, `/reports <player>` the
/// reports against one player and `/reports close <id> [note]` closes one.
pub struct ReportsCommand;

#[async_trait]
impl Command for ReportsCommand {
    fn name(&self) -> &'static str {
        "reports"
    }

    fn permission(&self) -> Option<&'static str> {
        Some("warden.reports")
    }

    fn usage(&self) -> &'static str {
        "/reports [player | close <id> [note]]"
    }

    async fn execute(&self, ctx: &ModerationContext, inv: &Invocation) -> Result<(), CommandError> {
        let limit = ctx.reports.list_limit().await;
        match inv.arg(0) {
            None => {
                let reports = ctx.reports.open_reports(limit).await?;
                let total = ctx.reports.count_open().await?;
                list(ctx, inv, &reports, total).await;
            }
            Some(sub) if sub.eq_ignore_ascii_case("close") => {
                let id: i64 = inv.require(1)?.parse().map_err(|_| inv.usage_error())?;
                let note = inv.rest(2);
                ctx.reports.close(id, inv.sender(), note.as_deref()).await?;
                ctx.reply(&inv.source, "report-closed", &[("id", &id.to_string())]).await;
            }
            Some(target) => {
                let reports = ctx.reports.reports_for(target, limit).await?;
                list(ctx, inv, &reports, reports.len() as i64).await;
            }
        }
        Ok(())
    }
}

async fn list(ctx: &ModerationContext, inv: &Invocation, reports: &[Report], total: i64) {
    if reports.is_empty() {
        ctx.reply(&inv.source, "reports-empty", &[]).await;
        return;
    }
    ctx.reply(&inv.source, "reports-header", &[("count", &total.to_string())])
        .await;
    for report in reports {
        let line = ctx.messages.raw(
            "reports-entry",
            &[
                ("id", &report.id.to_string()),
                ("player", &report.target),
                ("reporter", &report.reporter),
                ("date", &format_timestamp(report.created_at)),
                ("reason", &report.reason),
            ],
        );
        ctx.reply_raw(&inv.source, &line).await;
    }
}
